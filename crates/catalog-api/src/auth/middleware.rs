use crate::auth::models::AuthUser;
use crate::auth::password::verify_password;
use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use catalog_core::AppError;
use catalog_db::UserRepository;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const AUTH_REQUIRED: &str = "Authentication required";
const INVALID_CREDENTIALS: &str = "Invalid credentials or insufficient permissions";
const AUTH_FAILED: &str = "Authentication failed";

#[derive(Debug, Clone, Copy)]
struct FailureWindow {
    failures: u32,
    expires_at: Instant,
}

/// Failed sign-ins per client address. A client that reaches `max_failures` is refused
/// until its window expires; expired windows are dropped on every new failure.
pub struct AuthFailureLimiter {
    windows: Mutex<HashMap<String, FailureWindow>>,
    max_failures: u32,
    window: Duration,
}

impl AuthFailureLimiter {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_failures,
            window: Duration::from_secs(window_seconds),
        }
    }

    /// Count a failure; true once the client has used up its attempts
    pub async fn record_failure(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| w.expires_at > now);

        let window = windows.entry(client.to_string()).or_insert(FailureWindow {
            failures: 0,
            expires_at: now + self.window,
        });
        window.failures += 1;
        window.failures >= self.max_failures
    }

    pub async fn is_blocked(&self, client: &str) -> bool {
        let windows = self.windows.lock().await;
        windows
            .get(client)
            .is_some_and(|w| w.expires_at > Instant::now() && w.failures >= self.max_failures)
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub users: UserRepository,
    pub auth_failure_limiter: Option<Arc<AuthFailureLimiter>>,
    /// See [`extract_client_ip`]
    pub trusted_proxy_count: usize,
}

/// Why a request could not be authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthFailure {
    /// No `Authorization: Basic` header
    Missing,
    /// Unknown user, wrong password, or not an active staff account
    Rejected,
    /// Header present but not decodable
    Malformed,
}

impl AuthFailure {
    fn message(self) -> &'static str {
        match self {
            AuthFailure::Missing => AUTH_REQUIRED,
            AuthFailure::Rejected => INVALID_CREDENTIALS,
            AuthFailure::Malformed => AUTH_FAILED,
        }
    }
}

/// Decode `Basic base64(username:password)`.
///
/// `Ok(None)` when the header is absent or uses another scheme.
fn parse_basic_auth(headers: &HeaderMap) -> Result<Option<(String, String)>, AuthFailure> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthFailure::Malformed)?;
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return Ok(None);
    };

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthFailure::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthFailure::Malformed)?;
    let (username, password) = decoded.split_once(':').ok_or(AuthFailure::Malformed)?;

    Ok(Some((username.to_string(), password.to_string())))
}

fn too_many_attempts() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "success": false,
            "error": "Too many failed auth attempts",
        })),
    )
        .into_response()
}

async fn authenticate(auth_state: &AuthState, headers: &HeaderMap) -> Result<AuthUser, AuthFailure> {
    let (username, password) = parse_basic_auth(headers)?.ok_or(AuthFailure::Missing)?;

    let user = auth_state
        .users
        .get_by_username(&username)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "User lookup failed during authentication");
            AuthFailure::Malformed
        })?
        .ok_or(AuthFailure::Rejected)?;

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|_| AuthFailure::Malformed)?
        .map_err(|e| {
            tracing::warn!(error = %e, username = %user.username, "Stored password hash is unreadable");
            AuthFailure::Malformed
        })?;

    if !verified || !user.can_use_api() {
        return Err(AuthFailure::Rejected);
    }

    Ok(AuthUser {
        id: user.id,
        username: user.username,
    })
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = extract_client_ip(request.headers(), peer, auth_state.trusted_proxy_count);

    if let Some(ref limiter) = auth_state.auth_failure_limiter {
        if limiter.is_blocked(&client).await {
            return too_many_attempts();
        }
    }

    match authenticate(&auth_state, request.headers()).await {
        Ok(user) => {
            tracing::debug!(username = %user.username, "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(failure) => {
            tracing::info!(client = %client, reason = ?failure, "Authentication failed");
            if let Some(ref limiter) = auth_state.auth_failure_limiter {
                if limiter.record_failure(&client).await {
                    return too_many_attempts();
                }
            }
            HttpAppError(AppError::Unauthorized(failure.message().to_string())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_basic_auth() {
        let encoded = STANDARD.encode("admin:pa:ss");
        let headers = headers_with_auth(&format!("Basic {}", encoded));
        assert_eq!(
            parse_basic_auth(&headers).unwrap(),
            Some(("admin".to_string(), "pa:ss".to_string()))
        );
    }

    #[test]
    fn test_parse_basic_auth_missing_or_other_scheme() {
        assert_eq!(parse_basic_auth(&HeaderMap::new()).unwrap(), None);
        let headers = headers_with_auth("Bearer abc");
        assert_eq!(parse_basic_auth(&headers).unwrap(), None);
    }

    #[test]
    fn test_parse_basic_auth_malformed() {
        let headers = headers_with_auth("Basic !!!not-base64");
        assert_eq!(parse_basic_auth(&headers), Err(AuthFailure::Malformed));

        let no_colon = STANDARD.encode("admin");
        let headers = headers_with_auth(&format!("Basic {}", no_colon));
        assert_eq!(parse_basic_auth(&headers), Err(AuthFailure::Malformed));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(AuthFailure::Missing.message(), "Authentication required");
        assert_eq!(
            AuthFailure::Rejected.message(),
            "Invalid credentials or insufficient permissions"
        );
        assert_eq!(AuthFailure::Malformed.message(), "Authentication failed");
    }

    #[tokio::test]
    async fn test_failure_limiter_blocks_after_max() {
        let limiter = AuthFailureLimiter::new(3, 60);
        assert!(!limiter.record_failure("1.2.3.4").await);
        assert!(!limiter.record_failure("1.2.3.4").await);
        assert!(!limiter.is_blocked("1.2.3.4").await);
        assert!(limiter.record_failure("1.2.3.4").await);
        assert!(limiter.is_blocked("1.2.3.4").await);
        assert!(!limiter.is_blocked("5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_escape_limiter() {
        let limiter = AuthFailureLimiter::new(10, 900);
        let peer = Some(SocketAddr::from(([198, 51, 100, 9], 51000)));

        let mut blocked = false;
        for i in 0..50 {
            let mut headers = HeaderMap::new();
            headers.insert(
                "x-forwarded-for",
                HeaderValue::from_str(&format!("10.0.0.{}", i)).unwrap(),
            );
            let client = extract_client_ip(&headers, peer, 0);
            blocked |= limiter.record_failure(&client).await;
        }

        assert!(blocked);
        assert!(limiter.is_blocked("198.51.100.9").await);
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_expired_windows_are_pruned() {
        let limiter = AuthFailureLimiter::new(3, 0);
        for i in 0..20 {
            limiter.record_failure(&format!("203.0.113.{}", i)).await;
        }
        assert_eq!(limiter.tracked_clients().await, 1);
        assert!(!limiter.is_blocked("203.0.113.19").await);
    }
}
