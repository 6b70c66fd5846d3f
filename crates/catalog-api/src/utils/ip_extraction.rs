//! Client address for the failed sign-in limiter

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Address of the caller as seen by the outermost trusted proxy.
///
/// With `trusted_proxy_count == 0` the `X-Forwarded-For` header is ignored and the
/// peer address is used. With N trusted proxies the N-th hop from the right is the
/// address the outermost proxy saw; anything left of it is caller-supplied.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| forwarded_hop(h, trusted_proxy_count));
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_hop(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let idx = hops.len().checked_sub(trusted_proxy_count)?;
    hops[idx].parse().ok()
}
