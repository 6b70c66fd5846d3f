//! HTTP client for the catalog import API.
//!
//! Every request carries HTTP Basic credentials. Non-2xx answers become an
//! [`ApiFailure`] inside the returned `anyhow::Error`, so callers can tell a 401
//! from a network error with `downcast_ref`.

pub mod api;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default server when `CATALOG_API_URL` is not set
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Import API path prefix; paths keep their trailing slash
pub const IMPORT_PREFIX: &str = "/upload/api";

/// A request the server answered with a non-success status
#[derive(Debug, Clone, thiserror::Error)]
#[error("API request failed with status {status}: {message}")]
pub struct ApiFailure {
    pub status: StatusCode,
    /// The `error` field of the JSON body, or the raw body
    pub message: String,
}

impl ApiFailure {
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);
        Self { status, message }
    }
}

/// HTTP client for the catalog API with Basic auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ApiClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.username, Some(&self.password))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        if !response.status().is_success() {
            return Err(ApiFailure::from_response(response).await.into());
        }

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// GET request with query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(self.client.post(self.build_url(path)).json(body))
            .await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        self.send(self.client.post(self.build_url(path)).multipart(form))
            .await
    }
}

pub use api::{CreatedEntry, DuplicateCheck, ImportHealth, TagNames, UploadedImage};
