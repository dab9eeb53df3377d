// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kubernetes API access for `host_k8s_api_call`.
//!
//! Host functions run synchronously on the thread that invoked the guest, so
//! [`KubeApi::call`] is blocking. [`HttpKubeApi`] drives its async client on a
//! captured tokio runtime handle and must therefore be called from a blocking
//! context (e.g. inside `spawn_blocking`), never from an async task.

use std::path::Path;
use std::time::Duration;

use galaxy_core::{GalaxyError, HttpMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

use crate::permissions::canonical_api_path;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on any per-request timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// A request decoded from the guest's `host_k8s_api_call` argument.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KubeRequest {
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

impl KubeRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Decode a guest argument: either a JSON request object or a bare API path.
    pub fn parse(arg: &str) -> Result<Self, serde_json::Error> {
        let arg = arg.trim();
        if arg.starts_with('{') {
            serde_json::from_str(arg)
        } else {
            Ok(Self::get(arg))
        }
    }
}

/// The response handed back to the guest as JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KubeResponse {
    pub status: u16,
    pub body: Value,
}

/// Blocking access to the Kubernetes API.
pub trait KubeApi: Send + Sync {
    fn call(&self, request: &KubeRequest) -> Result<KubeResponse, GalaxyError>;
}

/// [`KubeApi`] backed by reqwest against a real API server.
pub struct HttpKubeApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    handle: Handle,
}

impl std::fmt::Debug for HttpKubeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpKubeApi")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpKubeApi {
    /// Create a client bound to the current tokio runtime.
    ///
    /// `timeout` is clamped to [`MAX_TIMEOUT`].
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GalaxyError> {
        let handle = Handle::try_current()
            .map_err(|e| GalaxyError::Internal(format!("no tokio runtime for kube client: {e}")))?;
        let timeout = timeout.min(MAX_TIMEOUT);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GalaxyError::Internal(format!("failed to build kube client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            timeout,
            handle,
        })
    }

    /// Like [`HttpKubeApi::new`], reading the bearer token from a service-account file.
    ///
    /// A missing token file means requests go out unauthenticated.
    pub fn with_token_file(
        base_url: impl Into<String>,
        token_path: &Path,
        timeout: Duration,
    ) -> Result<Self, GalaxyError> {
        let token = std::fs::read_to_string(token_path)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if token.is_none() {
            debug!(path = %token_path.display(), "no kubernetes token found, using anonymous access");
        }
        Self::new(base_url, token, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl KubeApi for HttpKubeApi {
    fn call(&self, request: &KubeRequest) -> Result<KubeResponse, GalaxyError> {
        if canonical_api_path(&request.path).is_none() {
            return Err(GalaxyError::Internal(format!(
                "refusing non-canonical kubernetes API path `{}`",
                request.path
            )));
        }
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(Self::method(request.method), &url)
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = self
            .handle
            .block_on(tokio::time::timeout(self.timeout, exchange))
            .map_err(|_| GalaxyError::Timeout {
                duration: self.timeout,
            })?
            .map_err(|e| {
                if e.is_timeout() {
                    GalaxyError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    GalaxyError::Internal(format!("kubernetes request to {url} failed: {e}"))
                }
            })?;

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(KubeResponse { status, body })
    }
}
