use crate::error::{ApiError, ApiResult};
use reqwest::{Client as HttpClient, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend API (e.g., "https://drive.example.com/api")
    pub base_url: String,
    /// Timeout for requests in seconds
    pub timeout_seconds: u64,
    /// Bearer token sent with every request, if any
    pub access_token: Option<String>,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds: 60,
            access_token: None,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the bearer token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Main drive API client
pub struct Client {
    pub(crate) config: ClientConfig,
    pub(crate) http_client: HttpClient,
    access_token: Arc<RwLock<Option<String>>>,
}

impl Client {
    /// Create a new API client
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        url::Url::parse(&config.base_url)?;

        let http_client = HttpClient::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let access_token = Arc::new(RwLock::new(config.access_token.clone()));

        Ok(Self {
            config,
            http_client,
            access_token,
        })
    }

    /// Replace the bearer token (e.g. after logging in again)
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the full URL for an API endpoint
    pub(crate) fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and decode the JSON response
    pub async fn send<T, R>(&self, path: &str, method: Method, body: Option<&T>) -> ApiResult<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.build_url(path);
        let mut request = self.http_client.request(method.clone(), &url);

        if let Some(token) = self.access_token.read().await.as_ref() {
            request = request.bearer_auth(token);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(target: "api", method = %method, path, "Sending request");

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_status(status.as_u16(), &response_text);
            if err.requires_login() {
                tracing::error!(target: "api", path, "Session expired");
            } else {
                tracing::warn!(target: "api", path, status = status.as_u16(), error = %err, "Request failed");
            }
            return Err(err);
        }

        // Some endpoints answer 2xx with an empty body
        let text = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text.as_str()
        };
        Ok(serde_json::from_str(text)?)
    }

    /// Send a GET request
    pub async fn get<R>(&self, path: &str) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        self.send::<(), R>(path, Method::GET, None).await
    }

    /// Send a POST request
    pub async fn post<T, R>(&self, path: &str, body: &T) -> ApiResult<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(path, Method::POST, Some(body)).await
    }

    /// Send a PUT request
    pub async fn put<T, R>(&self, path: &str, body: Option<&T>) -> ApiResult<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(path, Method::PUT, body).await
    }

    /// Send a DELETE request
    pub async fn delete<R>(&self, path: &str) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        self.send::<(), R>(path, Method::DELETE, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = Client::new(ClientConfig::new("http://localhost:5000/api/")).unwrap();
        assert_eq!(client.build_url("/files"), "http://localhost:5000/api/files");
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let result = Client::new(ClientConfig::new("drive.example.com/api"));
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new("http://x")
            .with_timeout(5)
            .with_access_token("abc");
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.access_token.as_deref(), Some("abc"));
    }
}
