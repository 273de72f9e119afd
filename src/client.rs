//! BloodNet API client
//!
//! Typed HTTP client for the `/api/v1` endpoints, used by `bloodnet-cli`.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::api::dto::{
    HealthResponse, LoginRequest, LoginResponse, LogoutResponse, MeResponse, RegisterRequest,
    RegisterResponse, RequestListQuery, RequestListResponse,
};
use crate::api::error::ErrorResponse;
use crate::forms::{ProfileForm, RequestForm};
use crate::model::{BloodRequest, DonorProfile, RequestFilter, Role};
use crate::service::Dashboard;

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Attempts for reads when the server is unavailable or rate limiting
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 10_000,
            max_retries: 3,
        }
    }
}

/// Errors from the API client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Server unavailable at {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with an error body
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Request timeout")]
    Timeout,

    #[error("Not signed in")]
    NotSignedIn,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT.as_u16())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::NotSignedIn)
            || self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

/// HTTP client of the BloodNet API
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config,
            token: None,
        })
    }

    /// Use an id token for authenticated calls
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        auth: bool,
    ) -> Result<RequestBuilder, ClientError> {
        let builder = self.client.request(method, self.url(path));
        if !auth {
            return Ok(builder);
        }
        let token = self.token.as_deref().ok_or(ClientError::NotSignedIn)?;
        Ok(builder.bearer_auth(token))
    }

    fn transport(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable(self.config.base_url.clone())
        } else {
            ClientError::Request(e)
        }
    }

    async fn error_from(response: Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => ClientError::Api {
                status,
                code: body.error.code,
                message: body.error.message,
            },
            Err(_) => ClientError::Api {
                status,
                code: "HTTP_ERROR".to_string(),
                message: if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text
                },
            },
        }
    }

    /// Send once; writes are never replayed
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(|e| self.transport(e))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    /// GET with retry on 429/503 and connection failures
    async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: Option<&Q>,
        auth: bool,
    ) -> Result<T, ClientError> {
        let mut last_error = ClientError::Unavailable(self.config.base_url.clone());

        for attempt in 0..self.config.max_retries.max(1) {
            if attempt > 0 {
                // Exponential backoff: 1s, 4s, 9s...
                let delay = std::time::Duration::from_secs((attempt as u64).pow(2));
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.request(Method::GET, path, auth)?;
            if let Some(query) = query {
                builder = builder.query(query);
            }

            match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json().await?);
                }
                Ok(response)
                    if response.status() == StatusCode::TOO_MANY_REQUESTS
                        || response.status() == StatusCode::SERVICE_UNAVAILABLE =>
                {
                    last_error = Self::error_from(response).await;
                }
                Ok(response) => return Err(Self::error_from(response).await),
                Err(e) => {
                    last_error = self.transport(e);
                    if matches!(last_error, ClientError::Request(_)) {
                        return Err(last_error);
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        auth: bool,
    ) -> Result<T, ClientError> {
        let mut builder = self.request(method, path, auth)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(self.send(builder).await?.json().await?)
    }

    // ============================================
    // Auth
    // ============================================

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<RegisterResponse, ClientError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            role,
        };
        self.json(Method::POST, "/api/v1/auth/register", Some(&body), false)
            .await
    }

    /// Sign in and keep the id token for later calls
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .json(Method::POST, "/api/v1/auth/login", Some(&body), false)
            .await?;
        self.token = Some(response.id_token.clone());
        Ok(response)
    }

    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let _: LogoutResponse = self
            .json(Method::POST, "/api/v1/auth/logout", None::<&()>, true)
            .await?;
        self.token = None;
        Ok(())
    }

    pub async fn me(&self) -> Result<MeResponse, ClientError> {
        self.get("/api/v1/auth/me", None::<&()>, true).await
    }

    // ============================================
    // Requests
    // ============================================

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<BloodRequest>, ClientError> {
        let query = RequestListQuery::from_filter(filter);
        let list: RequestListResponse = self.get("/api/v1/requests", Some(&query), true).await?;
        Ok(list.requests)
    }

    pub async fn create_request(&self, form: &RequestForm) -> Result<BloodRequest, ClientError> {
        self.json(Method::POST, "/api/v1/requests", Some(form), true)
            .await
    }

    pub async fn get_request(&self, id: &str) -> Result<BloodRequest, ClientError> {
        let path = format!("/api/v1/requests/{}", urlencoding::encode(id));
        self.get(&path, None::<&()>, true).await
    }

    pub async fn donate(&self, id: &str) -> Result<BloodRequest, ClientError> {
        let path = format!("/api/v1/requests/{}/donate", urlencoding::encode(id));
        self.json(Method::POST, &path, None::<&()>, true).await
    }

    pub async fn undo_donation(&self, id: &str) -> Result<BloodRequest, ClientError> {
        let path = format!("/api/v1/requests/{}/donation", urlencoding::encode(id));
        self.json(Method::DELETE, &path, None::<&()>, true).await
    }

    pub async fn history(&self) -> Result<Vec<BloodRequest>, ClientError> {
        let list: RequestListResponse = self.get("/api/v1/donations", None::<&()>, true).await?;
        Ok(list.requests)
    }

    // ============================================
    // Admin
    // ============================================

    pub async fn dashboard(&self) -> Result<Dashboard, ClientError> {
        self.get("/api/v1/dashboard", None::<&()>, true).await
    }

    pub async fn export_csv(&self) -> Result<String, ClientError> {
        let builder = self.request(Method::GET, "/api/v1/export", true)?;
        Ok(self.send(builder).await?.text().await?)
    }

    // ============================================
    // Profile
    // ============================================

    pub async fn profile(&self) -> Result<DonorProfile, ClientError> {
        self.get("/api/v1/profile", None::<&()>, true).await
    }

    pub async fn update_profile(&self, form: &ProfileForm) -> Result<DonorProfile, ClientError> {
        self.json(Method::PUT, "/api/v1/profile", Some(form), true)
            .await
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health", None::<&()>, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_url_joins_base() {
        let client = ApiClient::new(ClientConfig {
            base_url: "http://api.example.com/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.url("/api/v1/requests"),
            "http://api.example.com/api/v1/requests"
        );
    }

    #[test]
    fn test_authenticated_calls_need_token() {
        let client = ApiClient::new(ClientConfig::default()).unwrap();
        assert!(matches!(
            client.request(Method::GET, "/api/v1/profile", true),
            Err(ClientError::NotSignedIn)
        ));
        assert!(client.request(Method::GET, "/health", false).is_ok());

        let client = client.with_token(Some("tok".to_string()));
        assert_eq!(client.token(), Some("tok"));
        assert!(client.request(Method::GET, "/api/v1/profile", true).is_ok());
    }

    #[test]
    fn test_error_classification() {
        let conflict = ClientError::Api {
            status: 409,
            code: "CONFLICT".to_string(),
            message: "Conflict: taken".to_string(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_unauthorized());
        assert!(ClientError::NotSignedIn.is_unauthorized());
    }
}
