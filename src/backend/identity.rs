//! Identity Toolkit REST client
//!
//! Email/password accounts are owned by Firebase Authentication. This client
//! calls `accounts:signUp`, `accounts:signInWithPassword`, `accounts:lookup`
//! and `accounts:delete`; it never sees or stores password hashes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{AuthError, BackendError};
use super::{AuthSession, AuthUser, IdentityProvider};

/// Connection settings for the Identity Toolkit API
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Base URL up to and excluding `/v1`
    pub endpoint: String,
    /// Web API key of the project
    pub api_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://identitytoolkit.googleapis.com".to_string(),
            api_key: String::new(),
            request_timeout_ms: 5000,
        }
    }
}

impl IdentityConfig {
    /// Settings for the local Auth emulator (`host:port`)
    pub fn emulator(host: &str) -> Self {
        Self {
            endpoint: format!(
                "http://{}/identitytoolkit.googleapis.com",
                host.trim_end_matches('/')
            ),
            // The emulator accepts any key
            api_key: "fake-api-key".to_string(),
            ..Default::default()
        }
    }
}

/// Identity provider backed by the Identity Toolkit REST API
pub struct IdentityToolkit {
    client: Client,
    config: IdentityConfig,
}

impl IdentityToolkit {
    pub fn new(config: IdentityConfig) -> Result<Self, BackendError> {
        if config.api_key.trim().is_empty() {
            return Err(BackendError::Config("identity api key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BackendError::Config(format!("http client: {e}")))?;

        Ok(Self { client, config })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}", self.config.endpoint, method)
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.url(method))
            .query(&[("key", &self.config.api_key)])
            .json(body)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| AuthError::Backend(BackendError::Request(e)));
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ToolkitErrorBody>(&text) {
            Ok(body) => {
                tracing::debug!(method, code = %body.error.message, "Identity call rejected");
                Err(AuthError::from_code(&body.error.message))
            }
            Err(_) => Err(AuthError::Backend(BackendError::Api {
                status: status.as_u16(),
                message: text,
            })),
        }
    }

    fn session_from(token: TokenResponse) -> AuthSession {
        AuthSession {
            user: AuthUser {
                uid: token.local_id,
                email: token.email.unwrap_or_default(),
            },
            id_token: token.id_token,
            refresh_token: token.refresh_token.unwrap_or_default(),
            expires_in: token
                .expires_in
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    fn name(&self) -> &str {
        "identitytoolkit"
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let token: TokenResponse = self.call("signUp", &body).await?;
        tracing::info!(uid = %token.local_id, "Account registered");
        Ok(Self::session_from(token))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let token: TokenResponse = self.call("signInWithPassword", &body).await?;
        Ok(Self::session_from(token))
    }

    async fn verify(&self, id_token: &str) -> Result<AuthUser, AuthError> {
        let body = LookupRequest { id_token };
        let lookup: LookupResponse = self.call("lookup", &body).await?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidToken)?;
        if user.disabled {
            return Err(AuthError::UserDisabled);
        }

        Ok(AuthUser {
            uid: user.local_id,
            email: user.email.unwrap_or_default(),
        })
    }

    async fn delete_account(&self, id_token: &str) -> Result<(), AuthError> {
        let body = LookupRequest { id_token };
        let _: serde_json::Value = self.call("delete", &body).await?;
        tracing::info!("Account deleted");
        Ok(())
    }
}

// ============================================
// Request/Response DTOs
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Seconds, sent as a decimal string
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorBody {
    error: ToolkitError,
}

#[derive(Debug, Deserialize)]
struct ToolkitError {
    #[serde(default)]
    message: String,
}
