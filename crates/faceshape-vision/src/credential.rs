//! Bearer credentials for the Vision API.
//!
//! A [`Credential`] is owned by whoever drives the landmark source and is
//! passed explicitly to each request. Refresh-token credentials exchange
//! the token lazily, at most once per instance.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;

pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid credential config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
    #[error("no refresh token in {}; log in with the Firebase CLI first", .0.display())]
    NotLoggedIn(PathBuf),
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("credential holds no access token")]
    NoToken,
}

/// OAuth client used for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseToolsConfig {
    #[serde(default)]
    tokens: Option<FirebaseTokens>,
}

#[derive(Debug, Deserialize)]
struct FirebaseTokens {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Read `tokens.refresh_token` from a firebase-tools style JSON config.
pub fn refresh_token_from_config(path: &Path) -> Result<String, CredentialError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    refresh_token_from_config_str(&raw)?
        .ok_or_else(|| CredentialError::NotLoggedIn(path.to_path_buf()))
}

fn refresh_token_from_config_str(raw: &str) -> Result<Option<String>, CredentialError> {
    let config: FirebaseToolsConfig = serde_json::from_str(raw)?;
    Ok(config
        .tokens
        .and_then(|t| t.refresh_token)
        .filter(|t| !t.is_empty()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
enum Grant {
    Static,
    RefreshToken {
        client: OAuthClient,
        refresh_token: String,
    },
}

/// Lazily-initialised bearer token.
pub struct Credential {
    grant: Grant,
    access_token: OnceCell<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grant = match self.grant {
            Grant::Static => "static",
            Grant::RefreshToken { .. } => "refresh_token",
        };
        f.debug_struct("Credential")
            .field("grant", &grant)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Credential {
    /// A pre-issued access token, used as-is.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            grant: Grant::Static,
            access_token: OnceCell::from(token.into()),
        }
    }

    /// Exchange `refresh_token` for an access token on first use.
    pub fn from_refresh_token(client: OAuthClient, refresh_token: impl Into<String>) -> Self {
        Self {
            grant: Grant::RefreshToken {
                client,
                refresh_token: refresh_token.into(),
            },
            access_token: OnceCell::new(),
        }
    }

    /// Whether the access token has already been obtained.
    pub fn is_initialized(&self) -> bool {
        self.access_token.initialized()
    }

    /// The bearer token, fetching it on the first call.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<&str, CredentialError> {
        let token = self
            .access_token
            .get_or_try_init(|| async {
                match &self.grant {
                    Grant::RefreshToken {
                        client,
                        refresh_token,
                    } => exchange_refresh_token(http, client, refresh_token).await,
                    // Static grants are constructed initialised.
                    Grant::Static => Err(CredentialError::NoToken),
                }
            })
            .await?;
        Ok(token.as_str())
    }
}

async fn exchange_refresh_token(
    http: &reqwest::Client,
    client: &OAuthClient,
    refresh_token: &str,
) -> Result<String, CredentialError> {
    tracing::info!(endpoint = %client.token_endpoint, "exchanging refresh token");

    let response = http
        .post(&client.token_endpoint)
        .form(&[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(CredentialError::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}
