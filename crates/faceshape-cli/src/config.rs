use anyhow::{bail, Context, Result};
use faceshape_vision::{
    Credential, OAuthClient, VisionClient, DEFAULT_ENDPOINT, DEFAULT_TOKEN_ENDPOINT,
};
use std::path::PathBuf;
use std::time::Duration;

/// Vision and credential settings, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `images:annotate` URL.
    pub vision_endpoint: String,
    /// OAuth token endpoint for the refresh-token grant.
    pub token_endpoint: String,
    /// Project billed for Vision requests, if any.
    pub quota_project: Option<String>,
    /// Pre-issued access token; skips the refresh-token exchange.
    pub access_token: Option<String>,
    /// firebase-tools config holding `tokens.refresh_token`.
    pub firebase_config: PathBuf,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `FACESHAPE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let firebase_config = non_empty("FACESHAPE_FIREBASE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                non_empty("XDG_CONFIG_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| {
                        let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                        PathBuf::from(home).join(".config")
                    })
                    .join("configstore/firebase-tools.json")
            });

        Self {
            vision_endpoint: non_empty("FACESHAPE_VISION_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token_endpoint: non_empty("FACESHAPE_TOKEN_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
            quota_project: non_empty("FACESHAPE_QUOTA_PROJECT"),
            access_token: non_empty("FACESHAPE_ACCESS_TOKEN"),
            firebase_config,
            oauth_client_id: non_empty("FACESHAPE_OAUTH_CLIENT_ID"),
            oauth_client_secret: non_empty("FACESHAPE_OAUTH_CLIENT_SECRET"),
            request_timeout_secs: env_u64(&var, "FACESHAPE_REQUEST_TIMEOUT_SECS", 30),
        }
    }

    pub fn vision_client(&self) -> Result<VisionClient> {
        let client = VisionClient::new(
            self.vision_endpoint.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )
        .context("failed to build HTTP client")?;
        Ok(match &self.quota_project {
            Some(project) => client.with_quota_project(project.clone()),
            None => client,
        })
    }

    /// Static token when one is configured, otherwise a refresh-token grant
    /// read from the firebase-tools config.
    pub fn credential(&self) -> Result<Credential> {
        if let Some(token) = &self.access_token {
            tracing::debug!("using access token from environment");
            return Ok(Credential::from_access_token(token.clone()));
        }

        let (Some(client_id), Some(client_secret)) =
            (&self.oauth_client_id, &self.oauth_client_secret)
        else {
            bail!(
                "no credentials: set FACESHAPE_ACCESS_TOKEN, or FACESHAPE_OAUTH_CLIENT_ID and \
                 FACESHAPE_OAUTH_CLIENT_SECRET for the refresh-token grant"
            );
        };

        let refresh_token = faceshape_vision::refresh_token_from_config(&self.firebase_config)?;
        tracing::debug!(config = %self.firebase_config.display(), "using refresh token");
        Ok(Credential::from_refresh_token(
            OAuthClient {
                token_endpoint: self.token_endpoint.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            },
            refresh_token,
        ))
    }
}

fn env_u64(var: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    var(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("HOME", "/home/alice")]);
        assert_eq!(cfg.vision_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(cfg.quota_project, None);
        assert_eq!(cfg.access_token, None);
        assert_eq!(
            cfg.firebase_config,
            PathBuf::from("/home/alice/.config/configstore/firebase-tools.json")
        );
        assert_eq!(cfg.request_timeout_secs, 30);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("FACESHAPE_VISION_ENDPOINT", "http://localhost:9000/annotate"),
            ("FACESHAPE_QUOTA_PROJECT", "my-project"),
            ("FACESHAPE_ACCESS_TOKEN", "ya29.x"),
            ("FACESHAPE_FIREBASE_CONFIG", "/etc/firebase.json"),
            ("FACESHAPE_REQUEST_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(cfg.vision_endpoint, "http://localhost:9000/annotate");
        assert_eq!(cfg.quota_project.as_deref(), Some("my-project"));
        assert_eq!(cfg.access_token.as_deref(), Some("ya29.x"));
        assert_eq!(cfg.firebase_config, PathBuf::from("/etc/firebase.json"));
        assert_eq!(cfg.request_timeout_secs, 5);
    }

    #[test]
    fn test_blank_and_invalid_values_use_defaults() {
        let cfg = config(&[
            ("XDG_CONFIG_HOME", "/xdg"),
            ("FACESHAPE_ACCESS_TOKEN", "  "),
            ("FACESHAPE_REQUEST_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(cfg.access_token, None);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.firebase_config, PathBuf::from("/xdg/configstore/firebase-tools.json"));
    }

    #[test]
    fn test_static_credential() {
        let cfg = config(&[("FACESHAPE_ACCESS_TOKEN", "ya29.x")]);
        assert!(cfg.credential().unwrap().is_initialized());
    }

    #[test]
    fn test_refresh_grant_needs_oauth_client() {
        let cfg = config(&[("HOME", "/nonexistent")]);
        let err = cfg.credential().unwrap_err();
        assert!(err.to_string().contains("FACESHAPE_ACCESS_TOKEN"));
    }
}
