//! Where the uploader finds its OAuth client and keeps its credential.

use eyre::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CLIENT_SECRETS: &str = "client_secrets.json";
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";
pub const DEFAULT_OAUTH_PORT: u16 = 8080;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";

/// File locations and ports used to establish a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// OAuth client credentials as downloaded from the Google Cloud console.
    pub client_secrets: PathBuf,
    /// Where the OAuth token is cached between runs.
    pub token_cache: PathBuf,
    /// Local port for the OAuth redirect listener. `0` picks any free port.
    pub oauth_port: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_secrets: PathBuf::from(DEFAULT_CLIENT_SECRETS),
            token_cache: PathBuf::from(DEFAULT_TOKEN_CACHE),
            oauth_port: DEFAULT_OAUTH_PORT,
        }
    }
}

/// An OAuth client registration for an installed application.
///
/// For installed applications using PKCE the secret is not actually secret, but Google still
/// requires it in the token exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

/// The console hands out the registration wrapped in an object named after the client type.
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        let file: ClientSecretsFile =
            serde_json::from_str(json).context("parse client secrets JSON")?;
        file.installed
            .or(file.web)
            .ok_or_else(|| eyre::eyre!("client secrets contain neither `installed` nor `web`"))
    }

    pub async fn load(path: &Path) -> eyre::Result<Self> {
        let json = tokio::fs::read_to_string(path).await.with_context(|| {
            format!(
                "read {} (download OAuth client credentials from the Google Cloud console)",
                path.display()
            )
        })?;
        Self::from_json(&json).with_context(|| format!("load {}", path.display()))
    }
}
