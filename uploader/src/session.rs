//! The authenticated handle shared by everything that talks to YouTube.
//!
//! A [`Session`] is built once at startup. Building it loads the token cached by a previous run
//! and refreshes it; only when there is no usable cached token is the user sent through the
//! browser consent flow. Either way the resulting token is written back to the cache.

use crate::config::{ClientSecrets, SessionConfig};
use crate::error::Error;
use crate::oauth::{OAuthManager, TokenSource};
use crate::youtube_api::{TimeBoundAccessToken, YouTubeClient};
use eyre::Context;
use oauth2::basic::BasicTokenResponse;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Session {
    client: YouTubeClient,
    token_cache: PathBuf,
}

impl Session {
    /// Produces an authorized client, prompting for consent only if the cache can't be used.
    pub async fn authenticate(config: &SessionConfig) -> Result<Self, Error> {
        let secrets = ClientSecrets::load(&config.client_secrets)
            .await
            .map_err(Error::Auth)?;
        let oauth_manager = Arc::new(OAuthManager::new(secrets, config.oauth_port));

        let token = acquire_token(&*oauth_manager, &config.token_cache)
            .await
            .map_err(Error::Auth)?;

        let http_client = reqwest::ClientBuilder::new()
            // Resumable uploads answer 308 without a Location; never follow it.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build YouTube API HTTP client")
            .map_err(Error::Auth)?;

        Ok(Self {
            client: YouTubeClient::new(token, oauth_manager, http_client),
            token_cache: config.token_cache.clone(),
        })
    }

    pub fn client(&self) -> &YouTubeClient {
        &self.client
    }

    /// Writes the client's current token back to the cache.
    ///
    /// The client may have refreshed its token during a long upload.
    pub async fn persist(&self) -> eyre::Result<()> {
        store_cached_token(&self.token_cache, &self.client.token().await).await
    }
}

/// Loads, refreshes, or newly obtains a token, and caches the result.
pub(crate) async fn acquire_token(
    source: &impl TokenSource,
    cache: &Path,
) -> eyre::Result<TimeBoundAccessToken> {
    let token = match load_cached_token(cache).await? {
        Some(cached) => {
            let mut token = TimeBoundAccessToken::expired(cached);
            if token
                .refresh(source)
                .await
                .context("refresh cached token")?
            {
                tracing::debug!("refreshed cached token");
                token
            } else {
                tracing::warn!("cached token can no longer be refreshed, re-authenticating");
                let raw_token = source
                    .consent()
                    .await
                    .context("authorize user to YouTube")?;
                TimeBoundAccessToken::new(raw_token)
            }
        }
        None => {
            tracing::info!("no cached token, authenticating with YouTube");
            let raw_token = source
                .consent()
                .await
                .context("authorize user to YouTube")?;
            TimeBoundAccessToken::new(raw_token)
        }
    };

    store_cached_token(cache, token.raw_token()).await?;
    Ok(token)
}

/// Reads the token cache. A missing or unparseable cache is treated as no cache.
async fn load_cached_token(path: &Path) -> eyre::Result<Option<BasicTokenResponse>> {
    if !tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("check for {}", path.display()))?
    {
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    match serde_json::from_str(&json) {
        Ok(token) => Ok(Some(token)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable token cache");
            Ok(None)
        }
    }
}

async fn store_cached_token(path: &Path, token: &BasicTokenResponse) -> eyre::Result<()> {
    let json = serde_json::to_string(token).context("serialize OAuth token")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2::TokenResponse;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token(access: &str, refresh: Option<&str>) -> BasicTokenResponse {
        let mut json = serde_json::json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3599,
        });
        if let Some(refresh) = refresh {
            json["refresh_token"] = refresh.into();
        }
        serde_json::from_value(json).unwrap()
    }

    /// Hands out tokens without a browser, counting how often consent was needed.
    struct FakeProvider {
        refreshable: bool,
        consents: AtomicUsize,
        refreshes: AtomicUsize,
    }

    impl FakeProvider {
        fn new(refreshable: bool) -> Self {
            Self {
                refreshable,
                consents: AtomicUsize::new(0),
                refreshes: AtomicUsize::new(0),
            }
        }
    }

    impl TokenSource for FakeProvider {
        async fn consent(&self) -> eyre::Result<BasicTokenResponse> {
            self.consents.fetch_add(1, Ordering::SeqCst);
            Ok(token("consented", Some("fresh-refresh")))
        }

        async fn refresh(
            &self,
            _: BasicTokenResponse,
        ) -> eyre::Result<Option<BasicTokenResponse>> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(self.refreshable.then(|| token("refreshed", None)))
        }
    }

    struct Declined;

    impl TokenSource for Declined {
        async fn consent(&self) -> eyre::Result<BasicTokenResponse> {
            eyre::bail!("user declined authorization")
        }

        async fn refresh(
            &self,
            _: BasicTokenResponse,
        ) -> eyre::Result<Option<BasicTokenResponse>> {
            Ok(None)
        }
    }

    async fn cached_access_token(path: &Path) -> String {
        let json = tokio::fs::read_to_string(path).await.unwrap();
        let token: BasicTokenResponse = serde_json::from_str(&json).unwrap();
        token.access_token().secret().clone()
    }

    #[tokio::test]
    async fn first_run_asks_for_consent_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        let provider = FakeProvider::new(true);

        let token = acquire_token(&provider, &cache).await.unwrap();

        assert_eq!(provider.consents.load(Ordering::SeqCst), 1);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(token.raw_token().access_token().secret(), "consented");
        assert_eq!(cached_access_token(&cache).await, "consented");
    }

    #[tokio::test]
    async fn rerun_with_cache_does_not_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        let provider = FakeProvider::new(true);

        acquire_token(&provider, &cache).await.unwrap();
        let token = acquire_token(&provider, &cache).await.unwrap();
        acquire_token(&provider, &cache).await.unwrap();

        assert_eq!(provider.consents.load(Ordering::SeqCst), 1);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 2);
        assert_eq!(token.raw_token().access_token().secret(), "refreshed");
        assert_eq!(
            token.raw_token().refresh_token().map(|r| r.secret().as_str()),
            Some("fresh-refresh")
        );
        assert_eq!(cached_access_token(&cache).await, "refreshed");
    }

    #[tokio::test]
    async fn revoked_cache_falls_back_to_consent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        store_cached_token(&cache, &token("stale", Some("revoked")))
            .await
            .unwrap();
        let provider = FakeProvider::new(false);

        let token = acquire_token(&provider, &cache).await.unwrap();

        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(provider.consents.load(Ordering::SeqCst), 1);
        assert_eq!(token.raw_token().access_token().secret(), "consented");
    }

    #[tokio::test]
    async fn corrupt_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");
        tokio::fs::write(&cache, "not json").await.unwrap();
        let provider = FakeProvider::new(true);

        acquire_token(&provider, &cache).await.unwrap();

        assert_eq!(provider.consents.load(Ordering::SeqCst), 1);
        assert_eq!(cached_access_token(&cache).await, "consented");
    }

    #[tokio::test]
    async fn declined_consent_is_an_error_and_caches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("token.json");

        let err = acquire_token(&Declined, &cache).await.unwrap_err();

        assert!(format!("{err:#}").contains("user declined"), "{err:#}");
        assert!(!cache.exists());
    }

    #[tokio::test]
    async fn missing_client_secrets_is_an_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            client_secrets: dir.path().join("client_secrets.json"),
            token_cache: dir.path().join("token.json"),
            oauth_port: 0,
        };

        let err = Session::authenticate(&config).await.unwrap_err();

        assert!(matches!(err, Error::Auth(_)), "{err:?}");
        assert!(!config.token_cache.exists());
    }
}
