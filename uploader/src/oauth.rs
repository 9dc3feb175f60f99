//! OAuth 2.0 installed-application flow for the YouTube Data API.
//!
//! The user authorizes the uploader once in their browser; Google then redirects to a loopback
//! listener we run for exactly one request. After that, the cached refresh token is enough.

use crate::config::ClientSecrets;
use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    Scope, TokenResponse, TokenUrl, reqwest,
};
use std::future::Future;

/// Scopes needed to insert videos and manage their caption tracks.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube.force-ssl",
];

const OAUTH_DONE: &str = "<!DOCTYPE html>\n<html><head><title>Authorized</title></head>\
    <body><p>The uploader is authorized. You can close this tab.</p></body></html>\n";

/// Drives the OAuth flows for one client registration.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    secrets: ClientSecrets,
    redirect_port: u16,
}

impl OAuthManager {
    /// `redirect_port` is where the local redirect listener binds; `0` lets the OS pick.
    pub fn new(secrets: ClientSecrets, redirect_port: u16) -> Self {
        Self {
            secrets,
            redirect_port,
        }
    }

    /// Runs the interactive consent flow and exchanges the resulting code for a token.
    ///
    /// Opens the user's browser and blocks until Google redirects back to us.
    pub async fn authenticate(&self) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_url =
            AuthUrl::new(self.secrets.auth_uri.clone()).context("parse authorization endpoint")?;
        let token_url =
            TokenUrl::new(self.secrets.token_uri.clone()).context("parse token endpoint")?;
        let client = BasicClient::new(ClientId::new(self.secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.secrets.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // We never re-use the CSRF since we only go through the flow exactly once.
            .authorize_url(move || csrf.clone())
            .add_scopes(SCOPES.map(|s| Scope::new(s.to_string())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        if let Err(e) = webbrowser::open(auth_url.as_ref()) {
            // Headless machines can still finish the flow by hand.
            tracing::warn!(error = %e, "could not open browser, visit the URL above manually");
        }
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let token_result = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client()?)
            .await
            .context("exchange authorization code with access token")?;

        Ok(token_result)
    }

    /// Exchanges the refresh token in `token` for a new access token.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - Refresh succeeded
    /// * `Ok(None)` - There is no refresh token, or Google no longer honors it
    /// * `Err(_)` - Network or other error occurred during refresh attempt
    ///
    /// `Ok(None)` means the user has to go through [`Self::authenticate`] again.
    pub async fn refresh_token(
        &self,
        token: BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");

        let client = BasicClient::new(ClientId::new(self.secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.secrets.client_secret.clone()))
            .set_token_uri(
                TokenUrl::new(self.secrets.token_uri.clone()).context("parse token endpoint")?,
            );

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&http_client()?)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    /// Starts a one-shot HTTP listener on localhost for the OAuth redirect.
    ///
    /// Returns the redirect URL to hand to Google, and a future that resolves to the
    /// authorization code once the browser has been redirected with a matching `state`.
    async fn setup_redirect(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind(("127.0.0.1", self.redirect_port))
            .await
            .with_context(|| format!("bind to localhost:{}", self.redirect_port))?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let query = req.uri().query().unwrap_or("");
                        let code = authorization_code_from_query(query, &csrf)?;
                        // The receiver lives until the connection is shut down below.
                        let _ = got.send(code).await;
                        Ok::<_, &'static str>(Response::new(Full::<Bytes>::from(OAUTH_DONE)))
                    }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exit prematurely");
                        }
                    }
                    code = gotten.recv() => {
                        serve.as_mut().graceful_shutdown();
                        code.ok_or_else(|| eyre::eyre!("redirect handler went away"))
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}

/// Something that can hand out OAuth tokens, either by asking the user or by refreshing.
#[allow(async_fn_in_trait)]
pub trait TokenSource {
    /// Obtains a brand new token, usually by asking the user for consent.
    async fn consent(&self) -> eyre::Result<BasicTokenResponse>;

    /// Refreshes `token`. `Ok(None)` means the token can no longer be refreshed.
    async fn refresh(&self, token: BasicTokenResponse)
    -> eyre::Result<Option<BasicTokenResponse>>;
}

impl TokenSource for OAuthManager {
    async fn consent(&self) -> eyre::Result<BasicTokenResponse> {
        self.authenticate().await
    }

    async fn refresh(
        &self,
        token: BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        self.refresh_token(token).await
    }
}

/// Pulls the authorization code out of the redirect's query string.
///
/// Google reports a declined consent as `error=access_denied` instead of a code.
fn authorization_code_from_query(
    query: &str,
    csrf: &CsrfToken,
) -> Result<AuthorizationCode, &'static str> {
    let mut presented_state = None;
    let mut presented_code = None;
    let mut presented_error = None;
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "state" => presented_state = Some(v),
            "code" => presented_code = Some(v),
            "error" => presented_error = Some(v),
            _ => {}
        }
    }
    if presented_state.as_deref() != Some(csrf.secret().as_str()) {
        return Err("invalid csrf token");
    }
    if presented_error.is_some() {
        return Err("user declined authorization");
    }
    let Some(code) = presented_code else {
        return Err("no authorization code found");
    };
    Ok(AuthorizationCode::new(code.into_owned()))
}

fn http_client() -> eyre::Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        // SSRF no thank you.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("build OAuth HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csrf() -> CsrfToken {
        CsrfToken::new("expected-state".to_string())
    }

    #[test]
    fn code_with_matching_state() {
        let code = authorization_code_from_query(
            "state=expected-state&code=4%2F0abc&scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fyoutube.upload",
            &csrf(),
        )
        .unwrap();
        assert_eq!(code.secret(), "4/0abc");
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let err = authorization_code_from_query("state=other&code=abc", &csrf()).unwrap_err();
        assert_eq!(err, "invalid csrf token");
        let err = authorization_code_from_query("code=abc", &csrf()).unwrap_err();
        assert_eq!(err, "invalid csrf token");
    }

    #[test]
    fn declined_consent() {
        let err = authorization_code_from_query("state=expected-state&error=access_denied", &csrf())
            .unwrap_err();
        assert_eq!(err, "user declined authorization");
    }

    #[test]
    fn missing_code() {
        let err = authorization_code_from_query("state=expected-state", &csrf()).unwrap_err();
        assert_eq!(err, "no authorization code found");
    }
}
