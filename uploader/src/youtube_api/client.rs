//! Core YouTube API client functionality and authentication management.

use crate::oauth::{OAuthManager, TokenSource};
use crate::youtube_api::{
    captions::{Caption, CaptionInsertRequest, CaptionListResponse},
    i18n_languages::{I18nLanguage, I18nLanguageListResponse},
    videos::{Video, VideoInsertRequest, VideoListResponse, VideoUpdateRequest},
};
use eyre::Context;
use http::Method;
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, LOCATION, RANGE};
use serde::Serialize;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::instrument;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Media is sent in pieces of this size. The resumable protocol wants multiples of 256 KiB.
pub const UPLOAD_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

const MEDIA_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token whose age is unknown, so that it is refreshed before first use.
    ///
    /// This is what tokens loaded from the on-disk cache look like.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Wraps a token that was just issued.
    ///
    /// The expiry time is calculated from the token's `expires_in` field minus
    /// a 5-minute safety buffer to prevent edge-case failures.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    /// Refreshes this token from `source`, preserving the refresh token.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Token was successfully refreshed
    /// * `Ok(false)` - Refresh failed (invalid grant, no refresh token, etc.)
    /// * `Err(_)` - Network or other error occurred
    pub async fn refresh(&mut self, source: &impl TokenSource) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match source
            .refresh(self.token.clone())
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                let old_token = std::mem::replace(&mut self.token, new_token);

                // Google only sends a refresh token on the initial exchange.
                if self.token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    self.token
                        .set_refresh_token(old_token.refresh_token().cloned());
                } else {
                    tracing::debug!("new token includes refresh token");
                }

                self.expires_at = Self::calculate_token_expiry(&self.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Uses the current time + expires_in duration - 5 minute safety buffer.
    /// If no expires_in is provided, assumes a conservative 55-minute lifetime.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => (now + expires_in)
                .checked_sub(Duration::from_secs(300))
                .unwrap_or(now),
            None => now + Duration::from_secs(3300),
        }
    }
}

/// What the server said after receiving one chunk of a resumable upload.
#[derive(Debug)]
enum ChunkOutcome {
    /// The upload is done; the response carries the created resource.
    Complete(reqwest::Response),
    /// The server wants more, starting at this byte offset.
    Incomplete { next_offset: u64 },
}

/// Client for the parts of the YouTube Data API v3 needed to publish videos and captions.
///
/// The client automatically refreshes expired access tokens before API calls using the stored
/// refresh token and OAuth manager.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    oauth_manager: Arc<OAuthManager>,
    client: reqwest::Client,
    upload_chunk_size: u64,
}

impl YouTubeClient {
    pub fn new(
        token: TimeBoundAccessToken,
        oauth_manager: Arc<OAuthManager>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager,
            client,
            upload_chunk_size: UPLOAD_CHUNK_SIZE,
        }
    }

    /// Sends resumable uploads in pieces of `size` bytes instead of [`UPLOAD_CHUNK_SIZE`].
    pub fn with_upload_chunk_size(mut self, size: u64) -> Self {
        self.upload_chunk_size = size.max(1);
        self
    }

    /// Returns a clone of the current OAuth2 token, e.g. for writing it back to the cache.
    pub async fn token(&self) -> BasicTokenResponse {
        self.token.lock().await.token.clone()
    }

    /// Gets a guaranteed-fresh access token, refreshing if necessary.
    #[instrument(skip(self), level = tracing::Level::TRACE)]
    async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            tracing::debug!("access token expired, attempting refresh");

            if token.refresh(&*self.oauth_manager).await? {
                tracing::debug!("access token successfully refreshed");
            } else {
                tracing::error!("access token refresh failed, client is unusable");
                return Err(eyre::eyre!("Unable to refresh expired access token"));
            }
        }

        Ok(token.token.access_token().secret().to_string())
    }

    /// Starts a request with a fresh bearer token attached.
    async fn authorized(&self, method: Method, url: &str) -> eyre::Result<reqwest::RequestBuilder> {
        let access_token = self.fresh_access_token().await?;
        Ok(self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", access_token)))
    }

    /// Sends `request` and turns any non-2xx status into an error carrying the response body.
    async fn send_checked(
        request: reqwest::RequestBuilder,
        method: &Method,
        url: &str,
    ) -> eyre::Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(eyre::eyre!(
                "YouTube API {} request failed with status {}: {}",
                method,
                status_code,
                error_text
            ));
        }

        Ok(response)
    }

    /// Makes an authenticated HTTP request to the YouTube API with common error handling.
    ///
    /// Handles token refresh, the authorization header, query parameters, an optional JSON
    /// body, and status code validation. Returns the raw [`reqwest::Response`] for
    /// method-specific JSON parsing.
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        url: &str,
        query_params: Option<&[(&str, &str)]>,
        json_body: Option<&impl Serialize>,
    ) -> eyre::Result<reqwest::Response> {
        let mut request = self.authorized(method.clone(), url).await?;

        if let Some(params) = query_params {
            request = request.query(params);
        }

        if let Some(body) = json_body {
            request = request.json(body);
        }

        Self::send_checked(request, &method, url).await
    }

    /// Uploads the video file at `path` together with its metadata.
    ///
    /// Uses the `videos.insert` API through the resumable upload protocol, sending the file in
    /// [`UPLOAD_CHUNK_SIZE`] pieces and logging progress after each one. Not retried on failure.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.upload`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/insert>
    #[instrument(skip(self, request), fields(title = %request.snippet.title))]
    pub async fn insert_video(
        &self,
        request: &VideoInsertRequest,
        path: &Path,
    ) -> eyre::Result<Video> {
        let total = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("stat {}", path.display()))?
            .len();

        let url = format!("{UPLOAD_BASE}/videos");
        let part = request.part();
        let query_params = [("uploadType", "resumable"), ("part", part.as_str())];
        let session_url = self
            .start_resumable_upload(&url, &query_params, request, total)
            .await
            .context("start resumable video upload")?;

        let response = self
            .upload_file(&session_url, path, total)
            .await
            .context("upload video content")?;

        let video: Video = response
            .json()
            .await
            .context("parse YouTube videos.insert response as JSON")?;

        tracing::debug!(video_id = video.id, bytes = total, "uploaded video");

        Ok(video)
    }

    /// Adds a caption track to a video.
    ///
    /// Uses the `captions.insert` API. The caption content is uploaded as-is; YouTube detects
    /// the subtitle format itself.
    ///
    /// # Required Scopes
    ///
    /// * `https://www.googleapis.com/auth/youtube.force-ssl`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/captions/insert>
    #[instrument(skip(self, request, content), fields(language = %request.snippet.language))]
    pub async fn insert_caption(
        &self,
        request: &CaptionInsertRequest,
        content: &[u8],
    ) -> eyre::Result<Caption> {
        let url = format!("{UPLOAD_BASE}/captions");
        let query_params = [("uploadType", "resumable"), ("part", "snippet")];
        let session_url = self
            .start_resumable_upload(&url, &query_params, request, content.len() as u64)
            .await
            .context("start resumable caption upload")?;

        let response = self
            .upload_bytes(&session_url, content)
            .await
            .context("upload caption content")?;

        let caption: Caption = response
            .json()
            .await
            .context("parse YouTube captions.insert response as JSON")?;

        tracing::debug!(caption_id = caption.id, "inserted caption track");

        Ok(caption)
    }

    /// Lists the caption tracks associated with a video.
    ///
    /// # API Cost
    ///
    /// This operation costs 50 quota units per call.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/captions/list>
    #[instrument(skip(self))]
    pub async fn list_captions(&self, video_id: &str) -> eyre::Result<Vec<Caption>> {
        let url = format!("{API_BASE}/captions");
        let query_params = [("part", "snippet"), ("videoId", video_id)];

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let captions: CaptionListResponse = response
            .json()
            .await
            .context("parse YouTube captions API response as JSON")?;

        tracing::debug!(
            video_id,
            returned_items = captions.items.len(),
            "fetched caption tracks"
        );

        Ok(captions.items)
    }

    /// Gets the snippet and localizations of a single video.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn get_video(&self, video_id: &str) -> eyre::Result<Video> {
        let url = format!("{API_BASE}/videos");
        let query_params = [("part", "snippet,localizations"), ("id", video_id)];

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let videos: VideoListResponse = response
            .json()
            .await
            .context("parse YouTube videos API response as JSON")?;

        videos
            .items
            .into_iter()
            .next()
            .ok_or_else(|| eyre::eyre!("video not found: {}", video_id))
    }

    /// Replaces a video's snippet and localizations.
    ///
    /// Fields of the snippet that are not sent are reset by YouTube, so callers should start
    /// from what [`Self::get_video`] returned.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/update>
    #[instrument(skip(self, update_request), fields(video_id = %update_request.id))]
    pub async fn update_video(&self, update_request: &VideoUpdateRequest) -> eyre::Result<Video> {
        let url = format!("{API_BASE}/videos");
        let query_params = [("part", "snippet,localizations")];

        let response = self
            .make_authenticated_request(Method::PUT, &url, Some(&query_params), Some(update_request))
            .await?;

        response
            .json()
            .await
            .context("parse YouTube videos.update response as JSON")
    }

    /// Lists the languages YouTube accepts as localization keys.
    ///
    /// # API Cost
    ///
    /// This operation costs 1 quota unit per call.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/i18nLanguages/list>
    #[instrument(skip(self))]
    pub async fn list_i18n_languages(&self) -> eyre::Result<Vec<I18nLanguage>> {
        let url = format!("{API_BASE}/i18nLanguages");
        let query_params = [("part", "snippet")];

        let response = self
            .make_authenticated_request(Method::GET, &url, Some(&query_params), None::<&()>)
            .await?;

        let languages: I18nLanguageListResponse = response
            .json()
            .await
            .context("parse YouTube i18nLanguages API response as JSON")?;

        tracing::debug!(
            returned_items = languages.items.len(),
            "fetched supported languages"
        );

        Ok(languages.items)
    }

    /// Opens a resumable upload session and returns its URL.
    ///
    /// <https://developers.google.com/youtube/v3/guides/using_resumable_upload_protocol>
    async fn start_resumable_upload(
        &self,
        url: &str,
        query_params: &[(&str, &str)],
        metadata: &impl Serialize,
        content_length: u64,
    ) -> eyre::Result<String> {
        let request = self
            .authorized(Method::POST, url)
            .await?
            .query(query_params)
            .header("X-Upload-Content-Type", MEDIA_CONTENT_TYPE)
            .header("X-Upload-Content-Length", content_length)
            .json(metadata);

        let response = Self::send_checked(request, &Method::POST, url).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| eyre::eyre!("resumable upload response has no Location header"))?
            .to_str()
            .context("resumable upload Location is not valid UTF-8")?;

        Ok(location.to_string())
    }

    /// Streams a file to an upload session, one chunk at a time.
    async fn upload_file(
        &self,
        session_url: &str,
        path: &Path,
        total: u64,
    ) -> eyre::Result<reqwest::Response> {
        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("open {}", path.display()))?;

        let mut offset = 0;
        loop {
            let mut chunk = Vec::new();
            (&mut file)
                .take(self.upload_chunk_size)
                .read_to_end(&mut chunk)
                .await
                .with_context(|| format!("read {} at offset {}", path.display(), offset))?;
            let sent_up_to = offset + chunk.len() as u64;

            match self.put_chunk(session_url, chunk, offset, total).await? {
                ChunkOutcome::Complete(response) => return Ok(response),
                ChunkOutcome::Incomplete { next_offset } => {
                    if next_offset <= offset || next_offset > total {
                        eyre::bail!(
                            "upload stalled at byte {} of {} (server reported {})",
                            offset,
                            total,
                            next_offset
                        );
                    }
                    tracing::info!(
                        progress = format!("{}%", next_offset * 100 / total),
                        "upload in progress"
                    );
                    if next_offset != sent_up_to {
                        file.seek(SeekFrom::Start(next_offset))
                            .await
                            .context("seek to resume offset")?;
                    }
                    offset = next_offset;
                }
            }
        }
    }

    /// Sends in-memory content to an upload session.
    async fn upload_bytes(
        &self,
        session_url: &str,
        content: &[u8],
    ) -> eyre::Result<reqwest::Response> {
        let total = content.len() as u64;
        let mut offset = 0;
        loop {
            let end = total.min(offset + self.upload_chunk_size);
            let chunk = content[offset as usize..end as usize].to_vec();
            match self.put_chunk(session_url, chunk, offset, total).await? {
                ChunkOutcome::Complete(response) => return Ok(response),
                ChunkOutcome::Incomplete { next_offset } => {
                    if next_offset <= offset || next_offset > total {
                        eyre::bail!(
                            "upload stalled at byte {} of {} (server reported {})",
                            offset,
                            total,
                            next_offset
                        );
                    }
                    offset = next_offset;
                }
            }
        }
    }

    async fn put_chunk(
        &self,
        session_url: &str,
        chunk: Vec<u8>,
        start: u64,
        total: u64,
    ) -> eyre::Result<ChunkOutcome> {
        let range = content_range(start, chunk.len() as u64, total);
        let response = self
            .authorized(Method::PUT, session_url)
            .await?
            .header(CONTENT_RANGE, range)
            .body(chunk)
            .send()
            .await
            .context("send upload chunk")?;

        let status = response.status();
        if status.is_success() {
            return Ok(ChunkOutcome::Complete(response));
        }
        if status == StatusCode::PERMANENT_REDIRECT {
            let received = response
                .headers()
                .get(RANGE)
                .map(|v| v.to_str())
                .transpose()
                .context("upload Range header is not valid UTF-8")?;
            return Ok(ChunkOutcome::Incomplete {
                next_offset: next_offset(received)?,
            });
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        Err(eyre::eyre!(
            "YouTube upload chunk failed with status {}: {}",
            status,
            error_text
        ))
    }
}

/// The `Content-Range` for sending `len` bytes at `start` of a `total`-byte upload.
fn content_range(start: u64, len: u64, total: u64) -> String {
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{}", start, start + len - 1, total)
    }
}

/// Where to continue after a `308`, given its `Range` header (`bytes=0-N`).
///
/// No header means the server has not persisted anything yet.
fn next_offset(range: Option<&str>) -> eyre::Result<u64> {
    let Some(range) = range else {
        return Ok(0);
    };
    let last = range
        .strip_prefix("bytes=")
        .and_then(|r| r.split_once('-'))
        .and_then(|(_, last)| last.trim().parse::<u64>().ok())
        .ok_or_else(|| eyre::eyre!("malformed upload Range header: {range}"))?;
    Ok(last + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth2::basic::BasicTokenType;
    use oauth2::{AccessToken, EmptyExtraTokenFields, RefreshToken, StandardTokenResponse};
    use crate::config::ClientSecrets;
    use http_body_util::{BodyExt, Full};
    use hyper::body::{self, Bytes};
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    fn token(access: &str, refresh: Option<&str>) -> BasicTokenResponse {
        let mut token = StandardTokenResponse::new(
            AccessToken::new(access.to_string()),
            BasicTokenType::Bearer,
            EmptyExtraTokenFields {},
        );
        token.set_refresh_token(refresh.map(|r| RefreshToken::new(r.to_string())));
        token.set_expires_in(Some(&Duration::from_secs(3600)));
        token
    }

    struct Refresher(Option<BasicTokenResponse>);

    impl TokenSource for Refresher {
        async fn consent(&self) -> eyre::Result<BasicTokenResponse> {
            unreachable!("refresh never asks for consent")
        }

        async fn refresh(
            &self,
            _: BasicTokenResponse,
        ) -> eyre::Result<Option<BasicTokenResponse>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn content_ranges() {
        assert_eq!(content_range(0, 100, 100), "bytes 0-99/100");
        assert_eq!(
            content_range(UPLOAD_CHUNK_SIZE, 10, UPLOAD_CHUNK_SIZE + 10),
            "bytes 8388608-8388617/8388618"
        );
        assert_eq!(content_range(0, 0, 0), "bytes */0");
    }

    #[test]
    fn resume_offsets() {
        assert_eq!(next_offset(None).unwrap(), 0);
        assert_eq!(next_offset(Some("bytes=0-8388607")).unwrap(), UPLOAD_CHUNK_SIZE);
        assert!(next_offset(Some("0-10")).is_err());
        assert!(next_offset(Some("bytes=0-")).is_err());
    }

    #[test]
    fn cached_tokens_start_expired() {
        assert!(TimeBoundAccessToken::expired(token("a", Some("r"))).is_expired());
        assert!(!TimeBoundAccessToken::new(token("a", Some("r"))).is_expired());
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_token() {
        let mut t = TimeBoundAccessToken::expired(token("old", Some("keep-me")));
        let refreshed = t
            .refresh(&Refresher(Some(token("new", None))))
            .await
            .unwrap();
        assert!(refreshed);
        assert!(!t.is_expired());
        assert_eq!(t.raw_token().access_token().secret(), "new");
        assert_eq!(
            t.raw_token().refresh_token().map(|r| r.secret().as_str()),
            Some("keep-me")
        );
    }

    #[tokio::test]
    async fn refresh_rejected() {
        let mut t = TimeBoundAccessToken::expired(token("old", Some("stale")));
        assert!(!t.refresh(&Refresher(None)).await.unwrap());
        assert!(t.is_expired());
        assert_eq!(t.raw_token().access_token().secret(), "old");
    }

    /// What the upload server received: the `Content-Range` header and the body of each request.
    type Received = Arc<std::sync::Mutex<Vec<(String, Vec<u8>)>>>;

    /// Serves a resumable upload session on localhost, answering requests with `replies` in
    /// order: a status, an optional `Range` header, and a body.
    async fn upload_server(replies: Vec<(u16, Option<&'static str>, &'static str)>) -> (String, Received) {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Received::default();
        let replies = Arc::new(std::sync::Mutex::new(VecDeque::from(replies)));

        let log = received.clone();
        tokio::spawn(async move {
            while let Ok((conn, _)) = listener.accept().await {
                let log = log.clone();
                let replies = replies.clone();
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let log = log.clone();
                    let replies = replies.clone();
                    async move {
                        let range = req
                            .headers()
                            .get(CONTENT_RANGE)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        let body = req.into_body().collect().await?.to_bytes().to_vec();
                        log.lock().unwrap().push((range, body));

                        let (status, resume_at, body) = replies
                            .lock()
                            .unwrap()
                            .pop_front()
                            .expect("more requests than scripted replies");
                        let mut response = Response::builder().status(status);
                        if let Some(resume_at) = resume_at {
                            response = response.header(RANGE, resume_at);
                        }
                        Ok::<_, hyper::Error>(response.body(Full::<Bytes>::from(body)).unwrap())
                    }
                });
                tokio::spawn(async move {
                    let conn = hyper_util::rt::TokioIo::new(conn);
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(conn, service)
                        .await;
                });
            }
        });

        (format!("http://{addr}/upload/session"), received)
    }

    fn test_client(chunk_size: u64) -> YouTubeClient {
        let secrets = ClientSecrets {
            client_id: "client".into(),
            client_secret: "secret".into(),
            auth_uri: "http://127.0.0.1/auth".into(),
            token_uri: "http://127.0.0.1/token".into(),
        };
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .unwrap();
        YouTubeClient::new(
            TimeBoundAccessToken::new(token("access", Some("refresh"))),
            Arc::new(OAuthManager::new(secrets, 0)),
            http,
        )
        .with_upload_chunk_size(chunk_size)
    }

    #[tokio::test]
    async fn file_upload_resumes_where_the_server_left_off() {
        let (session_url, received) = upload_server(vec![
            // Only 4 of the 6 bytes sent made it.
            (308, Some("bytes=0-3"), ""),
            (200, None, r#"{"kind": "youtube#video", "id": "uploaded-id"}"#),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let response = test_client(6)
            .upload_file(&session_url, &path, 10)
            .await
            .unwrap();
        let video: Video = response.json().await.unwrap();

        assert_eq!(video.id, "uploaded-id");
        let received = received.lock().unwrap().clone();
        assert_eq!(
            received,
            [
                ("bytes 0-5/10".to_string(), b"012345".to_vec()),
                ("bytes 4-9/10".to_string(), b"456789".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn byte_upload_in_chunks() {
        let (session_url, received) = upload_server(vec![
            (308, Some("bytes=0-3"), ""),
            (308, Some("bytes=0-7"), ""),
            (201, None, r#"{"id": "caption-id", "snippet": {"videoId": "v", "language": "ko"}}"#),
        ])
        .await;

        let response = test_client(4)
            .upload_bytes(&session_url, b"caption text")
            .await
            .unwrap();
        let caption: Caption = response.json().await.unwrap();

        assert_eq!(caption.id, "caption-id");
        let ranges: Vec<_> = received
            .lock()
            .unwrap()
            .iter()
            .map(|(range, _)| range.clone())
            .collect();
        assert_eq!(ranges, ["bytes 0-3/12", "bytes 4-7/12", "bytes 8-11/12"]);
    }

    #[tokio::test]
    async fn upload_without_progress_is_abandoned() {
        // A 308 without a Range header means nothing was stored.
        let (session_url, received) = upload_server(vec![(308, None, "")]).await;

        let err = test_client(4)
            .upload_bytes(&session_url, b"caption text")
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("stalled at byte 0 of 12"), "{err:#}");
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_chunk_carries_the_server_message() {
        let (session_url, _) = upload_server(vec![(403, None, "quotaExceeded")]).await;

        let err = test_client(4)
            .upload_bytes(&session_url, b"caption text")
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("quotaExceeded"), "{err:#}");
    }
}
