//! YouTube Data API v3 client library.
//!
//! Covers the handful of endpoints needed to publish a video with captions:
//!
//! - `videos.insert` to upload the video itself, via the resumable upload protocol,
//! - `videos.list` and `videos.update` to manage localized titles and descriptions,
//! - `captions.insert` and `captions.list` to attach caption tracks,
//! - `i18nLanguages.list` to learn which localization keys YouTube accepts.
//!
//! All calls go through [`YouTubeClient`], which attaches the OAuth bearer token and refreshes
//! it when it is about to expire.

pub mod captions;
pub mod client;
pub mod i18n_languages;
pub mod types;
pub mod videos;

// Re-export main types for convenience
pub use client::{TimeBoundAccessToken, UPLOAD_CHUNK_SIZE, YouTubeClient};
pub use types::PageInfo;

pub use i18n_languages::I18nLanguage;

pub use captions::{Caption, CaptionInsertRequest, CaptionSnippet, uploaded_track_languages};

pub use videos::{
    Localizations, PrivacyStatus, Video, VideoInsertRequest, VideoLocalization, VideoSnippet,
    VideoStatus, VideoUpdateRequest, watch_url,
};
