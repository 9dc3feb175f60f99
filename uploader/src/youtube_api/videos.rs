//! YouTube Videos API types and functionality.

use crate::youtube_api::types::PageInfo;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// YouTube's "People & Blogs" category, used for every upload.
pub const DEFAULT_CATEGORY_ID: &str = "22";

/// Localized titles and descriptions keyed by language code.
pub type Localizations = BTreeMap<String, VideoLocalization>;

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoListResponse {
    /// Identifies the API resource's type.
    ///
    /// The value will be `youtube#videoListResponse`.
    pub kind: String,
    /// A list of videos that match the request criteria.
    pub items: VecDeque<Video>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
}

/// A `video` resource represents a YouTube video.
///
/// Only the parts requested through `part=` are present.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub localizations: Localizations,
}

impl Video {
    pub fn watch_url(&self) -> String {
        watch_url(&self.id)
    }
}

/// The public page of the video with the given ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://youtube.com/watch?v={video_id}")
}

/// Basic details about a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category_id")]
    pub category_id: String,
    /// The language of the snippet's title and description.
    ///
    /// YouTube requires this to be set before a video can carry localizations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

fn default_category_id() -> String {
    DEFAULT_CATEGORY_ID.to_string()
}

/// A translated title and description.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#localizations>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLocalization {
    pub title: String,
    pub description: String,
}

/// Who can see an uploaded video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#status.privacyStatus>
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    Unlisted,
    #[default]
    Private,
}

impl fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        })
    }
}

/// See: <https://developers.google.com/youtube/v3/docs/videos#status>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: PrivacyStatus,
    pub self_declared_made_for_kids: bool,
}

/// Request body for `videos.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/insert>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInsertRequest {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub localizations: Localizations,
}

impl VideoInsertRequest {
    /// The `part` parameter naming every resource part this request sets.
    pub fn part(&self) -> String {
        if self.localizations.is_empty() {
            "snippet,status".to_string()
        } else {
            "snippet,status,localizations".to_string()
        }
    }
}

/// Request body for `videos.update` with `part=snippet,localizations`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/update>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoUpdateRequest {
    pub id: String,
    pub snippet: VideoSnippet,
    pub localizations: Localizations,
}
