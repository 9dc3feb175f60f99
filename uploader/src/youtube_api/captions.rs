//! YouTube Captions API types.

use serde::{Deserialize, Serialize};

/// Response structure for the `captions.list` API call.
///
/// Unlike most list endpoints this one is not paginated.
///
/// See: <https://developers.google.com/youtube/v3/docs/captions/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct CaptionListResponse {
    /// The value will be `youtube#captionListResponse`.
    pub kind: String,
    #[serde(default)]
    pub items: Vec<Caption>,
}

/// A `caption` resource represents one caption track of a video.
///
/// See: <https://developers.google.com/youtube/v3/docs/captions#resource>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    /// The ID that YouTube uses to uniquely identify the caption track.
    pub id: String,
    pub snippet: CaptionSnippet,
}

/// See: <https://developers.google.com/youtube/v3/docs/captions#snippet>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSnippet {
    pub video_id: String,
    /// BCP-47 language tag of the track.
    pub language: String,
    /// Track name shown to viewers in the player.
    #[serde(default)]
    pub name: String,
    /// `standard`, `ASR` (automatic speech recognition) or `forced`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_kind: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

/// Request body for `captions.insert`.
///
/// See: <https://developers.google.com/youtube/v3/docs/captions/insert>
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionInsertRequest {
    pub snippet: CaptionSnippet,
}

impl CaptionInsertRequest {
    /// A published (non-draft) track named `name` in `language`.
    pub fn new(video_id: &str, language: &str, name: &str) -> Self {
        Self {
            snippet: CaptionSnippet {
                video_id: video_id.to_string(),
                language: language.to_string(),
                name: name.to_string(),
                track_kind: None,
                is_draft: false,
            },
        }
    }
}

/// Languages of the tracks someone uploaded, leaving out YouTube's automatic (`ASR`) ones.
pub fn uploaded_track_languages(tracks: impl IntoIterator<Item = Caption>) -> Vec<String> {
    tracks
        .into_iter()
        .filter(|c| !c.snippet.is_auto_generated())
        .map(|c| c.snippet.language)
        .collect()
}

impl CaptionSnippet {
    pub fn is_auto_generated(&self) -> bool {
        self.track_kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("asr"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_body() {
        let request = CaptionInsertRequest::new("vid", "zh-Hant", "Chinese (Traditional)");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "snippet": {
                    "videoId": "vid",
                    "language": "zh-Hant",
                    "name": "Chinese (Traditional)",
                    "isDraft": false,
                }
            })
        );
    }

    #[test]
    fn list_response() {
        let response: CaptionListResponse = serde_json::from_str(
            r#"{
                "kind": "youtube#captionListResponse",
                "etag": "e",
                "items": [
                    {
                        "kind": "youtube#caption",
                        "etag": "e1",
                        "id": "AUieDaZ",
                        "snippet": {
                            "videoId": "vid",
                            "lastUpdated": "2024-01-01T00:00:00Z",
                            "trackKind": "standard",
                            "language": "ko",
                            "name": "Korean",
                            "audioTrackType": "unknown",
                            "isCC": false,
                            "isLarge": false,
                            "isEasyReader": false,
                            "isDraft": false,
                            "isAutoSynced": false,
                            "status": "serving"
                        }
                    }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].id, "AUieDaZ");
        assert_eq!(response.items[0].snippet.language, "ko");
        assert_eq!(
            response.items[0].snippet.track_kind.as_deref(),
            Some("standard")
        );
    }

    #[test]
    fn empty_list_response() {
        let response: CaptionListResponse =
            serde_json::from_str(r#"{"kind": "youtube#captionListResponse"}"#).unwrap();
        assert!(response.items.is_empty());
    }

    #[test]
    fn automatic_tracks_are_not_uploaded_tracks() {
        let response: CaptionListResponse = serde_json::from_str(
            r#"{
                "kind": "youtube#captionListResponse",
                "items": [
                    {
                        "id": "auto",
                        "snippet": { "videoId": "vid", "trackKind": "asr", "language": "ko" }
                    },
                    {
                        "id": "manual",
                        "snippet": { "videoId": "vid", "trackKind": "standard", "language": "en" }
                    },
                    {
                        "id": "forced",
                        "snippet": { "videoId": "vid", "trackKind": "forced", "language": "ja" }
                    }
                ]
            }"#,
        )
        .unwrap();
        assert!(response.items[0].snippet.is_auto_generated());
        assert_eq!(uploaded_track_languages(response.items), ["en", "ja"]);
    }
}
