//! Localized titles and descriptions supplied alongside the video.
//!
//! The file is a JSON object with a `default` entry describing the video in its original
//! language, plus one entry per translation:
//!
//! ```json
//! {
//!   "default": { "title": "제목", "description": "설명", "language": "ko" },
//!   "en": { "title": "Title", "description": "Description" },
//!   "ja": { "title": "タイトル", "description": "説明" }
//! }
//! ```

use crate::languages::LanguageTable;
use crate::youtube_api::{Localizations, VideoLocalization};
use eyre::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DefaultMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Language of the default title and description.
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalizedEntry {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub default: DefaultMetadata,
    #[serde(flatten)]
    pub translations: BTreeMap<String, Option<LocalizedEntry>>,
}

impl VideoMetadata {
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        serde_json::from_str(json).context("parse metadata JSON")
    }

    pub async fn load(path: &Path) -> eyre::Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("load {}", path.display()))
    }

    /// The translations in the shape the API expects, keyed by platform language code.
    ///
    /// Entries lacking a title or a description are left out and logged.
    pub fn localizations(&self) -> Localizations {
        let mut localizations = Localizations::new();
        for (code, entry) in &self.translations {
            let Some(LocalizedEntry {
                title: Some(title),
                description: Some(description),
            }) = entry
            else {
                tracing::warn!(language = code, "skipping localization without title or description");
                continue;
            };
            if title.is_empty() || description.is_empty() {
                tracing::warn!(language = code, "skipping localization with empty title or description");
                continue;
            }
            localizations.insert(
                LanguageTable::platform_code(code).into_owned(),
                VideoLocalization {
                    title: title.clone(),
                    description: description.clone(),
                },
            );
        }
        localizations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "default": { "title": "제목", "description": "설명", "language": "ko" },
        "en": { "title": "Title", "description": "Description" },
        "iw": { "title": "כותרת", "description": "תיאור" },
        "ja": { "title": "タイトル" },
        "fr": null
    }"#;

    #[test]
    fn parses_default_and_translations() {
        let metadata = VideoMetadata::from_json(SAMPLE).unwrap();
        assert_eq!(
            metadata.default,
            DefaultMetadata {
                title: Some("제목".into()),
                description: Some("설명".into()),
                language: Some("ko".into()),
            }
        );
        assert_eq!(metadata.translations.len(), 4);
    }

    #[test]
    fn incomplete_translations_are_skipped() {
        let localizations = VideoMetadata::from_json(SAMPLE).unwrap().localizations();
        let codes: Vec<_> = localizations.keys().map(String::as_str).collect();
        // `iw` is submitted under its current code.
        assert_eq!(codes, ["en", "he"]);
        assert_eq!(localizations["en"].title, "Title");
    }

    #[test]
    fn default_is_optional() {
        let metadata =
            VideoMetadata::from_json(r#"{"de": {"title": "Titel", "description": "Text"}}"#)
                .unwrap();
        assert_eq!(metadata.default, DefaultMetadata::default());
        assert_eq!(metadata.localizations().len(), 1);
    }

    #[test]
    fn rejects_non_objects() {
        assert!(VideoMetadata::from_json("[]").is_err());
    }
}
