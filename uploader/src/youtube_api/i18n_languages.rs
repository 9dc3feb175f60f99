//! YouTube i18nLanguages API types.

use serde::{Deserialize, Serialize};

/// Response structure for the `i18nLanguages.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/i18nLanguages/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct I18nLanguageListResponse {
    /// The value will be `youtube#i18nLanguageListResponse`.
    pub kind: String,
    #[serde(default)]
    pub items: Vec<I18nLanguage>,
}

/// An application language that YouTube supports, and thus a valid localization key.
///
/// See: <https://developers.google.com/youtube/v3/docs/i18nLanguages#resource>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nLanguage {
    /// The language code, e.g. `en-GB` or `zh-Hant`.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<I18nLanguageSnippet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nLanguageSnippet {
    pub hl: String,
    /// Name of the language, written in the language requested through `hl`.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_response() {
        let response: I18nLanguageListResponse = serde_json::from_str(
            r#"{
                "kind": "youtube#i18nLanguageListResponse",
                "etag": "e",
                "items": [
                    {
                        "kind": "youtube#i18nLanguage",
                        "etag": "e1",
                        "id": "zh-Hant",
                        "snippet": { "hl": "zh-Hant", "name": "Chinese (Traditional)" }
                    },
                    { "kind": "youtube#i18nLanguage", "id": "ko" }
                ]
            }"#,
        )
        .unwrap();
        let ids: Vec<_> = response.items.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["zh-Hant", "ko"]);
        assert_eq!(response.items[1].snippet, None);
    }
}
