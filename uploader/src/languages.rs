//! The languages YouTube offers for caption tracks and localized metadata.
//!
//! Caption files are named after the language they contain (`ko.srt`, `zh-TW.vtt`), so the
//! file stem doubles as the language code. The table here is only used to give those codes a
//! human-readable label; a code that is not in the table is still uploaded as-is.

use std::borrow::Cow;

/// Language codes and their English display names, sorted by code.
const LANGUAGES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("ar", "Arabic"),
    ("az", "Azerbaijani"),
    ("be", "Belarusian"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("bs", "Bosnian"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("cy", "Welsh"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("es", "Spanish"),
    ("et", "Estonian"),
    ("eu", "Basque"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fil", "Filipino"),
    ("fr", "French"),
    ("gl", "Galician"),
    ("gu", "Gujarati"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("hy", "Armenian"),
    ("id", "Indonesian"),
    ("is", "Icelandic"),
    ("it", "Italian"),
    ("iw", "Hebrew"),
    ("ja", "Japanese"),
    ("ka", "Georgian"),
    ("kk", "Kazakh"),
    ("km", "Khmer"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("ky", "Kyrgyz"),
    ("lo", "Lao"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("ml", "Malayalam"),
    ("mn", "Mongolian"),
    ("mr", "Marathi"),
    ("ms", "Malay"),
    ("my", "Burmese"),
    ("ne", "Nepali"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pa", "Punjabi"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("si", "Sinhala"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("uz", "Uzbek"),
    ("vi", "Vietnamese"),
    ("zh-CN", "Chinese (Simplified)"),
    ("zh-TW", "Chinese (Traditional)"),
    ("zu", "Zulu"),
];

/// Codes the API no longer accepts under their historical spelling.
const PLATFORM_CODES: &[(&str, &str)] = &[
    ("fil", "tl"),
    ("iw", "he"),
    ("zh-cn", "zh-Hans"),
    ("zh-tw", "zh-Hant"),
];

/// Localization keys YouTube is known to accept, for when it can't be asked.
const SUPPORTED_LOCALIZATIONS: &[&str] = &[
    "af", "ar", "az", "be", "bg", "bn", "bs", "ca", "cs", "da", "de", "el", "en", "es", "et",
    "fa", "fi", "fr", "gu", "hi", "hr", "hu", "hy", "id", "is", "it", "ja", "ka", "kk", "km",
    "kn", "ko", "ky", "lo", "lt", "lv", "mk", "ml", "mn", "mr", "ms", "my", "ne", "nl", "no",
    "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "sv", "sw", "ta", "te", "th",
    "tl", "tr", "uk", "ur", "uz", "vi", "zh-Hans", "zh-Hant", "zu",
];

/// Read-only lookup from language code to display name.
///
/// All lookups are case-insensitive, since codes usually arrive lowercased from file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageTable;

impl LanguageTable {
    /// Returns the display name for `code`, if it is a known language.
    pub fn label(code: &str) -> Option<&'static str> {
        LANGUAGES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(code))
            .map(|&(_, name)| name)
    }

    /// Returns the code to submit to the API for `code`.
    ///
    /// A handful of legacy codes are rewritten (e.g. `iw` → `he`); everything else, including
    /// codes we have never heard of, passes through unchanged.
    pub fn platform_code(code: &str) -> Cow<'_, str> {
        PLATFORM_CODES
            .iter()
            .find(|(legacy, _)| legacy.eq_ignore_ascii_case(code))
            .map_or(Cow::Borrowed(code), |&(_, current)| Cow::Borrowed(current))
    }

    /// Platform codes accepted as localization keys when the live list is unavailable.
    pub fn fallback_localizations() -> impl Iterator<Item = &'static str> {
        SUPPORTED_LOCALIZATIONS.iter().copied()
    }

    /// Iterates over all known `(code, display name)` pairs in code order.
    pub fn iter() -> impl Iterator<Item = (&'static str, &'static str)> {
        LANGUAGES.iter().copied()
    }
}
