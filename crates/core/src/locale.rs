//! ISO 639-1 locale codes.
//!
//! A [`Locale`] can only be constructed from a code that passes
//! [`is_valid_locale_code`], so anything holding one has already been
//! validated. Codes are accepted in canonical lowercase form only.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::error::CoreError;

/// Locale served when the caller does not ask for one.
pub const DEFAULT_LOCALE: &str = "en";

/// Whether `code` is a lowercase two-letter ISO 639-1 language code.
pub fn is_valid_locale_code(code: &str) -> bool {
    code.len() == 2
        && code.bytes().all(|b| b.is_ascii_lowercase())
        && isolang::Language::from_639_1(code).is_some()
}

/// `validator` hook for DTO fields holding a raw locale string.
pub fn validate_locale_code(code: &str) -> Result<(), ValidationError> {
    if is_valid_locale_code(code) {
        return Ok(());
    }
    let mut err = ValidationError::new("locale");
    err.message = Some(Cow::from(format!(
        "'{code}' is not an ISO 639-1 language code"
    )));
    Err(err)
}

/// A validated ISO 639-1 language code.
///
/// Ordering is lexicographic on the code, which is what the resolver relies
/// on for its last-resort pick.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Validate and wrap a locale code.
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        if is_valid_locale_code(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(CoreError::Validation(format!(
                "Invalid locale '{code}': expected a lowercase ISO 639-1 language code"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(DEFAULT_LOCALE.to_string())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn common_codes_accepted() {
        for code in ["en", "de", "fr", "es", "ja", "zh", "pt"] {
            assert!(is_valid_locale_code(code), "{code} should be valid");
        }
    }

    #[test]
    fn uppercase_and_mixed_case_rejected() {
        assert!(!is_valid_locale_code("EN"));
        assert!(!is_valid_locale_code("De"));
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(!is_valid_locale_code(""));
        assert!(!is_valid_locale_code("e"));
        assert!(!is_valid_locale_code("eng"));
        assert!(!is_valid_locale_code("en-US"));
    }

    #[test]
    fn unassigned_two_letter_codes_rejected() {
        assert!(!is_valid_locale_code("zz"));
        assert!(!is_valid_locale_code("xx"));
    }

    #[test]
    fn parse_returns_validation_error() {
        assert_matches!(Locale::parse("qq"), Err(CoreError::Validation(_)));
        let locale = Locale::parse("de").unwrap();
        assert_eq!(locale.as_str(), "de");
    }

    #[test]
    fn default_is_english() {
        assert_eq!(Locale::default().as_str(), DEFAULT_LOCALE);
    }

    #[test]
    fn deserialize_rejects_invalid_code() {
        let ok: Result<Locale, _> = serde_json::from_str("\"fr\"");
        assert_eq!(ok.unwrap().as_str(), "fr");

        let bad: Result<Locale, _> = serde_json::from_str("\"French\"");
        assert!(bad.is_err());
    }

    #[test]
    fn validator_hook_carries_message() {
        let err = validate_locale_code("q1").unwrap_err();
        assert_eq!(err.code, "locale");
        assert!(err.message.unwrap().contains("q1"));
    }
}
