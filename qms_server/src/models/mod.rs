//! Row types, insert/update structs and request bodies for every QMS table.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+(?:[/?#]\S*)?$").unwrap());

/// Generate a string-backed enum with `as_str`, `FromStr` and `Display`
/// over the stored SCREAMING_SNAKE_CASE spelling. Serde uses the same
/// spelling through `rename_all`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "invalid {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod audit;
pub mod calibration;
pub mod contract;
pub mod document;
pub mod management_review;
pub mod nonconformance;
pub mod ohs;
pub mod risk;
pub mod training;
pub mod user;
pub mod vocab;
pub mod waste;

/// Distinguish an absent field from an explicit `null` in update bodies.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trimmed, non-empty string or an error pushed onto `errors`.
pub(crate) fn require(value: &str, field: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

pub(crate) fn email_is_valid(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Absolute http(s) URL with a dotted host.
pub(crate) fn url_is_valid(url: &str) -> bool {
    URL_REGEX.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        owner: Option<Option<String>>,
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.owner, None);
        let null: Patch = serde_json::from_str(r#"{"owner":null}"#).unwrap();
        assert_eq!(null.owner, Some(None));
        let set: Patch = serde_json::from_str(r#"{"owner":"QA"}"#).unwrap();
        assert_eq!(set.owner, Some(Some("QA".to_string())));
    }

    #[test]
    fn email_validation() {
        assert!(email_is_valid("qa@example.com"));
        assert!(!email_is_valid("not-an-email"));
        assert!(!email_is_valid("a b@example.com"));
    }

    #[test]
    fn url_validation() {
        assert!(url_is_valid("https://dms.example.com/mr/7"));
        assert!(url_is_valid("http://intranet.local"));
        assert!(!url_is_valid("/files/7"));
        assert!(!url_is_valid("ftp://files.example.com/a"));
        assert!(!url_is_valid("https://exa mple.com"));
    }
}
