//! Entity tags for registry resources.
//!
//! Every mutable resource the registry hands out (device and module identities,
//! twins, configurations) carries an opaque version stamp. The service assigns a
//! new stamp on creation and on every successful mutation, and accepts it back in
//! an `If-Match` header to perform an atomic compare-and-swap on writes.
//!
//! The client never interprets the stamp beyond equality. Two representations
//! matter on the wire:
//!
//! * the JSON `etag` field, which the service may send bare (`MTIz`) or already
//!   quoted (`"MTIz"`)
//! * the HTTP header form, which is always quoted (`"MTIz"`), optionally weak
//!   (`W/"MTIz"`)
//!
//! [`ETag`] normalizes both to the bare opaque value so that quoting happens
//! exactly once, when a header is produced.
//!
//! ```rust
//! use hub_registry::resource::etag::ETag;
//!
//! let from_json: ETag = serde_json::from_str(r#""\"MTIz\"""#).unwrap();
//! let from_header: ETag = "W/\"MTIz\"".parse().unwrap();
//!
//! assert_eq!(from_json, from_header);
//! assert_eq!(from_json.as_str(), "MTIz");
//! assert_eq!(from_json.header_value(), "\"MTIz\"");
//! ```

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Opaque version stamp attached to a registry resource.
///
/// The inner value never includes surrounding quotes or a weak prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag {
    opaque: String,
}

impl ETag {
    /// Create an ETag from an opaque value, stripping any quoting.
    ///
    /// Returns `None` when nothing remains after normalization, which is how an
    /// absent stamp is represented everywhere in this crate, and also when the
    /// value cannot be carried inside a quoted header. Use [`ETag::parse`] to
    /// tell the two apart.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        Self::parse(value.as_ref()).ok()
    }

    /// Create an ETag, reporting why a value was rejected.
    ///
    /// After quotes and the weak prefix are stripped, every remaining character
    /// must be visible ASCII other than `"`.
    pub fn parse(value: &str) -> Result<Self, ETagError> {
        let opaque = normalize(value);
        if opaque.is_empty() {
            return Err(ETagError::Empty(value.to_string()));
        }
        if let Some(character) = opaque.chars().find(|c| !is_etag_char(*c)) {
            return Err(ETagError::InvalidCharacter {
                value: value.to_string(),
                character,
            });
        }
        Ok(Self {
            opaque: opaque.to_string(),
        })
    }

    /// Derive a stamp from resource content and a generation counter.
    ///
    /// The generation is mixed in so that writing identical content twice still
    /// produces a different stamp.
    pub fn from_content(content: &[u8], generation: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hasher.update(generation.to_be_bytes());
        let hash = hasher.finalize();

        Self {
            opaque: BASE64.encode(&hash[..8]),
        }
    }

    /// The bare opaque value.
    pub fn as_str(&self) -> &str {
        &self.opaque
    }

    /// The value as it appears in an `If-Match` or `ETag` header.
    pub fn header_value(&self) -> String {
        format!("\"{}\"", self.opaque)
    }
}

fn normalize(value: &str) -> &str {
    let trimmed = value.trim();
    let unweakened = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    match unweakened
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.trim(),
        None => unweakened,
    }
}

fn is_etag_char(c: char) -> bool {
    c.is_ascii_graphic() && c != '"'
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opaque)
    }
}

impl FromStr for ETag {
    type Err = ETagError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim() == "*" {
            return Err(ETagError::Wildcard);
        }
        ETag::parse(value)
    }
}

impl Serialize for ETag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.opaque.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ETag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ETag::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Deserialize an optional ETag, mapping empty strings and `null` to `None`.
///
/// Use with `#[serde(default, deserialize_with = "...")]` on DTO fields; the
/// service sends `""` for resources that were never versioned. A value that
/// cannot be sent back in `If-Match` is a deserialization error.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<ETag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(ETag::parse) {
        None | Some(Err(ETagError::Empty(_))) => Ok(None),
        Some(Ok(etag)) => Ok(Some(etag)),
        Some(Err(error)) => Err(serde::de::Error::custom(error)),
    }
}

/// Errors that can occur while parsing an ETag.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ETagError {
    /// Nothing left after stripping quotes
    #[error("ETag value is empty: {0:?}")]
    Empty(String),

    /// The wildcard matches any version and is not itself a version
    #[error("Wildcard '*' is not a concrete ETag")]
    Wildcard,

    /// A character that cannot appear inside a quoted entity tag
    #[error("ETag {value:?} contains invalid character {character:?}")]
    InvalidCharacter { value: String, character: char },
}
