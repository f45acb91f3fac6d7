//! Identifier validation for registry resources.
//!
//! Device, module, configuration and job identifiers are case-sensitive
//! strings of at most 128 ASCII alphanumeric characters plus a small set of
//! punctuation. Checking them locally means a bad identifier fails before any
//! request is sent.

use crate::error::{ValidationError, ValidationResult};

/// Maximum identifier length accepted by the service.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

const ALLOWED_PUNCTUATION: &str = "-.+%_#*?!(),:=@$'";

/// Validate an identifier, naming `field` in any error.
pub fn validate(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::missing_identifier(field));
    }

    if value.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::IdentifierTooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LENGTH,
        });
    }

    if let Some(character) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(*c)))
    {
        return Err(ValidationError::InvalidIdentifierCharacter {
            field: field.to_string(),
            character,
        });
    }

    Ok(())
}

/// Validate that a required argument is present and non-blank.
pub fn require(argument: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::missing_argument(argument))
    } else {
        Ok(())
    }
}
