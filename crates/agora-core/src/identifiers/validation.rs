//! Identifier validation rules

use std::fmt;

/// Maximum length for all identifier types
pub const MAX_ID_LENGTH: usize = 128;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The identifier string is empty
    Empty,
    /// The identifier has leading or trailing whitespace
    LeadingTrailingWhitespace,
    /// The identifier contains characters outside `[A-Za-z0-9._-]`
    InvalidCharacters,
    /// The identifier exceeds the maximum length
    TooLong { length: usize, max: usize },
    /// The identifier contains path traversal sequences
    PathTraversal,
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Identifier cannot be empty"),
            Self::LeadingTrailingWhitespace => {
                write!(f, "Identifier cannot have leading or trailing whitespace")
            }
            Self::InvalidCharacters => write!(
                f,
                "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
            ),
            Self::TooLong { length, max } => {
                write!(f, "Identifier too long ({length} chars, max {max})")
            }
            Self::PathTraversal => write!(f, "Identifier cannot contain '..'"),
        }
    }
}

impl std::error::Error for IdValidationError {}

/// Validator shared by every identifier newtype.
///
/// Identifiers end up in actor handles and in config file names, so the
/// accepted alphabet is kept to characters that are safe in both.
pub struct IdValidator;

impl IdValidator {
    pub fn validate(id: &str) -> Result<&str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }
        if id != id.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }
        if id.len() > MAX_ID_LENGTH {
            return Err(IdValidationError::TooLong {
                length: id.len(),
                max: MAX_ID_LENGTH,
            });
        }
        if id.contains("..") {
            return Err(IdValidationError::PathTraversal);
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(IdValidationError::InvalidCharacters);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("HDFCBank")]
    #[case("anil-01")]
    #[case("run_2024.10")]
    fn accepts_safe_identifiers(#[case] id: &str) {
        assert_eq!(IdValidator::validate(id), Ok(id));
    }

    #[rstest]
    #[case("", IdValidationError::Empty)]
    #[case(" anil", IdValidationError::LeadingTrailingWhitespace)]
    #[case("a/b", IdValidationError::InvalidCharacters)]
    #[case("a b", IdValidationError::InvalidCharacters)]
    #[case("../etc", IdValidationError::PathTraversal)]
    fn rejects_unsafe_identifiers(#[case] id: &str, #[case] expected: IdValidationError) {
        assert_eq!(IdValidator::validate(id), Err(expected));
    }

    #[test]
    fn rejects_overlong_identifier() {
        let id = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            IdValidator::validate(&id),
            Err(IdValidationError::TooLong { .. })
        ));
    }
}
