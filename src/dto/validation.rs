//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a string holds at least one non-whitespace character.
///
/// Chat messages and catalog identifiers must not collapse to nothing
/// once trimmed, even if the raw string has a positive length.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_non_blank_values() {
        assert!(validate_not_blank("any%").is_ok());
        assert!(validate_not_blank("  glitchless  ").is_ok());
    }

    #[test]
    fn rejects_empty_and_whitespace_only_values() {
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("\t\n").is_err());
    }
}
