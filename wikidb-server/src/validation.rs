//! Validation of page API payloads

use thiserror::Error;

/// Longest page name the store accepts (column is VARCHAR(255)).
pub const MAX_PAGE_NAME_LEN: usize = 255;

/// Validation error for request payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field absent from the payload
    #[error("missing field '{field}'")]
    Missing { field: &'static str },

    /// Field is empty when it shouldn't be
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Field exceeds maximum length
    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format
    #[error("{field}: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },
}

/// Unwrap a required payload field.
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::Missing { field })
}

/// Check a page name before it reaches the store. The name is kept
/// exactly as given; only blank names are refused.
pub fn page_name(name: &str) -> Result<&str, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty { field: "name" });
    }
    if name.chars().count() > MAX_PAGE_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name",
            max: MAX_PAGE_NAME_LEN,
        });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "name",
            max: 255,
        };
        assert_eq!(err.to_string(), "name exceeds maximum length of 255 characters");
    }

    #[test]
    fn page_name_keeps_surrounding_whitespace() {
        assert_eq!(page_name("  Home  ").unwrap(), "  Home  ");
    }

    #[test]
    fn blank_page_name_is_rejected() {
        assert_eq!(page_name("   "), Err(ValidationError::Empty { field: "name" }));
    }

    #[test]
    fn overlong_page_name_is_rejected() {
        let name = "x".repeat(MAX_PAGE_NAME_LEN + 1);
        assert!(matches!(page_name(&name), Err(ValidationError::TooLong { .. })));
    }

    #[test]
    fn missing_field_is_reported() {
        let err = required::<String>(None, "markdown").unwrap_err();
        assert_eq!(err.to_string(), "missing field 'markdown'");
    }
}
