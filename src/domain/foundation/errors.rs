//! Error types for the domain layer.

use thiserror::Error;

/// Errors that occur during value object construction.
///
/// Construction never clamps out-of-range values into bounds; callers get
/// the rejection and must supply a valid value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        actual: f64,
    },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: &'static str) -> Self {
        ValidationError::EmptyField { field }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: &'static str, min: f64, max: f64, actual: f64) -> Self {
        ValidationError::OutOfRange {
            field,
            min,
            max,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_displays_bounds() {
        let err = ValidationError::out_of_range("temperature", 0.0, 1.5, 2.0);
        assert_eq!(
            err.to_string(),
            "Field 'temperature' must be between 0 and 1.5, got 2"
        );
    }

    #[test]
    fn empty_field_displays_field_name() {
        let err = ValidationError::empty_field("message");
        assert!(err.to_string().contains("message"));
    }
}
