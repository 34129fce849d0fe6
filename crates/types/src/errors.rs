//! Validation errors for summary rows

use thiserror::Error;

/// Result type alias for row validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// A row violates a field constraint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("entity id must not be empty")]
    EmptyEntityId,

    #[error("rating for '{entity_id}' is not a finite number: {rating}")]
    NonFiniteRating { entity_id: String, rating: f64 },

    #[error("rating for '{entity_id}' is outside [{min}, {max}]: {rating}")]
    RatingOutOfRange {
        entity_id: String,
        rating: f64,
        min: f64,
        max: f64,
    },

    #[error("counter '{counter}' for '{entity_id}' is negative: {value}")]
    NegativeCounter {
        entity_id: String,
        counter: &'static str,
        value: i64,
    },

    #[error("counter '{counter}' for '{entity_id}' overflowed while combining")]
    CounterOverflow {
        entity_id: String,
        counter: &'static str,
    },
}

impl ValidationError {
    /// Entity the failing row belongs to, if it has one
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ValidationError::EmptyEntityId => None,
            ValidationError::NonFiniteRating { entity_id, .. }
            | ValidationError::RatingOutOfRange { entity_id, .. }
            | ValidationError::NegativeCounter { entity_id, .. }
            | ValidationError::CounterOverflow { entity_id, .. } => Some(entity_id),
        }
    }
}
