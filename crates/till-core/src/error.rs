//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Server errors (apps/server)                                           │
//! │  └── ApiError         - What clients see (code + message JSON)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, step, limits)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a stable user-facing message code

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-facing message codes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item cannot be found in the catalog snapshot.
    ///
    /// ## When This Occurs
    /// - SKU doesn't exist in the session's catalog
    /// - Item was retired (soft delete) before the session opened
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Stock cannot cover the requested units.
    ///
    /// ## When This Occurs
    /// - Adding a unit when the shadow stock for the SKU is already zero
    /// - Raising a line quantity past what the shadow stock can cover
    /// - Checkout finding live stock consumed by another register
    ///
    /// ## User Workflow
    /// ```text
    /// Tap item (shadow stock: 0)
    ///      │
    ///      ▼
    /// OutOfStock { sku: "COLA-330", available: 0, requested: 1 }
    ///      │
    ///      ▼
    /// Client shows: "COLA-330 is out of stock"
    /// ```
    #[error("Out of stock for {sku}: available {available}, requested {requested}")]
    OutOfStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Cart line not found for the given SKU.
    #[error("No cart line for {0}")]
    LineNotFound(String),

    /// Checkout attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Onboarding step submitted out of order.
    ///
    /// ## When This Occurs
    /// - Submitting branches before business info
    /// - Re-submitting a step after the flow moved past it
    #[error("Onboarding is on step '{actual}', expected '{expected}'")]
    StepMismatch { expected: String, actual: String },

    /// Onboarding step submitted after the flow already completed.
    #[error("Business is already onboarded")]
    AlreadyOnboarded,

    /// Back navigation is not possible from the current step.
    #[error("Cannot go back from step '{step}'")]
    CannotGoBack { step: String },

    /// Chosen subscription plan does not cover the collected branches.
    #[error("Plan '{plan}' allows {max_branches} branches, {branches} collected")]
    PlanLimitExceeded {
        plan: String,
        max_branches: u32,
        branches: usize,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet field-level requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unknown branch reference).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU, duplicate branch name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OutOfStock {
            sku: "COLA-330".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Out of stock for COLA-330: available 3, requested 5"
        );
    }

    #[test]
    fn test_step_mismatch_message() {
        let err = CoreError::StepMismatch {
            expected: "branches".to_string(),
            actual: "business info".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Onboarding is on step 'business info', expected 'branches'"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
