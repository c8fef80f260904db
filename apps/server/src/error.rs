//! # API Error Type
//!
//! Unified error type for route handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error Flow in Till                                 │
//! │                                                                         │
//! │  Client                       Rust Backend                              │
//! │  ──────                       ────────────                              │
//! │                                                                         │
//! │  POST /api/registers/R1/cart/items                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Route Handler                                                   │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Domain Error? ─── CoreError::OutOfStock ──────── ApiError ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄────────────────────────────────────────────────────────────────────  │
//! │                                                                         │
//! │  HTTP 409                                                               │
//! │  { "code": "OUT_OF_STOCK",                                              │
//! │    "message": "Out of stock for COLA-330: available 0, requested 1" }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mobile client the original backend served mapped failures to message
//! resource identifiers; the stable `code` strings here play that role.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// API error returned from route handlers.
///
/// ## Serialization
/// This is what the client receives when a request fails:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Item not found: COLA-330"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
///
/// ## Usage in Clients
/// ```typescript
/// const res = await fetch('/api/registers/R1/cart/items', { ... });
/// if (!res.ok) {
///   const err = await res.json();
///   switch (err.code) {
///     case 'OUT_OF_STOCK':
///       showSnackbar(err.message);
///       break;
///     case 'VALIDATION_ERROR':
///       showForm(err.message);
///       break;
///     default:
///       showError('An error occurred');
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Stock cannot cover the requested units (409)
    OutOfStock,

    /// Cart operation failed (409)
    CartError,

    /// Onboarding step order or plan limit violated (409)
    OnboardingError,

    /// Payment processing error (400)
    PaymentError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    /// HTTP status the code maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::OutOfStock => StatusCode::CONFLICT,
            ErrorCode::CartError => StatusCode::CONFLICT,
            ErrorCode::OnboardingError => StatusCode::CONFLICT,
            ErrorCode::PaymentError => StatusCode::BAD_REQUEST,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Serializes the error as the JSON body with its mapped status code.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        (status, Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::InsufficientStock { .. } => {
                // The checkout transaction found live stock short; the full
                // message names the sku and the counts.
                ApiError::new(ErrorCode::OutOfStock, err.to_string())
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(sku) => ApiError::not_found("Item", &sku),
            CoreError::OutOfStock { .. } => ApiError::new(ErrorCode::OutOfStock, err.to_string()),
            CoreError::LineNotFound(_) | CoreError::EmptyCart | CoreError::CartTooLarge { .. } => {
                ApiError::new(ErrorCode::CartError, err.to_string())
            }
            CoreError::QuantityTooLarge { .. } => {
                ApiError::new(ErrorCode::ValidationError, err.to_string())
            }
            CoreError::InvalidPaymentAmount { .. } => {
                ApiError::new(ErrorCode::PaymentError, err.to_string())
            }
            CoreError::StepMismatch { .. }
            | CoreError::AlreadyOnboarded
            | CoreError::CannotGoBack { .. }
            | CoreError::PlanLimitExceeded { .. } => {
                ApiError::new(ErrorCode::OnboardingError, err.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

/// Converts bare validation errors, for handlers that call validators
/// directly on request fields.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
