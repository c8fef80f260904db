//! # Validation Module
//!
//! Input validation utilities for Till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Client                                                       │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: a bad write must fail before it reaches the store   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use till_core::validation::{validate_sku, validate_quantity};
//!
//! // Validate SKU before database insert
//! validate_sku("COLA-330").unwrap();
//!
//! // Validate quantity before a cart operation
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_sku;
///
/// assert!(validate_sku("COLA-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an item name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Cola 330ml").is_ok());
/// assert!(validate_item_name("").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    validate_required_name("name", name, 200)
}

/// Validates a required display name (business, owner, branch, employee).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most `max` characters
pub fn validate_required_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an ISO 4217 currency code.
///
/// ## Rules
/// - Exactly 3 ASCII uppercase letters ("USD", "PKR", "EUR")
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency_code".to_string(),
            reason: "must be 3 uppercase letters".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Deliberately shallow: one '@' with non-empty sides. Deliverability is
/// the mail system's problem, not ours.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 200,
        });
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 30 characters
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    validate_required_name("phone", phone, 30)
}

/// Validates a register identifier (one per till/lane).
///
/// Same character rules as SKUs: these end up in URLs and logs.
pub fn validate_register_id(register: &str) -> ValidationResult<()> {
    let register = register.trim();

    if register.is_empty() {
        return Err(ValidationError::Required {
            field: "register".to_string(),
        });
    }

    if register.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "register".to_string(),
            max: 50,
        });
    }

    if !register
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "register".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Update Line                                                      │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → Proceed against shadow stock                            │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock level (item quantity on hand).
///
/// ## Rules
/// - Must be non-negative (>= 0)
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // 10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot pay zero or negative amounts
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates the cart's amount-paid-so-far field.
///
/// ## Rules
/// - Must be non-negative (zero means nothing tendered yet)
pub fn validate_paid_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "amount paid".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a subscription renewal length in months.
///
/// ## Rules
/// - Between 1 and 24 months per renewal
pub fn validate_renewal_months(months: u32) -> ValidationResult<()> {
    if months == 0 || months > 24 {
        return Err(ValidationError::OutOfRange {
            field: "months".to_string(),
            min: 1,
            max: 24,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        // Valid SKUs
        assert!(validate_sku("COLA-330").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("item_1").is_ok());

        // Invalid SKUs
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Cola 330ml").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_required_name() {
        assert!(validate_required_name("branch", "Main Street", 120).is_ok());
        assert!(validate_required_name("branch", "  ", 120).is_err());
        assert!(validate_required_name("branch", &"B".repeat(200), 120).is_err());
    }

    #[test]
    fn test_validate_currency_code() {
        assert!(validate_currency_code("USD").is_ok());
        assert!(validate_currency_code("PKR").is_ok());
        assert!(validate_currency_code("usd").is_err());
        assert!(validate_currency_code("US").is_err());
        assert!(validate_currency_code("DOLLARS").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("owner@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("owner@").is_err());
        assert!(validate_email("a@b@c").is_err());
    }

    #[test]
    fn test_validate_register_id() {
        assert!(validate_register_id("lane-1").is_ok());
        assert!(validate_register_id("front_desk").is_ok());
        assert!(validate_register_id("").is_err());
        assert!(validate_register_id("lane 1").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_stock_level() {
        assert!(validate_stock_level(0).is_ok());
        assert!(validate_stock_level(500).is_ok());
        assert!(validate_stock_level(-1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_payment_amounts() {
        assert!(validate_payment_amount(100).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-5).is_err());

        assert!(validate_paid_amount(0).is_ok());
        assert!(validate_paid_amount(100).is_ok());
        assert!(validate_paid_amount(-5).is_err());
    }

    #[test]
    fn test_validate_renewal_months() {
        assert!(validate_renewal_months(1).is_ok());
        assert!(validate_renewal_months(12).is_ok());
        assert!(validate_renewal_months(24).is_ok());
        assert!(validate_renewal_months(0).is_err());
        assert!(validate_renewal_months(25).is_err());
    }
}
