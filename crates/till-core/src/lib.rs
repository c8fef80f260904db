//! # till-core: Pure Business Logic for Till
//!
//! This crate is the **heart** of Till. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/server)                       │   │
//! │  │    items, registers/cart, checkout, invoices, onboarding        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │onboarding │  │   │
//! │  │   │   Item    │  │   Money   │  │SaleSession│  │  stepper  │  │   │
//! │  │   │  Invoice  │  │ line math │  │ CartLine  │  │   steps   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, Invoice, Business, Subscription, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Sale session with shadow-stock reconciliation
//! - [`onboarding`] - Business onboarding stepper
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{Item, SaleSession, DEFAULT_BUSINESS_ID};
//! use chrono::Utc;
//!
//! let cola = Item {
//!     id: "7b2d3a90-1f60-4f70-9c6e-2ad32f1b4c55".to_string(),
//!     business_id: DEFAULT_BUSINESS_ID.to_string(),
//!     sku: "COLA-330".to_string(),
//!     name: "Cola 330ml".to_string(),
//!     price_cents: 150,
//!     quantity: 10,
//!     image_url: None,
//!     is_active: true,
//!     created_at: Utc::now(),
//!     updated_at: Utc::now(),
//! };
//!
//! // Open a sale session over a catalog snapshot, then cart one unit
//! let mut session = SaleSession::new(vec![cola]);
//! session.add_item("COLA-330").unwrap();
//!
//! assert_eq!(session.total_cents(), 150);
//! assert_eq!(session.shadow_stock("COLA-330"), Some(9));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod onboarding;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use cart::{CartLine, CartTotals, CheckoutDraft, SaleSession, StockAdjustment};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use onboarding::{BranchDraft, BusinessDraft, EmployeeDraft, Onboarding, OnboardingStep};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default business ID (single-business runtime with multi-business schema)
///
/// ## Why a constant?
/// The runtime serves one business, but every table carries business_id so a
/// hosted multi-business deployment stays a schema no-op. Onboarding creates
/// the business row under this well-known ID.
pub const DEFAULT_BUSINESS_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single item in a cart line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum branches collectable during onboarding
pub const MAX_BRANCHES: usize = 50;

/// Maximum employees collectable during onboarding
pub const MAX_EMPLOYEES: usize = 200;
