//! # Domain Types
//!
//! Core domain types used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Item       │   │     Invoice     │   │ SupplierInvoice │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  invoice_number │   │  bill_number    │       │
//! │  │  price_cents    │   │  status         │   │  supplier_name  │       │
//! │  │  quantity       │   │  total_cents    │   │  total_cents    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Business     │   │  PaymentStatus  │   │SubscriptionPlan │       │
//! │  │    Branch       │   │  ─────────────  │   │  ─────────────  │       │
//! │  │    Employee     │   │  Unpaid         │   │  Basic          │       │
//! │  │  Subscription   │   │  Partial        │   │  Standard       │       │
//! │  └─────────────────┘   │  Paid           │   │  Premium        │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, invoice_number, bill_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Item
// =============================================================================

/// An inventory item available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business this item belongs to.
    pub business_id: String,

    /// Stock Keeping Unit - business identifier, unique per business.
    pub sku: String,

    /// Display name shown to the cashier and on invoices.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Tracked stock on hand. Never negative.
    pub quantity: i64,

    /// Relative URL of the item's image, if one was uploaded.
    pub image_url: Option<String>,

    /// Whether the item is active (soft delete).
    pub is_active: bool,

    /// When the item was created.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if at least one unit is on hand.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment state of an invoice or supplier bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing paid yet.
    Unpaid,
    /// Partially paid, balance outstanding.
    Partial,
    /// Fully settled.
    Paid,
}

impl PaymentStatus {
    /// Derives the status from paid vs. total amounts.
    ///
    /// A zero-total document counts as paid (nothing is owed).
    pub fn from_amounts(paid_cents: i64, total_cents: i64) -> Self {
        if paid_cents <= 0 && total_cents > 0 {
            PaymentStatus::Unpaid
        } else if paid_cents >= total_cents {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        }
    }

    /// Stable lowercase name, matching the stored form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Parses the stored form back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A sale invoice produced by checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub business_id: String,
    /// Human-readable number, e.g. INV-20250321-0042.
    pub invoice_number: String,
    pub status: PaymentStatus,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the amount paid as Money.
    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Outstanding balance, never negative.
    #[inline]
    pub fn remaining_due(&self) -> Money {
        self.total().saturating_sub_to_zero(self.amount_paid())
    }
}

// =============================================================================
// Invoice Line
// =============================================================================

/// A line item on an invoice.
/// Uses snapshot pattern to freeze item data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub item_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Item name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl InvoiceLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Supplier Invoice
// =============================================================================

/// A bill received from a supplier, tracked until settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SupplierInvoice {
    pub id: String,
    pub business_id: String,
    /// Human-readable number, e.g. BILL-20250321-0007.
    pub bill_number: String,
    /// Free-text supplier name (no supplier registry).
    pub supplier_name: String,
    /// The supplier's own invoice reference, if any.
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    /// Whether line quantities were received into inventory when recorded.
    pub stock_received: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplierInvoice {
    /// Outstanding balance, never negative.
    #[inline]
    pub fn remaining_due(&self) -> Money {
        Money::from_cents(self.total_cents)
            .saturating_sub_to_zero(Money::from_cents(self.amount_paid_cents))
    }
}

/// A line item on a supplier bill.
/// Snapshots follow the invoice-line pattern: the bill stays readable even
/// after the item is renamed or retired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SupplierInvoiceLine {
    pub id: String,
    pub supplier_invoice_id: String,
    pub item_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    /// Unit cost in cents charged by the supplier.
    pub unit_cost_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Business / Branch / Employee
// =============================================================================

/// The onboarded business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Business {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// ISO 4217 currency code, e.g. "USD".
    pub currency_code: String,
    /// Set when the onboarding flow completed. None while mid-flow.
    pub onboarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A physical branch of the business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: String,
    pub business_id: String,
    /// Unique within the business.
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What an employee does at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Manager,
    Cashier,
    Stock,
}

impl EmployeeRole {
    /// Stable lowercase name, matching the stored form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EmployeeRole::Manager => "manager",
            EmployeeRole::Cashier => "cashier",
            EmployeeRole::Stock => "stock",
        }
    }
}

/// A member of the business's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: String,
    pub business_id: String,
    /// Branch this employee works at, if assigned.
    pub branch_id: Option<String>,
    pub name: String,
    pub role: EmployeeRole,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Subscription
// =============================================================================

/// Subscription tiers. Pricing is per month, limits are on branch count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Basic,
    Standard,
    Premium,
}

impl SubscriptionPlan {
    /// Monthly price in cents.
    pub const fn monthly_price_cents(&self) -> i64 {
        match self {
            SubscriptionPlan::Basic => 2500,
            SubscriptionPlan::Standard => 4900,
            SubscriptionPlan::Premium => 9900,
        }
    }

    /// Branch limit for the tier. None means unlimited.
    pub const fn max_branches(&self) -> Option<u32> {
        match self {
            SubscriptionPlan::Basic => Some(1),
            SubscriptionPlan::Standard => Some(3),
            SubscriptionPlan::Premium => None,
        }
    }

    /// Whether this plan covers `count` branches.
    pub fn allows_branches(&self, count: usize) -> bool {
        match self.max_branches() {
            Some(max) => count <= max as usize,
            None => true,
        }
    }

    /// Stable lowercase name, matching the stored form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Standard => "standard",
            SubscriptionPlan::Premium => "premium",
        }
    }
}

/// Derived subscription state. Never stored; computed from expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

/// The business's current subscription term.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: String,
    pub business_id: String,
    pub plan: SubscriptionPlan,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Status at a given instant. Pure so tests can pin the clock.
    pub fn status_at(&self, at: DateTime<Utc>) -> SubscriptionStatus {
        if self.expires_at > at {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Expired
        }
    }

    /// Status right now.
    pub fn status(&self) -> SubscriptionStatus {
        self.status_at(Utc::now())
    }

    /// Whole days until expiry at a given instant, floored at zero.
    pub fn days_remaining_at(&self, at: DateTime<Utc>) -> i64 {
        (self.expires_at - at).num_days().max(0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_payment_status_from_amounts() {
        assert_eq!(PaymentStatus::from_amounts(0, 1000), PaymentStatus::Unpaid);
        assert_eq!(
            PaymentStatus::from_amounts(500, 1000),
            PaymentStatus::Partial
        );
        assert_eq!(PaymentStatus::from_amounts(1000, 1000), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_amounts(1500, 1000), PaymentStatus::Paid);

        // Zero-total documents owe nothing
        assert_eq!(PaymentStatus::from_amounts(0, 0), PaymentStatus::Paid);
    }

    #[test]
    fn test_payment_status_round_trips_stored_form() {
        for status in [
            PaymentStatus::Unpaid,
            PaymentStatus::Partial,
            PaymentStatus::Paid,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("settled"), None);
    }

    #[test]
    fn test_plan_branch_limits() {
        assert!(SubscriptionPlan::Basic.allows_branches(1));
        assert!(!SubscriptionPlan::Basic.allows_branches(2));
        assert!(SubscriptionPlan::Standard.allows_branches(3));
        assert!(!SubscriptionPlan::Standard.allows_branches(4));
        assert!(SubscriptionPlan::Premium.allows_branches(500));
    }

    #[test]
    fn test_subscription_status_at() {
        let now = Utc::now();
        let sub = Subscription {
            id: "s1".to_string(),
            business_id: "b1".to_string(),
            plan: SubscriptionPlan::Basic,
            started_at: now - Duration::days(10),
            expires_at: now + Duration::days(20),
            updated_at: now,
        };

        assert_eq!(sub.status_at(now), SubscriptionStatus::Active);
        assert_eq!(sub.days_remaining_at(now), 20);

        let later = now + Duration::days(21);
        assert_eq!(sub.status_at(later), SubscriptionStatus::Expired);
        assert_eq!(sub.days_remaining_at(later), 0);
    }

    #[test]
    fn test_item_in_stock() {
        let mut item = Item {
            id: "i1".to_string(),
            business_id: "b1".to_string(),
            sku: "COLA-330".to_string(),
            name: "Cola 330ml".to_string(),
            price_cents: 150,
            quantity: 3,
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(item.in_stock());

        item.quantity = 0;
        assert!(!item.in_stock());
    }

    #[test]
    fn test_invoice_remaining_due() {
        let now = Utc::now();
        let invoice = Invoice {
            id: "v1".to_string(),
            business_id: "b1".to_string(),
            invoice_number: "INV-20250321-0001".to_string(),
            status: PaymentStatus::Partial,
            total_cents: 1000,
            amount_paid_cents: 400,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(invoice.remaining_due().cents(), 600);
    }
}
