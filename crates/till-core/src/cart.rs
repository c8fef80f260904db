//! # Sale Session Module
//!
//! In-memory cart for an open register, with shadow stock tracking.
//!
//! ## Shadow Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Sale Session Flow                                  │
//! │                                                                         │
//! │  Open session ──► snapshot catalog quantities (shadow stock)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  add_item(sku)                                                          │
//! │       ├── unknown sku        → ItemNotFound                            │
//! │       ├── shadow stock == 0  → OutOfStock (cart untouched)             │
//! │       └── ok                 → line +1 unit, shadow stock -1           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  update_quantity(sku, n)                                                │
//! │       ├── n == current       → no-op                                   │
//! │       ├── increase > shadow  → OutOfStock (cart untouched)             │
//! │       └── ok                 → shadow stock -+ signed difference       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  remove_line(sku)            → shadow stock restored by line quantity  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  checkout_draft()            → lines + totals + stock adjustments      │
//! │       (session untouched; caller clears only after storage commits)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The shadow stock is a per-session mirror of on-hand quantities. It stops
//! a cashier overselling within one session without touching the database
//! on every keystroke. The database recheck at checkout is the source of
//! truth; the shadow is fast feedback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Item, PaymentStatus};
use crate::validation::validate_paid_amount;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// A single line in an open sale: one item at a unit price, N units.
///
/// Price and name are snapshotted when the line is created, so a catalog
/// edit mid-sale does not silently change a ticket already on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl CartLine {
    fn from_item(item: &Item, quantity: i64) -> Self {
        Self {
            item_id: item.id.clone(),
            sku: item.sku.clone(),
            name: item.name.clone(),
            unit_price_cents: item.price_cents,
            quantity,
        }
    }

    /// Unit price as Money.
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line total (unit price × quantity) as Money.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Totals and Checkout Draft
// =============================================================================

/// Aggregate view of an open session, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Number of distinct lines.
    pub lines: usize,
    /// Total units across all lines.
    pub units: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_due_cents: i64,
}

/// A stock delta to apply when a sale commits. Negative for units sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item_id: String,
    pub sku: String,
    pub delta: i64,
}

/// Everything storage needs to commit a sale: the lines to invoice and the
/// stock deltas to apply. Building a draft does not mutate the session;
/// the caller clears it only after the write succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub status: PaymentStatus,
    pub adjustments: Vec<StockAdjustment>,
}

// =============================================================================
// Sale Session
// =============================================================================

/// An open sale at one register.
///
/// Holds the cart lines, the tendered amount, and a shadow copy of catalog
/// stock that every cart operation is checked against.
///
/// ## Example
/// ```rust
/// use till_core::SaleSession;
/// # use chrono::Utc;
/// # use till_core::types::Item;
/// # let now = Utc::now();
/// # let cola = Item {
/// #     id: "item-1".to_string(),
/// #     business_id: "biz-1".to_string(),
/// #     sku: "COLA-330".to_string(),
/// #     name: "Cola 330ml".to_string(),
/// #     price_cents: 150,
/// #     quantity: 10,
/// #     image_url: None,
/// #     is_active: true,
/// #     created_at: now,
/// #     updated_at: now,
/// # };
///
/// let mut session = SaleSession::new(vec![cola]);
/// session.add_item("COLA-330").unwrap();
/// session.add_item("COLA-330").unwrap();
///
/// assert_eq!(session.total_cents(), 300);
/// assert_eq!(session.shadow_stock("COLA-330"), Some(8));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleSession {
    /// Shadow catalog keyed by SKU. Quantities here drift from the catalog
    /// as the cart changes; they reconcile at checkout or on abandon.
    stock: BTreeMap<String, Item>,
    lines: Vec<CartLine>,
    amount_paid_cents: i64,
}

impl SaleSession {
    /// Opens a session over a catalog snapshot.
    pub fn new(catalog: Vec<Item>) -> Self {
        let stock = catalog
            .into_iter()
            .map(|item| (item.sku.clone(), item))
            .collect();
        Self {
            stock,
            lines: Vec::new(),
            amount_paid_cents: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Cart operations
    // -------------------------------------------------------------------------

    /// Adds one unit of an item to the cart.
    ///
    /// Rejects unknown SKUs and items whose shadow stock is exhausted. On
    /// any error the session is untouched.
    pub fn add_item(&mut self, sku: &str) -> CoreResult<()> {
        let available = self
            .stock
            .get(sku)
            .ok_or_else(|| CoreError::ItemNotFound(sku.to_string()))?
            .quantity;

        if available <= 0 {
            return Err(CoreError::OutOfStock {
                sku: sku.to_string(),
                available: 0,
                requested: 1,
            });
        }

        match self.lines.iter_mut().find(|line| line.sku == sku) {
            Some(line) => {
                if line.quantity >= MAX_LINE_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: line.quantity + 1,
                        max: MAX_LINE_QUANTITY,
                    });
                }
                line.quantity += 1;
            }
            None => {
                if self.lines.len() >= MAX_CART_LINES {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_LINES,
                    });
                }
                let line = self
                    .stock
                    .get(sku)
                    .map(|item| CartLine::from_item(item, 1))
                    .ok_or_else(|| CoreError::ItemNotFound(sku.to_string()))?;
                self.lines.push(line);
            }
        }

        // Checks all passed; now take the unit out of the shadow.
        if let Some(item) = self.stock.get_mut(sku) {
            item.quantity -= 1;
        }

        Ok(())
    }

    /// Sets a cart line to an absolute quantity.
    ///
    /// Quantity 0 removes the line. Setting the quantity it already has is
    /// a no-op. Increases are checked against shadow stock; decreases give
    /// the difference back.
    pub fn update_quantity(&mut self, sku: &str, new_qty: i64) -> CoreResult<()> {
        if new_qty == 0 {
            return self.remove_line(sku);
        }
        if new_qty < 0 {
            return Err(crate::error::ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if new_qty > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: new_qty,
                max: MAX_LINE_QUANTITY,
            });
        }

        let current = self
            .lines
            .iter()
            .find(|line| line.sku == sku)
            .map(|line| line.quantity)
            .ok_or_else(|| CoreError::LineNotFound(sku.to_string()))?;

        if new_qty == current {
            return Ok(());
        }

        let difference = new_qty - current;
        let available = self.stock.get(sku).map(|item| item.quantity).unwrap_or(0);
        if difference > available {
            return Err(CoreError::OutOfStock {
                sku: sku.to_string(),
                available,
                requested: difference,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|line| line.sku == sku) {
            line.quantity = new_qty;
        }
        if let Some(item) = self.stock.get_mut(sku) {
            item.quantity -= difference;
        }

        Ok(())
    }

    /// Removes a cart line, restoring its full quantity to shadow stock.
    pub fn remove_line(&mut self, sku: &str) -> CoreResult<()> {
        let index = self
            .lines
            .iter()
            .position(|line| line.sku == sku)
            .ok_or_else(|| CoreError::LineNotFound(sku.to_string()))?;

        let line = self.lines.remove(index);
        if let Some(item) = self.stock.get_mut(&line.sku) {
            item.quantity += line.quantity;
        }

        Ok(())
    }

    /// Abandons the sale: every line's quantity goes back to shadow stock
    /// and the tendered amount resets.
    pub fn clear(&mut self) {
        for line in self.lines.drain(..) {
            if let Some(item) = self.stock.get_mut(&line.sku) {
                item.quantity += line.quantity;
            }
        }
        self.amount_paid_cents = 0;
    }

    /// Records the amount tendered so far. Must not exceed the cart total.
    pub fn set_amount_paid(&mut self, cents: i64) -> CoreResult<()> {
        validate_paid_amount(cents)?;
        if cents > self.total_cents() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "amount paid {} exceeds cart total {}",
                    Money::from_cents(cents),
                    self.total()
                ),
            });
        }
        self.amount_paid_cents = cents;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------------

    /// All lines, in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// One line by SKU, if present.
    pub fn line(&self, sku: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.sku == sku)
    }

    /// Remaining shadow stock for a SKU, or None if the SKU is not in the
    /// session's catalog snapshot.
    pub fn shadow_stock(&self, sku: &str) -> Option<i64> {
        self.stock.get(sku).map(|item| item.quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Cart total in cents.
    pub fn total_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| line.line_total().cents())
            .sum()
    }

    /// Cart total as Money.
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }

    pub fn amount_paid_cents(&self) -> i64 {
        self.amount_paid_cents
    }

    /// Aggregate totals for display.
    pub fn totals(&self) -> CartTotals {
        let total_cents = self.total_cents();
        let remaining = Money::from_cents(total_cents)
            .saturating_sub_to_zero(Money::from_cents(self.amount_paid_cents));
        CartTotals {
            lines: self.lines.len(),
            units: self.lines.iter().map(|line| line.quantity).sum(),
            total_cents,
            amount_paid_cents: self.amount_paid_cents,
            remaining_due_cents: remaining.cents(),
        }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Builds the commit payload for this sale without touching the session.
    ///
    /// Storage applies the adjustments and writes the invoice in one
    /// transaction; only after that succeeds should the caller clear or
    /// drop the session. A failed commit leaves the cart exactly as the
    /// cashier sees it.
    pub fn checkout_draft(&self) -> CoreResult<CheckoutDraft> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let total_cents = self.total_cents();
        // The paid amount was validated when set, but the cart may have
        // shrunk since. Recheck at the commit point.
        if self.amount_paid_cents > total_cents {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "amount paid {} exceeds cart total {}",
                    Money::from_cents(self.amount_paid_cents),
                    Money::from_cents(total_cents)
                ),
            });
        }

        let adjustments = self
            .lines
            .iter()
            .map(|line| StockAdjustment {
                item_id: line.item_id.clone(),
                sku: line.sku.clone(),
                delta: -line.quantity,
            })
            .collect();

        Ok(CheckoutDraft {
            lines: self.lines.clone(),
            total_cents,
            amount_paid_cents: self.amount_paid_cents,
            status: PaymentStatus::from_amounts(self.amount_paid_cents, total_cents),
            adjustments,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_item(sku: &str, price_cents: i64, quantity: i64) -> Item {
        let now = Utc::now();
        Item {
            id: format!("item-{sku}"),
            business_id: "biz-1".to_string(),
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            price_cents,
            quantity,
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn session_with(items: Vec<Item>) -> SaleSession {
        SaleSession::new(items)
    }

    #[test]
    fn test_add_item_creates_line_and_decrements_shadow() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);

        session.add_item("COLA").unwrap();

        assert_eq!(session.len(), 1);
        assert_eq!(session.line("COLA").unwrap().quantity, 1);
        assert_eq!(session.shadow_stock("COLA"), Some(9));
        assert_eq!(session.total_cents(), 150);
    }

    #[test]
    fn test_add_item_increments_existing_line() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);

        session.add_item("COLA").unwrap();
        session.add_item("COLA").unwrap();
        session.add_item("COLA").unwrap();

        assert_eq!(session.len(), 1);
        assert_eq!(session.line("COLA").unwrap().quantity, 3);
        assert_eq!(session.shadow_stock("COLA"), Some(7));
        assert_eq!(session.total_cents(), 450);
    }

    #[test]
    fn test_add_unknown_sku() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);

        let err = session.add_item("MISSING").unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound(_)));
        assert!(session.is_empty());
    }

    #[test]
    fn test_add_out_of_stock_leaves_cart_unchanged() {
        let mut session = session_with(vec![test_item("COLA", 150, 2)]);

        session.add_item("COLA").unwrap();
        session.add_item("COLA").unwrap();
        assert_eq!(session.shadow_stock("COLA"), Some(0));

        let before = session.lines().to_vec();
        let err = session.add_item("COLA").unwrap_err();

        assert!(err.to_string().starts_with("Out of stock"));
        assert_eq!(session.lines(), &before[..]);
        assert_eq!(session.shadow_stock("COLA"), Some(0));
    }

    #[test]
    fn test_add_zero_stock_item_rejected_immediately() {
        let mut session = session_with(vec![test_item("COLA", 150, 0)]);

        let err = session.add_item("COLA").unwrap_err();
        assert!(matches!(
            err,
            CoreError::OutOfStock {
                available: 0,
                requested: 1,
                ..
            }
        ));
        assert!(session.is_empty());
    }

    #[test]
    fn test_same_quantity_update_is_noop() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();
        session.add_item("COLA").unwrap();

        session.update_quantity("COLA", 2).unwrap();

        assert_eq!(session.line("COLA").unwrap().quantity, 2);
        assert_eq!(session.shadow_stock("COLA"), Some(8));
    }

    #[test]
    fn test_update_quantity_increase_takes_from_shadow() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();

        session.update_quantity("COLA", 6).unwrap();

        assert_eq!(session.line("COLA").unwrap().quantity, 6);
        assert_eq!(session.shadow_stock("COLA"), Some(4));
    }

    #[test]
    fn test_update_quantity_decrease_gives_back_to_shadow() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 6).unwrap();

        session.update_quantity("COLA", 2).unwrap();

        assert_eq!(session.line("COLA").unwrap().quantity, 2);
        assert_eq!(session.shadow_stock("COLA"), Some(8));
    }

    #[test]
    fn test_update_beyond_shadow_stock_rejected() {
        let mut session = session_with(vec![test_item("COLA", 150, 3)]);
        session.add_item("COLA").unwrap();

        let err = session.update_quantity("COLA", 4).unwrap_err();

        assert!(matches!(
            err,
            CoreError::OutOfStock {
                available: 2,
                requested: 3,
                ..
            }
        ));
        assert_eq!(session.line("COLA").unwrap().quantity, 1);
        assert_eq!(session.shadow_stock("COLA"), Some(2));
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();

        session.update_quantity("COLA", 0).unwrap();

        assert!(session.is_empty());
        assert_eq!(session.shadow_stock("COLA"), Some(10));
    }

    #[test]
    fn test_update_unknown_line() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);

        let err = session.update_quantity("COLA", 2).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound(_)));
    }

    #[test]
    fn test_remove_restores_shadow_stock_exactly() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 7).unwrap();
        assert_eq!(session.shadow_stock("COLA"), Some(3));

        session.remove_line("COLA").unwrap();

        assert!(session.is_empty());
        assert_eq!(session.shadow_stock("COLA"), Some(10));
    }

    #[test]
    fn test_remove_unknown_line() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);

        let err = session.remove_line("COLA").unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound(_)));
    }

    #[test]
    fn test_clear_restores_everything() {
        let mut session = session_with(vec![
            test_item("COLA", 150, 10),
            test_item("CHIPS", 250, 5),
        ]);
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 4).unwrap();
        session.add_item("CHIPS").unwrap();
        session.set_amount_paid(100).unwrap();

        session.clear();

        assert!(session.is_empty());
        assert_eq!(session.amount_paid_cents(), 0);
        assert_eq!(session.shadow_stock("COLA"), Some(10));
        assert_eq!(session.shadow_stock("CHIPS"), Some(5));
    }

    #[test]
    fn test_set_amount_paid_bounds() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();
        session.add_item("COLA").unwrap();

        session.set_amount_paid(0).unwrap();
        session.set_amount_paid(300).unwrap();
        assert_eq!(session.amount_paid_cents(), 300);

        assert!(session.set_amount_paid(-1).is_err());
        assert!(matches!(
            session.set_amount_paid(301).unwrap_err(),
            CoreError::InvalidPaymentAmount { .. }
        ));
        // Failed set leaves the previous value.
        assert_eq!(session.amount_paid_cents(), 300);
    }

    #[test]
    fn test_totals() {
        let mut session = session_with(vec![
            test_item("COLA", 150, 10),
            test_item("CHIPS", 250, 5),
        ]);
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 2).unwrap();
        session.add_item("CHIPS").unwrap();
        session.set_amount_paid(200).unwrap();

        let totals = session.totals();
        assert_eq!(totals.lines, 2);
        assert_eq!(totals.units, 3);
        assert_eq!(totals.total_cents, 550);
        assert_eq!(totals.amount_paid_cents, 200);
        assert_eq!(totals.remaining_due_cents, 350);
    }

    #[test]
    fn test_checkout_draft_empty_cart() {
        let session = session_with(vec![test_item("COLA", 150, 10)]);

        let err = session.checkout_draft().unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_checkout_draft_contents() {
        let mut session = session_with(vec![
            test_item("COLA", 150, 10),
            test_item("CHIPS", 250, 5),
        ]);
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 3).unwrap();
        session.add_item("CHIPS").unwrap();
        session.set_amount_paid(400).unwrap();

        let draft = session.checkout_draft().unwrap();

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.total_cents, 700);
        assert_eq!(draft.amount_paid_cents, 400);
        assert_eq!(draft.status, PaymentStatus::Partial);
        assert_eq!(draft.adjustments.len(), 2);
        let cola = draft
            .adjustments
            .iter()
            .find(|adj| adj.sku == "COLA")
            .unwrap();
        assert_eq!(cola.delta, -3);
    }

    #[test]
    fn test_checkout_draft_leaves_session_intact() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();

        let _ = session.checkout_draft().unwrap();

        assert_eq!(session.len(), 1);
        assert_eq!(session.shadow_stock("COLA"), Some(9));
    }

    #[test]
    fn test_checkout_draft_fully_paid() {
        let mut session = session_with(vec![test_item("COLA", 150, 10)]);
        session.add_item("COLA").unwrap();
        session.set_amount_paid(150).unwrap();

        let draft = session.checkout_draft().unwrap();
        assert_eq!(draft.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_line_quantity_cap() {
        let mut session = session_with(vec![test_item("COLA", 1, 2000)]);
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", MAX_LINE_QUANTITY).unwrap();

        let err = session.add_item("COLA").unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert!(session
            .update_quantity("COLA", MAX_LINE_QUANTITY + 1)
            .is_err());
    }

    #[test]
    fn test_cart_line_cap() {
        let catalog: Vec<Item> = (0..=crate::MAX_CART_LINES)
            .map(|i| test_item(&format!("SKU-{i}"), 100, 5))
            .collect();
        let mut session = session_with(catalog);

        for i in 0..crate::MAX_CART_LINES {
            session.add_item(&format!("SKU-{i}")).unwrap();
        }

        let err = session
            .add_item(&format!("SKU-{}", crate::MAX_CART_LINES))
            .unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }
}
