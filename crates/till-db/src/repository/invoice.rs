//! # Invoice Repository
//!
//! Database operations for sales invoices.
//!
//! ## Checkout Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Checkout Transaction                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── For each cart line:                                              │
//! │    │     UPDATE items SET quantity = quantity - N                      │
//! │    │     WHERE id = ? AND quantity >= N                                │
//! │    │         │                                                          │
//! │    │         └── 0 rows? → ROLLBACK, report the shortfall              │
//! │    │                                                                    │
//! │    ├── Generate invoice number (daily counter)                         │
//! │    ├── INSERT invoice                                                  │
//! │    └── INSERT invoice lines                                            │
//! │    │                                                                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Stock and invoice move together: there is no state where stock was    │
//! │  taken but no invoice exists, or an invoice exists for stock that was  │
//! │  never decremented.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::{CheckoutDraft, Invoice, InvoiceLine, PaymentStatus, DEFAULT_BUSINESS_ID};

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Commits a checkout: applies the stock adjustments and writes the
    /// invoice with its lines, all in one transaction.
    ///
    /// ## Errors
    /// * `DbError::InsufficientStock` - an item's real stock can no longer
    ///   cover its cart line; nothing is written
    /// * `DbError::NotFound` - a carted item vanished from the catalog
    pub async fn create_from_checkout(&self, draft: &CheckoutDraft) -> DbResult<Invoice> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Conditional decrements first. Shadow stock made this *look* fine
        // on the register; the database has the final say.
        for adjustment in &draft.adjustments {
            let needed = -adjustment.delta;

            let result = sqlx::query(
                r#"
                UPDATE items
                SET quantity = quantity - ?2, updated_at = ?3
                WHERE id = ?1 AND quantity >= ?2
                "#,
            )
            .bind(&adjustment.item_id)
            .bind(needed)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM items WHERE id = ?1")
                        .bind(&adjustment.item_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                // Dropping the transaction rolls back the decrements
                // already applied in this loop.
                return match available {
                    Some(available) => Err(DbError::InsufficientStock {
                        sku: adjustment.sku.clone(),
                        available,
                        requested: needed,
                    }),
                    None => Err(DbError::not_found("Item", &adjustment.item_id)),
                };
            }
        }

        let invoice_number = next_receipt_number(&mut tx, "INV", "invoices", "invoice_number").await?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            invoice_number,
            status: draft.status,
            total_cents: draft.total_cents,
            amount_paid_cents: draft.amount_paid_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(invoice_number = %invoice.invoice_number, total = invoice.total_cents, "Writing invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, business_id, invoice_number, status,
                total_cents, amount_paid_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.business_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.status.as_str())
        .bind(invoice.total_cents)
        .bind(invoice.amount_paid_cents)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &draft.lines {
            sqlx::query(
                r#"
                INSERT INTO invoice_lines (
                    id, invoice_id, item_id, sku_snapshot, name_snapshot,
                    unit_price_cents, quantity, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&invoice.id)
            .bind(&line.item_id)
            .bind(&line.sku)
            .bind(&line.name)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line.line_total().cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(invoice)
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, business_id, invoice_number, status,
                   total_cents, amount_paid_cents, created_at, updated_at
            FROM invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets all lines for an invoice, in the order they were rung up.
    pub async fn get_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, item_id, sku_snapshot, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, created_at
            FROM invoice_lines
            WHERE invoice_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists the most recent invoices.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, business_id, invoice_number, status,
                   total_cents, amount_paid_cents, created_at, updated_at
            FROM invoices
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Lists the most recent invoices in one payment status.
    pub async fn list_by_status(
        &self,
        status: PaymentStatus,
        limit: u32,
    ) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, business_id, invoice_number, status,
                   total_cents, amount_paid_cents, created_at, updated_at
            FROM invoices
            WHERE status = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Stores a new paid amount and the status derived from it.
    ///
    /// The caller validates the payment against the fetched invoice first.
    pub async fn update_payment(
        &self,
        id: &str,
        amount_paid_cents: i64,
        status: PaymentStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET amount_paid_cents = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(amount_paid_cents)
        .bind(status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        Ok(())
    }

    /// Counts invoices (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates the next receipt number in format `{PREFIX}-YYYYMMDD-NNNN`.
///
/// NNNN is a per-day counter derived from how many numbers with today's
/// prefix already exist. Runs inside the caller's transaction, and the
/// UNIQUE constraint on the number column backstops any race.
pub(crate) async fn next_receipt_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    prefix: &str,
    table: &str,
    column: &str,
) -> DbResult<String> {
    let date_part = Utc::now().format("%Y%m%d").to_string();
    let like = format!("{prefix}-{date_part}-%");

    let today: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} LIKE ?1"
    ))
    .bind(&like)
    .fetch_one(&mut **tx)
    .await?;

    Ok(format!("{prefix}-{date_part}-{:04}", today + 1))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::item::generate_item_id;
    use till_core::{Item, SaleSession};

    fn test_item(sku: &str, price_cents: i64, quantity: i64) -> Item {
        let now = Utc::now();
        Item {
            id: generate_item_id(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_checkout_commits_invoice_and_stock_together() {
        let db = test_db().await;
        let cola = test_item("COLA", 150, 10);
        let chips = test_item("CHIPS", 250, 5);
        db.items().insert(&cola).await.unwrap();
        db.items().insert(&chips).await.unwrap();

        let mut session = SaleSession::new(db.items().list_all_active().await.unwrap());
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 3).unwrap();
        session.add_item("CHIPS").unwrap();
        session.set_amount_paid(700).unwrap();

        let draft = session.checkout_draft().unwrap();
        let invoice = db.invoices().create_from_checkout(&draft).await.unwrap();

        assert_eq!(invoice.total_cents, 700);
        assert_eq!(invoice.status, PaymentStatus::Paid);
        assert!(invoice.invoice_number.starts_with("INV-"));

        let lines = db.invoices().get_lines(&invoice.id).await.unwrap();
        assert_eq!(lines.len(), 2);

        let cola_after = db.items().get_by_id(&cola.id).await.unwrap().unwrap();
        let chips_after = db.items().get_by_id(&chips.id).await.unwrap().unwrap();
        assert_eq!(cola_after.quantity, 7);
        assert_eq!(chips_after.quantity, 4);
    }

    #[tokio::test]
    async fn test_checkout_shortfall_rolls_everything_back() {
        let db = test_db().await;
        let cola = test_item("COLA", 150, 10);
        let chips = test_item("CHIPS", 250, 5);
        db.items().insert(&cola).await.unwrap();
        db.items().insert(&chips).await.unwrap();

        let mut session = SaleSession::new(db.items().list_all_active().await.unwrap());
        session.add_item("COLA").unwrap();
        session.add_item("CHIPS").unwrap();
        session.update_quantity("CHIPS", 4).unwrap();

        // Another register sells chips behind this session's back.
        db.items().update_stock(&chips.id, -3).await.unwrap();

        let draft = session.checkout_draft().unwrap();
        let err = db.invoices().create_from_checkout(&draft).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 2,
                requested: 4,
                ..
            }
        ));

        // The cola decrement from earlier in the transaction was rolled back.
        let cola_after = db.items().get_by_id(&cola.id).await.unwrap().unwrap();
        assert_eq!(cola_after.quantity, 10);
        assert_eq!(db.invoices().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invoice_numbers_count_up_within_a_day() {
        let db = test_db().await;
        db.items().insert(&test_item("COLA", 150, 10)).await.unwrap();

        for expected_seq in 1..=2 {
            let mut session = SaleSession::new(db.items().list_all_active().await.unwrap());
            session.add_item("COLA").unwrap();
            let invoice = db
                .invoices()
                .create_from_checkout(&session.checkout_draft().unwrap())
                .await
                .unwrap();
            assert!(invoice
                .invoice_number
                .ends_with(&format!("-{expected_seq:04}")));
        }
    }

    #[tokio::test]
    async fn test_update_payment() {
        let db = test_db().await;
        db.items().insert(&test_item("COLA", 150, 10)).await.unwrap();

        let mut session = SaleSession::new(db.items().list_all_active().await.unwrap());
        session.add_item("COLA").unwrap();
        session.update_quantity("COLA", 2).unwrap();
        let invoice = db
            .invoices()
            .create_from_checkout(&session.checkout_draft().unwrap())
            .await
            .unwrap();
        assert_eq!(invoice.status, PaymentStatus::Unpaid);

        db.invoices()
            .update_payment(&invoice.id, 300, PaymentStatus::Paid)
            .await
            .unwrap();

        let fetched = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(fetched.amount_paid_cents, 300);
        assert_eq!(fetched.status, PaymentStatus::Paid);

        let paid = db
            .invoices()
            .list_by_status(PaymentStatus::Paid, 10)
            .await
            .unwrap();
        assert_eq!(paid.len(), 1);
        assert!(db
            .invoices()
            .list_by_status(PaymentStatus::Unpaid, 10)
            .await
            .unwrap()
            .is_empty());

        assert!(matches!(
            db.invoices()
                .update_payment("missing", 100, PaymentStatus::Partial)
                .await
                .unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let db = test_db().await;
        db.items().insert(&test_item("COLA", 150, 10)).await.unwrap();

        for _ in 0..3 {
            let mut session = SaleSession::new(db.items().list_all_active().await.unwrap());
            session.add_item("COLA").unwrap();
            db.invoices()
                .create_from_checkout(&session.checkout_draft().unwrap())
                .await
                .unwrap();
        }

        let recent = db.invoices().list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].created_at >= recent[1].created_at);
    }
}
