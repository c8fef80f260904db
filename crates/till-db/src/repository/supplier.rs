//! # Supplier Invoice Repository
//!
//! Database operations for supplier bills (money the shop owes).
//!
//! ## Receiving Stock
//! A bill records what a supplier delivered and charged. Receiving is a
//! separate, one-shot step: each line's quantity is added to item stock and
//! the bill is flagged, all in one transaction. The conditional flag flip
//! makes a double receive impossible even under concurrent requests.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::next_receipt_number;
use till_core::{PaymentStatus, SupplierInvoice, SupplierInvoiceLine};

/// Repository for supplier invoice database operations.
#[derive(Debug, Clone)]
pub struct SupplierInvoiceRepository {
    pool: SqlitePool,
}

impl SupplierInvoiceRepository {
    /// Creates a new SupplierInvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierInvoiceRepository { pool }
    }

    /// Inserts a bill and its lines in one transaction, generating the
    /// bill number. Returns the bill as stored.
    pub async fn create(
        &self,
        mut bill: SupplierInvoice,
        lines: Vec<SupplierInvoiceLine>,
    ) -> DbResult<SupplierInvoice> {
        let mut tx = self.pool.begin().await?;

        bill.bill_number =
            next_receipt_number(&mut tx, "BILL", "supplier_invoices", "bill_number").await?;

        debug!(bill_number = %bill.bill_number, supplier = %bill.supplier_name, "Writing supplier invoice");

        sqlx::query(
            r#"
            INSERT INTO supplier_invoices (
                id, business_id, bill_number, supplier_name, reference,
                status, total_cents, amount_paid_cents, stock_received,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.business_id)
        .bind(&bill.bill_number)
        .bind(&bill.supplier_name)
        .bind(&bill.reference)
        .bind(bill.status.as_str())
        .bind(bill.total_cents)
        .bind(bill.amount_paid_cents)
        .bind(bill.stock_received)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO supplier_invoice_lines (
                    id, supplier_invoice_id, item_id, sku_snapshot, name_snapshot,
                    unit_cost_cents, quantity, line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&line.id)
            .bind(&line.supplier_invoice_id)
            .bind(&line.item_id)
            .bind(&line.sku_snapshot)
            .bind(&line.name_snapshot)
            .bind(line.unit_cost_cents)
            .bind(line.quantity)
            .bind(line.line_total_cents)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(bill)
    }

    /// Gets a supplier invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SupplierInvoice>> {
        let bill = sqlx::query_as::<_, SupplierInvoice>(
            r#"
            SELECT id, business_id, bill_number, supplier_name, reference,
                   status, total_cents, amount_paid_cents, stock_received,
                   created_at, updated_at
            FROM supplier_invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets all lines for a supplier invoice.
    pub async fn get_lines(&self, supplier_invoice_id: &str) -> DbResult<Vec<SupplierInvoiceLine>> {
        let lines = sqlx::query_as::<_, SupplierInvoiceLine>(
            r#"
            SELECT id, supplier_invoice_id, item_id, sku_snapshot, name_snapshot,
                   unit_cost_cents, quantity, line_total_cents, created_at
            FROM supplier_invoice_lines
            WHERE supplier_invoice_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(supplier_invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists the most recent supplier invoices.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<SupplierInvoice>> {
        let bills = sqlx::query_as::<_, SupplierInvoice>(
            r#"
            SELECT id, business_id, bill_number, supplier_name, reference,
                   status, total_cents, amount_paid_cents, stock_received,
                   created_at, updated_at
            FROM supplier_invoices
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Lists the most recent supplier invoices in one payment status.
    pub async fn list_by_status(
        &self,
        status: PaymentStatus,
        limit: u32,
    ) -> DbResult<Vec<SupplierInvoice>> {
        let bills = sqlx::query_as::<_, SupplierInvoice>(
            r#"
            SELECT id, business_id, bill_number, supplier_name, reference,
                   status, total_cents, amount_paid_cents, stock_received,
                   created_at, updated_at
            FROM supplier_invoices
            WHERE status = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Stores a new paid amount and the status derived from it.
    pub async fn update_payment(
        &self,
        id: &str,
        amount_paid_cents: i64,
        status: PaymentStatus,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE supplier_invoices
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
            return Err(DbError::not_found("Supplier invoice", id));
        }

        Ok(())
    }

    /// Receives the billed quantities into item stock and flags the bill.
    ///
    /// The flag flip is conditional on `stock_received = 0`, so the stock
    /// additions can apply at most once per bill.
    pub async fn receive_stock(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let flagged = sqlx::query(
            r#"
            UPDATE supplier_invoices
            SET stock_received = 1, updated_at = ?2
            WHERE id = ?1 AND stock_received = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if flagged.rows_affected() == 0 {
            return Err(DbError::not_found("Unreceived supplier invoice", id));
        }

        let lines = sqlx::query_as::<_, SupplierInvoiceLine>(
            r#"
            SELECT id, supplier_invoice_id, item_id, sku_snapshot, name_snapshot,
                   unit_cost_cents, quantity, line_total_cents, created_at
            FROM supplier_invoice_lines
            WHERE supplier_invoice_id = ?1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for line in &lines {
            let result = sqlx::query(
                r#"
                UPDATE items
                SET quantity = quantity + ?2, updated_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(&line.item_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Item", &line.item_id));
            }
        }

        debug!(id = %id, lines = lines.len(), "Received supplier stock");

        tx.commit().await?;

        Ok(())
    }
}

/// Helper to generate a new supplier invoice ID.
pub fn generate_bill_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
