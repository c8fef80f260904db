//! # Business Repository
//!
//! Database operations for the business, its branches, and employees.
//!
//! ## Replace-Style Writes
//! The onboarding stepper lets users go back and resubmit a step. Branch
//! and employee writes therefore replace the whole set for the business
//! instead of appending, which makes a resubmit idempotent. Employees keep
//! a nullable branch reference that drops to NULL if their branch goes
//! away in a replace.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Branch, Business, Employee};

/// Repository for business, branch, and employee operations.
#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: SqlitePool,
}

impl BusinessRepository {
    /// Creates a new BusinessRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BusinessRepository { pool }
    }

    /// Gets the business row, if onboarding has written one.
    pub async fn get(&self, id: &str) -> DbResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT id, name, owner_name, phone, email, address, currency_code,
                   onboarded_at, created_at, updated_at
            FROM businesses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(business)
    }

    /// Inserts the business, or updates its editable fields if the row
    /// already exists. `onboarded_at` and `created_at` are never touched
    /// by an upsert; completion goes through [`Self::mark_onboarded`].
    pub async fn upsert(&self, business: &Business) -> DbResult<()> {
        debug!(id = %business.id, name = %business.name, "Upserting business");

        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, owner_name, phone, email, address, currency_code,
                onboarded_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                owner_name = excluded.owner_name,
                phone = excluded.phone,
                email = excluded.email,
                address = excluded.address,
                currency_code = excluded.currency_code,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.owner_name)
        .bind(&business.phone)
        .bind(&business.email)
        .bind(&business.address)
        .bind(&business.currency_code)
        .bind(business.onboarded_at)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stamps the business as onboarded.
    pub async fn mark_onboarded(
        &self,
        id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE businesses SET onboarded_at = ?2, updated_at = ?2 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Business", id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Branches
    // -------------------------------------------------------------------------

    /// Replaces the business's branch set in one transaction.
    pub async fn replace_branches(
        &self,
        business_id: &str,
        branches: &[Branch],
    ) -> DbResult<()> {
        debug!(business_id = %business_id, count = branches.len(), "Replacing branches");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM branches WHERE business_id = ?1")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        for branch in branches {
            sqlx::query(
                r#"
                INSERT INTO branches (id, business_id, name, address, phone, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&branch.id)
            .bind(&branch.business_id)
            .bind(&branch.name)
            .bind(&branch.address)
            .bind(&branch.phone)
            .bind(branch.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Lists branches for a business, oldest first.
    pub async fn list_branches(&self, business_id: &str) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, business_id, name, address, phone, created_at
            FROM branches
            WHERE business_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(branches)
    }

    // -------------------------------------------------------------------------
    // Employees
    // -------------------------------------------------------------------------

    /// Replaces the business's employee roster in one transaction.
    pub async fn replace_employees(
        &self,
        business_id: &str,
        employees: &[Employee],
    ) -> DbResult<()> {
        debug!(business_id = %business_id, count = employees.len(), "Replacing employees");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM employees WHERE business_id = ?1")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        for employee in employees {
            sqlx::query(
                r#"
                INSERT INTO employees (id, business_id, branch_id, name, role, phone, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&employee.id)
            .bind(&employee.business_id)
            .bind(&employee.branch_id)
            .bind(&employee.name)
            .bind(employee.role.as_str())
            .bind(&employee.phone)
            .bind(employee.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Lists employees for a business, oldest first.
    pub async fn list_employees(&self, business_id: &str) -> DbResult<Vec<Employee>> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, business_id, branch_id, name, role, phone, created_at
            FROM employees
            WHERE business_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(employees)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
