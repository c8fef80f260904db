//! # Item Repository
//!
//! Database operations for the item catalog.
//!
//! ## Key Operations
//! - Catalog search (SKU and name, case-insensitive LIKE)
//! - CRUD operations with soft delete
//! - Stock updates as deltas
//!
//! ## Stock Delta Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: Absolute update (lost-update prone)                         │
//! │     UPDATE items SET quantity = 7 WHERE id = ?                         │
//! │                                                                         │
//! │  ✅ CORRECT: Delta update                                              │
//! │     UPDATE items SET quantity = quantity - 3 WHERE id = ?              │
//! │                                                                         │
//! │  Register A: sells 3 → quantity - 3                                    │
//! │  Register B: receives 10 → quantity + 10                               │
//! │  Both apply cleanly in either order: -3 + 10 = +7 total               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::{Item, DEFAULT_BUSINESS_ID};

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ItemRepository::new(pool);
///
/// // Search the catalog
/// let results = repo.search("cola", 20).await?;
///
/// // Get by ID
/// let item = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Searches active items by SKU or name.
    ///
    /// An empty query lists active items sorted by name. Otherwise a
    /// case-insensitive substring match over sku and name; fine for the
    /// catalog sizes a single shop carries.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Item>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching items");

        if query.is_empty() {
            return self.list(false, limit).await;
        }

        let pattern = like_pattern(query);

        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, business_id, sku, name, price_cents, quantity,
                   image_url, is_active, created_at, updated_at
            FROM items
            WHERE business_id = ?1
              AND is_active = 1
              AND (sku LIKE ?2 ESCAPE '\' OR name LIKE ?2 ESCAPE '\')
            ORDER BY name
            LIMIT ?3
            "#,
        )
        .bind(DEFAULT_BUSINESS_ID)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Search returned items");
        Ok(items)
    }

    /// Lists items sorted by name. Retired items are hidden unless
    /// `include_inactive` is set (stock-take and audit views want them).
    pub async fn list(&self, include_inactive: bool, limit: u32) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, business_id, sku, name, price_cents, quantity,
                   image_url, is_active, created_at, updated_at
            FROM items
            WHERE business_id = ?1 AND (is_active = 1 OR ?2)
            ORDER BY name
            LIMIT ?3
            "#,
        )
        .bind(DEFAULT_BUSINESS_ID)
        .bind(include_inactive)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists every active item, for loading a register's catalog snapshot.
    pub async fn list_all_active(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, business_id, sku, name, price_cents, quantity,
                   image_url, is_active, created_at, updated_at
            FROM items
            WHERE business_id = ?1 AND is_active = 1
            ORDER BY name
            "#,
        )
        .bind(DEFAULT_BUSINESS_ID)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Item))` - Item found
    /// * `Ok(None)` - Item not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, business_id, sku, name, price_cents, quantity,
                   image_url, is_active, created_at, updated_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an item by its SKU (e.g. "COLA-330").
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, business_id, sku, name, price_cents, quantity,
                   image_url, is_active, created_at, updated_at
            FROM items
            WHERE sku = ?1 AND business_id = ?2
            "#,
        )
        .bind(sku)
        .bind(DEFAULT_BUSINESS_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts a new item.
    ///
    /// ## Returns
    /// * `Ok(Item)` - Inserted item
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, item: &Item) -> DbResult<Item> {
        debug!(sku = %item.sku, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, business_id, sku, name, price_cents, quantity,
                image_url, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.business_id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(item.quantity)
        .bind(&item.image_url)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item.clone())
    }

    /// Updates an existing item's editable fields.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Item doesn't exist
    pub async fn update(&self, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, "Updating item");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items SET
                sku = ?2,
                name = ?3,
                price_cents = ?4,
                quantity = ?5,
                image_url = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(item.quantity)
        .bind(&item.image_url)
        .bind(item.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", &item.id));
        }

        Ok(())
    }

    /// Applies a stock delta (negative for sales, positive for receiving).
    ///
    /// The schema's CHECK (quantity >= 0) rejects a delta that would drive
    /// stock negative; sale paths should use the checkout transaction in
    /// the invoice repository instead, which reports the shortfall.
    pub async fn update_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Stores the media URL for an item's image.
    pub async fn set_image_url(&self, id: &str, image_url: Option<&str>) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items SET image_url = ?2, updated_at = ?3 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(image_url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Soft-deletes an item by setting is_active = false.
    ///
    /// Historical invoice lines still reference the item, and it can be
    /// restored if deleted by mistake.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting item");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items SET is_active = 0, updated_at = ?2 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Counts active items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Builds a `%query%` LIKE pattern with LIKE metacharacters escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Helper to generate a new item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn test_item(sku: &str, name: &str, price_cents: i64, quantity: i64) -> Item {
        let now = Utc::now();
        Item {
            id: generate_item_id(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
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
    async fn test_insert_and_get() {
        let db = test_db().await;
        let item = test_item("COLA-330", "Cola 330ml", 150, 10);

        db.items().insert(&item).await.unwrap();

        let by_id = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "COLA-330");
        assert_eq!(by_id.price_cents, 150);
        assert_eq!(by_id.quantity, 10);

        let by_sku = db.items().get_by_sku("COLA-330").await.unwrap().unwrap();
        assert_eq!(by_sku.id, item.id);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        db.items()
            .insert(&test_item("COLA-330", "Cola", 150, 10))
            .await
            .unwrap();

        let err = db
            .items()
            .insert(&test_item("COLA-330", "Other Cola", 200, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_matches_sku_and_name() {
        let db = test_db().await;
        db.items()
            .insert(&test_item("COLA-330", "Cola 330ml", 150, 10))
            .await
            .unwrap();
        db.items()
            .insert(&test_item("CHIPS-50", "Salted Chips", 250, 6))
            .await
            .unwrap();

        let by_sku = db.items().search("cola", 20).await.unwrap();
        assert_eq!(by_sku.len(), 1);
        assert_eq!(by_sku[0].sku, "COLA-330");

        let by_name = db.items().search("salted", 20).await.unwrap();
        assert_eq!(by_name.len(), 1);

        let all = db.items().search("", 20).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_stock_delta() {
        let db = test_db().await;
        let item = test_item("COLA-330", "Cola", 150, 10);
        db.items().insert(&item).await.unwrap();

        db.items().update_stock(&item.id, -3).await.unwrap();
        db.items().update_stock(&item.id, 5).await.unwrap();

        let fetched = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched.quantity, 12);
    }

    #[tokio::test]
    async fn test_update_stock_cannot_go_negative() {
        let db = test_db().await;
        let item = test_item("COLA-330", "Cola", 150, 2);
        db.items().insert(&item).await.unwrap();

        assert!(db.items().update_stock(&item.id, -5).await.is_err());

        let fetched = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched.quantity, 2);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_search() {
        let db = test_db().await;
        let item = test_item("COLA-330", "Cola", 150, 10);
        db.items().insert(&item).await.unwrap();

        db.items().soft_delete(&item.id).await.unwrap();

        assert!(db.items().search("cola", 20).await.unwrap().is_empty());
        assert!(db.items().list(false, 20).await.unwrap().is_empty());

        // Still reachable for history and stock-take views.
        let listed = db.items().list(true, 20).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_active);
    }

    #[tokio::test]
    async fn test_missing_item_errors() {
        let db = test_db().await;

        assert!(db.items().get_by_id("missing").await.unwrap().is_none());
        assert!(matches!(
            db.items().update_stock("missing", 1).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
