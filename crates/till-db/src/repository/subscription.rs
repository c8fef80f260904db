//! # Subscription Repository
//!
//! Database operations for the business subscription. One row per business;
//! status and days-remaining are derived in core from `expires_at`, never
//! stored.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use till_core::Subscription;

/// Repository for subscription database operations.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubscriptionRepository { pool }
    }

    /// Gets the subscription for a business, if one has been chosen.
    pub async fn get_for_business(&self, business_id: &str) -> DbResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, business_id, plan, started_at, expires_at, updated_at
            FROM subscriptions
            WHERE business_id = ?1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Inserts the subscription, or updates plan and expiry if the business
    /// already has one. The original `started_at` is kept on update.
    pub async fn upsert(&self, subscription: &Subscription) -> DbResult<()> {
        debug!(
            business_id = %subscription.business_id,
            plan = %subscription.plan.as_str(),
            "Upserting subscription"
        );

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, business_id, plan, started_at, expires_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(business_id) DO UPDATE SET
                plan = excluded.plan,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&subscription.id)
        .bind(&subscription.business_id)
        .bind(subscription.plan.as_str())
        .bind(subscription.started_at)
        .bind(subscription.expires_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use till_core::{Business, SubscriptionPlan, DEFAULT_BUSINESS_ID};
    use uuid::Uuid;

    async fn test_db_with_business() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.business()
            .upsert(&Business {
                id: DEFAULT_BUSINESS_ID.to_string(),
                name: "Corner Mart".to_string(),
                owner_name: "Sara Khan".to_string(),
                phone: "+92-300-1234567".to_string(),
                email: None,
                address: None,
                currency_code: "PKR".to_string(),
                onboarded_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db
    }

    fn test_subscription(plan: SubscriptionPlan, months: i64) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4().to_string(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            plan,
            started_at: now,
            expires_at: now + Duration::days(30 * months),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_fetch() {
        let db = test_db_with_business().await;

        db.subscriptions()
            .upsert(&test_subscription(SubscriptionPlan::Basic, 1))
            .await
            .unwrap();

        let fetched = db
            .subscriptions()
            .get_for_business(DEFAULT_BUSINESS_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.plan, SubscriptionPlan::Basic);
    }

    #[tokio::test]
    async fn test_renewal_keeps_started_at() {
        let db = test_db_with_business().await;

        let original = test_subscription(SubscriptionPlan::Basic, 1);
        db.subscriptions().upsert(&original).await.unwrap();

        let mut renewed = original.clone();
        renewed.id = Uuid::new_v4().to_string();
        renewed.plan = SubscriptionPlan::Standard;
        renewed.started_at = Utc::now() + Duration::days(99);
        renewed.expires_at = original.expires_at + Duration::days(30);
        db.subscriptions().upsert(&renewed).await.unwrap();

        let fetched = db
            .subscriptions()
            .get_for_business(DEFAULT_BUSINESS_ID)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.plan, SubscriptionPlan::Standard);
        assert_eq!(fetched.id, original.id);
        // started_at survives the update; only expiry moved.
        assert_eq!(
            fetched.started_at.timestamp(),
            original.started_at.timestamp()
        );
        assert!(fetched.expires_at > original.expires_at);
    }

    #[tokio::test]
    async fn test_no_subscription_yet() {
        let db = test_db_with_business().await;

        assert!(db
            .subscriptions()
            .get_for_business(DEFAULT_BUSINESS_ID)
            .await
            .unwrap()
            .is_none());
    }
}
