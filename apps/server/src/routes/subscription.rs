//! # Subscription Routes
//!
//! The business's plan and term. Status is derived from the expiry at read
//! time and never enforced on POS operations; an expired shop keeps selling
//! and the client decides what to nag about.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use till_core::validation::validate_renewal_months;
use till_core::{Subscription, SubscriptionPlan, SubscriptionStatus, DEFAULT_BUSINESS_ID};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_subscription))
        .route("/renew", post(renew))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub days_remaining: i64,
    pub monthly_price_cents: i64,
    /// None means the plan has no branch cap.
    pub max_branches: Option<u32>,
}

impl SubscriptionDto {
    fn from_subscription(sub: &Subscription, at: DateTime<Utc>) -> Self {
        SubscriptionDto {
            plan: sub.plan,
            status: sub.status_at(at),
            started_at: sub.started_at,
            expires_at: sub.expires_at,
            days_remaining: sub.days_remaining_at(at),
            monthly_price_cents: sub.plan.monthly_price_cents(),
            max_branches: sub.plan.max_branches(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewRequest {
    pub months: u32,
    /// Optional plan change applying to the renewed term.
    pub plan: Option<SubscriptionPlan>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/subscription
async fn get_subscription(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<SubscriptionDto>, ApiError> {
    let sub = fetch_subscription(&state).await?;
    Ok(Json(SubscriptionDto::from_subscription(&sub, Utc::now())))
}

/// POST /api/subscription/renew
///
/// Extends the term by N calendar months from `max(now, current expiry)`:
/// renewing early adds time on top of what is left, renewing after expiry
/// restarts from now.
async fn renew(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<RenewRequest>,
) -> Result<Json<SubscriptionDto>, ApiError> {
    validate_renewal_months(body.months)?;

    let current = fetch_subscription(&state).await?;
    let plan = body.plan.unwrap_or(current.plan);

    if plan != current.plan {
        let branches = state
            .db
            .business()
            .list_branches(DEFAULT_BUSINESS_ID)
            .await?;
        if !plan.allows_branches(branches.len()) {
            return Err(till_core::CoreError::PlanLimitExceeded {
                plan: plan.as_str().to_string(),
                max_branches: plan.max_branches().unwrap_or(0),
                branches: branches.len(),
            }
            .into());
        }
    }

    let now = Utc::now();
    let base = current.expires_at.max(now);
    let expires_at = add_months(base, body.months)?;

    // The upsert keeps started_at; only plan and expiry move.
    state
        .db
        .subscriptions()
        .upsert(&new_subscription(plan, now, expires_at))
        .await?;

    let renewed = fetch_subscription(&state).await?;
    Ok(Json(SubscriptionDto::from_subscription(&renewed, now)))
}

async fn fetch_subscription(state: &AppState) -> Result<Subscription, ApiError> {
    state
        .db
        .subscriptions()
        .get_for_business(DEFAULT_BUSINESS_ID)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription", DEFAULT_BUSINESS_ID))
}

// =============================================================================
// Helpers shared with onboarding
// =============================================================================

/// Builds a subscription row for the default business. `started_at` only
/// matters on first insert; the repository upsert keeps the original.
pub(crate) fn new_subscription(
    plan: SubscriptionPlan,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Subscription {
    Subscription {
        id: Uuid::new_v4().to_string(),
        business_id: DEFAULT_BUSINESS_ID.to_string(),
        plan,
        started_at: now,
        expires_at,
        updated_at: now,
    }
}

/// Calendar-month addition (Jan 31 + 1 month clamps to Feb 28/29).
pub(crate) fn add_months(at: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, ApiError> {
    at.checked_add_months(chrono::Months::new(months))
        .ok_or_else(|| ApiError::internal("Subscription expiry out of range"))
}

// =============================================================================
// Unit Tests
// =============================================================================
