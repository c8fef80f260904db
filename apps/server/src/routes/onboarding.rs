//! # Onboarding Routes
//!
//! The business-setup stepper over HTTP. Each POST submits one step; the
//! machine in [`crate::state::OnboardingState`] enforces the order.
//!
//! ## Persist-Then-Advance
//! ```text
//! POST /api/onboarding/business
//!     │
//!     ├── lock flow, check payload against the current step   (sync)
//!     ├── write the rows for this step                        (await, no lock)
//!     └── lock flow, submit payload, advance                  (sync)
//!
//! A failed write leaves the machine on the same step, so the client can
//! simply retry; a resubmit replaces the step's rows (replace-style writes
//! in the business repository).
//! ```

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use till_core::{
    Branch, BranchDraft, Business, BusinessDraft, Employee, EmployeeDraft, EmployeeRole,
    SubscriptionPlan, DEFAULT_BUSINESS_ID,
};

use crate::error::ApiError;
use crate::routes::subscription::{add_months, new_subscription};
use crate::state::AppState;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_state))
        .route("/business", post(submit_business))
        .route("/branches", post(submit_branches))
        .route("/subscription", post(submit_subscription))
        .route("/employees", post(submit_employees))
        .route("/back", post(go_back))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRequest {
    pub name: String,
    pub owner_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRequest {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub plan: SubscriptionPlan,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRequest {
    pub name: String,
    pub role: EmployeeRole,
    pub phone: Option<String>,
    /// Index into the branch list submitted at step 2.
    pub branch_index: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDto {
    pub name: String,
    pub owner_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub currency_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDto {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub name: String,
    pub role: EmployeeRole,
    pub phone: Option<String>,
    pub branch_index: Option<usize>,
}

/// The whole flow as the client sees it: current step plus everything
/// collected so far, so a stepper UI can render any screen from one GET.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStateDto {
    pub step: String,
    pub complete: bool,
    pub business: Option<BusinessDto>,
    pub branches: Vec<BranchDto>,
    pub plan: Option<SubscriptionPlan>,
    pub employees: Vec<EmployeeDto>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/onboarding
async fn get_state(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<OnboardingStateDto>, ApiError> {
    state_dto(&state)
}

/// POST /api/onboarding/business
async fn submit_business(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<BusinessRequest>,
) -> Result<Json<OnboardingStateDto>, ApiError> {
    let draft = BusinessDraft {
        name: body.name,
        owner_name: body.owner_name,
        phone: body.phone,
        email: body.email,
        address: body.address,
        currency_code: body.currency_code,
    };

    state
        .onboarding
        .with_flow(|flow| flow.check_business(&draft).map_err(ApiError::from))?;

    let now = Utc::now();
    let created_at = state
        .db
        .business()
        .get(DEFAULT_BUSINESS_ID)
        .await?
        .map(|b| b.created_at)
        .unwrap_or(now);

    state
        .db
        .business()
        .upsert(&Business {
            id: DEFAULT_BUSINESS_ID.to_string(),
            name: draft.name.trim().to_string(),
            owner_name: draft.owner_name.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            email: draft.email.clone(),
            address: draft.address.clone(),
            currency_code: draft.currency_code.trim().to_string(),
            onboarded_at: None,
            created_at,
            updated_at: now,
        })
        .await?;

    state
        .onboarding
        .with_flow(|flow| flow.submit_business(draft).map_err(ApiError::from))?;

    state_dto(&state)
}

/// POST /api/onboarding/branches
async fn submit_branches(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<Vec<BranchRequest>>,
) -> Result<Json<OnboardingStateDto>, ApiError> {
    let drafts: Vec<BranchDraft> = body
        .into_iter()
        .map(|b| BranchDraft {
            name: b.name,
            address: b.address,
            phone: b.phone,
        })
        .collect();

    state
        .onboarding
        .with_flow(|flow| flow.check_branches(&drafts).map_err(ApiError::from))?;

    let now = Utc::now();
    let rows: Vec<Branch> = drafts
        .iter()
        .map(|draft| Branch {
            id: Uuid::new_v4().to_string(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            name: draft.name.trim().to_string(),
            address: draft.address.clone(),
            phone: draft.phone.clone(),
            created_at: now,
        })
        .collect();

    state
        .db
        .business()
        .replace_branches(DEFAULT_BUSINESS_ID, &rows)
        .await?;

    state
        .onboarding
        .with_flow(|flow| flow.submit_branches(drafts).map_err(ApiError::from))?;

    state_dto(&state)
}

/// POST /api/onboarding/subscription
async fn submit_subscription(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<SubscriptionRequest>,
) -> Result<Json<OnboardingStateDto>, ApiError> {
    state
        .onboarding
        .with_flow(|flow| flow.check_plan(body.plan).map_err(ApiError::from))?;

    // First term runs one month from the choice; renewals extend it.
    let now = Utc::now();
    let expires_at = add_months(now, 1)?;
    state
        .db
        .subscriptions()
        .upsert(&new_subscription(body.plan, now, expires_at))
        .await?;

    state
        .onboarding
        .with_flow(|flow| flow.choose_plan(body.plan).map_err(ApiError::from))?;

    state_dto(&state)
}

/// POST /api/onboarding/employees
async fn submit_employees(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<Vec<EmployeeRequest>>,
) -> Result<Json<OnboardingStateDto>, ApiError> {
    let drafts: Vec<EmployeeDraft> = body
        .into_iter()
        .map(|e| EmployeeDraft {
            name: e.name,
            role: e.role,
            phone: e.phone,
            branch_index: e.branch_index,
        })
        .collect();

    state
        .onboarding
        .with_flow(|flow| flow.check_employees(&drafts).map_err(ApiError::from))?;

    // Branch indices in the drafts refer to the step-2 list; the stored
    // rows carry real branch ids.
    let branches = state.db.business().list_branches(DEFAULT_BUSINESS_ID).await?;

    let now = Utc::now();
    let rows: Vec<Employee> = drafts
        .iter()
        .map(|draft| Employee {
            id: Uuid::new_v4().to_string(),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            branch_id: draft
                .branch_index
                .and_then(|i| branches.get(i))
                .map(|b| b.id.clone()),
            name: draft.name.trim().to_string(),
            role: draft.role,
            phone: draft.phone.clone(),
            created_at: now,
        })
        .collect();

    state
        .db
        .business()
        .replace_employees(DEFAULT_BUSINESS_ID, &rows)
        .await?;
    state
        .db
        .business()
        .mark_onboarded(DEFAULT_BUSINESS_ID, now)
        .await?;

    state
        .onboarding
        .with_flow(|flow| flow.submit_employees(drafts).map_err(ApiError::from))?;

    state_dto(&state)
}

/// POST /api/onboarding/back
async fn go_back(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<OnboardingStateDto>, ApiError> {
    state
        .onboarding
        .with_flow(|flow| flow.back().map_err(ApiError::from))?;
    state_dto(&state)
}

/// Snapshots the flow into the wire shape.
fn state_dto(state: &AppState) -> Result<Json<OnboardingStateDto>, ApiError> {
    state.onboarding.with_flow(|flow| {
        Ok(Json(OnboardingStateDto {
            step: flow.step().as_str().to_string(),
            complete: flow.is_complete(),
            business: flow.business().map(|b| BusinessDto {
                name: b.name.clone(),
                owner_name: b.owner_name.clone(),
                phone: b.phone.clone(),
                email: b.email.clone(),
                address: b.address.clone(),
                currency_code: b.currency_code.clone(),
            }),
            branches: flow
                .branches()
                .iter()
                .map(|b| BranchDto {
                    name: b.name.clone(),
                    address: b.address.clone(),
                    phone: b.phone.clone(),
                })
                .collect(),
            plan: flow.plan(),
            employees: flow
                .employees()
                .iter()
                .map(|e| EmployeeDto {
                    name: e.name.clone(),
                    role: e.role,
                    phone: e.phone.clone(),
                    branch_index: e.branch_index,
                })
                .collect(),
        }))
    })
}
