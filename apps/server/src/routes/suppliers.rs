//! # Supplier Invoice Routes
//!
//! Bills from suppliers: money the shop owes, and stock on its way in.
//! Receiving the billed quantities into inventory is its own step so a bill
//! can be recorded before the truck arrives; `receiveImmediately` covers
//! the common case where goods and bill show up together.

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use till_core::validation::{
    validate_paid_amount, validate_payment_amount, validate_quantity, validate_required_name,
};
use till_core::{PaymentStatus, SupplierInvoice, SupplierInvoiceLine, DEFAULT_BUSINESS_ID};

use crate::error::{ApiError, ErrorCode};
use crate::routes::invoices::{parse_status_filter, ListInvoicesQuery};
use crate::state::AppState;

/// How many bills list responses are capped at.
const LIST_LIMIT: u32 = 100;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_bill).get(list_bills))
        .route("/:id", get(get_bill))
        .route("/:id/payments", post(record_payment))
        .route("/:id/receive", post(receive_stock))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub supplier_name: String,
    /// The supplier's own invoice number, if they gave one.
    pub reference: Option<String>,
    pub lines: Vec<BillLineRequest>,
    /// Amount already paid when recording the bill (e.g. cash on delivery).
    #[serde(default)]
    pub amount_paid_cents: i64,
    /// Apply the billed quantities to stock as part of creation.
    #[serde(default)]
    pub receive_immediately: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLineRequest {
    pub sku: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDto {
    pub id: String,
    pub bill_number: String,
    pub supplier_name: String,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_due_cents: i64,
    pub stock_received: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupplierInvoice> for BillDto {
    fn from(bill: SupplierInvoice) -> Self {
        let remaining_due_cents = bill.remaining_due().cents();
        BillDto {
            id: bill.id,
            bill_number: bill.bill_number,
            supplier_name: bill.supplier_name,
            reference: bill.reference,
            status: bill.status,
            total_cents: bill.total_cents,
            amount_paid_cents: bill.amount_paid_cents,
            remaining_due_cents,
            stock_received: bill.stock_received,
            created_at: bill.created_at,
            updated_at: bill.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLineDto {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub unit_cost_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl From<SupplierInvoiceLine> for BillLineDto {
    fn from(line: SupplierInvoiceLine) -> Self {
        BillLineDto {
            item_id: line.item_id,
            sku: line.sku_snapshot,
            name: line.name_snapshot,
            unit_cost_cents: line.unit_cost_cents,
            quantity: line.quantity,
            line_total_cents: line.line_total_cents,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDetailDto {
    #[serde(flatten)]
    pub bill: BillDto,
    pub lines: Vec<BillLineDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPaymentRequest {
    pub amount_cents: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/supplier-invoices
async fn create_bill(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<BillDetailDto>), ApiError> {
    validate_required_name("supplier name", &body.supplier_name, 200)?;
    validate_paid_amount(body.amount_paid_cents)?;
    if body.lines.is_empty() {
        return Err(ApiError::validation("a bill needs at least one line"));
    }

    let now = Utc::now();
    let bill_id = Uuid::new_v4().to_string();

    // Lines reference items by SKU; inactive items are fine (the stock may
    // be coming back), unknown SKUs are not.
    let mut lines = Vec::with_capacity(body.lines.len());
    let mut total_cents = 0i64;
    for line in &body.lines {
        validate_quantity(line.quantity)?;
        if line.unit_cost_cents < 0 {
            return Err(ApiError::validation("unitCostCents must be non-negative"));
        }

        let item = state
            .db
            .items()
            .get_by_sku(line.sku.trim())
            .await?
            .ok_or_else(|| ApiError::not_found("Item", &line.sku))?;

        let line_total_cents = line.unit_cost_cents * line.quantity;
        total_cents += line_total_cents;
        lines.push(SupplierInvoiceLine {
            id: Uuid::new_v4().to_string(),
            supplier_invoice_id: bill_id.clone(),
            item_id: item.id,
            sku_snapshot: item.sku,
            name_snapshot: item.name,
            unit_cost_cents: line.unit_cost_cents,
            quantity: line.quantity,
            line_total_cents,
            created_at: now,
        });
    }

    if body.amount_paid_cents > total_cents {
        return Err(ApiError::new(
            ErrorCode::PaymentError,
            format!(
                "Initial payment of {} exceeds the bill total of {total_cents}",
                body.amount_paid_cents
            ),
        ));
    }

    let bill = SupplierInvoice {
        id: bill_id,
        business_id: DEFAULT_BUSINESS_ID.to_string(),
        bill_number: String::new(), // assigned by the repository
        supplier_name: body.supplier_name.trim().to_string(),
        reference: body.reference.clone(),
        status: PaymentStatus::from_amounts(body.amount_paid_cents, total_cents),
        total_cents,
        amount_paid_cents: body.amount_paid_cents,
        stock_received: false,
        created_at: now,
        updated_at: now,
    };

    let stored = state.db.suppliers().create(bill, lines).await?;

    if body.receive_immediately {
        state.db.suppliers().receive_stock(&stored.id).await?;
    }

    tracing::info!(
        bill_number = %stored.bill_number,
        supplier = %stored.supplier_name,
        total_cents,
        received = body.receive_immediately,
        "supplier bill recorded"
    );

    let detail = fetch_detail(&state, &stored.id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/supplier-invoices?status=
async fn list_bills(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<BillDto>>, ApiError> {
    let bills = match parse_status_filter(params.status.as_deref())? {
        Some(status) => {
            state
                .db
                .suppliers()
                .list_by_status(status, LIST_LIMIT)
                .await?
        }
        None => state.db.suppliers().list_recent(LIST_LIMIT).await?,
    };

    Ok(Json(bills.into_iter().map(BillDto::from).collect()))
}

/// GET /api/supplier-invoices/{id}
async fn get_bill(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BillDetailDto>, ApiError> {
    let detail = fetch_detail(&state, &id).await?;
    Ok(Json(detail))
}

/// POST /api/supplier-invoices/{id}/payments
async fn record_payment(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<BillPaymentRequest>,
) -> Result<Json<BillDto>, ApiError> {
    validate_payment_amount(body.amount_cents)?;

    let bill = fetch_bill(&state, &id).await?;
    let new_paid = bill.amount_paid_cents + body.amount_cents;
    if new_paid > bill.total_cents {
        return Err(ApiError::new(
            ErrorCode::PaymentError,
            format!(
                "Payment of {} exceeds the {} outstanding on {}",
                body.amount_cents,
                bill.remaining_due().cents(),
                bill.bill_number
            ),
        ));
    }

    let status = PaymentStatus::from_amounts(new_paid, bill.total_cents);
    state
        .db
        .suppliers()
        .update_payment(&id, new_paid, status)
        .await?;

    let updated = fetch_bill(&state, &id).await?;
    Ok(Json(updated.into()))
}

/// POST /api/supplier-invoices/{id}/receive
///
/// One-shot: a bill whose stock already landed cannot land it again.
async fn receive_stock(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BillDto>, ApiError> {
    let bill = fetch_bill(&state, &id).await?;
    if bill.stock_received {
        return Err(ApiError::new(
            ErrorCode::ValidationError,
            format!("Stock for {} has already been received", bill.bill_number),
        ));
    }

    state.db.suppliers().receive_stock(&id).await?;

    let updated = fetch_bill(&state, &id).await?;
    Ok(Json(updated.into()))
}

async fn fetch_bill(state: &AppState, id: &str) -> Result<SupplierInvoice, ApiError> {
    state
        .db
        .suppliers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier invoice", id))
}

async fn fetch_detail(state: &AppState, id: &str) -> Result<BillDetailDto, ApiError> {
    let bill = fetch_bill(state, id).await?;
    let lines = state.db.suppliers().get_lines(id).await?;
    Ok(BillDetailDto {
        bill: bill.into(),
        lines: lines.into_iter().map(BillLineDto::from).collect(),
    })
}
