//! # Invoice Routes
//!
//! Read access to sale invoices (checkout creates them, under
//! `/api/registers/{register}/checkout`) plus payment recording for
//! tickets settled after the sale.

use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use till_core::validation::validate_payment_amount;
use till_core::{Invoice, InvoiceLine, PaymentStatus};

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// How many invoices list responses are capped at.
const LIST_LIMIT: u32 = 100;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices))
        .route("/:id", get(get_invoice))
        .route("/:id/payments", post(record_payment))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub id: String,
    pub invoice_number: String,
    pub status: PaymentStatus,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_due_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceDto {
    fn from(invoice: Invoice) -> Self {
        let remaining_due_cents = invoice.remaining_due().cents();
        InvoiceDto {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            status: invoice.status,
            total_cents: invoice.total_cents,
            amount_paid_cents: invoice.amount_paid_cents,
            remaining_due_cents,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineDto {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl From<InvoiceLine> for InvoiceLineDto {
    fn from(line: InvoiceLine) -> Self {
        InvoiceLineDto {
            item_id: line.item_id,
            sku: line.sku_snapshot,
            name: line.name_snapshot,
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            line_total_cents: line.line_total_cents,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailDto {
    #[serde(flatten)]
    pub invoice: InvoiceDto,
    pub lines: Vec<InvoiceLineDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount_cents: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListInvoicesQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// Parses an optional `?status=` filter into the stored enum.
pub(crate) fn parse_status_filter(
    status: Option<&str>,
) -> Result<Option<PaymentStatus>, ApiError> {
    match status {
        None | Some("") => Ok(None),
        Some(s) => PaymentStatus::parse(s).map(Some).ok_or_else(|| {
            ApiError::validation(format!(
                "unknown status '{s}': expected unpaid, partial or paid"
            ))
        }),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/invoices?status=
async fn list_invoices(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceDto>>, ApiError> {
    let invoices = match parse_status_filter(params.status.as_deref())? {
        Some(status) => state.db.invoices().list_by_status(status, LIST_LIMIT).await?,
        None => state.db.invoices().list_recent(LIST_LIMIT).await?,
    };

    Ok(Json(invoices.into_iter().map(InvoiceDto::from).collect()))
}

/// GET /api/invoices/{id}
async fn get_invoice(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceDetailDto>, ApiError> {
    let invoice = fetch_invoice(&state, &id).await?;
    let lines = state.db.invoices().get_lines(&id).await?;

    Ok(Json(InvoiceDetailDto {
        invoice: invoice.into(),
        lines: lines.into_iter().map(InvoiceLineDto::from).collect(),
    }))
}

/// POST /api/invoices/{id}/payments
///
/// Records a payment against an open ticket. Payments accumulate and can
/// never push the paid amount past the total.
async fn record_payment(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<InvoiceDto>, ApiError> {
    validate_payment_amount(body.amount_cents)?;

    let invoice = fetch_invoice(&state, &id).await?;
    let new_paid = invoice.amount_paid_cents + body.amount_cents;
    if new_paid > invoice.total_cents {
        return Err(ApiError::new(
            ErrorCode::PaymentError,
            format!(
                "Payment of {} exceeds the {} outstanding on {}",
                body.amount_cents,
                invoice.remaining_due().cents(),
                invoice.invoice_number
            ),
        ));
    }

    let status = PaymentStatus::from_amounts(new_paid, invoice.total_cents);
    state
        .db
        .invoices()
        .update_payment(&id, new_paid, status)
        .await?;

    let updated = fetch_invoice(&state, &id).await?;
    Ok(Json(updated.into()))
}

async fn fetch_invoice(state: &AppState, id: &str) -> Result<Invoice, ApiError> {
    state
        .db
        .invoices()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", id))
}
