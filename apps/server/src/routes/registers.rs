//! # Register Routes
//!
//! Sale sessions and their carts. A session pins a catalog snapshot taken
//! when it opens; cart math runs against that snapshot in memory, and only
//! checkout touches the database again.
//!
//! Session state lives behind a sync lock, so every handler here does its
//! in-memory work in a closure and its database work outside it.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use till_core::validation::validate_register_id;
use till_core::{CartLine, SaleSession};

use crate::error::ApiError;
use crate::routes::invoices::InvoiceDto;
use crate::state::AppState;

pub fn router() -> Router {
    Router::new()
        .route(
            "/:register/session",
            post(open_session).delete(close_session),
        )
        .route("/:register/cart", get(get_cart))
        .route("/:register/cart/items", post(add_item))
        .route(
            "/:register/cart/items/:sku",
            put(update_line).delete(remove_line),
        )
        .route("/:register/cart/payment", post(set_payment))
        .route("/:register/checkout", post(checkout))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub register: String,
    pub catalog_size: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl From<&CartLine> for CartLineDto {
    fn from(line: &CartLine) -> Self {
        CartLineDto {
            sku: line.sku.clone(),
            name: line.name.clone(),
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            line_total_cents: line.line_total().cents(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    pub register: String,
    pub lines: Vec<CartLineDto>,
    pub units: i64,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub remaining_due_cents: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub sku: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPaymentRequest {
    pub amount_cents: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/registers/{register}/session
///
/// Opens a session over a snapshot of the active catalog. Re-opening an
/// already-open register discards its cart and takes a fresh snapshot.
async fn open_session(
    Extension(state): Extension<Arc<AppState>>,
    Path(register): Path<String>,
) -> Result<(StatusCode, Json<SessionDto>), ApiError> {
    validate_register_id(&register)?;

    let catalog = state.db.items().list_all_active().await?;
    let catalog_size = catalog.len();
    state.registers.open(&register, SaleSession::new(catalog));

    tracing::info!(register, catalog_size, "register session opened");
    Ok((
        StatusCode::CREATED,
        Json(SessionDto {
            register,
            catalog_size,
        }),
    ))
}

/// DELETE /api/registers/{register}/session
async fn close_session(
    Extension(state): Extension<Arc<AppState>>,
    Path(register): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registers.close(&register)?;
    tracing::info!(register, "register session closed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/registers/{register}/cart
async fn get_cart(
    Extension(state): Extension<Arc<AppState>>,
    Path(register): Path<String>,
) -> Result<Json<CartDto>, ApiError> {
    let dto = state
        .registers
        .with_session(&register, |session| Ok(cart_dto(&register, session)))?;
    Ok(Json(dto))
}

/// POST /api/registers/{register}/cart/items
///
/// Adds one unit of the SKU, or bumps the existing line by one.
async fn add_item(
    Extension(state): Extension<Arc<AppState>>,
    Path(register): Path<String>,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartDto>, ApiError> {
    let dto = state.registers.with_session(&register, |session| {
        session.add_item(body.sku.trim())?;
        Ok(cart_dto(&register, session))
    })?;
    Ok(Json(dto))
}

/// PUT /api/registers/{register}/cart/items/{sku}
///
/// Sets a line's quantity outright; zero removes the line.
async fn update_line(
    Extension(state): Extension<Arc<AppState>>,
    Path((register, sku)): Path<(String, String)>,
    Json(body): Json<UpdateLineRequest>,
) -> Result<Json<CartDto>, ApiError> {
    let dto = state.registers.with_session(&register, |session| {
        session.update_quantity(&sku, body.quantity)?;
        Ok(cart_dto(&register, session))
    })?;
    Ok(Json(dto))
}

/// DELETE /api/registers/{register}/cart/items/{sku}
async fn remove_line(
    Extension(state): Extension<Arc<AppState>>,
    Path((register, sku)): Path<(String, String)>,
) -> Result<Json<CartDto>, ApiError> {
    let dto = state.registers.with_session(&register, |session| {
        session.remove_line(&sku)?;
        Ok(cart_dto(&register, session))
    })?;
    Ok(Json(dto))
}

/// POST /api/registers/{register}/cart/payment
///
/// Records what the customer is handing over for this sale. May be less
/// than the total; checkout then produces a partial or unpaid invoice.
async fn set_payment(
    Extension(state): Extension<Arc<AppState>>,
    Path(register): Path<String>,
    Json(body): Json<SetPaymentRequest>,
) -> Result<Json<CartDto>, ApiError> {
    let dto = state.registers.with_session(&register, |session| {
        session.set_amount_paid(body.amount_cents)?;
        Ok(cart_dto(&register, session))
    })?;
    Ok(Json(dto))
}

/// POST /api/registers/{register}/checkout
///
/// Commits the sale: one transaction writes the invoice, its lines, and
/// the stock decrements, failing whole if any line lacks stock. On success
/// the session stays open with an empty cart over a fresh snapshot.
async fn checkout(
    Extension(state): Extension<Arc<AppState>>,
    Path(register): Path<String>,
) -> Result<(StatusCode, Json<InvoiceDto>), ApiError> {
    let draft = state
        .registers
        .with_session(&register, |session| Ok(session.checkout_draft()?))?;

    let invoice = state.db.invoices().create_from_checkout(&draft).await?;

    // The snapshot the cart was built on is stale now that stock moved;
    // reload before the next sale starts.
    let catalog = state.db.items().list_all_active().await?;
    state.registers.open(&register, SaleSession::new(catalog));

    tracing::info!(
        register,
        invoice_number = %invoice.invoice_number,
        total_cents = invoice.total_cents,
        status = invoice.status.as_str(),
        "checkout committed"
    );
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

fn cart_dto(register: &str, session: &SaleSession) -> CartDto {
    let totals = session.totals();
    CartDto {
        register: register.to_string(),
        lines: session.lines().iter().map(CartLineDto::from).collect(),
        units: totals.units,
        total_cents: totals.total_cents,
        amount_paid_cents: totals.amount_paid_cents,
        remaining_due_cents: totals.remaining_due_cents,
    }
}
