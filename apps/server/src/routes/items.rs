//! # Item Routes
//!
//! Catalog management: create, search, reprice, adjust stock, retire, and
//! attach images. All writes validate in core before touching the database;
//! the unique index on (business_id, sku) backstops duplicate SKUs.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use till_core::validation::{
    validate_item_name, validate_price_cents, validate_search_query, validate_sku,
    validate_stock_level,
};
use till_core::{Item, DEFAULT_BUSINESS_ID};

use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

/// How many items list/search responses are capped at.
const LIST_LIMIT: u32 = 200;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/:sku", get(get_item).put(update_item).delete(delete_item))
        .route("/:sku/stock", post(adjust_stock))
        .route("/:sku/image", post(upload_image))
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemDto {
    fn from(item: Item) -> Self {
        ItemDto {
            id: item.id,
            sku: item.sku,
            name: item.name,
            price_cents: item.price_cents,
            quantity: item.quantity,
            image_url: item.image_url,
            is_active: item.is_active,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustRequest {
    /// Signed change: negative for shrinkage/corrections, positive for
    /// received goods outside a supplier bill.
    pub delta: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/items
async fn create_item(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemDto>), ApiError> {
    validate_sku(&body.sku)?;
    validate_item_name(&body.name)?;
    validate_price_cents(body.price_cents)?;
    validate_stock_level(body.quantity)?;

    let now = Utc::now();
    let item = Item {
        id: Uuid::new_v4().to_string(),
        business_id: DEFAULT_BUSINESS_ID.to_string(),
        sku: body.sku.trim().to_string(),
        name: body.name.trim().to_string(),
        price_cents: body.price_cents,
        quantity: body.quantity,
        image_url: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let stored = state.db.items().insert(&item).await?;
    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// GET /api/items?query=&include_inactive=
async fn list_items(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListItemsQuery>,
) -> Result<Json<Vec<ItemDto>>, ApiError> {
    let query = validate_search_query(params.query.as_deref().unwrap_or(""))?;

    let items = if query.is_empty() {
        state
            .db
            .items()
            .list(params.include_inactive, LIST_LIMIT)
            .await?
    } else {
        // Search covers active items only; stock-take views list instead.
        state.db.items().search(&query, LIST_LIMIT).await?
    };

    Ok(Json(items.into_iter().map(ItemDto::from).collect()))
}

/// GET /api/items/{sku}
async fn get_item(
    Extension(state): Extension<Arc<AppState>>,
    Path(sku): Path<String>,
) -> Result<Json<ItemDto>, ApiError> {
    let item = fetch_by_sku(&state, &sku).await?;
    Ok(Json(item.into()))
}

/// PUT /api/items/{sku}
async fn update_item(
    Extension(state): Extension<Arc<AppState>>,
    Path(sku): Path<String>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<ItemDto>, ApiError> {
    let mut item = fetch_by_sku(&state, &sku).await?;

    if let Some(name) = body.name {
        validate_item_name(&name)?;
        item.name = name.trim().to_string();
    }
    if let Some(price_cents) = body.price_cents {
        validate_price_cents(price_cents)?;
        item.price_cents = price_cents;
    }

    state.db.items().update(&item).await?;

    let updated = fetch_by_sku(&state, &sku).await?;
    Ok(Json(updated.into()))
}

/// POST /api/items/{sku}/stock
async fn adjust_stock(
    Extension(state): Extension<Arc<AppState>>,
    Path(sku): Path<String>,
    Json(body): Json<StockAdjustRequest>,
) -> Result<Json<ItemDto>, ApiError> {
    if body.delta == 0 {
        return Err(ApiError::validation("delta must be non-zero"));
    }

    let item = fetch_by_sku(&state, &sku).await?;

    // Friendly pre-check; the schema's CHECK (quantity >= 0) is the
    // authoritative guard if another writer races this one.
    if item.quantity + body.delta < 0 {
        return Err(ApiError::new(
            ErrorCode::OutOfStock,
            format!(
                "Cannot remove {} units of {}: only {} on hand",
                -body.delta, item.sku, item.quantity
            ),
        ));
    }

    state.db.items().update_stock(&item.id, body.delta).await?;

    let updated = fetch_by_sku(&state, &sku).await?;
    Ok(Json(updated.into()))
}

/// DELETE /api/items/{sku}
async fn delete_item(
    Extension(state): Extension<Arc<AppState>>,
    Path(sku): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item = fetch_by_sku(&state, &sku).await?;
    state.db.items().soft_delete(&item.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/items/{sku}/image
///
/// Body is the raw image bytes; `Content-Type` names the format. The new
/// image replaces any previous one, whose file is removed best-effort.
async fn upload_image(
    Extension(state): Extension<Arc<AppState>>,
    Path(sku): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ItemDto>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::validation("Content-Type header is required"))?;

    let item = fetch_by_sku(&state, &sku).await?;

    let name = state.media.save(content_type, &body).await?;
    let image_url = format!("/media/{name}");
    state
        .db
        .items()
        .set_image_url(&item.id, Some(&image_url))
        .await?;

    // The database points at the new file; the old one is just disk noise.
    if let Some(old_name) = item
        .image_url
        .as_deref()
        .and_then(|url| url.strip_prefix("/media/"))
    {
        state.media.remove(old_name).await;
    }

    let updated = fetch_by_sku(&state, &sku).await?;
    Ok(Json(updated.into()))
}

/// Looks an item up by SKU, translating a miss into NOT_FOUND.
async fn fetch_by_sku(state: &AppState, sku: &str) -> Result<Item, ApiError> {
    state
        .db
        .items()
        .get_by_sku(sku)
        .await?
        .ok_or_else(|| ApiError::not_found("Item", sku))
}
