//! # HTTP Routes
//!
//! One module per resource; each exposes a `router()` that the top-level
//! builder nests under its path prefix. Handlers stay thin: decode the
//! request, call core/db, encode the response, and let `ApiError` carry
//! every failure to the wire.
//!
//! ## Route Map
//! ```text
//! GET    /health
//!
//! GET    /api/onboarding                       current step + collected data
//! POST   /api/onboarding/business              step 1
//! POST   /api/onboarding/branches              step 2
//! POST   /api/onboarding/subscription          step 3
//! POST   /api/onboarding/employees             step 4 (completes)
//! POST   /api/onboarding/back                  previous step
//!
//! POST   /api/items                            create catalog item
//! GET    /api/items?query=&include_inactive=   list / search
//! GET    /api/items/{sku}
//! PUT    /api/items/{sku}                      rename / reprice
//! POST   /api/items/{sku}/stock                signed stock delta
//! DELETE /api/items/{sku}                      soft delete
//! POST   /api/items/{sku}/image                upload image bytes
//! GET    /media/{name}                         serve stored image
//!
//! POST   /api/registers/{register}/session     open with catalog snapshot
//! DELETE /api/registers/{register}/session     abandon
//! GET    /api/registers/{register}/cart
//! POST   /api/registers/{register}/cart/items
//! PUT    /api/registers/{register}/cart/items/{sku}
//! DELETE /api/registers/{register}/cart/items/{sku}
//! POST   /api/registers/{register}/cart/payment
//! POST   /api/registers/{register}/checkout
//!
//! GET    /api/invoices?status=
//! GET    /api/invoices/{id}                    with lines
//! POST   /api/invoices/{id}/payments
//!
//! POST   /api/supplier-invoices
//! GET    /api/supplier-invoices?status=
//! GET    /api/supplier-invoices/{id}           with lines
//! POST   /api/supplier-invoices/{id}/payments
//! POST   /api/supplier-invoices/{id}/receive
//!
//! GET    /api/subscription
//! POST   /api/subscription/renew
//! ```

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use crate::state::AppState;

pub mod health;
pub mod invoices;
pub mod items;
pub mod media;
pub mod onboarding;
pub mod registers;
pub mod subscription;
pub mod suppliers;

/// Builds the full router with shared state attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/onboarding", onboarding::router())
        .nest("/api/items", items::router())
        .nest("/api/registers", registers::router())
        .nest("/api/invoices", invoices::router())
        .nest("/api/supplier-invoices", suppliers::router())
        .nest("/api/subscription", subscription::router())
        .route("/media/:name", get(media::serve))
        .layer(Extension(state))
}
