//! # Till Server
//!
//! The HTTP API over the Till point-of-sale engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           till-server                                   │
//! │                                                                         │
//! │  Client ───► axum router ───► route handlers ───► AppState             │
//! │                                                       │                 │
//! │                              ┌────────────────────────┼──────────────┐  │
//! │                              ▼                        ▼              ▼  │
//! │                         till-core               till-db         media/ │
//! │                      (carts, onboarding,     (SQLite pool,    (images) │
//! │                       validation, money)      repositories)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The library target exists so integration tests can build the router
//! in-process; the binary in `main.rs` is the thin startup path around it.

pub mod config;
pub mod error;
pub mod media;
pub mod routes;
pub mod state;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
/// - Default: INFO level
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
