//! # Repository Module
//!
//! Database repository implementations for Till.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  HTTP Handler                                                          │
//! │       │                                                                 │
//! │       │  db.items().search("cola", 20)                                 │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ItemRepository                                                        │
//! │  ├── search(&self, query, limit)                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, item)                                               │
//! │  └── update(&self, item)                                               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                        │
//! │  • Handlers stay thin                                                  │
//! │  • Transactions live next to the queries they protect                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - Item catalog CRUD, search, stock deltas
//! - [`invoice::InvoiceRepository`] - Checkout commit and invoice queries
//! - [`supplier::SupplierInvoiceRepository`] - Supplier bills and stock receipt
//! - [`business::BusinessRepository`] - Business, branches, employees
//! - [`subscription::SubscriptionRepository`] - Subscription state

pub mod business;
pub mod invoice;
pub mod item;
pub mod subscription;
pub mod supplier;
