//! # Shared Application State
//!
//! Everything route handlers reach for: the database handle, the media
//! store, the open register sessions, and the onboarding flow.
//!
//! ## State Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    AppState (Arc, via Extension)                        │
//! │                                                                         │
//! │  ┌──────────────┐  ┌───────────────────────┐  ┌─────────────────────┐  │
//! │  │  Database    │  │  RegisterState        │  │  OnboardingState    │  │
//! │  │  (pool,      │  │  Mutex<HashMap<       │  │  Mutex<Onboarding>  │  │
//! │  │   clone-     │  │    register_id,       │  │  (rehydrated from   │  │
//! │  │   cheap)     │  │    SaleSession>>      │  │   the db at boot)   │  │
//! │  └──────────────┘  └───────────────────────┘  └─────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────┐                                                       │
//! │  │  MediaStore  │  item images on disk                                  │
//! │  └──────────────┘                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking Discipline
//! Register sessions and the onboarding flow live behind `std::sync::Mutex`.
//! Every critical section is a short, synchronous state mutation; no lock is
//! ever held across an `.await`. Handlers that need both a session mutation
//! and a database call do them in separate steps (mutate, release, write).

use std::collections::HashMap;
use std::sync::Mutex;

use till_core::{
    BranchDraft, BusinessDraft, EmployeeDraft, Onboarding, SaleSession, DEFAULT_BUSINESS_ID,
};
use till_db::{Database, DbError};

use crate::error::ApiError;
use crate::media::MediaStore;

// =============================================================================
// Register Sessions
// =============================================================================

/// Open sale sessions, one per register/lane.
///
/// A session exists between `POST .../session` and either checkout teardown
/// or `DELETE .../session`; cart routes on a register without one fail.
#[derive(Debug, Default)]
pub struct RegisterState {
    sessions: Mutex<HashMap<String, SaleSession>>,
}

impl RegisterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or re-opens) a session over a fresh catalog snapshot.
    ///
    /// Re-opening an existing register drops its old cart: the snapshot is
    /// only trustworthy at the moment it was taken.
    pub fn open(&self, register: &str, session: SaleSession) {
        self.sessions
            .lock()
            .expect("register lock poisoned")
            .insert(register.to_string(), session);
    }

    /// Closes a register's session, abandoning any cart it held.
    pub fn close(&self, register: &str) -> Result<(), ApiError> {
        self.sessions
            .lock()
            .expect("register lock poisoned")
            .remove(register)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("Register session", register))
    }

    /// Runs a closure against a register's session under the lock.
    ///
    /// The closure must stay synchronous; do database work before or after.
    pub fn with_session<R>(
        &self,
        register: &str,
        f: impl FnOnce(&mut SaleSession) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let mut sessions = self.sessions.lock().expect("register lock poisoned");
        let session = sessions
            .get_mut(register)
            .ok_or_else(|| ApiError::not_found("Register session", register))?;
        f(session)
    }

    /// Number of open sessions (for diagnostics).
    pub fn open_count(&self) -> usize {
        self.sessions.lock().expect("register lock poisoned").len()
    }
}

// =============================================================================
// Onboarding Flow
// =============================================================================

/// The single in-progress (or completed) onboarding flow.
#[derive(Debug)]
pub struct OnboardingState {
    flow: Mutex<Onboarding>,
}

impl OnboardingState {
    pub fn new(flow: Onboarding) -> Self {
        Self {
            flow: Mutex::new(flow),
        }
    }

    /// Runs a closure against the flow under the lock. Synchronous only.
    pub fn with_flow<R>(
        &self,
        f: impl FnOnce(&mut Onboarding) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let mut flow = self.flow.lock().expect("onboarding lock poisoned");
        f(&mut flow)
    }
}

/// Rebuilds the onboarding stepper from whatever previous runs persisted.
///
/// The stepper itself is in-memory; a restart mid-flow lands the user back
/// on the step after the last one that committed.
pub async fn load_onboarding(db: &Database) -> Result<Onboarding, DbError> {
    let business = db.business().get(DEFAULT_BUSINESS_ID).await?;
    let completed = business
        .as_ref()
        .map(|b| b.onboarded_at.is_some())
        .unwrap_or(false);

    let business_draft = business.map(|b| BusinessDraft {
        name: b.name,
        owner_name: b.owner_name,
        phone: b.phone,
        email: b.email,
        address: b.address,
        currency_code: b.currency_code,
    });

    let branches = db.business().list_branches(DEFAULT_BUSINESS_ID).await?;
    let branch_drafts: Vec<BranchDraft> = branches
        .iter()
        .map(|b| BranchDraft {
            name: b.name.clone(),
            address: b.address.clone(),
            phone: b.phone.clone(),
        })
        .collect();

    let plan = db
        .subscriptions()
        .get_for_business(DEFAULT_BUSINESS_ID)
        .await?
        .map(|s| s.plan);

    let employee_drafts: Vec<EmployeeDraft> = db
        .business()
        .list_employees(DEFAULT_BUSINESS_ID)
        .await?
        .into_iter()
        .map(|e| EmployeeDraft {
            name: e.name,
            role: e.role,
            phone: e.phone,
            branch_index: e
                .branch_id
                .and_then(|id| branches.iter().position(|b| b.id == id)),
        })
        .collect();

    Ok(Onboarding::resume(
        business_draft,
        branch_drafts,
        plan,
        employee_drafts,
        completed,
    ))
}

// =============================================================================
// App State
// =============================================================================

/// Shared state handed to every route handler.
#[derive(Debug)]
pub struct AppState {
    pub db: Database,
    pub registers: RegisterState,
    pub onboarding: OnboardingState,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(db: Database, onboarding: Onboarding, media: MediaStore) -> Self {
        Self {
            db,
            registers: RegisterState::new(),
            onboarding: OnboardingState::new(onboarding),
            media,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use till_core::Item;

    fn test_item(sku: &str, quantity: i64) -> Item {
        let now = Utc::now();
        Item {
            id: format!("item-{sku}"),
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            price_cents: 150,
            quantity,
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sessions_are_keyed_by_register() {
        let registers = RegisterState::new();
        registers.open("lane-1", SaleSession::new(vec![test_item("COLA", 5)]));
        registers.open("lane-2", SaleSession::new(vec![test_item("COLA", 5)]));

        registers
            .with_session("lane-1", |session| {
                session.add_item("COLA").map_err(ApiError::from)
            })
            .unwrap();

        // lane-2's shadow stock is untouched by lane-1's cart.
        let lane2_stock = registers
            .with_session("lane-2", |session| Ok(session.shadow_stock("COLA")))
            .unwrap();
        assert_eq!(lane2_stock, Some(5));
    }

    #[test]
    fn test_missing_session_is_not_found() {
        let registers = RegisterState::new();
        let err = registers
            .with_session("lane-9", |_| Ok(()))
            .unwrap_err();
        assert!(err.message.contains("lane-9"));
    }

    #[test]
    fn test_reopen_replaces_session() {
        let registers = RegisterState::new();
        registers.open("lane-1", SaleSession::new(vec![test_item("COLA", 5)]));
        registers
            .with_session("lane-1", |session| {
                session.add_item("COLA").map_err(ApiError::from)
            })
            .unwrap();

        registers.open("lane-1", SaleSession::new(vec![test_item("COLA", 9)]));

        let (len, stock) = registers
            .with_session("lane-1", |session| {
                Ok((session.len(), session.shadow_stock("COLA")))
            })
            .unwrap();
        assert_eq!(len, 0);
        assert_eq!(stock, Some(9));
    }

    #[test]
    fn test_close_requires_open_session() {
        let registers = RegisterState::new();
        assert!(registers.close("lane-1").is_err());

        registers.open("lane-1", SaleSession::new(vec![]));
        assert!(registers.close("lane-1").is_ok());
        assert_eq!(registers.open_count(), 0);
    }

    #[tokio::test]
    async fn test_load_onboarding_from_empty_db() {
        let db = Database::new(till_db::DbConfig::in_memory()).await.unwrap();
        let flow = load_onboarding(&db).await.unwrap();
        assert_eq!(flow.step(), till_core::OnboardingStep::BusinessInfo);
    }
}
