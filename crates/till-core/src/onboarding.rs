//! # Onboarding Module
//!
//! Stepper state machine for setting up a new business.
//!
//! ## Step Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Onboarding Stepper                                 │
//! │                                                                         │
//! │  BusinessInfo ──► Branches ──► Plan ──► Employees ──► Complete         │
//! │       ▲              │           │          │                           │
//! │       └──── back ────┴── back ───┴── back ──┘                           │
//! │                                                                         │
//! │  Each submit validates, persists, then advances. A step out of order   │
//! │  is rejected with the step the machine is actually on.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Submitted data stays in the machine when the user goes back, so a
//! resubmit after editing replaces rather than duplicates. The plan is
//! chosen after branches, which lets plan limits be checked against the
//! real branch count instead of a promise.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{EmployeeRole, SubscriptionPlan};
use crate::validation::{
    validate_currency_code, validate_email, validate_phone, validate_required_name,
};
use crate::{MAX_BRANCHES, MAX_EMPLOYEES};

// =============================================================================
// Steps
// =============================================================================

/// Where the stepper currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    BusinessInfo,
    Branches,
    Plan,
    Employees,
    Complete,
}

impl OnboardingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStep::BusinessInfo => "business_info",
            OnboardingStep::Branches => "branches",
            OnboardingStep::Plan => "plan",
            OnboardingStep::Employees => "employees",
            OnboardingStep::Complete => "complete",
        }
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// Business details collected on the first step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDraft {
    pub name: String,
    pub owner_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub currency_code: String,
}

/// One branch row collected on the second step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDraft {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// One employee row collected on the final step.
///
/// Branches have no IDs until they are persisted, so an employee points
/// at a branch by its position in the submitted branch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub name: String,
    pub role: EmployeeRole,
    pub phone: Option<String>,
    pub branch_index: Option<usize>,
}

// =============================================================================
// State Machine
// =============================================================================

/// The onboarding stepper.
///
/// `check_*` methods validate a payload against the current step without
/// changing anything; `submit_*` methods validate, store the payload, and
/// advance. Callers that persist externally run check, write, then submit,
/// so a failed write never advances the machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Onboarding {
    step: OnboardingStep,
    business: Option<BusinessDraft>,
    branches: Vec<BranchDraft>,
    plan: Option<SubscriptionPlan>,
    employees: Vec<EmployeeDraft>,
}

impl Default for Onboarding {
    fn default() -> Self {
        Self::new()
    }
}

impl Onboarding {
    /// Fresh machine at the first step.
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::BusinessInfo,
            business: None,
            branches: Vec::new(),
            plan: None,
            employees: Vec::new(),
        }
    }

    /// Rebuilds the machine from persisted state, deriving the step from
    /// how far the stored data got.
    pub fn resume(
        business: Option<BusinessDraft>,
        branches: Vec<BranchDraft>,
        plan: Option<SubscriptionPlan>,
        employees: Vec<EmployeeDraft>,
        completed: bool,
    ) -> Self {
        let step = if completed {
            OnboardingStep::Complete
        } else if plan.is_some() {
            OnboardingStep::Employees
        } else if !branches.is_empty() {
            OnboardingStep::Plan
        } else if business.is_some() {
            OnboardingStep::Branches
        } else {
            OnboardingStep::BusinessInfo
        };
        Self {
            step,
            business,
            branches,
            plan,
            employees,
        }
    }

    /// Errors unless the machine is on the given step. A machine that has
    /// already completed rejects every step with AlreadyOnboarded.
    pub fn ensure_step(&self, expected: OnboardingStep) -> CoreResult<()> {
        if self.step == OnboardingStep::Complete && expected != OnboardingStep::Complete {
            return Err(CoreError::AlreadyOnboarded);
        }
        if self.step != expected {
            return Err(CoreError::StepMismatch {
                expected: expected.as_str().to_string(),
                actual: self.step.as_str().to_string(),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 1: business info
    // -------------------------------------------------------------------------

    /// Validates a business payload against the current step.
    pub fn check_business(&self, draft: &BusinessDraft) -> CoreResult<()> {
        self.ensure_step(OnboardingStep::BusinessInfo)?;
        validate_business_draft(draft)?;
        Ok(())
    }

    /// Stores the business payload and advances to branches.
    pub fn submit_business(&mut self, draft: BusinessDraft) -> CoreResult<()> {
        self.check_business(&draft)?;
        self.business = Some(draft);
        self.step = OnboardingStep::Branches;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 2: branches
    // -------------------------------------------------------------------------

    /// Validates a branch list against the current step.
    pub fn check_branches(&self, drafts: &[BranchDraft]) -> CoreResult<()> {
        self.ensure_step(OnboardingStep::Branches)?;
        validate_branch_drafts(drafts)?;
        Ok(())
    }

    /// Stores the branch list and advances to plan choice.
    pub fn submit_branches(&mut self, drafts: Vec<BranchDraft>) -> CoreResult<()> {
        self.check_branches(&drafts)?;
        self.branches = drafts;
        self.step = OnboardingStep::Plan;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 3: subscription plan
    // -------------------------------------------------------------------------

    /// Validates a plan choice against the branch count already submitted.
    pub fn check_plan(&self, plan: SubscriptionPlan) -> CoreResult<()> {
        self.ensure_step(OnboardingStep::Plan)?;
        if !plan.allows_branches(self.branches.len()) {
            return Err(CoreError::PlanLimitExceeded {
                plan: plan.as_str().to_string(),
                max_branches: plan.max_branches().unwrap_or(0),
                branches: self.branches.len(),
            });
        }
        Ok(())
    }

    /// Stores the plan choice and advances to employees.
    pub fn choose_plan(&mut self, plan: SubscriptionPlan) -> CoreResult<()> {
        self.check_plan(plan)?;
        self.plan = Some(plan);
        self.step = OnboardingStep::Employees;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 4: employees
    // -------------------------------------------------------------------------

    /// Validates an employee list against the current step. An empty list
    /// is fine; owners often run the till alone at first.
    pub fn check_employees(&self, drafts: &[EmployeeDraft]) -> CoreResult<()> {
        self.ensure_step(OnboardingStep::Employees)?;
        validate_employee_drafts(drafts, self.branches.len())?;
        Ok(())
    }

    /// Stores the employee list and completes onboarding.
    pub fn submit_employees(&mut self, drafts: Vec<EmployeeDraft>) -> CoreResult<()> {
        self.check_employees(&drafts)?;
        self.employees = drafts;
        self.step = OnboardingStep::Complete;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Steps back to the previous screen. Submitted data is kept so a
    /// resubmit after editing replaces it.
    pub fn back(&mut self) -> CoreResult<()> {
        self.step = match self.step {
            OnboardingStep::BusinessInfo | OnboardingStep::Complete => {
                return Err(CoreError::CannotGoBack {
                    step: self.step.as_str().to_string(),
                })
            }
            OnboardingStep::Branches => OnboardingStep::BusinessInfo,
            OnboardingStep::Plan => OnboardingStep::Branches,
            OnboardingStep::Employees => OnboardingStep::Plan,
        };
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------------

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == OnboardingStep::Complete
    }

    pub fn business(&self) -> Option<&BusinessDraft> {
        self.business.as_ref()
    }

    pub fn branches(&self) -> &[BranchDraft] {
        &self.branches
    }

    pub fn plan(&self) -> Option<SubscriptionPlan> {
        self.plan
    }

    pub fn employees(&self) -> &[EmployeeDraft] {
        &self.employees
    }
}

// =============================================================================
// Draft Validation
// =============================================================================

fn validate_business_draft(draft: &BusinessDraft) -> Result<(), ValidationError> {
    validate_required_name("business name", &draft.name, 200)?;
    validate_required_name("owner name", &draft.owner_name, 200)?;
    validate_phone(&draft.phone)?;
    if let Some(email) = &draft.email {
        validate_email(email)?;
    }
    if let Some(address) = &draft.address {
        validate_required_name("address", address, 500)?;
    }
    validate_currency_code(&draft.currency_code)?;
    Ok(())
}

fn validate_branch_drafts(drafts: &[BranchDraft]) -> Result<(), ValidationError> {
    if drafts.is_empty() {
        return Err(ValidationError::Required {
            field: "branches".to_string(),
        });
    }
    if drafts.len() > MAX_BRANCHES {
        return Err(ValidationError::OutOfRange {
            field: "branches".to_string(),
            min: 1,
            max: MAX_BRANCHES as i64,
        });
    }
    let mut seen = std::collections::BTreeSet::new();
    for draft in drafts {
        validate_required_name("branch name", &draft.name, 120)?;
        if let Some(address) = &draft.address {
            validate_required_name("address", address, 500)?;
        }
        if let Some(phone) = &draft.phone {
            validate_phone(phone)?;
        }
        if !seen.insert(draft.name.trim().to_lowercase()) {
            return Err(ValidationError::Duplicate {
                field: "branch name".to_string(),
                value: draft.name.clone(),
            });
        }
    }
    Ok(())
}

fn validate_employee_drafts(
    drafts: &[EmployeeDraft],
    branch_count: usize,
) -> Result<(), ValidationError> {
    if drafts.len() > MAX_EMPLOYEES {
        return Err(ValidationError::OutOfRange {
            field: "employees".to_string(),
            min: 0,
            max: MAX_EMPLOYEES as i64,
        });
    }
    let mut seen = std::collections::BTreeSet::new();
    for draft in drafts {
        validate_required_name("employee name", &draft.name, 200)?;
        if let Some(phone) = &draft.phone {
            validate_phone(phone)?;
        }
        if let Some(index) = draft.branch_index {
            if index >= branch_count {
                return Err(ValidationError::OutOfRange {
                    field: "branch index".to_string(),
                    min: 0,
                    max: branch_count.saturating_sub(1) as i64,
                });
            }
        }
        if !seen.insert(draft.name.trim().to_lowercase()) {
            return Err(ValidationError::Duplicate {
                field: "employee name".to_string(),
                value: draft.name.clone(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
