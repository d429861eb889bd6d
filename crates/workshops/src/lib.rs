//! Workshops domain module.
//!
//! Business rules for workshops and enrollment, implemented as deterministic
//! domain logic (no IO, no storage). Stores load an [`EnrollmentSnapshot`]
//! inside their transaction and ask this crate for the decision.

pub mod enrollment;
pub mod workshop;

pub use enrollment::{
    EnrollmentSnapshot, EnrollmentState, StudentRecord, decide_enroll, decide_unenroll,
    ensure_capacity_covers_roster, ensure_role_change_keeps_dependents,
};
pub use workshop::{DEFAULT_MAX_STUDENTS, Workshop, WorkshopDraft, WorkshopPatch, WorkshopSummary};
