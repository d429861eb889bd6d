//! Enrollment decisions.
//!
//! Each (student, workshop) pair is either [`EnrollmentState::NotEnrolled`] or
//! [`EnrollmentState::Enrolled`]; there is no pending state. The functions here
//! decide a transition from a snapshot the store read inside its transaction.
//! The store performs the insert/delete only when the decision is `Ok`, within
//! the same transaction, so the capacity check and the write are atomic.

use serde::{Deserialize, Serialize};

use ellp_auth::Role;
use ellp_core::{DomainError, DomainResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    NotEnrolled,
    Enrolled,
}

impl EnrollmentState {
    pub fn from_membership(enrolled: bool) -> Self {
        if enrolled {
            Self::Enrolled
        } else {
            Self::NotEnrolled
        }
    }

    pub fn enroll(self) -> DomainResult<Self> {
        match self {
            Self::NotEnrolled => Ok(Self::Enrolled),
            Self::Enrolled => Err(DomainError::AlreadyEnrolled),
        }
    }

    pub fn unenroll(self) -> DomainResult<Self> {
        match self {
            Self::Enrolled => Ok(Self::NotEnrolled),
            Self::NotEnrolled => Err(DomainError::NotEnrolled),
        }
    }
}

/// The parts of the student's account enrollment depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub role: Role,
    pub is_active: bool,
}

/// Everything an enrollment decision reads, captured in one transaction.
///
/// The workshop itself must exist; a missing workshop is reported as
/// `NotFound` by the store before a snapshot is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EnrollmentSnapshot {
    pub max_students: u32,
    pub roster_size: usize,
    pub already_enrolled: bool,
    /// `None` when the student id does not resolve to a user.
    pub student: Option<StudentRecord>,
}

/// Decide whether the student may be added to the roster.
///
/// Checks, in order: the student's role, an existing pair, capacity, and
/// that the student exists and is active.
pub fn decide_enroll(snapshot: &EnrollmentSnapshot) -> DomainResult<EnrollmentState> {
    if let Some(student) = snapshot.student {
        if !student.role.is_student() {
            return Err(DomainError::RoleNotAllowed);
        }
    }

    let next = EnrollmentState::from_membership(snapshot.already_enrolled).enroll()?;

    if snapshot.roster_size >= snapshot.max_students as usize {
        return Err(DomainError::WorkshopFull);
    }

    match snapshot.student {
        Some(student) if student.is_active => Ok(next),
        _ => Err(DomainError::StudentNotFound),
    }
}

/// Decide whether the pair may be removed.
pub fn decide_unenroll(already_enrolled: bool) -> DomainResult<EnrollmentState> {
    EnrollmentState::from_membership(already_enrolled).unenroll()
}

/// Reject a capacity change that would leave the roster over capacity.
pub fn ensure_capacity_covers_roster(new_max_students: u32, roster_size: usize) -> DomainResult<()> {
    if (new_max_students as usize) < roster_size {
        return Err(DomainError::invalid_input(format!(
            "max_students ({new_max_students}) cannot be lower than the current roster size ({roster_size})"
        )));
    }
    Ok(())
}

/// Reject a role change that would orphan workshop data: an enrolled student
/// must stay `aluno`, and a workshop owner must keep a teaching role.
pub fn ensure_role_change_keeps_dependents(
    current: Role,
    next: Role,
    has_enrollments: bool,
    owns_workshops: bool,
) -> DomainResult<()> {
    if current == next {
        return Ok(());
    }
    if has_enrollments && !next.is_student() {
        return Err(DomainError::has_dependents("user is still enrolled in workshops"));
    }
    if owns_workshops && !next.can_teach() {
        return Err(DomainError::has_dependents("user still owns workshops"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn active_student() -> Option<StudentRecord> {
        Some(StudentRecord {
            role: Role::Aluno,
            is_active: true,
        })
    }

    fn snapshot(max: u32, roster: usize) -> EnrollmentSnapshot {
        EnrollmentSnapshot {
            max_students: max,
            roster_size: roster,
            already_enrolled: false,
            student: active_student(),
        }
    }

    #[test]
    fn open_seat_admits_student() {
        assert_eq!(decide_enroll(&snapshot(5, 4)), Ok(EnrollmentState::Enrolled));
    }

    #[test]
    fn full_workshop_rejects() {
        assert_eq!(decide_enroll(&snapshot(5, 5)), Err(DomainError::WorkshopFull));
    }

    #[test]
    fn duplicate_reported_before_capacity() {
        let snap = EnrollmentSnapshot {
            already_enrolled: true,
            ..snapshot(1, 1)
        };
        assert_eq!(decide_enroll(&snap), Err(DomainError::AlreadyEnrolled));
    }

    #[test]
    fn non_student_role_rejected_first() {
        let snap = EnrollmentSnapshot {
            already_enrolled: true,
            student: Some(StudentRecord {
                role: Role::Professor,
                is_active: true,
            }),
            ..snapshot(1, 1)
        };
        assert_eq!(decide_enroll(&snap), Err(DomainError::RoleNotAllowed));
    }

    #[test]
    fn missing_or_inactive_student_rejected() {
        let missing = EnrollmentSnapshot {
            student: None,
            ..snapshot(5, 0)
        };
        assert_eq!(decide_enroll(&missing), Err(DomainError::StudentNotFound));

        let inactive = EnrollmentSnapshot {
            student: Some(StudentRecord {
                role: Role::Aluno,
                is_active: false,
            }),
            ..snapshot(5, 0)
        };
        assert_eq!(decide_enroll(&inactive), Err(DomainError::StudentNotFound));
    }

    #[test]
    fn unenroll_twice() {
        assert_eq!(decide_unenroll(true), Ok(EnrollmentState::NotEnrolled));
        assert_eq!(decide_unenroll(false), Err(DomainError::NotEnrolled));
    }

    #[test]
    fn capacity_shrink_rule() {
        assert!(ensure_capacity_covers_roster(3, 3).is_ok());
        assert!(ensure_capacity_covers_roster(10, 0).is_ok());
        assert!(matches!(
            ensure_capacity_covers_roster(2, 3),
            Err(DomainError::InvalidInput(_))
        ));
    }

    proptest! {
        /// Property: an admitted enrollment always leaves the roster within
        /// capacity, and only active students are ever admitted.
        #[test]
        fn admission_respects_capacity(
            max in 1u32..50,
            roster in 0usize..60,
            already in any::<bool>(),
            role in prop_oneof![Just(Role::Admin), Just(Role::Professor), Just(Role::Aluno)],
            active in any::<bool>(),
            present in any::<bool>(),
        ) {
            let snap = EnrollmentSnapshot {
                max_students: max,
                roster_size: roster,
                already_enrolled: already,
                student: present.then_some(StudentRecord { role, is_active: active }),
            };
            if decide_enroll(&snap).is_ok() {
                prop_assert!(roster + 1 <= max as usize);
                prop_assert!(!already);
                prop_assert!(present && active && role == Role::Aluno);
            }
        }

        /// Property: replaying a stream of distinct enroll attempts against a
        /// roster never exceeds `max_students`.
        #[test]
        fn sequential_enrollment_fills_exactly(max in 1u32..30, attempts in 0usize..60) {
            let mut roster = 0usize;
            let mut full = 0usize;
            for _ in 0..attempts {
                match decide_enroll(&snapshot(max, roster)) {
                    Ok(_) => roster += 1,
                    Err(DomainError::WorkshopFull) => full += 1,
                    Err(other) => prop_assert!(false, "unexpected {other:?}"),
                }
            }
            prop_assert_eq!(roster, attempts.min(max as usize));
            prop_assert_eq!(roster + full, attempts);
        }
    }

    #[test]
    fn role_change_respects_dependents() {
        assert!(ensure_role_change_keeps_dependents(Role::Aluno, Role::Aluno, true, false).is_ok());
        assert!(ensure_role_change_keeps_dependents(Role::Aluno, Role::Professor, false, false).is_ok());
        assert!(ensure_role_change_keeps_dependents(Role::Professor, Role::Admin, false, true).is_ok());
        assert!(matches!(
            ensure_role_change_keeps_dependents(Role::Aluno, Role::Professor, true, false),
            Err(DomainError::HasDependents(_))
        ));
        assert!(matches!(
            ensure_role_change_keeps_dependents(Role::Professor, Role::Aluno, false, true),
            Err(DomainError::HasDependents(_))
        ));
    }
}
