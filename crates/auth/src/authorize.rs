//! Authorization policy.
//!
//! - No IO
//! - No panics
//! - No business state (the caller loads whatever the resource needs, e.g. a
//!   workshop's `professor_id`)

use serde::Serialize;

use ellp_core::{DomainError, DomainResult, UserId};

use crate::{Actor, Role};

/// What the actor is trying to do.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReadUser,
    ListUsers,
    CreateUser,
    /// `privileged` is set when the patch touches `role` or `is_active`.
    UpdateUser { privileged: bool },
    DeleteUser,
    CreateWorkshop,
    ReadWorkshop,
    UpdateWorkshop,
    DeleteWorkshop,
    ViewRoster,
    Enroll,
    Unenroll,
    ViewEnrollments,
}

/// What the action targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// A specific user account.
    User(UserId),
    /// The user directory as a whole (listing, creating).
    Users,
    /// A specific workshop, identified for policy purposes by its owner.
    Workshop { professor_id: UserId },
    /// The workshop catalog as a whole (listing, creating).
    Workshops,
    /// A student's enrollments (enroll/unenroll/view on behalf of `student_id`).
    Enrollment { student_id: UserId },
}

/// Why a request was denied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The actor's account is deactivated.
    Inactive,
    /// The actor's role can never perform this action.
    RoleNotAllowed,
    /// Only the workshop's professor (or an admin) may do this.
    NotOwner,
    /// Students act on their own identity only.
    NotSelf,
    /// Admin-only action.
    AdminOnly,
    /// The action does not apply to this kind of resource.
    UnsupportedResource,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Inactive => "account is inactive",
            DenyReason::RoleNotAllowed => "role not allowed for this action",
            DenyReason::NotOwner => "only the workshop's professor or an admin may do this",
            DenyReason::NotSelf => "students may only act on their own enrollments",
            DenyReason::AdminOnly => "admin only",
            DenyReason::UnsupportedResource => "action does not apply to this resource",
        }
    }
}

impl From<DenyReason> for DomainError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::RoleNotAllowed => DomainError::RoleNotAllowed,
            _ => DomainError::PermissionDenied,
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> DomainResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// Rules, in precedence order:
/// 1. An inactive actor may only read their own profile.
/// 2. Admins may do everything.
/// 3. Workshops: professors may create; the owning professor may update,
///    delete and view the roster; anyone active may read.
/// 4. Enrollment: only students, and only for themselves.
/// 5. Users: everyone may read and (non-privileged) update themselves; the
///    rest is admin-only.
pub fn authorize(actor: &Actor, action: Action, resource: Resource) -> Decision {
    use Decision::{Allow, Deny};

    if !actor.is_active {
        return match (action, resource) {
            (Action::ReadUser, Resource::User(id)) if actor.is(id) => Allow,
            _ => Deny(DenyReason::Inactive),
        };
    }

    if actor.role.is_admin() {
        return Allow;
    }

    match (action, resource) {
        (Action::CreateWorkshop, Resource::Workshops) => {
            if actor.role == Role::Professor {
                Allow
            } else {
                Deny(DenyReason::RoleNotAllowed)
            }
        }
        (Action::ReadWorkshop, Resource::Workshops | Resource::Workshop { .. }) => Allow,
        (
            Action::UpdateWorkshop | Action::DeleteWorkshop | Action::ViewRoster,
            Resource::Workshop { professor_id },
        ) => {
            if actor.is(professor_id) {
                Allow
            } else {
                Deny(DenyReason::NotOwner)
            }
        }

        (Action::Enroll | Action::Unenroll | Action::ViewEnrollments, Resource::Enrollment { student_id }) => {
            if !actor.role.is_student() {
                Deny(DenyReason::RoleNotAllowed)
            } else if !actor.is(student_id) {
                Deny(DenyReason::NotSelf)
            } else {
                Allow
            }
        }

        (Action::ReadUser, Resource::User(id)) if actor.is(id) => Allow,
        (Action::UpdateUser { privileged: false }, Resource::User(id)) if actor.is(id) => Allow,
        (
            Action::ReadUser | Action::UpdateUser { .. } | Action::DeleteUser,
            Resource::User(_),
        ) => Deny(DenyReason::AdminOnly),
        (Action::ListUsers | Action::CreateUser, Resource::Users) => Deny(DenyReason::AdminOnly),

        _ => Deny(DenyReason::UnsupportedResource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role, true)
    }

    #[test]
    fn professor_may_create_workshops_student_may_not() {
        assert!(authorize(&actor(Role::Professor), Action::CreateWorkshop, Resource::Workshops).is_allowed());
        assert_eq!(
            authorize(&actor(Role::Aluno), Action::CreateWorkshop, Resource::Workshops),
            Decision::Deny(DenyReason::RoleNotAllowed)
        );
    }

    #[test]
    fn only_owner_or_admin_updates_workshop() {
        let owner = actor(Role::Professor);
        let other = actor(Role::Professor);
        let workshop = Resource::Workshop { professor_id: owner.id };

        assert!(authorize(&owner, Action::UpdateWorkshop, workshop).is_allowed());
        assert_eq!(
            authorize(&other, Action::UpdateWorkshop, workshop).into_result(),
            Err(DomainError::PermissionDenied)
        );
        assert!(authorize(&actor(Role::Admin), Action::DeleteWorkshop, workshop).is_allowed());
        assert!(authorize(&owner, Action::ViewRoster, workshop).is_allowed());
        assert!(!authorize(&other, Action::ViewRoster, workshop).is_allowed());
    }

    #[test]
    fn professor_cannot_enroll() {
        let professor = actor(Role::Professor);
        let decision = authorize(
            &professor,
            Action::Enroll,
            Resource::Enrollment { student_id: professor.id },
        );
        assert_eq!(decision.into_result(), Err(DomainError::RoleNotAllowed));
    }

    #[test]
    fn student_cannot_enroll_someone_else() {
        let student = actor(Role::Aluno);
        let decision = authorize(
            &student,
            Action::Enroll,
            Resource::Enrollment { student_id: UserId::new() },
        );
        assert_eq!(decision, Decision::Deny(DenyReason::NotSelf));
        assert!(
            authorize(&student, Action::Unenroll, Resource::Enrollment { student_id: student.id })
                .is_allowed()
        );
    }

    #[test]
    fn self_service_profile_but_not_privileged_fields() {
        let user = actor(Role::Aluno);
        let me = Resource::User(user.id);

        assert!(authorize(&user, Action::ReadUser, me).is_allowed());
        assert!(authorize(&user, Action::UpdateUser { privileged: false }, me).is_allowed());
        assert_eq!(
            authorize(&user, Action::UpdateUser { privileged: true }, me),
            Decision::Deny(DenyReason::AdminOnly)
        );
        assert_eq!(
            authorize(&user, Action::ReadUser, Resource::User(UserId::new())),
            Decision::Deny(DenyReason::AdminOnly)
        );
        assert!(!authorize(&user, Action::DeleteUser, me).is_allowed());
        assert!(!authorize(&user, Action::ListUsers, Resource::Users).is_allowed());
    }

    #[test]
    fn inactive_actor_only_reads_own_profile() {
        let mut admin = actor(Role::Admin);
        admin.is_active = false;

        assert!(authorize(&admin, Action::ReadUser, Resource::User(admin.id)).is_allowed());
        assert_eq!(
            authorize(&admin, Action::ListUsers, Resource::Users),
            Decision::Deny(DenyReason::Inactive)
        );
        assert_eq!(
            authorize(&admin, Action::UpdateUser { privileged: false }, Resource::User(admin.id))
                .into_result(),
            Err(DomainError::PermissionDenied)
        );
    }

    #[test]
    fn mismatched_resource_is_denied() {
        let professor = actor(Role::Professor);
        assert_eq!(
            authorize(&professor, Action::UpdateWorkshop, Resource::Users),
            Decision::Deny(DenyReason::UnsupportedResource)
        );
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Professor), Just(Role::Aluno)]
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::ReadUser),
            Just(Action::ListUsers),
            Just(Action::CreateUser),
            any::<bool>().prop_map(|privileged| Action::UpdateUser { privileged }),
            Just(Action::DeleteUser),
            Just(Action::CreateWorkshop),
            Just(Action::ReadWorkshop),
            Just(Action::UpdateWorkshop),
            Just(Action::DeleteWorkshop),
            Just(Action::ViewRoster),
            Just(Action::Enroll),
            Just(Action::Unenroll),
            Just(Action::ViewEnrollments),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: an active admin is allowed everything.
        #[test]
        fn admin_always_allowed(action in any_action(), kind in 0..5u8) {
            let admin = actor(Role::Admin);
            let resource = match kind {
                0 => Resource::User(UserId::new()),
                1 => Resource::Users,
                2 => Resource::Workshop { professor_id: UserId::new() },
                3 => Resource::Workshops,
                _ => Resource::Enrollment { student_id: UserId::new() },
            };
            prop_assert!(authorize(&admin, action, resource).is_allowed());
        }

        /// Property: an inactive actor is denied everything except reading
        /// their own profile.
        #[test]
        fn inactive_denied_except_own_read(role in any_role(), action in any_action(), seed in 0..5u8) {
            let inactive = Actor::new(UserId::new(), role, false);
            let resource = match seed {
                0 => Resource::User(inactive.id),
                1 => Resource::Users,
                2 => Resource::Workshop { professor_id: inactive.id },
                3 => Resource::Workshops,
                _ => Resource::Enrollment { student_id: inactive.id },
            };
            let decision = authorize(&inactive, action, resource);
            let own_read = action == Action::ReadUser && resource == Resource::User(inactive.id);
            prop_assert_eq!(decision.is_allowed(), own_read);
        }

        /// Property: a non-admin never touches another user's account or
        /// enrollments.
        #[test]
        fn non_admin_never_acts_on_others(
            role in prop_oneof![Just(Role::Professor), Just(Role::Aluno)],
            action in any_action(),
        ) {
            let me = actor(role);
            let other = UserId::new();
            prop_assert!(!authorize(&me, action, Resource::User(other)).is_allowed());
            let enrollment = Resource::Enrollment { student_id: other };
            prop_assert!(!authorize(&me, action, enrollment).is_allowed());
        }
    }
}
