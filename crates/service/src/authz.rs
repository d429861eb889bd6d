//! Service-side authorization guard.
//!
//! Every service operation calls [`ensure`] before touching the store (or, for
//! owner-gated workshop actions, right after loading the owner id).

use ellp_auth::{Action, Actor, Decision, Resource, authorize};

use crate::errors::{ServiceError, ServiceResult};

/// Gate `action` on `resource` for `actor`; a denial becomes the matching
/// domain error (`RoleNotAllowed` or `PermissionDenied`).
pub fn ensure(actor: &Actor, action: Action, resource: Resource) -> ServiceResult<()> {
    match authorize(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(
                actor_id = %actor.id,
                role = %actor.role,
                ?action,
                ?resource,
                reason = reason.message(),
                "authorization denied"
            );
            Err(ServiceError::Domain(reason.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use ellp_auth::Role;
    use ellp_core::{DomainError, UserId};

    use super::*;

    #[test]
    fn denial_maps_to_domain_error() {
        let professor = Actor::new(UserId::new(), Role::Professor, true);
        assert_eq!(
            ensure(
                &professor,
                Action::Enroll,
                Resource::Enrollment { student_id: professor.id }
            ),
            Err(ServiceError::Domain(DomainError::RoleNotAllowed))
        );
        assert!(ensure(&professor, Action::CreateWorkshop, Resource::Workshops).is_ok());
    }
}
