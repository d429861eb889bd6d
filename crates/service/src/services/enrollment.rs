use std::sync::Arc;

use tracing::instrument;

use ellp_auth::{Action, Actor, Resource};
use ellp_core::{DomainError, UserId, WorkshopId};
use ellp_infra::Store;
use ellp_workshops::WorkshopSummary;

use crate::authz::ensure;
use crate::errors::ServiceResult;

/// Enroll/unenroll and enrollment views.
///
/// Capacity and duplicate checks happen inside the store's transaction; this
/// layer only gates who may act for which student.
pub struct EnrollmentService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for EnrollmentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> EnrollmentService<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id), err)]
    pub async fn enroll(&self, actor: &Actor, workshop_id: WorkshopId, student_id: UserId) -> ServiceResult<()> {
        ensure(actor, Action::Enroll, Resource::Enrollment { student_id })?;
        self.store.enroll(workshop_id, student_id).await?;
        tracing::info!(%workshop_id, %student_id, "student enrolled");
        Ok(())
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id), err)]
    pub async fn unenroll(&self, actor: &Actor, workshop_id: WorkshopId, student_id: UserId) -> ServiceResult<()> {
        ensure(actor, Action::Unenroll, Resource::Enrollment { student_id })?;
        self.store.unenroll(workshop_id, student_id).await?;
        tracing::info!(%workshop_id, %student_id, "student unenrolled");
        Ok(())
    }

    /// The acting student's published enrollments.
    pub async fn my_enrollments(&self, actor: &Actor) -> ServiceResult<Vec<WorkshopSummary>> {
        ensure(
            actor,
            Action::ViewEnrollments,
            Resource::Enrollment { student_id: actor.id },
        )?;
        Ok(self.store.enrollments_of(actor.id, true).await?)
    }

    /// All enrollments of a given student, published or not. Admin (or the
    /// student themselves); the target must be a student.
    pub async fn student_enrollments(&self, actor: &Actor, student_id: UserId) -> ServiceResult<Vec<WorkshopSummary>> {
        ensure(actor, Action::ReadUser, Resource::User(student_id))?;
        let student = self
            .store
            .get_user(student_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !student.role.is_student() {
            return Err(DomainError::RoleNotAllowed.into());
        }
        Ok(self.store.enrollments_of(student_id, false).await?)
    }
}
