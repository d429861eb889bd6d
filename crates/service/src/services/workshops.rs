use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use ellp_auth::{Action, Actor, Resource, User};
use ellp_core::{DomainError, DomainResult, Page, WorkshopId};
use ellp_infra::Store;
use ellp_workshops::{Workshop, WorkshopDraft, WorkshopPatch, WorkshopSummary, ensure_capacity_covers_roster};

use crate::authz::ensure;
use crate::errors::ServiceResult;

/// Workshop catalog and owner-gated management.
pub struct WorkshopService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for WorkshopService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> WorkshopService<S>
where
    S: Store + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a workshop owned by the acting professor (or admin).
    #[instrument(skip(self, actor, draft), fields(actor_id = %actor.id), err)]
    pub async fn create(&self, actor: &Actor, draft: WorkshopDraft) -> ServiceResult<WorkshopSummary> {
        ensure(actor, Action::CreateWorkshop, Resource::Workshops)?;
        let workshop = Workshop::create(draft, actor.id, Utc::now())?;
        let workshop = self.store.insert_workshop(workshop).await?;
        tracing::info!(workshop_id = %workshop.id, max_students = workshop.max_students, "workshop created");
        Ok(WorkshopSummary::new(workshop, 0))
    }

    pub async fn get(&self, actor: &Actor, id: WorkshopId) -> ServiceResult<WorkshopSummary> {
        ensure(actor, Action::ReadWorkshop, Resource::Workshops)?;
        self.load(id).await
    }

    pub async fn list(&self, actor: &Actor, page: Page, published_only: bool) -> ServiceResult<Vec<WorkshopSummary>> {
        ensure(actor, Action::ReadWorkshop, Resource::Workshops)?;
        Ok(self.store.list_workshops(page, published_only).await?)
    }

    /// Workshops owned by the acting user.
    pub async fn list_mine(&self, actor: &Actor) -> ServiceResult<Vec<WorkshopSummary>> {
        ensure(actor, Action::ReadWorkshop, Resource::Workshops)?;
        Ok(self.store.list_workshops_by_professor(actor.id).await?)
    }

    /// Owner or admin. Lowering `max_students` below the current roster is
    /// rejected; the check runs in the same transaction as the write.
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.id), err)]
    pub async fn update(&self, actor: &Actor, id: WorkshopId, patch: WorkshopPatch) -> ServiceResult<WorkshopSummary> {
        let current = self.load(id).await?;
        ensure(
            actor,
            Action::UpdateWorkshop,
            Resource::Workshop {
                professor_id: current.workshop.professor_id,
            },
        )?;
        if patch.is_empty() {
            return Ok(current);
        }

        let now = Utc::now();
        let updated = self
            .store
            .update_workshop(
                id,
                Box::new(move |workshop: &mut Workshop, roster_size: usize| -> DomainResult<()> {
                    if let Some(max_students) = patch.max_students {
                        ensure_capacity_covers_roster(max_students, roster_size)?;
                    }
                    patch.apply(workshop, now)
                }),
            )
            .await?;
        tracing::info!(workshop_id = %id, "workshop updated");
        Ok(updated)
    }

    /// Mark the workshop as completed.
    pub async fn complete(&self, actor: &Actor, id: WorkshopId) -> ServiceResult<WorkshopSummary> {
        self.update(
            actor,
            id,
            WorkshopPatch {
                is_completed: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Owner or admin. Enrollment pairs are removed with the workshop.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id), err)]
    pub async fn delete(&self, actor: &Actor, id: WorkshopId) -> ServiceResult<()> {
        let current = self.load(id).await?;
        ensure(
            actor,
            Action::DeleteWorkshop,
            Resource::Workshop {
                professor_id: current.workshop.professor_id,
            },
        )?;
        self.store.delete_workshop(id).await?;
        tracing::info!(workshop_id = %id, dropped_enrollments = current.enrolled_count, "workshop deleted");
        Ok(())
    }

    /// Current roster. Owner or admin.
    pub async fn students(&self, actor: &Actor, id: WorkshopId) -> ServiceResult<Vec<User>> {
        let current = self.load(id).await?;
        ensure(
            actor,
            Action::ViewRoster,
            Resource::Workshop {
                professor_id: current.workshop.professor_id,
            },
        )?;
        Ok(self.store.roster(id).await?)
    }

    async fn load(&self, id: WorkshopId) -> ServiceResult<WorkshopSummary> {
        Ok(self
            .store
            .get_workshop(id)
            .await?
            .ok_or(DomainError::NotFound)?)
    }
}
