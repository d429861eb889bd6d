use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ellp_auth::{Role, User};
use ellp_core::{DomainError, Email, Page, UserId, WorkshopId};
use ellp_workshops::{
    EnrollmentSnapshot, StudentRecord, Workshop, WorkshopSummary, decide_enroll, decide_unenroll,
    ensure_role_change_keeps_dependents,
};

use super::{IdentityStore, StoreError, StoreResult, UserMutation, WorkshopMutation, WorkshopStore};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// Unique index over normalized emails.
    email_index: HashMap<Email, UserId>,
    workshops: HashMap<WorkshopId, Workshop>,
    /// Enrollment pairs indexed by workshop...
    rosters: HashMap<WorkshopId, HashSet<UserId>>,
    /// ...and by student.
    enrolled_in: HashMap<UserId, HashSet<WorkshopId>>,
}

impl Tables {
    fn roster_size(&self, workshop_id: WorkshopId) -> usize {
        self.rosters.get(&workshop_id).map_or(0, HashSet::len)
    }

    fn is_enrolled(&self, workshop_id: WorkshopId, student_id: UserId) -> bool {
        self.rosters
            .get(&workshop_id)
            .is_some_and(|roster| roster.contains(&student_id))
    }

    fn summary(&self, workshop: &Workshop) -> WorkshopSummary {
        WorkshopSummary::new(workshop.clone(), self.roster_size(workshop.id))
    }

    fn summaries<'a>(&self, workshops: impl Iterator<Item = &'a Workshop>) -> Vec<WorkshopSummary> {
        let mut workshops: Vec<&Workshop> = workshops.collect();
        workshops.sort_by_key(|w| (w.created_at, w.id));
        workshops.into_iter().map(|w| self.summary(w)).collect()
    }

    fn remove_pair(&mut self, workshop_id: WorkshopId, student_id: UserId) {
        if let Some(roster) = self.rosters.get_mut(&workshop_id) {
            roster.remove(&student_id);
        }
        if let Some(workshops) = self.enrolled_in.get_mut(&student_id) {
            workshops.remove(&workshop_id);
        }
    }
}

/// In-memory store.
///
/// Intended for tests/dev. Every operation runs inside one critical section of
/// a single `RwLock`, which makes check-then-act sequences (email uniqueness,
/// capacity) atomic. The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut t = self.write()?;
        if t.email_index.contains_key(&user.email) {
            return Err(DomainError::DuplicateEmail.into());
        }
        t.email_index.insert(user.email.clone(), user.id);
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        let t = self.read()?;
        Ok(t.email_index.get(email).and_then(|id| t.users.get(id)).cloned())
    }

    async fn list_users(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<User>> {
        let t = self.read()?;
        let mut users: Vec<&User> = t
            .users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(page.slice(users.into_iter().cloned()))
    }

    async fn update_user(&self, id: UserId, mutation: UserMutation) -> StoreResult<User> {
        let mut t = self.write()?;
        let current = t.users.get(&id).cloned().ok_or(DomainError::NotFound)?;

        let mut next = current.clone();
        mutation(&mut next)?;
        next.id = current.id;
        next.created_at = current.created_at;

        if next.role != current.role {
            let has_enrollments = t.enrolled_in.get(&id).is_some_and(|w| !w.is_empty());
            let owns_workshops = t.workshops.values().any(|w| w.professor_id == id);
            ensure_role_change_keeps_dependents(current.role, next.role, has_enrollments, owns_workshops)?;
        }

        if next.email != current.email {
            if t.email_index.get(&next.email).is_some_and(|owner| *owner != id) {
                return Err(DomainError::DuplicateEmail.into());
            }
            t.email_index.remove(&current.email);
            t.email_index.insert(next.email.clone(), id);
        }

        t.users.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut t = self.write()?;
        let Some(user) = t.users.get(&id) else {
            return Err(DomainError::NotFound.into());
        };
        if t.workshops.values().any(|w| w.professor_id == id) {
            return Err(DomainError::has_dependents("user still owns workshops").into());
        }

        let email = user.email.clone();
        t.email_index.remove(&email);
        t.users.remove(&id);
        for workshop_id in t.enrolled_in.remove(&id).unwrap_or_default() {
            if let Some(roster) = t.rosters.get_mut(&workshop_id) {
                roster.remove(&id);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl WorkshopStore for InMemoryStore {
    async fn insert_workshop(&self, workshop: Workshop) -> StoreResult<Workshop> {
        let mut t = self.write()?;
        if !t.users.contains_key(&workshop.professor_id) {
            return Err(DomainError::NotFound.into());
        }
        t.workshops.insert(workshop.id, workshop.clone());
        Ok(workshop)
    }

    async fn get_workshop(&self, id: WorkshopId) -> StoreResult<Option<WorkshopSummary>> {
        let t = self.read()?;
        Ok(t.workshops.get(&id).map(|w| t.summary(w)))
    }

    async fn list_workshops(&self, page: Page, published_only: bool) -> StoreResult<Vec<WorkshopSummary>> {
        let t = self.read()?;
        let all = t.summaries(t.workshops.values().filter(|w| !published_only || w.is_published));
        Ok(page.slice(all))
    }

    async fn list_workshops_by_professor(&self, professor_id: UserId) -> StoreResult<Vec<WorkshopSummary>> {
        let t = self.read()?;
        Ok(t.summaries(t.workshops.values().filter(|w| w.professor_id == professor_id)))
    }

    async fn update_workshop(&self, id: WorkshopId, mutation: WorkshopMutation) -> StoreResult<WorkshopSummary> {
        let mut t = self.write()?;
        let roster_size = t.roster_size(id);
        let current = t.workshops.get(&id).cloned().ok_or(DomainError::NotFound)?;

        let mut next = current.clone();
        mutation(&mut next, roster_size)?;
        next.id = current.id;
        next.professor_id = current.professor_id;
        next.created_at = current.created_at;

        let summary = t.summary(&next);
        t.workshops.insert(id, next);
        Ok(summary)
    }

    async fn delete_workshop(&self, id: WorkshopId) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.workshops.remove(&id).is_none() {
            return Err(DomainError::NotFound.into());
        }
        for student_id in t.rosters.remove(&id).unwrap_or_default() {
            if let Some(workshops) = t.enrolled_in.get_mut(&student_id) {
                workshops.remove(&id);
            }
        }
        Ok(())
    }

    async fn roster(&self, workshop_id: WorkshopId) -> StoreResult<Vec<User>> {
        let t = self.read()?;
        if !t.workshops.contains_key(&workshop_id) {
            return Err(DomainError::NotFound.into());
        }
        let mut students: Vec<User> = t
            .rosters
            .get(&workshop_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.users.get(id).cloned())
            .collect();
        students.sort_by_key(|u| (u.created_at, u.id));
        Ok(students)
    }

    async fn enroll(&self, workshop_id: WorkshopId, student_id: UserId) -> StoreResult<()> {
        let mut t = self.write()?;
        let workshop = t.workshops.get(&workshop_id).ok_or(DomainError::NotFound)?;

        let snapshot = EnrollmentSnapshot {
            max_students: workshop.max_students,
            roster_size: t.roster_size(workshop_id),
            already_enrolled: t.is_enrolled(workshop_id, student_id),
            student: t.users.get(&student_id).map(|u| StudentRecord {
                role: u.role,
                is_active: u.is_active,
            }),
        };
        decide_enroll(&snapshot)?;

        t.rosters.entry(workshop_id).or_default().insert(student_id);
        t.enrolled_in.entry(student_id).or_default().insert(workshop_id);
        Ok(())
    }

    async fn unenroll(&self, workshop_id: WorkshopId, student_id: UserId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.workshops.contains_key(&workshop_id) {
            return Err(DomainError::NotFound.into());
        }
        decide_unenroll(t.is_enrolled(workshop_id, student_id))?;
        t.remove_pair(workshop_id, student_id);
        Ok(())
    }

    async fn enrollments_of(&self, user_id: UserId, published_only: bool) -> StoreResult<Vec<WorkshopSummary>> {
        let t = self.read()?;
        let workshops = t
            .enrolled_in
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| t.workshops.get(id))
            .filter(|w| !published_only || w.is_published);
        Ok(t.summaries(workshops))
    }
}
