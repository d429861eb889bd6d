//! Workshop entity, creation draft and partial patch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ellp_core::{DomainError, DomainResult, Entity, UserId, WorkshopId};

pub const DEFAULT_MAX_STUDENTS: u32 = 20;

/// A workshop offered by a professor.
///
/// # Invariants
/// - `title` is non-empty.
/// - `max_students > 0`.
/// - `start_date <= end_date` when both are set.
/// - `professor_id` references an existing user (enforced by the store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workshop {
    pub id: WorkshopId,
    pub title: String,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub max_students: u32,
    pub prerequisites: Option<String>,
    pub is_published: bool,
    pub is_completed: bool,
    pub professor_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub schedule: Option<String>,
}

impl Entity for Workshop {
    type Id = WorkshopId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Workshop {
    /// Create a workshop owned by `professor_id` from a validated draft.
    pub fn create(draft: WorkshopDraft, professor_id: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        let workshop = Self {
            id: WorkshopId::new(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            theme: draft.theme,
            max_students: draft.max_students.unwrap_or(DEFAULT_MAX_STUDENTS),
            prerequisites: draft.prerequisites,
            is_published: draft.is_published,
            is_completed: false,
            professor_id,
            created_at: now,
            updated_at: None,
            start_date: draft.start_date,
            end_date: draft.end_date,
            schedule: draft.schedule,
        };
        workshop.validate()?;
        Ok(workshop)
    }

    /// Check the entity-level invariants.
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::invalid_input("title cannot be empty"));
        }
        if self.max_students == 0 {
            return Err(DomainError::invalid_input("max_students must be greater than 0"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(DomainError::invalid_input("start_date must not be after end_date"));
            }
        }
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.professor_id == user_id
    }
}

/// Creation input. `max_students` defaults to [`DEFAULT_MAX_STUDENTS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorkshopDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub max_students: Option<u32>,
    #[serde(default)]
    pub prerequisites: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub schedule: Option<String>,
}

impl WorkshopDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a workshop. `None` leaves a field untouched.
///
/// Ownership (`professor_id`) and `created_at` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkshopPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub theme: Option<String>,
    pub max_students: Option<u32>,
    pub prerequisites: Option<String>,
    pub is_published: Option<bool>,
    pub is_completed: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub schedule: Option<String>,
}

impl WorkshopPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply field-by-field and stamp `updated_at`.
    ///
    /// All-or-nothing: on a validation failure `workshop` is left unchanged.
    /// An empty patch is a no-op and does not touch `updated_at`.
    pub fn apply(self, workshop: &mut Workshop, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_empty() {
            return Ok(());
        }

        let mut next = workshop.clone();
        if let Some(title) = self.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            next.description = Some(description);
        }
        if let Some(theme) = self.theme {
            next.theme = Some(theme);
        }
        if let Some(max) = self.max_students {
            next.max_students = max;
        }
        if let Some(prerequisites) = self.prerequisites {
            next.prerequisites = Some(prerequisites);
        }
        if let Some(published) = self.is_published {
            next.is_published = published;
        }
        if let Some(completed) = self.is_completed {
            next.is_completed = completed;
        }
        if let Some(start) = self.start_date {
            next.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            next.end_date = Some(end);
        }
        if let Some(schedule) = self.schedule {
            next.schedule = Some(schedule);
        }
        next.validate()?;

        next.updated_at = Some(now);
        *workshop = next;
        Ok(())
    }
}

/// A workshop with its current occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkshopSummary {
    #[serde(flatten)]
    pub workshop: Workshop,
    pub enrolled_count: usize,
    pub available_spots: usize,
}

impl WorkshopSummary {
    pub fn new(workshop: Workshop, enrolled_count: usize) -> Self {
        let available_spots = (workshop.max_students as usize).saturating_sub(enrolled_count);
        Self {
            workshop,
            enrolled_count,
            available_spots,
        }
    }

    pub fn is_full(&self) -> bool {
        self.available_spots == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn robotics() -> Workshop {
        Workshop::create(WorkshopDraft::titled("Robotics 101"), UserId::new(), t0()).unwrap()
    }

    #[test]
    fn create_applies_defaults() {
        let w = robotics();
        assert_eq!(w.max_students, DEFAULT_MAX_STUDENTS);
        assert!(!w.is_published);
        assert!(!w.is_completed);
        assert_eq!(w.updated_at, None);
        assert_eq!(w.created_at, t0());
    }

    #[test]
    fn create_rejects_zero_capacity_and_blank_title() {
        let zero = WorkshopDraft {
            max_students: Some(0),
            ..WorkshopDraft::titled("Scratch")
        };
        assert!(matches!(
            Workshop::create(zero, UserId::new(), t0()),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            Workshop::create(WorkshopDraft::titled("  "), UserId::new(), t0()),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn create_rejects_inverted_dates() {
        let draft = WorkshopDraft {
            start_date: Some(t0()),
            end_date: Some(t0() - Duration::days(1)),
            ..WorkshopDraft::titled("Arduino")
        };
        assert!(Workshop::create(draft, UserId::new(), t0()).is_err());
    }

    #[test]
    fn patch_sets_fields_and_updated_at() {
        let mut w = robotics();
        let later = t0() + Duration::hours(1);
        WorkshopPatch {
            title: Some("Robotics 102".into()),
            is_published: Some(true),
            ..Default::default()
        }
        .apply(&mut w, later)
        .unwrap();

        assert_eq!(w.title, "Robotics 102");
        assert!(w.is_published);
        assert_eq!(w.updated_at, Some(later));
        assert!(w.same_identity_as(&robotics_with_id(w.id)));
        assert_ne!(w, robotics_with_id(w.id));
    }

    fn robotics_with_id(id: WorkshopId) -> Workshop {
        Workshop { id, ..robotics() }
    }

    #[test]
    fn invalid_patch_leaves_workshop_untouched() {
        let mut w = robotics();
        let before = w.clone();
        let result = WorkshopPatch {
            title: Some("Renamed".into()),
            max_students: Some(0),
            ..Default::default()
        }
        .apply(&mut w, t0());

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert_eq!(w, before);
    }

    #[test]
    fn empty_patch_is_noop() {
        let mut w = robotics();
        let before = w.clone();
        WorkshopPatch::default().apply(&mut w, t0() + Duration::days(1)).unwrap();
        assert_eq!(w, before);
    }

    #[test]
    fn summary_saturates_available_spots() {
        let w = robotics();
        assert_eq!(WorkshopSummary::new(w.clone(), 3).available_spots, 17);
        let over = WorkshopSummary::new(w, 25);
        assert_eq!(over.available_spots, 0);
        assert!(over.is_full());
    }

    #[test]
    fn summary_serializes_flat() {
        let json = serde_json::to_value(WorkshopSummary::new(robotics(), 1)).unwrap();
        assert_eq!(json["title"], "Robotics 101");
        assert_eq!(json["available_spots"], 19);
    }
}
