use serde::{Deserialize, Serialize};

use ellp_core::UserId;

use crate::{Role, User};

/// The authenticated identity performing an action.
///
/// Built from the user record after token verification, so `role` and
/// `is_active` reflect the account's current state, not what it was when the
/// token was issued.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub is_active: bool,
}

impl Actor {
    pub fn new(id: UserId, role: Role, is_active: bool) -> Self {
        Self { id, role, is_active }
    }

    pub fn is(&self, user_id: UserId) -> bool {
        self.id == user_id
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            is_active: user.is_active,
        }
    }
}
