use serde::{Deserialize, Serialize};

use ellp_core::DomainError;

/// Role of a user account.
///
/// The set is closed: every authorization rule is written against these three
/// roles. `Aluno` is the student role; it is the only role that may hold
/// enrollments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Professor,
    Aluno,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Professor, Role::Aluno];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professor => "professor",
            Role::Aluno => "aluno",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Roles that may own (teach) a workshop.
    pub fn can_teach(&self) -> bool {
        matches!(self, Role::Admin | Role::Professor)
    }

    pub fn is_student(&self) -> bool {
        matches!(self, Role::Aluno)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "professor" => Ok(Role::Professor),
            "aluno" | "student" => Ok(Role::Aluno),
            other => Err(DomainError::invalid_input(format!(
                "unknown role '{other}' (expected one of: admin, professor, aluno)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("Student".parse::<Role>().unwrap(), Role::Aluno);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(matches!("root".parse::<Role>(), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn teaching_roles() {
        assert!(Role::Admin.can_teach());
        assert!(Role::Professor.can_teach());
        assert!(!Role::Aluno.can_teach());
    }
}
