//! Email address value object.

use serde::{Deserialize, Serialize};

use crate::{DomainError, DomainResult, ValueObject};

/// A syntactically plausible, normalized email address.
///
/// Normalization trims surrounding whitespace and lower-cases the whole
/// address, so equality (and therefore the uniqueness constraint on users) is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::invalid_input("invalid email format"));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::invalid_input("invalid email format"));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid_input("email cannot contain whitespace"));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Email {}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl core::str::FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = Email::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert_eq!(email, Email::parse("alice@example.com").unwrap());
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["", "alice", "@example.com", "alice@", "a@b@c", "al ice@example.com"] {
            assert!(Email::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: Email = serde_json::from_str("\"Bob@X.com\"").unwrap();
        assert_eq!(ok.as_str(), "bob@x.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }

    proptest! {
        /// Property: parsing is idempotent on its own output.
        #[test]
        fn parse_is_idempotent(local in "[A-Za-z0-9._]{1,16}", domain in "[A-Za-z0-9]{1,12}\\.[a-z]{2,4}") {
            let first = Email::parse(&format!("{local}@{domain}")).unwrap();
            let second = Email::parse(first.as_str()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
