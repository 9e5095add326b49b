use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an aggregate instance.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// aggregate IDs with other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

/// Unique identifier for a single event occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected bounded context name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidContextName {
    #[error("context name must not be empty")]
    Empty,

    /// `:` separates topic segments, so it cannot appear in a context name.
    #[error("context name '{0}' must not contain ':'")]
    ContainsSeparator(String),

    #[error("context name '{0}' must be lower-case")]
    NotLowercase(String),
}

/// Name of a bounded context (e.g. `accounts`, `enrollment`).
///
/// Used as the owner key for handler registries and as the middle
/// segment of integration topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundedContext(String);

impl BoundedContext {
    /// Validates and wraps a context name.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidContextName> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidContextName::Empty);
        }
        if name.contains(':') {
            return Err(InvalidContextName::ContainsSeparator(name));
        }
        if name.chars().any(char::is_uppercase) {
            return Err(InvalidContextName::NotLowercase(name));
        }
        Ok(Self(name))
    }

    /// Returns the context name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BoundedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BoundedContext {
    type Error = InvalidContextName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoundedContext> for String {
    fn from(context: BoundedContext) -> Self {
        context.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_id_new_creates_unique_ids() {
        let id1 = AggregateId::new();
        let id2 = AggregateId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn aggregate_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = AggregateId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn bounded_context_accepts_plain_names() {
        let context = BoundedContext::new("accounts").unwrap();
        assert_eq!(context.as_str(), "accounts");
        assert_eq!(context.to_string(), "accounts");
    }

    #[test]
    fn bounded_context_rejects_empty_and_separator() {
        assert_eq!(BoundedContext::new(""), Err(InvalidContextName::Empty));
        assert!(matches!(
            BoundedContext::new("acc:ounts"),
            Err(InvalidContextName::ContainsSeparator(_))
        ));
    }

    #[test]
    fn bounded_context_rejects_upper_case() {
        assert_eq!(
            BoundedContext::new("Accounts"),
            Err(InvalidContextName::NotLowercase("Accounts".to_string()))
        );
        assert!(BoundedContext::new("program_catalog").is_ok());
    }

    #[test]
    fn bounded_context_deserialization_validates() {
        let ok: BoundedContext = serde_json::from_str("\"enrollment\"").unwrap();
        assert_eq!(ok.as_str(), "enrollment");

        let bad = serde_json::from_str::<BoundedContext>("\"a:b\"");
        assert!(bad.is_err());
        assert!(serde_json::from_str::<BoundedContext>("\"Enrollment\"").is_err());
    }
}
