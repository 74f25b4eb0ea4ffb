//! Request identifiers.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifier carried on every request and response envelope.
///
/// Callers may supply any string; when they don't, a fresh ULID is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new unique RequestId
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Echo the caller's id, or generate one when it is missing or empty.
    pub fn echo_or_generate(supplied: Option<&str>) -> Self {
        match supplied {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::new(),
        }
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echoes_supplied_id() {
        let id = RequestId::echo_or_generate(Some("req-001"));
        assert_eq!(id.as_str(), "req-001");
    }

    #[test]
    fn test_generates_when_missing_or_empty() {
        let a = RequestId::echo_or_generate(None);
        let b = RequestId::echo_or_generate(Some(""));
        assert_eq!(a.as_str().len(), 26);
        assert!(!b.as_str().is_empty());
        assert_ne!(a, b);
    }
}
