//! User identity as seen by the core.
//!
//! The authentication provider is opaque: core only receives an optional
//! identifier string. A missing identity is not an error, it selects the
//! device-local bucket instead.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Bucket used when no authenticated identity is available.
pub const LOCAL_USER_ID: &str = "local";

/// Partition key for every book row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Maps the auth collaborator's identifier onto a partition key.
    ///
    /// `None` and blank values map to [`LOCAL_USER_ID`].
    pub fn from_auth(identity: Option<&str>) -> Self {
        match identity.map(str::trim) {
            Some(value) if !value.is_empty() => Self(value.to_string()),
            _ => Self::local(),
        }
    }

    pub fn local() -> Self {
        Self(LOCAL_USER_ID.to_string())
    }

    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_USER_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{UserId, LOCAL_USER_ID};

    #[test]
    fn missing_or_blank_identity_maps_to_local_bucket() {
        assert_eq!(UserId::from_auth(None).as_str(), LOCAL_USER_ID);
        assert!(UserId::from_auth(Some("   ")).is_local());
    }

    #[test]
    fn identity_is_trimmed() {
        assert_eq!(UserId::from_auth(Some(" uid-42 ")).as_str(), "uid-42");
    }
}
