//! Identity claim types
//!
//! An [`IdentityClaim`] is minted once by the identity callback and then only
//! ever travels inside an opaque token held by the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable numeric identity issued by the identity provider for a verified user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u64);

impl SubjectId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(SubjectId)
    }
}

impl From<u64> for SubjectId {
    fn from(value: u64) -> Self {
        SubjectId(value)
    }
}

/// Verified identity carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// Subject identifier scoped to the identity provider
    pub subject: SubjectId,
    /// When the claim was minted
    pub issued_at: DateTime<Utc>,
}

impl IdentityClaim {
    /// Create a claim for `subject` stamped with the current time
    pub fn new(subject: SubjectId) -> Self {
        Self::issued_at(subject, Utc::now())
    }

    /// Create a claim with an explicit issue time
    pub fn issued_at(subject: SubjectId, issued_at: DateTime<Utc>) -> Self {
        Self { subject, issued_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id_parse_and_display() {
        let id: SubjectId = "76561197960287930".parse().unwrap();
        assert_eq!(id, SubjectId(76561197960287930));
        assert_eq!(id.to_string(), "76561197960287930");

        assert!("not-a-number".parse::<SubjectId>().is_err());
        assert!("-1".parse::<SubjectId>().is_err());
    }

    #[test]
    fn test_claim_serializes_subject_as_number() {
        let claim = IdentityClaim::new(SubjectId(42));
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["subject"], 42);

        let back: IdentityClaim = serde_json::from_value(json).unwrap();
        assert_eq!(back, claim);
    }
}
