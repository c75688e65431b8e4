// Recipient addressing
//
// A notification is addressed either to the administrative operator role
// (a fixed sentinel identifier) or to an individual patient, keyed by the
// patient's unique identifier. Recipients are not validated against a user
// directory: a record addressed to an identifier nobody subscribes to is
// simply never surfaced.

use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, Result};

/// Sentinel identifier for the administrative operator role
pub const ADMIN_RECIPIENT: &str = "admin";

/// A validated recipient identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    /// The administrative operator role
    pub fn admin() -> Self {
        Recipient(ADMIN_RECIPIENT.to_string())
    }

    /// A specific patient, keyed by their unique identifier
    pub fn patient(id: impl Into<String>) -> Result<Self> {
        Self::parse(id.into())
    }

    /// Validate an incoming identifier. Only emptiness is rejected;
    /// existence checks are out of scope by design.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(NotifyError::invalid_recipient("empty identifier"));
        }
        Ok(Recipient(id))
    }

    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_RECIPIENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Recipient> for String {
    fn from(r: Recipient) -> String {
        r.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_sentinel() {
        let admin = Recipient::admin();
        assert!(admin.is_admin());
        assert_eq!(admin.as_str(), "admin");
    }

    #[test]
    fn test_patient_recipient() {
        let patient = Recipient::patient("u123").unwrap();
        assert!(!patient.is_admin());
        assert_eq!(patient.as_str(), "u123");
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(Recipient::parse("").is_err());
        assert!(Recipient::parse("   ").is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let r: Recipient = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(r.as_str(), "p1");
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"p1\"");
    }
}
