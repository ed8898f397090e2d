use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, RequestId};

/// Request status lifecycle.
///
/// A closed enumeration replacing the free-text status the upstream system
/// stores; parsed case-insensitively at the boundary, rendered with the
/// original state names for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Parse a stored status string. Case-insensitive: "approved",
    /// "Approved" and "APPROVED" are the same state.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown request status '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrow view of a stock request, as served by the request directory.
///
/// The office is a free-text name in the upstream record; resolving it to an
/// `OfficeId` is the office directory's job, not the engine's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub status: RequestStatus,
    pub office_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RequestStatus::parse("Approved").unwrap(), RequestStatus::Approved);
        assert_eq!(RequestStatus::parse("approved").unwrap(), RequestStatus::Approved);
        assert_eq!(RequestStatus::parse("  APPROVED ").unwrap(), RequestStatus::Approved);
        assert_eq!(RequestStatus::parse("pending").unwrap(), RequestStatus::Pending);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = RequestStatus::parse("fulfilled").unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("fulfilled")),
            _ => panic!("expected Validation"),
        }
    }

    #[test]
    fn display_keeps_original_state_names() {
        assert_eq!(RequestStatus::Approved.to_string(), "Approved");
        assert_eq!(RequestStatus::Pending.to_string(), "Pending");
        assert_eq!(RequestStatus::Rejected.to_string(), "Rejected");
    }
}
