/// Staging status definitions for the identifier queue
///
/// This module defines all possible states a staged identifier can be in
/// between discovery and catalog ingestion.
use std::fmt;

/// Represents the current status of a staged identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    // ===== Active States =====
    /// Identifier is waiting to be claimed by an ingestion run
    Pending,

    /// Identifier has been claimed and is currently being ingested
    Processing,

    // ===== Terminal Success States =====
    /// Identifier was successfully ingested into the catalog
    Completed,

    // ===== Terminal Skip States =====
    /// Identifier was found in the catalog before any external call was made
    Skipped,

    /// Identifier already existed in the catalog at discovery time
    Duplicate,

    // ===== Terminal Error States =====
    /// Ingestion failed permanently or exhausted its retry budget
    Failed,
}

impl StageStatus {
    /// Returns true if this is a terminal status (no further processing happens)
    ///
    /// Pending and Processing identifiers may still move; all others are final
    /// unless explicitly reset by an operator.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Processing)
    }

    /// Returns true if this is an active status (identifier may still be ingested)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Returns true if this represents a successful ingestion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if this represents a skip (no external call spent)
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped | Self::Duplicate)
    }

    /// Returns true if this represents a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Duplicate => "duplicate",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "skipped" => Some(Self::Skipped),
            "duplicate" => Some(Self::Duplicate),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Processing,
            Self::Completed,
            Self::Skipped,
            Self::Duplicate,
            Self::Failed,
        ]
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Processing.is_terminal());

        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Skipped.is_terminal());
        assert!(StageStatus::Duplicate.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
    }

    #[test]
    fn test_is_active() {
        assert!(StageStatus::Pending.is_active());
        assert!(StageStatus::Processing.is_active());

        assert!(!StageStatus::Completed.is_active());
        assert!(!StageStatus::Failed.is_active());
    }

    #[test]
    fn test_is_success() {
        assert!(StageStatus::Completed.is_success());

        assert!(!StageStatus::Pending.is_success());
        assert!(!StageStatus::Skipped.is_success());
        assert!(!StageStatus::Failed.is_success());
    }

    #[test]
    fn test_is_skipped() {
        assert!(StageStatus::Skipped.is_skipped());
        assert!(StageStatus::Duplicate.is_skipped());

        assert!(!StageStatus::Completed.is_skipped());
        assert!(!StageStatus::Failed.is_skipped());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for status in StageStatus::all_statuses() {
            let db_str = status.to_db_string();
            let parsed = StageStatus::from_db_string(db_str);
            assert_eq!(Some(status), parsed, "Failed roundtrip for {:?}", status);
        }
    }

    #[test]
    fn test_from_db_string_invalid() {
        assert_eq!(StageStatus::from_db_string("queued"), None);
        assert_eq!(StageStatus::from_db_string(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", StageStatus::Pending), "pending");
        assert_eq!(format!("{}", StageStatus::Duplicate), "duplicate");
    }

    #[test]
    fn test_all_statuses_complete() {
        let all = StageStatus::all_statuses();
        assert_eq!(all.len(), 6);

        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate status found");
            }
        }
    }
}
