/// Run outcome definitions for orchestrator runs
use std::fmt;

/// Terminal outcome of an ingestion or price-refresh run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// Run processed its whole batch (individual items may still have failed)
    #[default]
    Completed,

    /// Run stopped early because the provider signaled an access block;
    /// unfinished identifiers were returned to the pending queue
    Aborted,
}

impl RunOutcome {
    /// Returns true if the run was cut short by an access block
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Converts the outcome to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    /// Parses an outcome from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_aborted() {
        assert!(RunOutcome::Aborted.is_aborted());
        assert!(!RunOutcome::Completed.is_aborted());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for outcome in [RunOutcome::Completed, RunOutcome::Aborted] {
            assert_eq!(
                RunOutcome::from_db_string(outcome.to_db_string()),
                Some(outcome)
            );
        }
        assert_eq!(RunOutcome::from_db_string("running"), None);
    }
}
