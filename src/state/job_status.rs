/// Job status definitions for tracking crawl progress
///
/// A job moves `queued → running → {completed | completed_with_errors | failed}`.
/// Terminal states are sticky.
use std::fmt;

/// Represents the current state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    // ===== Active States =====
    /// Job has been accepted but its control loop has not started
    Queued,

    /// Control loop is draining the frontier
    Running,

    // ===== Terminal States =====
    /// Frontier exhausted with an empty error log
    Completed,

    /// Frontier exhausted, at least one page failed
    CompletedWithErrors,

    /// The control loop itself faulted
    Failed,
}

impl JobStatus {
    /// Returns true if this is a terminal state (no further updates are accepted)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if a job in this state blocks a new start for the same key
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Position along the lifecycle; transitions never decrease it
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Completed | Self::CompletedWithErrors | Self::Failed => 2,
        }
    }

    /// Returns the wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its wire name
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "completed_with_errors" => Some(Self::CompletedWithErrors),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible job statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::Running,
            Self::Completed,
            Self::CompletedWithErrors,
            Self::Failed,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
