//! Run result types consumed by the CLI reporter.

use std::path::PathBuf;
use std::time::Duration;

/// Terminal status of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// Executed against live data.
    Completed,
    /// Validated by a dry run; nothing was read or written.
    Validated,
    /// Rendered to empty or whitespace-only SQL and never submitted.
    Skipped,
}

impl UnitStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Validated => "Validated",
            Self::Skipped => "Skipped",
        }
    }
}

/// Per-unit result: path, disposition, and elapsed wall-clock time.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub path: PathBuf,
    pub status: UnitStatus,
    pub duration: Duration,
}

/// Result of a whole run. Outcomes exist for console reporting only;
/// nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<UnitOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    /// Terminal summary for the zero-units case.
    pub fn empty(duration: Duration) -> Self {
        Self {
            outcomes: Vec::new(),
            duration,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.count(UnitStatus::Completed)
    }

    pub fn validated(&self) -> usize {
        self.count(UnitStatus::Validated)
    }

    pub fn skipped(&self) -> usize {
        self.count(UnitStatus::Skipped)
    }

    fn count(&self, status: UnitStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
