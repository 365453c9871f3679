//! Stage resolution
//!
//! Projects a job's raw `(status, progress)` pair onto the four display stages.
//! Progress is authoritative over a `started` label once it reaches
//! [`GENERATING_THRESHOLD`], while `finished` and `failed` always win.

use crate::types::{JobSnapshot, JobStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress value at which a non-terminal job is shown as generating.
pub const GENERATING_THRESHOLD: i64 = 30;

/// Coarse, ordered display stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued = 0,
    Started = 1,
    Generating = 2,
    Finished = 3,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Queued,
        Stage::Started,
        Stage::Generating,
        Stage::Finished,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Queued => "Queued",
            Stage::Started => "Processing",
            Stage::Generating => "Generating",
            Stage::Finished => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of [`resolve`]. `stage` is `None` exactly when `failed` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageView {
    pub stage: Option<Stage>,
    pub failed: bool,
    pub terminal: bool,
}

impl StageView {
    fn at(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            failed: false,
            terminal: stage == Stage::Finished,
        }
    }

    fn failed() -> Self {
        Self {
            stage: None,
            failed: true,
            terminal: true,
        }
    }

    /// Label for display; failed jobs show a marker instead of a stage position.
    pub fn label(&self) -> &'static str {
        match self.stage {
            Some(stage) => stage.label(),
            None => "Failed",
        }
    }
}

/// Map a status/progress pair to a display stage.
pub fn resolve(status: JobStatus, progress: i64) -> StageView {
    if status == JobStatus::Failed {
        return StageView::failed();
    }
    if status == JobStatus::Finished {
        return StageView::at(Stage::Finished);
    }
    if progress >= GENERATING_THRESHOLD {
        return StageView::at(Stage::Generating);
    }
    if status == JobStatus::Started {
        return StageView::at(Stage::Started);
    }
    StageView::at(Stage::Queued)
}

pub fn resolve_snapshot(job: &JobSnapshot) -> StageView {
    resolve(job.status, job.progress)
}
