use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of batch work, derived from a source table record.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    /// URL of the first image attachment, if the record has one.
    pub image_url: Option<String>,
    /// Prediction already written by an earlier run. Present means the item
    /// is skipped without any remote call.
    pub existing_result: Option<String>,
}

/// Terminal state of a single work item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Already done, or nothing to do (no attachment, no candidates).
    Skipped,
    Succeeded,
    Failed(String),
}

/// Progress event emitted after every item reaches a terminal state.
/// `completed` counts terminal items and is monotonically increasing even
/// when completion order differs from submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub current_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub message: String,
}

/// Summary of a finished batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
    pub finished: bool,
}

impl JobReport {
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            total: self.total,
            completed: self.completed,
            finished: self.finished,
        }
    }
}

/// The part of a run persisted across restarts for resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub total: usize,
    pub completed: usize,
    pub finished: bool,
}
