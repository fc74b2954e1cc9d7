use serde::{Deserialize, Serialize};

/// A long-running operation returned by the model service for asynchronous
/// work (dataset import, model training). The client only ever reads it;
/// state changes happen server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Fully qualified resource name, e.g.
    /// `projects/p/locations/us-central1/operations/123`.
    pub name: String,

    #[serde(default)]
    pub done: bool,

    /// Terminal error, if the operation finished unsuccessfully. Inspected by
    /// the caller; the poller treats it as a result, not as a poll failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl Operation {
    /// Last segment of the resource name.
    pub fn short_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationList {
    #[serde(default)]
    pub operations: Vec<Operation>,
}
