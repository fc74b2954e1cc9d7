//! Bounded-concurrency batch processing with idempotent resume.
//!
//! Work items are dispatched through a bounded stream; completions are
//! aggregated on the driver task, so the completed count is monotonic even
//! when completion order differs from submission order. An item that already
//! carries a result is skipped without any remote call, and one failing item
//! never aborts the batch.

use std::sync::Arc;

use futures::stream::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::models::job::{ItemFailure, ItemOutcome, JobReport, Progress, WorkItem};

use super::api::ApiError;
use super::automl::{AutoMlClient, PredictResponse};
use super::auth::IdentityProvider;
use super::table::{CellValue, FieldKind, SourceTable, TableError, TableRecord};

/// Output fields written back to the source table.
pub const PREDICTION_FIELD: &str = "Prediction";
pub const CONFIDENCE_FIELD: &str = "Confidence";

/// The per-item side effect. Only called for items without an existing
/// result; the skip decision belongs to the runner.
pub trait ItemAction {
    fn process(
        &self,
        item: &WorkItem,
    ) -> impl std::future::Future<Output = Result<ItemOutcome, ItemError>> + Send;
}

pub struct BatchJobRunner {
    concurrency: usize,
    progress: Option<UnboundedSender<Progress>>,
}

impl BatchJobRunner {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    /// Emit a progress event after every terminal item.
    pub fn with_progress(mut self, sink: UnboundedSender<Progress>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Run the batch to completion. The report's `finished` flag is only set
    /// after every item is terminal and the completion stream is drained.
    pub async fn run<A: ItemAction>(&self, items: Vec<WorkItem>, action: &A) -> JobReport {
        let run_id = Uuid::new_v4();
        let total = items.len();
        tracing::info!(run_id = %run_id, total, concurrency = self.concurrency, "Starting batch run");

        let mut completions = futures::stream::iter(items.into_iter().map(|item| async move {
            let outcome = if item.existing_result.is_some() {
                tracing::debug!(item = %item.id, "Already predicted, skipping record");
                ItemOutcome::Skipped
            } else {
                match action.process(&item).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(item = %item.id, error = %e, "Item processing failed");
                        ItemOutcome::Failed(e.to_string())
                    }
                }
            };
            (item, outcome)
        }))
        .buffer_unordered(self.concurrency);

        let mut completed = 0usize;
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;
        let mut failures = Vec::new();

        while let Some((item, outcome)) = completions.next().await {
            completed += 1;
            match outcome {
                ItemOutcome::Succeeded => succeeded += 1,
                ItemOutcome::Skipped => skipped += 1,
                ItemOutcome::Failed(message) => {
                    failed += 1;
                    failures.push(ItemFailure {
                        item_id: item.id.clone(),
                        message,
                    });
                }
            }
            if let Some(sink) = &self.progress {
                // A closed receiver just means nobody is watching.
                let _ = sink.send(Progress {
                    completed,
                    total,
                    current_label: format!("Predicted {} out of {} records.", completed, total),
                });
            }
        }

        let report = JobReport {
            run_id,
            total,
            completed,
            succeeded,
            failed,
            skipped,
            failures,
            finished: true,
        };
        tracing::info!(
            run_id = %run_id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Batch run complete"
        );
        report
    }
}

/// Ensure the two output fields exist before a run. Idempotent.
pub async fn prepare_output_fields<T: SourceTable>(table: &T) -> Result<(), TableError> {
    table.ensure_field(PREDICTION_FIELD, FieldKind::Text).await?;
    table.ensure_field(CONFIDENCE_FIELD, FieldKind::Number).await?;
    Ok(())
}

/// Map table records to work items: the first attachment of the image field
/// and any prediction written by an earlier run.
pub fn collect_work_items(records: &[TableRecord], image_field: &str) -> Vec<WorkItem> {
    records
        .iter()
        .map(|record| {
            let image_url = match record.cell(image_field) {
                Some(CellValue::Attachments(urls)) => urls.first().cloned(),
                Some(CellValue::Text(url)) if !url.is_empty() => Some(url.clone()),
                _ => None,
            };
            WorkItem {
                id: record.id.clone(),
                image_url,
                existing_result: record.text(PREDICTION_FIELD).map(str::to_string),
            }
        })
        .collect()
}

/// The production per-item action: fetch the image, predict, write the top
/// candidate's label and score back.
pub struct PredictAction<T, I> {
    table: Arc<T>,
    automl: Arc<AutoMlClient<I>>,
    http: reqwest::Client,
    project_id: String,
    model_id: String,
    score_threshold: f64,
}

impl<T: SourceTable, I: IdentityProvider> PredictAction<T, I> {
    pub fn new(
        table: Arc<T>,
        automl: Arc<AutoMlClient<I>>,
        http: reqwest::Client,
        project_id: impl Into<String>,
        model_id: impl Into<String>,
        score_threshold: f64,
    ) -> Self {
        Self {
            table,
            automl,
            http,
            project_id: project_id.into(),
            model_id: model_id.into(),
            score_threshold,
        }
    }

    /// Write the top candidate's label and score back to the record. An
    /// empty payload means nothing cleared the threshold: there is no result
    /// to record and the item counts as skipped.
    pub async fn record_top_candidate(
        &self,
        item: &WorkItem,
        response: &PredictResponse,
    ) -> Result<ItemOutcome, ItemError> {
        match response.top() {
            Some(candidate) => {
                self.table
                    .write_cells(
                        &item.id,
                        vec![
                            (
                                PREDICTION_FIELD.to_string(),
                                CellValue::Text(candidate.display_name.clone()),
                            ),
                            (
                                CONFIDENCE_FIELD.to_string(),
                                CellValue::Number(candidate.score()),
                            ),
                        ],
                    )
                    .await?;
                Ok(ItemOutcome::Succeeded)
            }
            None => {
                tracing::debug!(item = %item.id, "No candidate above threshold, skipping record");
                Ok(ItemOutcome::Skipped)
            }
        }
    }
}

impl<T, I> ItemAction for PredictAction<T, I>
where
    T: SourceTable + Sync + Send,
    I: IdentityProvider + Sync + Send,
{
    async fn process(&self, item: &WorkItem) -> Result<ItemOutcome, ItemError> {
        let Some(url) = &item.image_url else {
            tracing::debug!(item = %item.id, "No image attachment, skipping record");
            return Ok(ItemOutcome::Skipped);
        };

        let image = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let response = self
            .automl
            .predict(&self.project_id, &self.model_id, &image, self.score_threshold)
            .await?;

        self.record_top_candidate(item, &response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("image fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Table(#[from] TableError),
}
