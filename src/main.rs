use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use automl_predict::{
    app_state::AppState,
    config::AppConfig,
    services::{
        automl::DEFAULT_SCORE_THRESHOLD,
        runner::{self, BatchJobRunner, PredictAction},
        state_store::JsonFileStore,
        table::{JsonFileTable, SourceTable},
        wizard::WizardStateMachine,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting prediction runner");

    let config = AppConfig::from_env().expect("Failed to load configuration");
    let state = AppState::new(&config);

    let store = JsonFileStore::new(&config.state_path);
    let mut wizard = WizardStateMachine::restore(store).expect("Failed to restore wizard state");

    // Validate identity material before touching anything else.
    wizard
        .probe(&state.credentials)
        .await
        .expect("Credential probe failed, check service account settings");

    // Only a confirmed review step may run; a wizard parked on an earlier
    // step (for example after a backward edit) must not trigger the batch.
    if !wizard.at_run_step() {
        tracing::error!(
            step = %wizard.state().step,
            "Wizard has not confirmed the run step, nothing to run"
        );
        std::process::exit(1);
    }

    if wizard.job_finished() {
        tracing::info!("Recorded run is already finished, nothing to do");
        return;
    }

    let (Some(source), Some(model)) = (wizard.source().cloned(), wizard.model().cloned()) else {
        tracing::error!("Wizard is not configured through the review step, nothing to run");
        std::process::exit(1);
    };

    tracing::info!(
        table = %source.table,
        image_field = %source.image_field,
        project = %model.project_id,
        model = %model.model_name,
        "Resuming prediction job"
    );

    let table = Arc::new(JsonFileTable::new(&config.table_path));
    runner::prepare_output_fields(table.as_ref())
        .await
        .expect("Failed to prepare output fields");

    let records = table.records().await.expect("Failed to enumerate records");
    let items = runner::collect_work_items(&records, &source.image_field);

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<automl_predict::models::job::Progress>();
    let reporter = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            tracing::info!(
                completed = progress.completed,
                total = progress.total,
                "{}",
                progress.current_label
            );
        }
    });

    let action = PredictAction::new(
        table.clone(),
        state.automl.clone(),
        state.http.clone(),
        model.project_id.clone(),
        model.short_model_id().to_string(),
        DEFAULT_SCORE_THRESHOLD,
    );

    // Concurrency 1 keeps the prediction calls serialized under the service
    // rate limits.
    let job_runner = BatchJobRunner::new(1).with_progress(progress_tx);
    let report = job_runner.run(items, &action).await;
    // Drops the progress sender so the reporter task can drain and exit.
    drop(job_runner);

    table.unload();
    wizard.record_job(&report).expect("Failed to persist job state");
    let _ = reporter.await;

    tracing::info!(
        run_id = %report.run_id,
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Prediction run finished"
    );
}
