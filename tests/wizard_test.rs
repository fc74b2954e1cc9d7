//! Wizard state machine: step sequencing, edit-in-place backward jumps,
//! credential gating, and whole-snapshot persistence.

mod helpers;

use helpers::{settings, CountingIdentity};
use uuid::Uuid;

use automl_predict::models::job::JobReport;
use automl_predict::models::wizard::{ModelConfig, SourceConfig, StepInput, WizardStep, WizardView};
use automl_predict::services::auth::CredentialManager;
use automl_predict::services::state_store::{MemoryStore, StateStore};
use automl_predict::services::wizard::{WizardError, WizardStateMachine};

fn source_config() -> SourceConfig {
    SourceConfig {
        table: "Products".to_string(),
        image_field: "Images".to_string(),
    }
}

fn model_config() -> ModelConfig {
    ModelConfig {
        project_id: "demo-project".to_string(),
        model_id: "projects/demo-project/locations/us-central1/models/ICN123".to_string(),
        model_name: "product-classifier".to_string(),
    }
}

async fn unlocked_wizard(store: MemoryStore) -> WizardStateMachine<MemoryStore> {
    let manager = CredentialManager::new(CountingIdentity::new(), settings());
    let mut wizard = WizardStateMachine::restore(store).unwrap();
    wizard.probe(&manager).await.unwrap();
    wizard
}

#[tokio::test]
async fn advance_walks_the_steps_in_order() {
    let mut wizard = unlocked_wizard(MemoryStore::new()).await;
    assert_eq!(wizard.state().step, WizardStep::ChooseSource);

    let step = wizard.advance(StepInput::Source(source_config())).unwrap();
    assert_eq!(step, WizardStep::ConfigureModel);

    let step = wizard.advance(StepInput::Model(model_config())).unwrap();
    assert_eq!(step, WizardStep::ReviewSettings);

    let step = wizard.advance(StepInput::Confirm).unwrap();
    assert_eq!(step, WizardStep::RunJob);
    assert_eq!(step.index(), 4);
}

#[tokio::test]
async fn backward_jump_preserves_later_steps_data() {
    let mut wizard = unlocked_wizard(MemoryStore::new()).await;
    wizard.advance(StepInput::Source(source_config())).unwrap();
    wizard.advance(StepInput::Model(model_config())).unwrap();

    wizard.goto(WizardStep::ChooseSource).unwrap();
    assert_eq!(wizard.state().step, WizardStep::ChooseSource);
    assert_eq!(wizard.model(), Some(&model_config()), "edit must not clear later data");

    // Re-advancing with the same fields reproduces the same source config.
    wizard.advance(StepInput::Source(source_config())).unwrap();
    assert_eq!(wizard.source(), Some(&source_config()));
    assert_eq!(wizard.model(), Some(&model_config()));
}

#[tokio::test]
async fn mismatched_input_is_rejected() {
    let mut wizard = unlocked_wizard(MemoryStore::new()).await;

    let result = wizard.advance(StepInput::Confirm);
    assert!(matches!(result, Err(WizardError::StepMismatch { .. })));
    assert_eq!(wizard.state().step, WizardStep::ChooseSource);
}

#[tokio::test]
async fn forward_jump_requires_prerequisites() {
    let mut wizard = unlocked_wizard(MemoryStore::new()).await;

    let result = wizard.goto(WizardStep::RunJob);
    assert!(matches!(result, Err(WizardError::MissingConfig(_))));

    wizard.advance(StepInput::Source(source_config())).unwrap();
    wizard.advance(StepInput::Model(model_config())).unwrap();
    wizard.goto(WizardStep::ChooseSource).unwrap();

    // Both configs are populated now, so jumping straight back is allowed.
    wizard.goto(WizardStep::ReviewSettings).unwrap();
    assert_eq!(wizard.state().step, WizardStep::ReviewSettings);
}

#[tokio::test]
async fn failed_probes_keep_the_wizard_locked() {
    let identity = CountingIdentity::failing(2);
    let manager = CredentialManager::new(identity.clone(), settings());
    let mut wizard = WizardStateMachine::restore(MemoryStore::new()).unwrap();

    assert!(wizard.probe(&manager).await.is_err());
    assert!(wizard.probe(&manager).await.is_err());
    assert_eq!(identity.calls(), 2);

    assert_eq!(wizard.view(&settings()), WizardView::NeedsCredentials);
    let result = wizard.advance(StepInput::Source(source_config()));
    assert!(matches!(result, Err(WizardError::CredentialsRequired)));
}

#[tokio::test]
async fn invalid_settings_preempt_every_step() {
    let wizard = unlocked_wizard(MemoryStore::new()).await;

    let mut incomplete = settings();
    incomplete.svc_key = String::new();

    assert_eq!(wizard.view(&incomplete), WizardView::NeedsCredentials);
    assert_eq!(wizard.view(&settings()), WizardView::Step(WizardStep::ChooseSource));
}

#[tokio::test]
async fn state_is_persisted_across_instances() {
    let store = MemoryStore::new();
    let mut wizard = unlocked_wizard(store.clone()).await;
    wizard.advance(StepInput::Source(source_config())).unwrap();
    wizard.advance(StepInput::Model(model_config())).unwrap();

    let restored = WizardStateMachine::restore(store).unwrap();
    assert_eq!(restored.state().step, WizardStep::ReviewSettings);
    assert_eq!(restored.source(), Some(&source_config()));
    assert_eq!(restored.model(), Some(&model_config()));

    // A fresh instance always requires a new probe.
    assert_eq!(restored.view(&settings()), WizardView::NeedsCredentials);
}

#[tokio::test]
async fn reset_clears_the_store_and_returns_to_step_one() {
    let store = MemoryStore::new();
    let mut wizard = unlocked_wizard(store.clone()).await;
    wizard.advance(StepInput::Source(source_config())).unwrap();

    wizard.reset().unwrap();

    assert_eq!(wizard.state().step, WizardStep::ChooseSource);
    assert_eq!(wizard.source(), None);
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn catalog_lists_are_cached_in_the_snapshot() {
    use automl_predict::models::wizard::Choice;

    let store = MemoryStore::new();
    let mut wizard = unlocked_wizard(store.clone()).await;

    wizard
        .cache_projects(vec![Choice {
            value: "demo-project".to_string(),
            label: "Demo".to_string(),
            disabled: false,
        }])
        .unwrap();
    wizard
        .cache_models(vec![Choice {
            value: "projects/demo-project/locations/us-central1/models/ICN123".to_string(),
            label: "product-classifier".to_string(),
            disabled: false,
        }])
        .unwrap();

    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.cache.projects.len(), 1);
    assert_eq!(persisted.cache.models.len(), 1);
    assert_eq!(wizard.catalog().projects[0].label, "Demo");
}

#[tokio::test]
async fn job_snapshot_is_persisted_for_resume() {
    let store = MemoryStore::new();
    let mut wizard = unlocked_wizard(store.clone()).await;
    wizard.advance(StepInput::Source(source_config())).unwrap();
    wizard.advance(StepInput::Model(model_config())).unwrap();
    wizard.advance(StepInput::Confirm).unwrap();

    let report = JobReport {
        run_id: Uuid::new_v4(),
        total: 3,
        completed: 3,
        succeeded: 2,
        failed: 0,
        skipped: 1,
        failures: Vec::new(),
        finished: true,
    };
    wizard.record_job(&report).unwrap();

    let persisted = store.load().unwrap().unwrap();
    let snapshot = persisted.job.unwrap();
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.completed, 3);
    assert!(snapshot.finished);
}

#[tokio::test]
async fn batch_runs_only_from_a_confirmed_run_step() {
    let mut wizard = unlocked_wizard(MemoryStore::new()).await;
    assert!(!wizard.at_run_step());

    wizard.advance(StepInput::Source(source_config())).unwrap();
    wizard.advance(StepInput::Model(model_config())).unwrap();
    // Both configs are in place, but the review step is not confirmed yet.
    assert!(!wizard.at_run_step());

    wizard.advance(StepInput::Confirm).unwrap();
    assert!(wizard.at_run_step());

    wizard.goto(WizardStep::ConfigureModel).unwrap();
    assert!(!wizard.at_run_step());
}

#[tokio::test]
async fn finished_runs_are_detected_from_the_snapshot() {
    let store = MemoryStore::new();
    let mut wizard = unlocked_wizard(store.clone()).await;
    wizard.advance(StepInput::Source(source_config())).unwrap();
    wizard.advance(StepInput::Model(model_config())).unwrap();
    wizard.advance(StepInput::Confirm).unwrap();
    assert!(!wizard.job_finished());

    let mut report = JobReport {
        run_id: Uuid::new_v4(),
        total: 5,
        completed: 2,
        succeeded: 2,
        failed: 0,
        skipped: 0,
        failures: Vec::new(),
        finished: false,
    };
    wizard.record_job(&report).unwrap();
    assert!(!wizard.job_finished());

    report.completed = 5;
    report.succeeded = 5;
    report.finished = true;
    wizard.record_job(&report).unwrap();
    assert!(wizard.job_finished());

    let restored = WizardStateMachine::restore(store).unwrap();
    assert!(restored.job_finished());
}
