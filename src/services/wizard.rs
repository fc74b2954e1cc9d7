//! The wizard state machine sequencing the configuration steps.
//!
//! Steps advance forward only when the current step's typed output is
//! supplied; backward jumps keep later steps' data so re-entering a step is
//! edit-in-place. The whole state snapshot is persisted after every
//! transition. While settings are invalid or the credential probe has not
//! succeeded, the machine presents `NeedsCredentials` and refuses to advance.

use crate::config::Settings;
use crate::models::job::JobReport;
use crate::models::wizard::{
    CatalogCache, Choice, ModelConfig, SourceConfig, StepInput, WizardState, WizardStep, WizardView,
};
use garde::Validate;

use super::auth::{AuthError, CredentialManager, IdentityProvider};
use super::state_store::{StateStore, StoreError};

pub struct WizardStateMachine<S> {
    store: S,
    state: WizardState,
    /// Set by a successful credential probe; never persisted, so every
    /// process entry revalidates the identity material.
    unlocked: bool,
}

impl<S: StateStore> WizardStateMachine<S> {
    /// Restore persisted state, defaulting to step one.
    pub fn restore(store: S) -> Result<Self, WizardError> {
        let state = store.load()?.unwrap_or_default();
        Ok(Self {
            store,
            state,
            unlocked: false,
        })
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// What to present right now. Invalid settings or a missing probe
    /// preempt every step.
    pub fn view(&self, settings: &Settings) -> WizardView {
        if settings.validate().is_err() || !self.unlocked {
            WizardView::NeedsCredentials
        } else {
            WizardView::Step(self.state.step)
        }
    }

    /// Validate the identity material with a no-op privileged call. Unlocks
    /// the wizard on success.
    pub async fn probe<I: IdentityProvider>(
        &mut self,
        credentials: &CredentialManager<I>,
    ) -> Result<(), WizardError> {
        credentials.token().await?;
        self.unlocked = true;
        tracing::info!("Credential probe succeeded, wizard unlocked");
        Ok(())
    }

    /// Complete the current step with its typed output and move forward.
    pub fn advance(&mut self, input: StepInput) -> Result<WizardStep, WizardError> {
        if !self.unlocked {
            return Err(WizardError::CredentialsRequired);
        }
        let next = match (self.state.step, input) {
            (WizardStep::ChooseSource, StepInput::Source(source)) => {
                self.state.source = Some(source);
                WizardStep::ConfigureModel
            }
            (WizardStep::ConfigureModel, StepInput::Model(model)) => {
                self.state.model = Some(model);
                WizardStep::ReviewSettings
            }
            (WizardStep::ReviewSettings, StepInput::Confirm) => {
                if self.state.source.is_none() {
                    return Err(WizardError::MissingConfig("source"));
                }
                if self.state.model.is_none() {
                    return Err(WizardError::MissingConfig("model"));
                }
                WizardStep::RunJob
            }
            (step, input) => {
                return Err(WizardError::StepMismatch {
                    step,
                    input: input_name(&input),
                })
            }
        };
        self.state.step = next;
        self.persist()?;
        tracing::info!(step = %next, "Wizard advanced");
        Ok(next)
    }

    /// Jump to an earlier step (or any step whose prerequisites are already
    /// populated) without clearing later steps' data.
    pub fn goto(&mut self, step: WizardStep) -> Result<(), WizardError> {
        if !self.unlocked {
            return Err(WizardError::CredentialsRequired);
        }
        if step > self.state.step {
            let satisfied = match step {
                WizardStep::ChooseSource => true,
                WizardStep::ConfigureModel => self.state.source.is_some(),
                WizardStep::ReviewSettings | WizardStep::RunJob => {
                    self.state.source.is_some() && self.state.model.is_some()
                }
            };
            if !satisfied {
                return Err(WizardError::MissingConfig("earlier step incomplete"));
            }
        }
        self.state.step = step;
        self.persist()?;
        Ok(())
    }

    /// Universal recovery action: clear everything and return to step one.
    pub fn reset(&mut self) -> Result<(), WizardError> {
        self.store.clear()?;
        self.state = WizardState::default();
        tracing::info!("Wizard state reset");
        Ok(())
    }

    /// Persist the resumable part of a finished or interrupted run.
    pub fn record_job(&mut self, report: &JobReport) -> Result<(), WizardError> {
        self.state.job = Some(report.snapshot());
        self.persist()
    }

    /// Cache the project option list fetched for the configure step.
    pub fn cache_projects(&mut self, projects: Vec<Choice>) -> Result<(), WizardError> {
        self.state.cache.projects = projects;
        self.persist()
    }

    /// Cache the model option list fetched for the configure step.
    pub fn cache_models(&mut self, models: Vec<Choice>) -> Result<(), WizardError> {
        self.state.cache.models = models;
        self.persist()
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.state.cache
    }

    /// True once the review step has been confirmed; the batch must not run
    /// from any earlier step.
    pub fn at_run_step(&self) -> bool {
        self.state.step == WizardStep::RunJob
    }

    /// True when a recorded run already completed; re-running would redo
    /// nothing but still enumerate the table.
    pub fn job_finished(&self) -> bool {
        self.state.job.as_ref().is_some_and(|job| job.finished)
    }

    pub fn source(&self) -> Option<&SourceConfig> {
        self.state.source.as_ref()
    }

    pub fn model(&self) -> Option<&ModelConfig> {
        self.state.model.as_ref()
    }

    fn persist(&mut self) -> Result<(), WizardError> {
        self.store.save(&self.state)?;
        Ok(())
    }
}

fn input_name(input: &StepInput) -> &'static str {
    match input {
        StepInput::Source(_) => "source",
        StepInput::Model(_) => "model",
        StepInput::Confirm => "confirm",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("credentials have not been validated")]
    CredentialsRequired,

    #[error("step {step} does not accept {input} input")]
    StepMismatch {
        step: WizardStep,
        input: &'static str,
    },

    #[error("required configuration is missing: {0}")]
    MissingConfig(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
