use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::job::JobSnapshot;

/// Wizard steps in order. `Ord` follows declaration order, which is the
/// forward direction of the wizard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WizardStep {
    ChooseSource,
    ConfigureModel,
    ReviewSettings,
    RunJob,
}

impl WizardStep {
    /// 1-based position shown to the user.
    pub fn index(self) -> usize {
        self as usize + 1
    }
}

/// What the caller should present: either a regular step, or the credential
/// form that preempts everything while settings are invalid or unprobed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardView {
    NeedsCredentials,
    Step(WizardStep),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub table: String,
    pub image_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub project_id: String,
    /// Fully qualified model resource name.
    pub model_id: String,
    pub model_name: String,
}

impl ModelConfig {
    /// Last segment of the model resource name, as expected by the predict
    /// endpoint.
    pub fn short_model_id(&self) -> &str {
        self.model_id.rsplit('/').next().unwrap_or(&self.model_id)
    }
}

/// A selectable project or model option cached after listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub disabled: bool,
}

/// Cached option lists for the configure-model step, refreshed only when
/// absent. `reset()` is the recovery path for stale entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCache {
    #[serde(default)]
    pub projects: Vec<Choice>,
    #[serde(default)]
    pub models: Vec<Choice>,
}

/// The whole persisted wizard snapshot. Written back atomically after every
/// transition; backward navigation never clears later steps' data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: WizardStep,
    pub source: Option<SourceConfig>,
    pub model: Option<ModelConfig>,
    pub job: Option<JobSnapshot>,
    #[serde(default)]
    pub cache: CatalogCache,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: WizardStep::ChooseSource,
            source: None,
            model: None,
            job: None,
            cache: CatalogCache::default(),
        }
    }
}

/// Typed output of a completed step, consumed by `advance`. Makes it
/// impossible to reach the run step without both configurations.
#[derive(Debug, Clone)]
pub enum StepInput {
    Source(SourceConfig),
    Model(ModelConfig),
    Confirm,
}
