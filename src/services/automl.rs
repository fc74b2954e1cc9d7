//! Client for the AutoML model service: dataset and model management,
//! long-running operation lookup, and image prediction.

use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;

use crate::models::operation::{Operation, OperationList};

use super::api::{ApiError, HttpApi};
use super::auth::{CredentialManager, IdentityProvider};
use super::poller::OperationSource;

/// All AutoML resources live in a single location.
const LOCATION: &str = "us-central1";

pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub example_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDatasetsResponse {
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default)]
    pub deployment_state: String,
}

impl Model {
    pub fn is_deployed(&self) -> bool {
        self.deployment_state == "DEPLOYED"
    }

    pub fn short_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListModelsResponse {
    // The service names this field `model`, singular.
    #[serde(rename = "model", default)]
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionCandidate {
    #[serde(default)]
    pub annotation_spec_id: String,
    pub display_name: String,
    #[serde(default)]
    pub classification: Option<Classification>,
}

impl PredictionCandidate {
    pub fn score(&self) -> f64 {
        self.classification.as_ref().map_or(0.0, |c| c.score)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    pub score: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub payload: Vec<PredictionCandidate>,
}

impl PredictResponse {
    /// The highest-ranked candidate; the service returns them best-first.
    pub fn top(&self) -> Option<&PredictionCandidate> {
        self.payload.first()
    }
}

pub struct AutoMlClient<I> {
    api: HttpApi<I>,
}

impl<I: IdentityProvider> AutoMlClient<I> {
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<CredentialManager<I>>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api: HttpApi::new(http, credentials, endpoint),
        }
    }

    fn base(project_id: &str) -> String {
        format!("/v1/projects/{}/locations/{}", project_id, LOCATION)
    }

    pub async fn list_datasets(&self, project_id: &str) -> Result<ListDatasetsResponse, ApiError> {
        self.api
            .get(&format!("{}/datasets", Self::base(project_id)))
            .await
    }

    pub async fn create_dataset(
        &self,
        project_id: &str,
        display_name: &str,
        classification_type: &str,
    ) -> Result<Dataset, ApiError> {
        let payload = serde_json::json!({
            "displayName": display_name,
            "imageClassificationDatasetMetadata": {
                "classificationType": classification_type,
            },
        });
        self.api
            .post(&format!("{}/datasets", Self::base(project_id)), &payload)
            .await
    }

    /// Start importing labeled images from the object store. Returns the
    /// operation handle to poll.
    pub async fn import_data(
        &self,
        project_id: &str,
        dataset_id: &str,
        labels_uri: &str,
    ) -> Result<Operation, ApiError> {
        let payload = serde_json::json!({
            "inputConfig": {
                "gcsSource": { "inputUris": [labels_uri] },
            },
        });
        self.api
            .post(
                &format!("{}/datasets/{}:importData", Self::base(project_id), dataset_id),
                &payload,
            )
            .await
    }

    /// Start training a model on an imported dataset. `training_budget` is in
    /// node hours; the wire format wants milli-node-hours.
    pub async fn create_model(
        &self,
        project_id: &str,
        dataset_id: &str,
        display_name: &str,
        training_budget: u64,
    ) -> Result<Operation, ApiError> {
        let payload = serde_json::json!({
            "displayName": display_name,
            "datasetId": dataset_id,
            "imageClassificationModelMetadata": {
                "trainBudgetMilliNodeHours": 1000 * training_budget,
                "modelType": "cloud",
            },
        });
        self.api
            .post(&format!("{}/models", Self::base(project_id)), &payload)
            .await
    }

    pub async fn list_models(&self, project_id: &str) -> Result<ListModelsResponse, ApiError> {
        self.api
            .get(&format!("{}/models", Self::base(project_id)))
            .await
    }

    pub async fn predict(
        &self,
        project_id: &str,
        model_id: &str,
        image: &[u8],
        score_threshold: f64,
    ) -> Result<PredictResponse, ApiError> {
        let payload = serde_json::json!({
            "payload": {
                "image": {
                    "imageBytes": base64::engine::general_purpose::STANDARD.encode(image),
                },
            },
            "params": {
                // The service takes the threshold as a string.
                "score_threshold": score_threshold.to_string(),
            },
        });
        self.api
            .post(
                &format!("{}/models/{}:predict", Self::base(project_id), model_id),
                &payload,
            )
            .await
    }
}

impl<I: IdentityProvider + Send + Sync> OperationSource for AutoMlClient<I> {
    async fn operation(&self, project_id: &str, operation_id: &str) -> Result<Operation, ApiError> {
        self.api
            .get(&format!("{}/operations/{}", Self::base(project_id), operation_id))
            .await
    }

    async fn active_operations(&self, project_id: &str) -> Result<Vec<Operation>, ApiError> {
        let list: OperationList = self
            .api
            .get(&format!("{}/operations", Self::base(project_id)))
            .await?;
        Ok(list.operations)
    }
}
