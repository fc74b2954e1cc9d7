use garde::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Google Cloud service account email
    pub gcloud_svc_email: String,

    /// Google Cloud service account private key (PEM)
    pub gcloud_svc_key: String,

    /// AutoML API endpoint
    #[serde(default = "default_automl_endpoint")]
    pub automl_endpoint: String,

    /// Cloud Storage JSON API endpoint
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,

    /// Cloud Resource Manager API endpoint
    #[serde(default = "default_crm_endpoint")]
    pub crm_endpoint: String,

    /// Path of the persisted wizard state snapshot
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Path of the JSON table document the runner binary operates on
    #[serde(default = "default_table_path")]
    pub table_path: String,
}

fn default_automl_endpoint() -> String {
    "https://automl.googleapis.com".to_string()
}

fn default_storage_endpoint() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_crm_endpoint() -> String {
    "https://cloudresourcemanager.googleapis.com".to_string()
}

fn default_state_path() -> String {
    "wizard_state.json".to_string()
}

fn default_table_path() -> String {
    "table.json".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Immutable settings snapshot consumed by the credential manager and
    /// API clients.
    pub fn settings(&self) -> Settings {
        Settings {
            svc_email: self.gcloud_svc_email.clone(),
            svc_key: self.gcloud_svc_key.clone(),
            automl_endpoint: self.automl_endpoint.clone(),
            storage_endpoint: self.storage_endpoint.clone(),
            crm_endpoint: self.crm_endpoint.clone(),
        }
    }
}

/// Connection settings for the three cloud services. A credential is only
/// valid for the settings snapshot it was issued against; see
/// [`Settings::fingerprint`].
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[garde(length(min = 1))]
    pub svc_email: String,

    #[garde(length(min = 1))]
    pub svc_key: String,

    #[garde(length(min = 1))]
    pub automl_endpoint: String,

    #[garde(length(min = 1))]
    pub storage_endpoint: String,

    #[garde(length(min = 1))]
    pub crm_endpoint: String,
}

impl Settings {
    /// Stable hash of the settings, used to detect reconfiguration and
    /// invalidate cached credentials.
    pub fn fingerprint(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
