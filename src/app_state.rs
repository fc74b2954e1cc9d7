use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    auth::{CredentialManager, ServiceAccountIdentity},
    automl::AutoMlClient,
    resource_manager::ResourceManagerClient,
    storage::CloudStorageClient,
};

/// Production identity provider; tests construct the clients directly with
/// their own mocks.
pub type Identity = ServiceAccountIdentity;

/// Shared application state: one credential manager behind all three service
/// clients.
#[derive(Clone)]
pub struct AppState {
    /// One HTTP client shared by every service and the image fetches.
    pub http: reqwest::Client,
    pub credentials: Arc<CredentialManager<Identity>>,
    pub automl: Arc<AutoMlClient<Identity>>,
    pub projects: Arc<ResourceManagerClient<Identity>>,
    pub storage: Arc<CloudStorageClient<Identity>>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::new();
        let credentials = Arc::new(CredentialManager::new(
            ServiceAccountIdentity::new(),
            config.settings(),
        ));
        let automl = Arc::new(AutoMlClient::new(
            http.clone(),
            credentials.clone(),
            &config.automl_endpoint,
        ));
        let projects = Arc::new(ResourceManagerClient::new(
            http.clone(),
            credentials.clone(),
            &config.crm_endpoint,
        ));
        let storage = Arc::new(CloudStorageClient::new(
            http.clone(),
            credentials.clone(),
            &config.storage_endpoint,
        ));
        Self {
            http,
            credentials,
            automl,
            projects,
            storage,
        }
    }
}
