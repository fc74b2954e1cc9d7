//! Client for the project service (Cloud Resource Manager).

use std::sync::Arc;

use serde::Deserialize;

use super::api::{ApiError, HttpApi};
use super::auth::{CredentialManager, IdentityProvider};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub lifecycle_state: String,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.lifecycle_state == "ACTIVE"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProjectsResponse {
    #[serde(default)]
    pub projects: Vec<Project>,
}

pub struct ResourceManagerClient<I> {
    api: HttpApi<I>,
}

impl<I: IdentityProvider> ResourceManagerClient<I> {
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<CredentialManager<I>>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api: HttpApi::new(http, credentials, endpoint),
        }
    }

    pub async fn list_projects(&self) -> Result<ListProjectsResponse, ApiError> {
        self.api.get("/v1/projects").await
    }
}
