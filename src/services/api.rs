//! Shared authenticated HTTP layer for the three cloud services.
//!
//! Every request fetches the current bearer credential, issues the call, and
//! classifies the response: status 200 decodes the payload, anything else is
//! a `Remote` error carrying the service-reported code and message verbatim.
//! Nothing is retried here.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::auth::{AuthError, CredentialManager, IdentityProvider};

/// Error envelope used by the Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    code: i64,
    message: String,
}

/// Base client bound to one service endpoint. The typed service clients
/// (`AutoMlClient`, `ResourceManagerClient`, `CloudStorageClient`) wrap this.
pub struct HttpApi<I> {
    http: reqwest::Client,
    credentials: Arc<CredentialManager<I>>,
    endpoint: String,
}

impl<I: IdentityProvider> HttpApi<I> {
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<CredentialManager<I>>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http,
            credentials,
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}{}", self.endpoint, resource)
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let credential = self.credentials.token().await?;
        let response = request.bearer_auth(credential.token()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_body(status, &body)
    }

    pub async fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T, ApiError> {
        self.dispatch(self.http.get(self.url(resource))).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.dispatch(self.http.post(self.url(resource)).json(body))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.dispatch(self.http.patch(self.url(resource)).json(body))
            .await
    }

    /// Raw media upload (`uploadType=media` style endpoints).
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        resource: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<T, ApiError> {
        self.dispatch(
            self.http
                .post(self.url(resource))
                .header(reqwest::header::CONTENT_TYPE, content_type.to_string())
                .body(body),
        )
        .await
    }
}

/// Classify a response body. Public so the classification rules are testable
/// without a live endpoint.
pub fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if status == 200 {
        Ok(serde_json::from_str(body)?)
    } else {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Err(ApiError::Remote {
                code: envelope.error.code,
                message: envelope.error.message,
            }),
            // Not every service error carries the envelope; keep the raw body.
            Err(_) => Err(ApiError::Remote {
                code: i64::from(status),
                message: body.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("failed to decode service response: {0}")]
    Decode(#[from] serde_json::Error),
}
