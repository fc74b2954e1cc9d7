//! Client for the object store (Cloud Storage JSON API), used for training
//! data: uploading label manifests and patching object metadata.

use std::sync::Arc;

use serde::Deserialize;

use super::api::{ApiError, HttpApi};
use super::auth::{CredentialManager, IdentityProvider};

const MAX_RESULTS: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBucketsResponse {
    #[serde(default)]
    pub items: Vec<Bucket>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    #[serde(default)]
    pub kind: String,
    pub id: String,
    pub name: String,
    pub bucket: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListObjectsResponse {
    #[serde(default)]
    pub items: Vec<StorageObject>,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

pub struct CloudStorageClient<I> {
    api: HttpApi<I>,
}

impl<I: IdentityProvider> CloudStorageClient<I> {
    pub fn new(
        http: reqwest::Client,
        credentials: Arc<CredentialManager<I>>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api: HttpApi::new(http, credentials, endpoint),
        }
    }

    pub async fn list_buckets(&self, project_id: &str) -> Result<ListBucketsResponse, ApiError> {
        self.api
            .get(&format!(
                "/storage/v1/b?maxResults={}&project={}",
                MAX_RESULTS, project_id
            ))
            .await
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<ListObjectsResponse, ApiError> {
        self.api
            .get(&format!(
                "/storage/v1/b/{}/o?maxResults={}&prefix={}",
                bucket, MAX_RESULTS, prefix
            ))
            .await
    }

    pub async fn upload(
        &self,
        bucket: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<StorageObject, ApiError> {
        self.api
            .post_bytes(
                &format!(
                    "/upload/storage/v1/b/{}/o?uploadType=media&name={}",
                    bucket,
                    urlencode(name)
                ),
                data,
                content_type,
            )
            .await
    }

    pub async fn patch_metadata(
        &self,
        bucket: &str,
        name: &str,
        metadata: &serde_json::Value,
    ) -> Result<StorageObject, ApiError> {
        let body = serde_json::json!({ "metadata": metadata });
        self.api
            .patch(
                &format!("/storage/v1/b/{}/o/{}", bucket, urlencode(name)),
                &body,
            )
            .await
    }

    /// True when the object exists. Any lookup failure maps to `false`; the
    /// caller only wants to know whether an upload is needed.
    pub async fn object_exists(&self, bucket: &str, name: &str) -> bool {
        let result: Result<StorageObject, ApiError> = self
            .api
            .get(&format!("/storage/v1/b/{}/o/{}", bucket, urlencode(name)))
            .await;
        match result {
            Ok(object) => object.kind == "storage#object",
            Err(_) => false,
        }
    }
}

/// Percent-encode an object name for use in a path segment.
fn urlencode(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
