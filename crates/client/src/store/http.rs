use async_trait::async_trait;
use pinmap_shared::models::{DocumentFields, RemoteDocument};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{RemoteStore, Result};
use crate::config::ClientConfig;
use crate::error::StoreError;

const DOCUMENTS_QUERY: &str = r#"query Documents($namespace: String!) {
    documents(namespace: $namespace) { id title latitude longitude imageKey }
}"#;

const CREATE_DOCUMENT_MUTATION: &str = r#"mutation CreateDocument($namespace: String!, $input: DocumentFieldsInput!) {
    createDocument(namespace: $namespace, input: $input) { id title latitude longitude imageKey }
}"#;

/// Build the variables JSON for a create document mutation.
pub fn build_create_document_variables(namespace: &str, fields: &DocumentFields) -> serde_json::Value {
    serde_json::json!({
        "namespace": namespace,
        "input": {
            "title": fields.title,
            "latitude": fields.latitude,
            "longitude": fields.longitude,
            "imageKey": fields.image_key
        }
    })
}

/// URL a blob is uploaded to and served from.
pub fn build_blob_url(api_url: &str, key: &str) -> String {
    format!("{}/blobs/{}", api_url.trim_end_matches('/'), key)
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

#[derive(Deserialize)]
pub struct DocumentsResponse {
    pub documents: Vec<RemoteDocument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentResponse {
    pub create_document: RemoteDocument,
}

/// Remote store backed by the pinmap backend over HTTP.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    api_url: String,
}

impl HttpRemoteStore {
    pub fn new(api_url: impl Into<String>) -> Self {
        HttpRemoteStore {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Read(format!("building HTTP client: {}", e)))?;
        Ok(HttpRemoteStore {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn graphql_url(&self) -> String {
        format!("{}/graphql", self.api_url)
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        query_str: &str,
        variables: Option<serde_json::Value>,
    ) -> std::result::Result<T, String> {
        let req = GraphQLRequest {
            query: query_str.to_string(),
            variables,
        };

        let resp = self
            .client
            .post(self.graphql_url())
            .json(&req)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;

        if let Some(errors) = gql_resp.errors {
            if !errors.is_empty() {
                return Err(errors[0].message.clone());
            }
        }

        gql_resp.data.ok_or_else(|| "No data returned".to_string())
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_documents(&self, namespace: &str) -> Result<Vec<RemoteDocument>> {
        let resp: DocumentsResponse = self
            .query(
                DOCUMENTS_QUERY,
                Some(serde_json::json!({ "namespace": namespace })),
            )
            .await
            .map_err(StoreError::Read)?;
        Ok(resp.documents)
    }

    async fn create_document(
        &self,
        namespace: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument> {
        let variables = build_create_document_variables(namespace, &fields);
        let resp: CreateDocumentResponse = self
            .query(CREATE_DOCUMENT_MUTATION, Some(variables))
            .await
            .map_err(StoreError::Write)?;
        Ok(resp.create_document)
    }

    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let resp = self
            .client
            .put(build_blob_url(&self.api_url, key))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        match resp.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            StatusCode::CONFLICT => Err(StoreError::Write(format!("blob {} already exists", key))),
            status => Err(StoreError::Write(format!(
                "uploading blob {} returned {}",
                key, status
            ))),
        }
    }

    async fn resolve_blob_url(&self, key: &str) -> Result<String> {
        let url = build_blob_url(&self.api_url, key);
        let resp = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => Ok(url),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(key.to_string())),
            status => Err(StoreError::Read(format!(
                "resolving blob {} returned {}",
                key, status
            ))),
        }
    }
}
