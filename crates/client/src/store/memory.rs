use std::collections::HashMap;

use async_trait::async_trait;
use pinmap_shared::models::{DocumentFields, RemoteDocument};
use tokio::sync::RwLock;

use super::{RemoteStore, Result};
use crate::error::StoreError;

/// One call received by [`MemoryRemoteStore`], successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListDocuments { namespace: String },
    CreateDocument { namespace: String, image_key: String },
    PutBlob { key: String },
    ResolveBlobUrl { key: String },
}

#[derive(Default)]
struct Inner {
    documents: Vec<(String, RemoteDocument)>,
    blobs: HashMap<String, Vec<u8>>,
    journal: Vec<StoreCall>,
    next_id: u64,
    fail_list: bool,
    fail_put_blob: bool,
    fail_create_document: bool,
}

/// In-process remote store with failure injection.
#[derive(Default)]
pub struct MemoryRemoteStore {
    inner: RwLock<Inner>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_list(&self, fail: bool) {
        self.inner.write().await.fail_list = fail;
    }

    pub async fn set_fail_put_blob(&self, fail: bool) {
        self.inner.write().await.fail_put_blob = fail;
    }

    pub async fn set_fail_create_document(&self, fail: bool) {
        self.inner.write().await.fail_create_document = fail;
    }

    /// Calls received so far, oldest first.
    pub async fn journal(&self) -> Vec<StoreCall> {
        self.inner.read().await.journal.clone()
    }

    pub async fn document_count(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn has_blob(&self, key: &str) -> bool {
        self.inner.read().await.blobs.contains_key(key)
    }

    /// Seed a document without journaling it.
    pub async fn insert_document(&self, namespace: &str, fields: DocumentFields) -> RemoteDocument {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let doc = RemoteDocument {
            id: format!("doc-{}", inner.next_id),
            fields,
        };
        inner.documents.push((namespace.to_string(), doc.clone()));
        doc
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list_documents(&self, namespace: &str) -> Result<Vec<RemoteDocument>> {
        let mut inner = self.inner.write().await;
        inner.journal.push(StoreCall::ListDocuments {
            namespace: namespace.to_string(),
        });
        if inner.fail_list {
            return Err(StoreError::Read("injected list failure".to_string()));
        }
        Ok(inner
            .documents
            .iter()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn create_document(
        &self,
        namespace: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument> {
        {
            let mut inner = self.inner.write().await;
            inner.journal.push(StoreCall::CreateDocument {
                namespace: namespace.to_string(),
                image_key: fields.image_key.clone(),
            });
            if inner.fail_create_document {
                return Err(StoreError::Write("injected document failure".to_string()));
            }
        }
        Ok(self.insert_document(namespace, fields).await)
    }

    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.journal.push(StoreCall::PutBlob {
            key: key.to_string(),
        });
        if inner.fail_put_blob {
            return Err(StoreError::Write("injected blob failure".to_string()));
        }
        if inner.blobs.contains_key(key) {
            return Err(StoreError::Write(format!("blob {} already exists", key)));
        }
        inner.blobs.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn resolve_blob_url(&self, key: &str) -> Result<String> {
        let mut inner = self.inner.write().await;
        inner.journal.push(StoreCall::ResolveBlobUrl {
            key: key.to_string(),
        });
        if inner.blobs.contains_key(key) {
            Ok(format!("memory://blobs/{}", key))
        } else {
            Err(StoreError::NotFound(key.to_string()))
        }
    }
}
