//! Remote document collection and blob storage.
//!
//! [`HttpRemoteStore`] talks to the pinmap backend; [`MemoryRemoteStore`]
//! keeps everything in process and records every call it receives.

mod http;
mod memory;

pub use http::HttpRemoteStore;
pub use memory::{MemoryRemoteStore, StoreCall};

use async_trait::async_trait;
use pinmap_shared::models::{DocumentFields, RemoteDocument};

use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every document in `namespace`, in creation order. One-shot, not a subscription.
    async fn list_documents(&self, namespace: &str) -> Result<Vec<RemoteDocument>>;

    /// Persist `fields` and return the document with its store-assigned id.
    async fn create_document(
        &self,
        namespace: &str,
        fields: DocumentFields,
    ) -> Result<RemoteDocument>;

    /// Upload a blob. Keys are write-once; reusing one is a write error.
    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// A URL the blob can be displayed from, or `NotFound`.
    async fn resolve_blob_url(&self, key: &str) -> Result<String>;
}
