//! Local marker state and its synchronization with the remote store.

use std::collections::HashMap;
use std::sync::Arc;

use pinmap_shared::models::{Coordinate, Marker, MARKER_NAMESPACE};
use tokio::sync::RwLock;

use crate::blob_key::BlobKeyGenerator;
use crate::error::{CreationError, StoreError};
use crate::pipeline::{CreatePipeline, ImagePicker, PipelineEnv};
use crate::store::RemoteStore;

/// Insertion-ordered, append-only marker collection.
///
/// `version` increases with every append so renderers can skip unchanged
/// snapshots.
#[derive(Debug, Default)]
pub struct MarkerSet {
    entries: Vec<Marker>,
    index: HashMap<String, usize>,
    version: u64,
}

impl MarkerSet {
    /// Append without a key check. Used by the bulk load only.
    fn append(&mut self, marker: Marker) {
        self.index
            .entry(marker.key.clone())
            .or_insert(self.entries.len());
        self.entries.push(marker);
        self.version += 1;
    }

    /// Append unless the key is already present, handing the marker back if it is.
    pub(crate) fn append_unique(&mut self, marker: Marker) -> Result<(), Marker> {
        if self.index.contains_key(&marker.key) {
            return Err(marker);
        }
        self.append(marker);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Marker> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn markers(&self) -> &[Marker] {
        &self.entries
    }
}

/// Point-in-time copy of the marker set for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSnapshot {
    pub version: u64,
    pub markers: Vec<Marker>,
}

pub struct MarkerRepository {
    store: Arc<dyn RemoteStore>,
    namespace: String,
    keys: BlobKeyGenerator,
    markers: RwLock<MarkerSet>,
}

impl MarkerRepository {
    /// Repository over the default marker namespace with wall-clock blob keys.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_options(store, MARKER_NAMESPACE, BlobKeyGenerator::system())
    }

    pub fn with_options(
        store: Arc<dyn RemoteStore>,
        namespace: impl Into<String>,
        keys: BlobKeyGenerator,
    ) -> Self {
        MarkerRepository {
            store,
            namespace: namespace.into(),
            keys,
            markers: RwLock::new(MarkerSet::default()),
        }
    }

    /// Fetch every document and append the resulting markers.
    ///
    /// Not idempotent: each call appends everything the store returns, so a
    /// second call duplicates every marker. Call once per session;
    /// [`crate::session::MapSession::mount`] enforces this.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        let documents = self.store.list_documents(&self.namespace).await?;
        let count = documents.len();

        let mut markers = self.markers.write().await;
        for doc in documents {
            markers.append(Marker::from_document(doc));
        }
        tracing::info!(
            namespace = %self.namespace,
            loaded = count,
            total = markers.len(),
            "Loaded markers"
        );
        Ok(count)
    }

    /// Create a marker for an already selected photo.
    pub async fn create_marker(
        &self,
        coordinate: Coordinate,
        image: Vec<u8>,
    ) -> Result<Marker, CreationError> {
        self.run(CreatePipeline::with_image(coordinate, image), None)
            .await
    }

    /// Create a marker, asking `picker` for the photo first.
    pub async fn create_marker_with_picker(
        &self,
        coordinate: Coordinate,
        picker: &dyn ImagePicker,
    ) -> Result<Marker, CreationError> {
        self.run(CreatePipeline::new(coordinate), Some(picker)).await
    }

    async fn run(
        &self,
        pipeline: CreatePipeline,
        picker: Option<&dyn ImagePicker>,
    ) -> Result<Marker, CreationError> {
        let env = PipelineEnv {
            store: self.store.as_ref(),
            namespace: &self.namespace,
            keys: &self.keys,
            markers: &self.markers,
            picker,
        };
        let marker = pipeline.run(&env).await?;
        tracing::info!(
            key = %marker.key,
            latitude = marker.coordinate.latitude,
            longitude = marker.coordinate.longitude,
            "Marker created"
        );
        Ok(marker)
    }

    pub async fn resolve_image_url(&self, image_key: &str) -> Result<String, StoreError> {
        self.store.resolve_blob_url(image_key).await
    }

    pub async fn get(&self, key: &str) -> Option<Marker> {
        self.markers.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.markers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.markers.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> MarkerSnapshot {
        let markers = self.markers.read().await;
        MarkerSnapshot {
            version: markers.version(),
            markers: markers.markers().to_vec(),
        }
    }
}
