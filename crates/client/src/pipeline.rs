//! The create-marker write pipeline.
//!
//! ```text
//! SelectImage -> UploadBlob -> WriteDocument -> CommitLocal -> Done
//! ```
//!
//! Each stage runs only after the previous one succeeded and the first
//! failure ends the run in `Failed`. The blob is always stored before the document that
//! references it, and the local marker set is touched only in `CommitLocal`.

use async_trait::async_trait;
use pinmap_shared::models::{Coordinate, DocumentFields, Marker, RemoteDocument, NEW_MARKER_TITLE};
use tokio::sync::RwLock;

use crate::blob_key::BlobKeyGenerator;
use crate::error::CreationError;
use crate::repository::MarkerSet;
use crate::store::RemoteStore;

/// Photo selection, implemented by the platform layer.
#[async_trait]
pub trait ImagePicker: Send + Sync {
    /// `Ok(None)` when the user cancels.
    async fn pick_image(&self) -> Result<Option<Vec<u8>>, String>;
}

#[derive(Debug)]
pub enum Stage {
    SelectImage,
    UploadBlob { image: Vec<u8> },
    WriteDocument { image_key: String },
    CommitLocal { document: RemoteDocument },
    Done(Marker),
    /// A step failed. Terminal.
    Failed,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::SelectImage => "select_image",
            Stage::UploadBlob { .. } => "upload_blob",
            Stage::WriteDocument { .. } => "write_document",
            Stage::CommitLocal { .. } => "commit_local",
            Stage::Done(_) => "done",
            Stage::Failed => "failed",
        }
    }
}

/// What a pipeline run needs from its owning repository.
pub struct PipelineEnv<'a> {
    pub store: &'a dyn RemoteStore,
    pub namespace: &'a str,
    pub keys: &'a BlobKeyGenerator,
    pub markers: &'a RwLock<MarkerSet>,
    pub picker: Option<&'a dyn ImagePicker>,
}

pub struct CreatePipeline {
    coordinate: Coordinate,
    title: String,
    stage: Stage,
}

impl CreatePipeline {
    /// Pipeline that starts by asking the picker for a photo.
    pub fn new(coordinate: Coordinate) -> Self {
        CreatePipeline {
            coordinate,
            title: NEW_MARKER_TITLE.to_string(),
            stage: Stage::SelectImage,
        }
    }

    /// Pipeline for a photo that was already selected.
    pub fn with_image(coordinate: Coordinate, image: Vec<u8>) -> Self {
        CreatePipeline {
            coordinate,
            title: NEW_MARKER_TITLE.to_string(),
            stage: Stage::UploadBlob { image },
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Advance by one stage. A failed step moves the pipeline to
    /// [`Stage::Failed`]; stages are not retried.
    pub async fn step(&mut self, env: &PipelineEnv<'_>) -> Result<(), CreationError> {
        let current = std::mem::replace(&mut self.stage, Stage::Failed);
        tracing::debug!(stage = current.name(), "Create marker step");
        self.stage = match current {
            Stage::SelectImage => {
                let picker = env
                    .picker
                    .ok_or_else(|| CreationError::ImageSelection("no image picker".to_string()))?;
                match picker.pick_image().await {
                    Ok(Some(image)) => Stage::UploadBlob { image },
                    Ok(None) => return Err(CreationError::Cancelled),
                    Err(e) => return Err(CreationError::ImageSelection(e)),
                }
            }
            Stage::UploadBlob { image } => {
                let key = env.keys.next_key();
                if let Err(source) = env.store.put_blob(&key, image).await {
                    return Err(CreationError::BlobUpload { key, source });
                }
                Stage::WriteDocument { image_key: key }
            }
            Stage::WriteDocument { image_key } => {
                let fields = DocumentFields {
                    title: self.title.clone(),
                    latitude: self.coordinate.latitude,
                    longitude: self.coordinate.longitude,
                    image_key: image_key.clone(),
                };
                match env.store.create_document(env.namespace, fields).await {
                    Ok(document) => Stage::CommitLocal { document },
                    Err(source) => {
                        tracing::warn!(image_key = %image_key, "Document write failed, blob left orphaned");
                        return Err(CreationError::DocumentWrite { image_key, source });
                    }
                }
            }
            Stage::CommitLocal { document } => {
                let marker = Marker::from_document(document);
                env.markers
                    .write()
                    .await
                    .append_unique(marker.clone())
                    .map_err(|m| CreationError::DuplicateKey(m.key))?;
                Stage::Done(marker)
            }
            done @ Stage::Done(_) => done,
            Stage::Failed => return Err(CreationError::Aborted),
        };
        Ok(())
    }

    /// Drive the pipeline to completion.
    pub async fn run(mut self, env: &PipelineEnv<'_>) -> Result<Marker, CreationError> {
        loop {
            if let Stage::Done(marker) = self.stage {
                return Ok(marker);
            }
            self.step(env).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryRemoteStore, StoreCall};
    use std::sync::Arc;

    struct FixedPicker(Option<Vec<u8>>);

    #[async_trait]
    impl ImagePicker for FixedPicker {
        async fn pick_image(&self) -> Result<Option<Vec<u8>>, String> {
            Ok(self.0.clone())
        }
    }

    struct Fixture {
        store: Arc<MemoryRemoteStore>,
        keys: BlobKeyGenerator,
        markers: RwLock<MarkerSet>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                store: Arc::new(MemoryRemoteStore::new()),
                keys: BlobKeyGenerator::system(),
                markers: RwLock::new(MarkerSet::default()),
            }
        }

        fn env<'a>(&'a self, picker: Option<&'a dyn ImagePicker>) -> PipelineEnv<'a> {
            PipelineEnv {
                store: self.store.as_ref(),
                namespace: "Map_Location",
                keys: &self.keys,
                markers: &self.markers,
                picker,
            }
        }
    }

    #[tokio::test]
    async fn test_steps_visit_every_stage_in_order() {
        let fx = Fixture::new();
        let picker = FixedPicker(Some(vec![1, 2, 3]));
        let env = fx.env(Some(&picker));
        let mut pipeline = CreatePipeline::new(Coordinate::new(55.1, 12.1));

        let mut visited = vec![pipeline.stage().name()];
        while !matches!(pipeline.stage(), Stage::Done(_)) {
            pipeline.step(&env).await.unwrap();
            visited.push(pipeline.stage().name());
        }
        assert_eq!(
            visited,
            vec!["select_image", "upload_blob", "write_document", "commit_local", "done"]
        );
        assert_eq!(fx.markers.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_is_committed_before_commit_local() {
        let fx = Fixture::new();
        let env = fx.env(None);
        let mut pipeline = CreatePipeline::with_image(Coordinate::new(55.1, 12.1), vec![9]);

        pipeline.step(&env).await.unwrap(); // upload
        pipeline.step(&env).await.unwrap(); // document
        assert!(matches!(pipeline.stage(), Stage::CommitLocal { .. }));
        assert_eq!(fx.store.document_count().await, 1);
        assert!(fx.markers.read().await.is_empty());

        pipeline.step(&env).await.unwrap();
        assert_eq!(fx.markers.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_makes_no_remote_calls() {
        let fx = Fixture::new();
        let picker = FixedPicker(None);
        let err = CreatePipeline::new(Coordinate::new(55.1, 12.1))
            .run(&fx.env(Some(&picker)))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(fx.store.journal().await.is_empty());
        assert!(fx.markers.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_picker_fails_selection() {
        let fx = Fixture::new();
        let err = CreatePipeline::new(Coordinate::new(55.1, 12.1))
            .run(&fx.env(None))
            .await
            .unwrap_err();
        assert!(matches!(err, CreationError::ImageSelection(_)));
    }

    #[tokio::test]
    async fn test_document_write_references_uploaded_blob() {
        let fx = Fixture::new();
        let marker = CreatePipeline::with_image(Coordinate::new(55.1, 12.1), vec![1])
            .titled("Harbour")
            .run(&fx.env(None))
            .await
            .unwrap();

        let key = marker.image_key.clone().unwrap();
        assert_eq!(marker.title, "Harbour");
        assert_eq!(
            fx.store.journal().await,
            vec![
                StoreCall::PutBlob { key: key.clone() },
                StoreCall::CreateDocument {
                    namespace: "Map_Location".to_string(),
                    image_key: key,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_upload_is_terminal() {
        let fx = Fixture::new();
        fx.store.set_fail_put_blob(true).await;
        let env = fx.env(None);
        let mut pipeline = CreatePipeline::with_image(Coordinate::new(55.1, 12.1), vec![7, 7]);

        let err = pipeline.step(&env).await.unwrap_err();
        assert!(matches!(err, CreationError::BlobUpload { .. }));
        assert!(matches!(pipeline.stage(), Stage::Failed));

        fx.store.set_fail_put_blob(false).await;
        let err = pipeline.step(&env).await.unwrap_err();
        assert!(matches!(err, CreationError::Aborted));
        assert_eq!(fx.store.journal().await.len(), 1);
        assert_eq!(fx.store.document_count().await, 0);
    }
}
