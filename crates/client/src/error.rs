//! Error taxonomy shared by the store, the repository and the session.

/// Failure of a call into the remote store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A blob or document write was refused or never reached the store.
    #[error("write failed: {0}")]
    Write(String),

    /// The requested blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Listing documents failed.
    #[error("read failed: {0}")]
    Read(String),
}

impl StoreError {
    pub fn is_write(&self) -> bool {
        matches!(self, StoreError::Write(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Failure of the create-marker pipeline, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum CreationError {
    /// The user dismissed the image picker. Nothing was written.
    #[error("image selection cancelled")]
    Cancelled,

    #[error("image selection failed: {0}")]
    ImageSelection(String),

    /// No document write was attempted.
    #[error("uploading blob {key} failed")]
    BlobUpload {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The blob at `image_key` stays in storage without a referencing document.
    #[error("writing document for blob {image_key} failed")]
    DocumentWrite {
        image_key: String,
        #[source]
        source: StoreError,
    },

    /// `step` was called on a pipeline whose earlier step failed.
    #[error("create pipeline already failed")]
    Aborted,

    /// Markers have not been loaded yet, so a new one could collide with
    /// the documents still to be fetched.
    #[error("markers are not loaded yet")]
    NotLoaded,

    /// The store returned an id that is already rendered.
    #[error("store returned duplicate marker key {0}")]
    DuplicateKey(String),
}

impl CreationError {
    /// The underlying store failure, if a remote step failed.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            CreationError::BlobUpload { source, .. } | CreationError::DocumentWrite { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CreationError::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    /// Foreground location access was refused. Tracking is skipped.
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position stream failed: {0}")]
    Stream(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Markers were already bulk-loaded for this session.
    #[error("markers already loaded")]
    AlreadyLoaded,

    #[error("loading markers failed")]
    Load(#[source] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_creation_error_keeps_source() {
        let err = CreationError::DocumentWrite {
            image_key: "image_1.jpg".to_string(),
            source: StoreError::Write("offline".to_string()),
        };
        assert_eq!(err.to_string(), "writing document for blob image_1.jpg failed");
        assert_eq!(err.source().unwrap().to_string(), "write failed: offline");
        assert!(err.store_error().unwrap().is_write());
    }

    #[test]
    fn test_cancel_has_no_store_error() {
        assert!(CreationError::Cancelled.store_error().is_none());
        assert!(CreationError::Cancelled.is_cancelled());
    }
}
