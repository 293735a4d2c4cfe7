//! Client side of pinmap: location tracking, the remote store, and the
//! marker repository that keeps rendered pins in step with stored documents.

pub mod blob_key;
pub mod config;
pub mod error;
pub mod location;
pub mod pipeline;
pub mod repository;
pub mod session;
pub mod store;

pub use config::ClientConfig;
pub use error::{CreationError, LocationError, SessionError, StoreError};
pub use location::{LocationTracker, PositionSource, Subscription, WatchOptions};
pub use pipeline::ImagePicker;
pub use repository::{MarkerRepository, MarkerSnapshot};
pub use session::{ImagePreviewPresenter, MapSession, MapSurface, Notice, Notifier, SessionParts};
pub use store::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
