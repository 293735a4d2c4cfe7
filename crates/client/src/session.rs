//! One mounted map view: the glue between the UI collaborators, the
//! location tracker and the marker repository.

use std::sync::Arc;

use pinmap_shared::models::{Coordinate, Marker, Region};
use tokio::sync::watch;

use crate::blob_key::BlobKeyGenerator;
use crate::config::ClientConfig;
use crate::error::{CreationError, LocationError, SessionError, StoreError};
use crate::location::{LocationTracker, PositionSource, Subscription};
use crate::pipeline::ImagePicker;
use crate::repository::MarkerRepository;
use crate::store::RemoteStore;

/// The map widget.
pub trait MapSurface: Send + Sync {
    fn render(&self, markers: &[Marker]);
    fn animate_to_region(&self, region: Region);
}

/// Modal showing a marker's photo.
pub trait ImagePreviewPresenter: Send + Sync {
    fn show(&self, url: &str);
    fn hide(&self);
}

/// Failures worth telling the user about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    MarkersNotLoaded { reason: String },
    MarkerNotSaved { reason: String },
    ImageUnavailable { key: String },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// UI collaborators a session drives.
pub struct SessionParts {
    pub surface: Arc<dyn MapSurface>,
    pub presenter: Arc<dyn ImagePreviewPresenter>,
    pub notifier: Arc<dyn Notifier>,
    pub picker: Arc<dyn ImagePicker>,
}

pub struct MapSession {
    repository: Arc<MarkerRepository>,
    tracker: LocationTracker,
    parts: SessionParts,
    region: Arc<watch::Sender<Region>>,
    preview: watch::Sender<Option<String>>,
    loaded: bool,
    subscription: Option<Subscription>,
}

impl MapSession {
    pub fn new(
        repository: Arc<MarkerRepository>,
        tracker: LocationTracker,
        parts: SessionParts,
    ) -> Self {
        let (region, _) = watch::channel(Region::default());
        let (preview, _) = watch::channel(None);
        MapSession {
            repository,
            tracker,
            parts,
            region: Arc::new(region),
            preview,
            loaded: false,
            subscription: None,
        }
    }

    /// Session over `store` using the namespace and tracking options in `config`.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn RemoteStore>,
        parts: SessionParts,
    ) -> Self {
        let repository = MarkerRepository::with_options(
            store,
            config.namespace.clone(),
            BlobKeyGenerator::system(),
        );
        MapSession::new(
            Arc::new(repository),
            LocationTracker::new(config.tracking),
            parts,
        )
    }

    /// Load the stored markers, render them and start following the user.
    ///
    /// Loads at most once per session; a second call is refused. If loading
    /// fails the user is notified, tracking is not started and `mount` may be
    /// called again. Permission denial only leaves the map unguided.
    pub async fn mount(&mut self, source: &dyn PositionSource) -> Result<usize, SessionError> {
        if self.loaded {
            tracing::warn!("Refusing to load markers twice");
            return Err(SessionError::AlreadyLoaded);
        }

        let count = match self.repository.load_all().await {
            Ok(count) => count,
            Err(e) => {
                self.notify(Notice::MarkersNotLoaded {
                    reason: e.to_string(),
                });
                return Err(SessionError::Load(e));
            }
        };
        self.loaded = true;
        self.render().await;

        let region = Arc::clone(&self.region);
        let surface = Arc::clone(&self.parts.surface);
        match self
            .tracker
            .start(source, move |r| {
                surface.animate_to_region(r);
                region.send_replace(r);
            })
            .await
        {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(LocationError::PermissionDenied) => {}
            Err(e) => tracing::error!(error = %e, "Location tracking unavailable"),
        }

        Ok(count)
    }

    /// Handle a long-press: pick a photo, store it and add the marker.
    ///
    /// Refused until `mount` has loaded the stored markers; the load appends
    /// every fetched document, including ones created here.
    pub async fn on_long_press(&self, coordinate: Coordinate) -> Result<Marker, CreationError> {
        if !self.loaded {
            let err = CreationError::NotLoaded;
            self.notify(Notice::MarkerNotSaved {
                reason: err.to_string(),
            });
            return Err(err);
        }

        let result = self
            .repository
            .create_marker_with_picker(coordinate, self.parts.picker.as_ref())
            .await;

        match &result {
            Ok(_) => self.render().await,
            Err(CreationError::Cancelled) => tracing::debug!("Marker creation cancelled"),
            Err(e) => self.notify(Notice::MarkerNotSaved {
                reason: e.to_string(),
            }),
        }
        result
    }

    /// Handle a tap on a marker: open its photo in the preview.
    pub async fn on_marker_selected(&self, key: &str) -> Result<String, StoreError> {
        let image_key = match self.repository.get(key).await {
            Some(marker) => marker.image_key,
            None => None,
        };
        let result = match image_key {
            Some(image_key) => self.repository.resolve_image_url(&image_key).await,
            None => Err(StoreError::NotFound(key.to_string())),
        };

        match &result {
            Ok(url) => {
                self.preview.send_replace(Some(url.clone()));
                self.parts.presenter.show(url);
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Marker image unavailable");
                self.notify(Notice::ImageUnavailable {
                    key: key.to_string(),
                });
            }
        }
        result
    }

    pub fn on_preview_dismissed(&self) {
        self.preview.send_replace(None);
        self.parts.presenter.hide();
    }

    /// Current viewport.
    pub fn region(&self) -> Region {
        *self.region.borrow()
    }

    /// URL shown in the preview, if it is open.
    pub fn preview_url(&self) -> Option<String> {
        self.preview.borrow().clone()
    }

    pub fn is_tracking(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    pub fn repository(&self) -> &Arc<MarkerRepository> {
        &self.repository
    }

    /// Tear the view down, releasing the location stream.
    pub fn unmount(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.stop();
        }
    }

    async fn render(&self) {
        let snapshot = self.repository.snapshot().await;
        self.parts.surface.render(&snapshot.markers);
    }

    fn notify(&self, notice: Notice) {
        tracing::warn!(?notice, "Notifying user");
        self.parts.notifier.notify(notice);
    }
}
