//! Live location tracking.
//!
//! [`LocationTracker::start`] asks the [`PositionSource`] for permission,
//! opens its position stream and forwards every position that moved far
//! enough as a [`Region`]. The returned [`Subscription`] owns the stream;
//! stopping or dropping it releases the stream.

use async_trait::async_trait;
use pinmap_shared::geo;
use pinmap_shared::models::{Coordinate, Region};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LocationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    /// Positions closer than this to the last emitted one are dropped.
    pub min_movement_meters: f64,
    pub accuracy: Accuracy,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            min_movement_meters: 100.0,
            accuracy: Accuracy::High,
        }
    }
}

/// Stream of device fixes. An `Err` item ends the stream.
pub type PositionStream = mpsc::Receiver<Result<Coordinate, String>>;

/// Device geolocation, implemented by the platform layer.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn request_foreground_permission(&self) -> PermissionStatus;

    /// Start delivering fixes. The options are a hint; the tracker enforces
    /// the movement threshold itself.
    async fn watch_position(&self, options: WatchOptions) -> Result<PositionStream, LocationError>;
}

pub struct LocationTracker {
    options: WatchOptions,
}

impl LocationTracker {
    pub fn new(options: WatchOptions) -> Self {
        LocationTracker { options }
    }

    /// Begin tracking. On permission denial nothing is acquired and
    /// `PermissionDenied` is returned.
    pub async fn start<F>(
        &self,
        source: &dyn PositionSource,
        on_update: F,
    ) -> Result<Subscription, LocationError>
    where
        F: FnMut(Region) + Send + 'static,
    {
        if source.request_foreground_permission().await != PermissionStatus::Granted {
            tracing::warn!("Location permission denied, map will not follow the user");
            return Err(LocationError::PermissionDenied);
        }

        let stream = source.watch_position(self.options).await?;
        tracing::info!(
            min_movement_meters = self.options.min_movement_meters,
            accuracy = ?self.options.accuracy,
            "Location tracking started"
        );

        let handle = tokio::spawn(forward_positions(
            stream,
            self.options.min_movement_meters,
            on_update,
        ));
        Ok(Subscription {
            handle: Some(handle),
        })
    }
}

async fn forward_positions<F>(mut stream: PositionStream, min_movement_meters: f64, mut on_update: F)
where
    F: FnMut(Region),
{
    let mut last: Option<Coordinate> = None;
    while let Some(fix) = stream.recv().await {
        match fix {
            Ok(coordinate) if !geo::is_valid(coordinate) => {
                tracing::warn!(?coordinate, "Ignoring invalid position");
            }
            Ok(coordinate) => {
                let moved = last
                    .map(|prev| geo::moved_at_least(prev, coordinate, min_movement_meters))
                    .unwrap_or(true);
                if moved {
                    last = Some(coordinate);
                    on_update(Region::centered_on(coordinate));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Position stream failed, tracking stopped");
                return;
            }
        }
    }
    tracing::debug!("Position stream closed");
}

/// Handle to a running position stream.
///
/// `stop` consumes the handle, so the stream is released exactly once;
/// dropping the handle without calling `stop` releases it as well.
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn stop(mut self) {
        self.release();
        tracing::info!("Location tracking stopped");
    }

    /// Whether the stream is still delivering positions.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
