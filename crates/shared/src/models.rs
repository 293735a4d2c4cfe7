use serde::{Deserialize, Serialize};

/// Collection under which every marker document is stored.
pub const MARKER_NAMESPACE: &str = "Map_Location";

/// Title given to markers whose document carries a blank title.
pub const UNTITLED: &str = "Untitled";

/// Title given to markers dropped with a long-press.
pub const NEW_MARKER_TITLE: &str = "Good place";

/// Wire value of `imageKey` for a marker without a photo.
pub const NO_IMAGE: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }
}

/// Map viewport: a center plus the visible span in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Region {
    pub const DEFAULT_DELTA: f64 = 0.5;

    /// Region of the default span centered on `coordinate`.
    pub fn centered_on(coordinate: Coordinate) -> Self {
        Region {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            latitude_delta: Self::DEFAULT_DELTA,
            longitude_delta: Self::DEFAULT_DELTA,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::centered_on(Coordinate::new(55.0, 12.0))
    }
}

/// Field group persisted for every marker document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(default)]
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub image_key: String,
}

/// A marker document as stored remotely. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    #[serde(flatten)]
    pub fields: DocumentFields,
}

/// A pin rendered on the map.
///
/// `key` is always the id of the backing remote document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub key: String,
    pub coordinate: Coordinate,
    pub title: String,
    pub image_key: Option<String>,
}

impl Marker {
    /// Build the local marker for a fetched or freshly created document.
    pub fn from_document(doc: RemoteDocument) -> Self {
        let RemoteDocument { id, fields } = doc;
        let title = if fields.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            fields.title
        };
        let image_key = if fields.image_key.trim().is_empty() {
            None
        } else {
            Some(fields.image_key)
        };
        Marker {
            key: id,
            coordinate: Coordinate::new(fields.latitude, fields.longitude),
            title,
            image_key,
        }
    }
}
