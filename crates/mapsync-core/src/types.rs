//! Records, renderable features and host events.

use serde::{Deserialize, Serialize};

/// Identifier shared by a record and the feature rendered for it.
pub type FeatureId = String;

/// Zero-argument teardown returned by an event subscription.
///
/// Returns an error when the underlying unsubscribe fails.
pub type Disposer = Box<dyn FnOnce() -> crate::Result<()> + Send>;

/// A datum fetched from the external data source.
///
/// Identity is the `id` alone; two records with the same id are the same
/// entity even if their other fields differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: FeatureId,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub name: String,
}

impl Record {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Point geometry in `[lon, lat]` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

/// A renderable map feature, shaped like a GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Geometry,
}

impl From<&Record> for Feature {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            feature_type: "Feature".into(),
            geometry: Geometry::Point {
                coordinates: [record.lon, record.lat],
            },
        }
    }
}

/// Raster tile source handed to the host when a tile layer is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    #[serde(rename = "tileWidth")]
    pub tile_width: u32,
    #[serde(rename = "tileHeight")]
    pub tile_height: u32,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub servers: Vec<String>,
}

/// Current map centre.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Viewport hint passed to the data source on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewContext {
    pub center: MapCenter,
    pub zoom: u8,
}

/// Host events the overlays listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The host finished loading and map data may be touched.
    Ready,
    /// The map stopped panning or zooming.
    MapMoveEnd,
    /// A feature on a tracked layer was clicked.
    LayerFeatureClicked,
    /// A layer checkbox in the layer switcher changed.
    LayerCheckboxToggled,
}

impl EventKind {
    /// Wire name used by the host.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "wme-ready",
            Self::MapMoveEnd => "wme-map-move-end",
            Self::LayerFeatureClicked => "wme-layer-feature-clicked",
            Self::LayerCheckboxToggled => "wme-layer-checkbox-toggled",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a layer checkbox toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleEvent {
    pub name: String,
    pub checked: bool,
}

/// Payload of a feature click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureClickEvent {
    #[serde(rename = "featureId")]
    pub feature_id: FeatureId,
    #[serde(rename = "layerName")]
    pub layer_name: String,
}

/// An event delivered by the host event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Ready,
    MapMoveEnd,
    FeatureClicked(FeatureClickEvent),
    CheckboxToggled(ToggleEvent),
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready => EventKind::Ready,
            Self::MapMoveEnd => EventKind::MapMoveEnd,
            Self::FeatureClicked(_) => EventKind::LayerFeatureClicked,
            Self::CheckboxToggled(_) => EventKind::LayerCheckboxToggled,
        }
    }
}
