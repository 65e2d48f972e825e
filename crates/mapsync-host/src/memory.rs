//! In-memory map surface and layer switcher.

use std::collections::{BTreeMap, HashMap};

use mapsync_core::{
    Error, Feature, FeatureId, HostEvent, MapCenter, Result, TileLayerOptions, ToggleEvent,
    ViewContext,
};
use parking_lot::{Mutex, RwLock};

use crate::events::EventBus;
use crate::host::{LayerSwitcher, MapSurface};

/// A mutation received by [`RecordingMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    AddLayer(String),
    AddTileLayer(String),
    RemoveLayer(String),
    SetZIndex(String, i32),
    TrackLayerEvents(String),
    AddFeatures(String, Vec<FeatureId>),
    RemoveFeatures(String, Vec<FeatureId>),
    AddCheckbox(String),
    SetCheckbox(String, bool),
}

impl MapCall {
    /// Whether this call changed feature contents.
    pub fn is_feature_mutation(&self) -> bool {
        matches!(self, Self::AddFeatures(..) | Self::RemoveFeatures(..))
    }
}

/// Map surface that keeps layers in memory and logs every mutation.
///
/// When connected to an [`EventBus`], checking a checkbox fires the toggle
/// event the way a real layer switcher does.
pub struct RecordingMap {
    view: RwLock<ViewContext>,
    layers: RwLock<BTreeMap<String, BTreeMap<FeatureId, Feature>>>,
    z_indexes: RwLock<HashMap<String, i32>>,
    checkboxes: RwLock<BTreeMap<String, bool>>,
    calls: Mutex<Vec<MapCall>>,
    bus: Option<EventBus>,
}

impl RecordingMap {
    pub fn new(view: ViewContext) -> Self {
        Self {
            view: RwLock::new(view),
            layers: RwLock::new(BTreeMap::new()),
            z_indexes: RwLock::new(HashMap::new()),
            checkboxes: RwLock::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Move the viewport. Does not emit a move-end event.
    pub fn set_view(&self, zoom: u8, center: MapCenter) {
        *self.view.write() = ViewContext { center, zoom };
    }

    pub fn has_layer(&self, layer: &str) -> bool {
        self.layers.read().contains_key(layer)
    }

    /// Feature ids on `layer`, sorted.
    pub fn feature_ids(&self, layer: &str) -> Vec<FeatureId> {
        self.layers
            .read()
            .get(layer)
            .map(|features| features.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn z_index(&self, layer: &str) -> Option<i32> {
        self.z_indexes.read().get(layer).copied()
    }

    pub fn checkbox(&self, name: &str) -> Option<bool> {
        self.checkboxes.read().get(name).copied()
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: MapCall) {
        self.calls.lock().push(call);
    }

    fn create_layer(&self, layer: &str) -> Result<()> {
        let mut layers = self.layers.write();
        if layers.contains_key(layer) {
            return Err(Error::Host(format!("layer {} already exists", layer)));
        }
        layers.insert(layer.to_string(), BTreeMap::new());
        Ok(())
    }
}

impl MapSurface for RecordingMap {
    fn add_layer(&self, layer: &str) -> Result<()> {
        self.record(MapCall::AddLayer(layer.to_string()));
        self.create_layer(layer)
    }

    fn add_tile_layer(&self, layer: &str, _options: &TileLayerOptions) -> Result<()> {
        self.record(MapCall::AddTileLayer(layer.to_string()));
        self.create_layer(layer)
    }

    fn remove_layer(&self, layer: &str) -> Result<()> {
        self.record(MapCall::RemoveLayer(layer.to_string()));
        self.z_indexes.write().remove(layer);
        self.layers
            .write()
            .remove(layer)
            .map(|_| ())
            .ok_or_else(|| Error::Host(format!("layer {} does not exist", layer)))
    }

    fn set_layer_z_index(&self, layer: &str, z_index: i32) -> Result<()> {
        self.record(MapCall::SetZIndex(layer.to_string(), z_index));
        if !self.has_layer(layer) {
            return Err(Error::Host(format!("layer {} does not exist", layer)));
        }
        self.z_indexes.write().insert(layer.to_string(), z_index);
        Ok(())
    }

    fn track_layer_events(&self, layer: &str) -> Result<()> {
        self.record(MapCall::TrackLayerEvents(layer.to_string()));
        Ok(())
    }

    fn add_features(&self, layer: &str, features: Vec<Feature>) -> Result<()> {
        self.record(MapCall::AddFeatures(
            layer.to_string(),
            features.iter().map(|f| f.id.clone()).collect(),
        ));
        let mut layers = self.layers.write();
        let contents = layers
            .get_mut(layer)
            .ok_or_else(|| Error::Host(format!("layer {} does not exist", layer)))?;
        for feature in features {
            contents.insert(feature.id.clone(), feature);
        }
        Ok(())
    }

    fn remove_features(&self, layer: &str, ids: &[FeatureId]) -> Result<()> {
        self.record(MapCall::RemoveFeatures(layer.to_string(), ids.to_vec()));
        let mut layers = self.layers.write();
        let contents = layers
            .get_mut(layer)
            .ok_or_else(|| Error::Host(format!("layer {} does not exist", layer)))?;
        for id in ids {
            contents.remove(id);
        }
        Ok(())
    }

    fn zoom_level(&self) -> u8 {
        self.view.read().zoom
    }

    fn center(&self) -> MapCenter {
        self.view.read().center
    }
}

impl LayerSwitcher for RecordingMap {
    fn add_layer_checkbox(&self, name: &str) -> Result<()> {
        self.record(MapCall::AddCheckbox(name.to_string()));
        self.checkboxes.write().insert(name.to_string(), false);
        Ok(())
    }

    fn set_layer_checkbox_checked(&self, name: &str, checked: bool) -> Result<()> {
        self.record(MapCall::SetCheckbox(name.to_string(), checked));
        {
            let mut checkboxes = self.checkboxes.write();
            let current = checkboxes
                .get_mut(name)
                .ok_or_else(|| Error::Host(format!("no checkbox named {}", name)))?;
            if *current == checked {
                return Ok(());
            }
            *current = checked;
        }

        if let Some(bus) = &self.bus {
            bus.emit(HostEvent::CheckboxToggled(ToggleEvent {
                name: name.to_string(),
                checked,
            }));
        }
        Ok(())
    }
}
