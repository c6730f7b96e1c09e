//! In-memory [`MapEngine`] that renders nothing and records every mutating call.
//!
//! Useful for tests, server-side rendering of a binding tree and for hosts without a real
//! engine yet. It follows the usual engine rules: ids of sources and layers are unique, layers
//! and terrain can only be added after the style is loaded, and removing a missing item fails.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use ahash::AHashMap;
use mapbind_types::{
    Control, Element, Expression, LayerSpec, Popup, RenderedFeature, ScreenPoint, SourceSpec,
    Surface, TerrainSpec,
};

use crate::engine::{EngineFactory, MapEngine, MarkerId, MarkerSpec};
use crate::error::EngineError;
use crate::options::MapOptions;

/// Mutating call received by a [`HeadlessEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `add_source`.
    AddSource {
        /// Source id.
        id: String,
        /// Source specification.
        spec: SourceSpec,
    },
    /// `remove_source`.
    RemoveSource(String),
    /// `add_layer`.
    AddLayer {
        /// Layer specification.
        spec: LayerSpec,
        /// Layer the new one was inserted below.
        before: Option<String>,
    },
    /// `remove_layer`.
    RemoveLayer(String),
    /// `set_filter`.
    SetFilter {
        /// Layer id.
        layer: String,
        /// New filter.
        filter: Option<Expression>,
    },
    /// `set_terrain`.
    SetTerrain(Option<TerrainSpec>),
    /// `add_control`.
    AddControl(Control),
    /// `add_marker`.
    AddMarker(MarkerId),
    /// `remove_marker`.
    RemoveMarker(MarkerId),
    /// `set_marker_popup`.
    SetMarkerPopup(MarkerId),
    /// `toggle_marker_popup`.
    TogglePopup(MarkerId),
    /// `destroy`.
    Destroy,
}

struct MarkerState {
    spec: MarkerSpec,
    popup: Option<Popup>,
    popup_open: bool,
}

#[derive(Default)]
struct HeadlessState {
    surface: Option<Surface>,
    options: Option<MapOptions>,
    sources: AHashMap<String, SourceSpec>,
    layers: Vec<LayerSpec>,
    terrain: Option<TerrainSpec>,
    controls: Vec<Control>,
    markers: AHashMap<MarkerId, MarkerState>,
    next_marker_id: u64,
    rendered: Vec<(ScreenPoint, RenderedFeature)>,
    style_loaded: bool,
    loaded: bool,
    destroyed: bool,
    calls: Vec<EngineCall>,
}

/// In-memory map engine.
///
/// Clones share state, so a test can keep one clone to inspect the engine after handing
/// another one to a [`MapProvider`](crate::MapProvider).
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessEngine {
    /// Creates an engine whose style is not loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the style as already loaded.
    pub fn with_style_loaded(self) -> Self {
        self.set_style_loaded(true);
        self
    }

    /// Marks the style and all resources as already loaded.
    pub fn with_loaded(self) -> Self {
        self.set_loaded(true);
        self
    }

    /// Sets whether the style is loaded. This does not fire any event.
    pub fn set_style_loaded(&self, value: bool) {
        self.state.borrow_mut().style_loaded = value;
    }

    /// Sets whether all resources are loaded. Loaded resources imply a loaded style. This does
    /// not fire any event.
    pub fn set_loaded(&self, value: bool) {
        let mut state = self.state.borrow_mut();
        state.loaded = value;
        state.style_loaded |= value;
    }

    /// Factory creating engines that share state with this one.
    pub fn factory(&self) -> impl EngineFactory {
        let engine = self.clone();
        move |surface: &Surface, options: &MapOptions| -> Result<Box<dyn MapEngine>, EngineError> {
            {
                let mut state = engine.state.borrow_mut();
                state.surface = Some(surface.clone());
                state.options = Some(options.clone());
            }

            Ok(Box::new(engine.clone()))
        }
    }

    /// Makes `feature` appear under `point` in rendered feature queries.
    pub fn add_rendered_feature(&self, point: ScreenPoint, feature: RenderedFeature) {
        self.state.borrow_mut().rendered.push((point, feature));
    }

    /// Mutating calls received so far, in order.
    pub fn calls(&self) -> Ref<'_, [EngineCall]> {
        Ref::map(self.state.borrow(), |state| state.calls.as_slice())
    }

    /// Number of received calls matching the predicate.
    pub fn count_calls(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Surface the engine was created for by its factory.
    pub fn surface(&self) -> Option<Surface> {
        self.state.borrow().surface.clone()
    }

    /// Options the engine was created with by its factory.
    pub fn options(&self) -> Option<MapOptions> {
        self.state.borrow().options.clone()
    }

    /// Ids of the registered sources, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Controls placed over the map.
    pub fn controls(&self) -> Vec<Control> {
        self.state.borrow().controls.clone()
    }

    /// Number of overlays on the map.
    pub fn marker_count(&self) -> usize {
        self.state.borrow().markers.len()
    }

    /// Returns true once the engine was destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    fn record(&self, call: EngineCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn check_alive(&self) -> Result<(), EngineError> {
        if self.state.borrow().destroyed {
            return Err(EngineError::Rejected("engine is destroyed".into()));
        }

        Ok(())
    }

    fn check_style(&self) -> Result<(), EngineError> {
        self.check_alive()?;
        if !self.state.borrow().style_loaded {
            return Err(EngineError::Rejected("style is not done loading".into()));
        }

        Ok(())
    }
}

impl MapEngine for HeadlessEngine {
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError> {
        self.check_alive()?;
        self.record(EngineCall::AddSource {
            id: id.to_owned(),
            spec: spec.clone(),
        });

        let mut state = self.state.borrow_mut();
        if state.sources.contains_key(id) {
            return Err(EngineError::Rejected(format!(
                "there is already a source with id `{id}`"
            )));
        }

        state.sources.insert(id.to_owned(), spec);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        self.check_alive()?;
        self.record(EngineCall::RemoveSource(id.to_owned()));

        let mut state = self.state.borrow_mut();
        if state.sources.remove(id).is_none() {
            return Err(EngineError::NotFound(id.to_owned()));
        }

        Ok(())
    }

    fn source(&self, id: &str) -> Option<SourceSpec> {
        self.state.borrow().sources.get(id).cloned()
    }

    fn add_layer(&mut self, spec: LayerSpec, before_id: Option<&str>) -> Result<(), EngineError> {
        self.check_style()?;
        self.record(EngineCall::AddLayer {
            spec: spec.clone(),
            before: before_id.map(str::to_owned),
        });

        let mut state = self.state.borrow_mut();
        if state.layers.iter().any(|layer| layer.id == spec.id) {
            return Err(EngineError::Rejected(format!(
                "there is already a layer with id `{}`",
                spec.id
            )));
        }

        let index = before_id
            .and_then(|before| state.layers.iter().position(|layer| layer.id == before))
            .unwrap_or(state.layers.len());
        state.layers.insert(index, spec);

        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        self.check_alive()?;
        self.record(EngineCall::RemoveLayer(id.to_owned()));

        let mut state = self.state.borrow_mut();
        let Some(index) = state.layers.iter().position(|layer| layer.id == id) else {
            return Err(EngineError::NotFound(id.to_owned()));
        };

        state.layers.remove(index);
        Ok(())
    }

    fn layer(&self, id: &str) -> Option<LayerSpec> {
        self.state
            .borrow()
            .layers
            .iter()
            .find(|layer| layer.id == id)
            .cloned()
    }

    fn layer_order(&self) -> Vec<String> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|layer| layer.id.clone())
            .collect()
    }

    fn set_filter(
        &mut self,
        layer_id: &str,
        filter: Option<Expression>,
    ) -> Result<(), EngineError> {
        self.check_alive()?;
        self.record(EngineCall::SetFilter {
            layer: layer_id.to_owned(),
            filter: filter.clone(),
        });

        let mut state = self.state.borrow_mut();
        let Some(layer) = state.layers.iter_mut().find(|layer| layer.id == layer_id) else {
            return Err(EngineError::NotFound(layer_id.to_owned()));
        };

        layer.filter = filter;
        Ok(())
    }

    fn set_terrain(&mut self, terrain: Option<TerrainSpec>) -> Result<(), EngineError> {
        self.check_style()?;
        self.record(EngineCall::SetTerrain(terrain.clone()));

        let mut state = self.state.borrow_mut();
        if let Some(terrain) = &terrain {
            if !state.sources.contains_key(&terrain.source) {
                return Err(EngineError::NotFound(terrain.source.clone()));
            }
        }

        state.terrain = terrain;
        Ok(())
    }

    fn terrain(&self) -> Option<TerrainSpec> {
        self.state.borrow().terrain.clone()
    }

    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: Option<&[&str]>,
    ) -> Vec<RenderedFeature> {
        let state = self.state.borrow();
        state
            .rendered
            .iter()
            .filter(|(feature_point, _)| *feature_point == point)
            .map(|(_, feature)| feature)
            .filter(|feature| state.layers.iter().any(|layer| layer.id == feature.layer))
            .filter(|feature| {
                layers.map_or(true, |layers| layers.contains(&feature.layer.as_str()))
            })
            .cloned()
            .collect()
    }

    fn add_control(&mut self, control: Control) {
        self.record(EngineCall::AddControl(control.clone()));
        self.state.borrow_mut().controls.push(control);
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> Result<MarkerId, EngineError> {
        self.check_alive()?;

        let id = {
            let mut state = self.state.borrow_mut();
            let id = MarkerId(state.next_marker_id);
            state.next_marker_id += 1;
            state.markers.insert(
                id,
                MarkerState {
                    spec: marker,
                    popup: None,
                    popup_open: false,
                },
            );
            id
        };

        self.record(EngineCall::AddMarker(id));
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.record(EngineCall::RemoveMarker(id));
        self.state.borrow_mut().markers.remove(&id);
    }

    fn has_marker(&self, id: MarkerId) -> bool {
        self.state.borrow().markers.contains_key(&id)
    }

    fn marker_element(&self, id: MarkerId) -> Option<Element> {
        self.state.borrow().markers.get(&id).map(|marker| {
            marker
                .spec
                .element
                .clone()
                .unwrap_or_else(|| Element::container().with_attribute("class", "marker"))
        })
    }

    fn set_marker_popup(&mut self, id: MarkerId, popup: Popup) -> Result<(), EngineError> {
        self.check_alive()?;
        self.record(EngineCall::SetMarkerPopup(id));

        let mut state = self.state.borrow_mut();
        let Some(marker) = state.markers.get_mut(&id) else {
            return Err(EngineError::NotFound(format!("marker {}", id.0)));
        };

        marker.popup = Some(popup);
        marker.popup_open = false;
        Ok(())
    }

    fn toggle_marker_popup(&mut self, id: MarkerId) {
        self.record(EngineCall::TogglePopup(id));

        if let Some(marker) = self.state.borrow_mut().markers.get_mut(&id) {
            if marker.popup.is_some() {
                marker.popup_open = !marker.popup_open;
            }
        }
    }

    fn marker_popup(&self, id: MarkerId) -> Option<Popup> {
        self.state
            .borrow()
            .markers
            .get(&id)
            .and_then(|marker| marker.popup.clone())
    }

    fn is_popup_open(&self, id: MarkerId) -> bool {
        self.state
            .borrow()
            .markers
            .get(&id)
            .is_some_and(|marker| marker.popup_open)
    }

    fn is_style_loaded(&self) -> bool {
        self.state.borrow().style_loaded
    }

    fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    fn destroy(&mut self) {
        self.record(EngineCall::Destroy);

        let mut state = self.state.borrow_mut();
        state.sources.clear();
        state.layers.clear();
        state.terrain = None;
        state.controls.clear();
        state.markers.clear();
        state.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mapbind_types::LayerKind;

    #[test]
    fn layers_are_inserted_before_the_named_layer() {
        let mut engine = HeadlessEngine::new().with_style_loaded();
        for id in ["water", "road-label"] {
            engine
                .add_layer(LayerSpec::new(id, LayerKind::Fill), None)
                .expect("failed to add layer");
        }

        engine
            .add_layer(
                LayerSpec::new("highlighted-road", LayerKind::Line),
                Some("road-label"),
            )
            .expect("failed to add layer");
        engine
            .add_layer(LayerSpec::new("labels", LayerKind::Symbol), Some("missing"))
            .expect("failed to add layer");

        assert_eq!(
            engine.layer_order(),
            vec!["water", "highlighted-road", "road-label", "labels"]
        );
    }

    #[test]
    fn layers_need_a_loaded_style() {
        let mut engine = HeadlessEngine::new();
        assert_matches!(
            engine.add_layer(LayerSpec::new("a", LayerKind::Fill), None),
            Err(EngineError::Rejected(_))
        );
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn removing_a_marker_removes_its_popup() {
        let mut engine = HeadlessEngine::new();
        let id = engine
            .add_marker(MarkerSpec {
                lng_lat: mapbind_types::lnglat!(1.0, 2.0),
                element: None,
            })
            .expect("failed to add marker");
        engine
            .set_marker_popup(id, Popup::new(Element::container()))
            .expect("failed to set popup");
        engine.toggle_marker_popup(id);
        assert!(engine.is_popup_open(id));

        engine.remove_marker(id);

        assert!(!engine.has_marker(id));
        assert!(engine.marker_popup(id).is_none());
        assert!(!engine.is_popup_open(id));
    }
}
