//! Contract of the external map engine that owns the drawing surface.
//!
//! Bindings never talk to an engine directly. They go through [`MapHandle`](crate::MapHandle),
//! which forwards calls to the [`MapEngine`] implementation while the engine is alive.

use mapbind_types::{
    Control, Element, Expression, LayerSpec, LngLat, Popup, RenderedFeature, ScreenPoint,
    SourceSpec, Surface, TerrainSpec,
};

use crate::error::EngineError;
use crate::options::MapOptions;

/// Id of a point overlay created by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Point overlay to place on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Anchor position.
    pub lng_lat: LngLat,
    /// Custom visual element. When `None` the engine uses its default marker visual.
    pub element: Option<Element>,
}

impl MarkerSpec {
    /// Creates a marker specification.
    pub fn new(lng_lat: LngLat, element: Option<Element>) -> Self {
        Self { lng_lat, element }
    }
}

/// Imperative map engine API.
///
/// Implementations adapt a concrete rendering engine. All calls happen on one thread; events
/// produced by the engine are delivered to bindings through [`MapHandle::dispatch`](crate::MapHandle::dispatch).
pub trait MapEngine {
    /// Registers a data source.
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError>;
    /// Removes a data source.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;
    /// Returns the specification of a registered source.
    fn source(&self, id: &str) -> Option<SourceSpec>;
    /// Returns true if a source with the id is registered.
    fn has_source(&self, id: &str) -> bool {
        self.source(id).is_some()
    }

    /// Registers a layer, inserting it below `before_id` when given, or on top otherwise.
    fn add_layer(&mut self, spec: LayerSpec, before_id: Option<&str>) -> Result<(), EngineError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
    /// Returns the specification of a registered layer.
    fn layer(&self, id: &str) -> Option<LayerSpec>;
    /// Returns true if a layer with the id is registered.
    fn has_layer(&self, id: &str) -> bool {
        self.layer(id).is_some()
    }
    /// Ids of all layers in draw order, bottom first.
    fn layer_order(&self) -> Vec<String>;
    /// Sets or clears the filter of a layer.
    fn set_filter(&mut self, layer_id: &str, filter: Option<Expression>)
        -> Result<(), EngineError>;

    /// Sets or clears the terrain configuration.
    fn set_terrain(&mut self, terrain: Option<TerrainSpec>) -> Result<(), EngineError>;
    /// Active terrain configuration.
    fn terrain(&self) -> Option<TerrainSpec>;

    /// Features rendered at `point`, optionally limited to the given layers.
    fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: Option<&[&str]>,
    ) -> Vec<RenderedFeature>;

    /// Places a control over the map.
    fn add_control(&mut self, control: Control);

    /// Creates a point overlay and adds it to the map.
    fn add_marker(&mut self, marker: MarkerSpec) -> Result<MarkerId, EngineError>;
    /// Removes an overlay together with its popup.
    fn remove_marker(&mut self, id: MarkerId);
    /// Returns true if the overlay exists.
    fn has_marker(&self, id: MarkerId) -> bool;
    /// Root element of an overlay.
    fn marker_element(&self, id: MarkerId) -> Option<Element>;
    /// Attaches a popup to an overlay, replacing the previous one.
    fn set_marker_popup(&mut self, id: MarkerId, popup: Popup) -> Result<(), EngineError>;
    /// Opens the overlay's popup if it is closed and closes it otherwise.
    fn toggle_marker_popup(&mut self, id: MarkerId);
    /// Popup attached to an overlay.
    fn marker_popup(&self, id: MarkerId) -> Option<Popup>;
    /// Returns true if the overlay's popup is shown.
    fn is_popup_open(&self, id: MarkerId) -> bool;

    /// Returns true once the style has been parsed.
    fn is_style_loaded(&self) -> bool;
    /// Returns true once all resources have been loaded.
    fn is_loaded(&self) -> bool;

    /// Destroys the engine instance and releases everything registered with it.
    fn destroy(&mut self);
}

/// Creates engine instances bound to a drawing surface.
pub trait EngineFactory {
    /// Creates an engine rendering into `surface`.
    fn create(
        &self,
        surface: &Surface,
        options: &MapOptions,
    ) -> Result<Box<dyn MapEngine>, EngineError>;
}

impl<F> EngineFactory for F
where
    F: Fn(&Surface, &MapOptions) -> Result<Box<dyn MapEngine>, EngineError>,
{
    fn create(
        &self,
        surface: &Surface,
        options: &MapOptions,
    ) -> Result<Box<dyn MapEngine>, EngineError> {
        self(surface, options)
    }
}
