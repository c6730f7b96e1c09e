//! Plain data types describing what a map should contain: coordinates, data sources, layers,
//! terrain, overlay elements and controls.
//!
//! These types carry no behaviour of their own. They are produced by bindings in the `mapbind`
//! crate and consumed by map engine adapters, so both sides agree on a single vocabulary.

mod control;
mod element;
mod feature;
mod layer;
mod lnglat;
mod screen;
mod source;
mod terrain;

pub use control::Control;
pub use element::{Element, Popup};
pub use feature::{FeatureId, RenderedFeature};
pub use layer::{Expression, LayerKind, LayerSpec};
pub use lnglat::LngLat;
pub use screen::{ScreenPoint, Surface};
pub use source::{SourceSpec, DEFAULT_DEM_MAX_ZOOM, DEFAULT_DEM_TILE_SIZE};
pub use terrain::{TerrainSpec, DEFAULT_EXAGGERATION};

// Reexport geojson, since source specs embed its types.
pub use geojson;
