//! Map events and the listener types bindings subscribe with.

use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::str::FromStr;

use mapbind_types::{LngLat, RenderedFeature, ScreenPoint};

use crate::handle::MapHandle;

/// Kind of a map event, identified by the engine's event name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapEventKind {
    /// `load`: the map finished loading all resources. Marks the fully loaded readiness state.
    Load,
    /// `style.load`: the style was parsed. Marks the style ready state. Fires again when the
    /// style is reloaded.
    StyleLoad,
    /// `styledata`: any style related change, including added or removed layers.
    StyleData,
    /// `click` on the map surface.
    Click,
    /// `dblclick` on the map surface.
    DblClick,
    /// `mousemove` over the map surface.
    MouseMove,
    /// `mouseenter` into a layer's features.
    MouseEnter,
    /// `mouseleave` from a layer's features.
    MouseLeave,
    /// `moveend`: camera movement finished.
    MoveEnd,
    /// `zoomend`: zoom change finished.
    ZoomEnd,
    /// `idle`: the map rendered the last frame of a transition.
    Idle,
    /// Any other event name.
    Other(String),
}

impl MapEventKind {
    /// Engine name of the event.
    pub fn name(&self) -> &str {
        match self {
            Self::Load => "load",
            Self::StyleLoad => "style.load",
            Self::StyleData => "styledata",
            Self::Click => "click",
            Self::DblClick => "dblclick",
            Self::MouseMove => "mousemove",
            Self::MouseEnter => "mouseenter",
            Self::MouseLeave => "mouseleave",
            Self::MoveEnd => "moveend",
            Self::ZoomEnd => "zoomend",
            Self::Idle => "idle",
            Self::Other(name) => name,
        }
    }
}

impl Display for MapEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MapEventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "load" => Self::Load,
            "style.load" => Self::StyleLoad,
            "styledata" => Self::StyleData,
            "click" => Self::Click,
            "dblclick" => Self::DblClick,
            "mousemove" => Self::MouseMove,
            "mouseenter" => Self::MouseEnter,
            "mouseleave" => Self::MouseLeave,
            "moveend" => Self::MoveEnd,
            "zoomend" => Self::ZoomEnd,
            "idle" => Self::Idle,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl From<&str> for MapEventKind {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

/// Event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEvent {
    /// Kind of the event.
    pub kind: MapEventKind,
    /// Pointer position for pointer events.
    pub point: Option<ScreenPoint>,
    /// Geographic position under the pointer for pointer events.
    pub lng_lat: Option<LngLat>,
    /// Features under the pointer. Only filled for layer-scoped listeners.
    pub features: Vec<RenderedFeature>,
}

impl MapEvent {
    /// Creates an event without pointer information.
    pub fn new(kind: impl Into<MapEventKind>) -> Self {
        Self {
            kind: kind.into(),
            point: None,
            lng_lat: None,
            features: vec![],
        }
    }

    /// Creates a pointer event at the given position.
    pub fn pointer(kind: impl Into<MapEventKind>, point: ScreenPoint, lng_lat: LngLat) -> Self {
        Self {
            kind: kind.into(),
            point: Some(point),
            lng_lat: Some(lng_lat),
            features: vec![],
        }
    }

    /// Creates a `click` event at the given position.
    pub fn click(point: ScreenPoint, lng_lat: LngLat) -> Self {
        Self::pointer(MapEventKind::Click, point, lng_lat)
    }
}

impl From<MapEventKind> for MapEvent {
    fn from(kind: MapEventKind) -> Self {
        Self::new(kind)
    }
}

/// Id of a registered listener, returned when subscribing and used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Value returned by an overlay listener to indicate whether the event should reach the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPropagation {
    /// Event continues to the map-level listeners.
    Propagate,
    /// Event stops at the overlay.
    Stop,
}

/// Map event listener.
///
/// Listeners receive the handle of the map that fired the event, so they never need to keep
/// a handle of their own.
pub type Listener = Rc<dyn Fn(&MapHandle, &MapEvent)>;

/// Listener attached to an overlay element.
pub type OverlayListener = Rc<dyn Fn(&MapHandle, &MapEvent) -> EventPropagation>;

/// Wraps a closure into a [`Listener`].
pub fn listener(f: impl Fn(&MapHandle, &MapEvent) + 'static) -> Listener {
    Rc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_round_trip() {
        for name in ["load", "style.load", "styledata", "click", "moveend", "custom"] {
            assert_eq!(MapEventKind::from(name).name(), name);
        }

        assert_eq!(MapEventKind::from("style.load"), MapEventKind::StyleLoad);
        assert_eq!(
            MapEventKind::from("render"),
            MapEventKind::Other("render".into())
        );
    }
}
