use std::rc::Rc;

use mapbind_types::{Element, LngLat, Popup};

use crate::binding::Binding;
use crate::engine::{MarkerId, MarkerSpec};
use crate::event::{EventPropagation, MapEvent};
use crate::handle::MapHandle;

/// Renders the content of a marker popup.
///
/// Implemented for closures taking the payload and the container element to fill:
///
/// ```
/// use mapbind::PopupRenderer;
/// use mapbind::mapbind_types::Element;
///
/// let renderer = |title: &String, container: &mut Element| {
///     container.append(Element::new("h3").with_text(title.as_str()));
/// };
///
/// let mut container = Element::container();
/// renderer.render(&"Santa Monica Pier".to_owned(), &mut container);
/// ```
pub trait PopupRenderer<P> {
    /// Renders `payload` into `container`.
    fn render(&self, payload: &P, container: &mut Element);
}

impl<P, F> PopupRenderer<P> for F
where
    F: Fn(&P, &mut Element),
{
    fn render(&self, payload: &P, container: &mut Element) {
        self(payload, container)
    }
}

/// Places a marker at the given coordinates while attached.
///
/// The marker shows the element built by the element factory, or the engine's default marker.
/// With a popup renderer the popup content is rendered once, on attach, and clicking the marker
/// toggles the popup. Clicks on the marker never reach the map-level click listeners.
///
/// The element factory, popup renderer and click handler all receive the payload, and are only
/// used when the payload is set.
pub struct MarkerBinding<P> {
    coordinates: LngLat,
    payload: Option<P>,
    element: Option<Rc<dyn Fn(&P) -> Element>>,
    popup: Option<Rc<dyn PopupRenderer<P>>>,
    on_click: Option<Rc<dyn Fn(&P)>>,
}

impl<P: Clone + 'static> MarkerBinding<P> {
    /// Creates a binding for a marker at `coordinates`.
    pub fn new(coordinates: LngLat) -> Self {
        Self {
            coordinates,
            payload: None,
            element: None,
            popup: None,
            on_click: None,
        }
    }

    /// Sets the data passed to the element factory, popup renderer and click handler.
    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the factory of the marker element.
    pub fn with_element(mut self, factory: impl Fn(&P) -> Element + 'static) -> Self {
        self.element = Some(Rc::new(factory));
        self
    }

    /// Sets the renderer of the popup content.
    pub fn with_popup(mut self, renderer: impl PopupRenderer<P> + 'static) -> Self {
        self.popup = Some(Rc::new(renderer));
        self
    }

    /// Sets the handler called when the marker is clicked.
    pub fn on_click(mut self, handler: impl Fn(&P) + 'static) -> Self {
        self.on_click = Some(Rc::new(handler));
        self
    }

    /// Position of the marker.
    pub fn coordinates(&self) -> LngLat {
        self.coordinates
    }

    /// Payload of the marker.
    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }
}

/// Result of attaching a [`MarkerBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerToken {
    marker: Option<MarkerId>,
}

impl MarkerToken {
    /// Id of the created marker, `None` if the engine refused to create it.
    pub fn marker_id(&self) -> Option<MarkerId> {
        self.marker
    }
}

impl<P: Clone + 'static> Binding for MarkerBinding<P> {
    type Token = MarkerToken;

    fn attach(&self, map: &MapHandle) -> MarkerToken {
        let element = match (&self.element, &self.payload) {
            (Some(factory), Some(payload)) => Some(factory(payload)),
            _ => None,
        };

        let id = match map.add_marker(MarkerSpec::new(self.coordinates, element)) {
            Ok(id) => id,
            Err(err) => {
                log::error!("Failed to add marker at {:?}: {err}", self.coordinates);
                return MarkerToken { marker: None };
            }
        };

        let payload = self.payload.clone();
        let on_click = self.on_click.clone();
        map.on_overlay_click(
            id,
            Rc::new(move |map: &MapHandle, _: &MapEvent| {
                map.toggle_marker_popup(id);
                if let (Some(on_click), Some(payload)) = (&on_click, &payload) {
                    on_click(payload);
                }

                EventPropagation::Stop
            }),
        );

        if let (Some(renderer), Some(payload)) = (&self.popup, &self.payload) {
            let mut container = Element::container();
            renderer.render(payload, &mut container);
            if let Err(err) = map.set_marker_popup(id, Popup::new(container)) {
                log::error!("Failed to attach popup to marker {}: {err}", id.0);
            }
        }

        MarkerToken { marker: Some(id) }
    }

    fn detach(&self, map: &MapHandle, token: MarkerToken) {
        if let Some(id) = token.marker {
            map.remove_marker(id);
        }
    }
}
