use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::Binding;
use crate::event::{Listener, ListenerId, MapEvent, MapEventKind};
use crate::handle::MapHandle;

/// Subscribes a handler to a map event while attached.
///
/// With a layer scope the handler only receives pointer events over rendered features of that
/// layer. If the layer does not exist yet when the binding is attached, the binding waits for
/// `styledata` events until the layer appears and subscribes then.
#[derive(Clone)]
pub struct EventBinding {
    kind: MapEventKind,
    handler: Listener,
    scope: Option<String>,
    once: bool,
}

impl EventBinding {
    /// Creates a binding calling `handler` on every event of `kind`.
    pub fn new(
        kind: impl Into<MapEventKind>,
        handler: impl Fn(&MapHandle, &MapEvent) + 'static,
    ) -> Self {
        Self {
            kind: kind.into(),
            handler: Rc::new(handler),
            scope: None,
            once: false,
        }
    }

    /// Limits the handler to events over features of the layer `layer_id`.
    pub fn with_layer(mut self, layer_id: impl Into<String>) -> Self {
        self.scope = Some(layer_id.into());
        self
    }

    /// Calls the handler for the first occurrence of the event only.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Event the handler is subscribed to.
    pub fn kind(&self) -> &MapEventKind {
        &self.kind
    }

    /// Layer scope of the subscription.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    fn subscribe(&self, map: &MapHandle) -> ListenerId {
        subscribe(map, &self.kind, self.scope.as_deref(), self.once, &self.handler)
    }
}

fn subscribe(
    map: &MapHandle,
    kind: &MapEventKind,
    scope: Option<&str>,
    once: bool,
    handler: &Listener,
) -> ListenerId {
    if once {
        map.once(kind.clone(), scope, handler.clone())
    } else {
        map.on(kind.clone(), scope, handler.clone())
    }
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("once", &self.once)
            .finish()
    }
}

/// Subscription state of an attached [`EventBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Waiting for the scope layer to appear. The id is the `styledata` listener polling for it.
    Pending(ListenerId),
    /// The handler is subscribed.
    Bound(ListenerId),
    /// The binding was detached.
    Cancelled,
}

/// Result of attaching an [`EventBinding`].
#[derive(Debug)]
pub struct EventToken {
    state: Rc<RefCell<EventState>>,
}

impl EventToken {
    /// Current subscription state.
    pub fn state(&self) -> EventState {
        *self.state.borrow()
    }
}

impl Binding for EventBinding {
    type Token = EventToken;

    fn attach(&self, map: &MapHandle) -> EventToken {
        let Some(layer_id) = self.scope.clone() else {
            let id = self.subscribe(map);
            return EventToken {
                state: Rc::new(RefCell::new(EventState::Bound(id))),
            };
        };

        if map.has_layer(&layer_id) {
            let id = self.subscribe(map);
            return EventToken {
                state: Rc::new(RefCell::new(EventState::Bound(id))),
            };
        }

        log::debug!(
            "Layer `{layer_id}` does not exist yet, waiting for it to bind `{}`",
            self.kind
        );

        let state = Rc::new(RefCell::new(EventState::Cancelled));
        let poll_state = state.clone();
        let kind = self.kind.clone();
        let once = self.once;
        let handler = self.handler.clone();

        let poll = map.on(
            MapEventKind::StyleData,
            None,
            Rc::new(move |map: &MapHandle, _: &MapEvent| {
                let EventState::Pending(poll) = *poll_state.borrow() else {
                    return;
                };
                if !map.has_layer(&layer_id) {
                    return;
                }

                map.off(MapEventKind::StyleData, None, poll);
                let id = subscribe(map, &kind, Some(layer_id.as_str()), once, &handler);
                *poll_state.borrow_mut() = EventState::Bound(id);
                log::debug!("Layer `{layer_id}` appeared, `{kind}` handler bound");
            }),
        );
        *state.borrow_mut() = EventState::Pending(poll);

        EventToken { state }
    }

    fn detach(&self, map: &MapHandle, token: EventToken) {
        let state = token.state.replace(EventState::Cancelled);
        match state {
            EventState::Pending(poll) => {
                map.off(MapEventKind::StyleData, None, poll);
            }
            EventState::Bound(id) => {
                map.off(self.kind.clone(), self.scope(), id);
            }
            EventState::Cancelled => {
                log::debug!("Event binding for `{}` is already detached", self.kind);
            }
        }
    }
}

/// Click handler, optionally limited to features of one layer.
#[derive(Debug, Clone)]
pub struct ClickBinding(EventBinding);

impl ClickBinding {
    /// Creates a binding calling `handler` on every click on the map.
    pub fn new(handler: impl Fn(&MapHandle, &MapEvent) + 'static) -> Self {
        Self(EventBinding::new(MapEventKind::Click, handler))
    }

    /// Limits the handler to clicks on features of the layer `layer_id`.
    pub fn with_layer(self, layer_id: impl Into<String>) -> Self {
        Self(self.0.with_layer(layer_id))
    }
}

impl Binding for ClickBinding {
    type Token = EventToken;

    fn attach(&self, map: &MapHandle) -> EventToken {
        self.0.attach(map)
    }

    fn detach(&self, map: &MapHandle, token: EventToken) {
        self.0.detach(map, token)
    }
}

/// Handler called once when the map finishes loading.
#[derive(Debug, Clone)]
pub struct OnLoadBinding(EventBinding);

impl OnLoadBinding {
    /// Creates a binding calling `handler` on the `load` event.
    pub fn new(handler: impl Fn(&MapHandle, &MapEvent) + 'static) -> Self {
        Self(EventBinding::new(MapEventKind::Load, handler).once())
    }
}

impl Binding for OnLoadBinding {
    type Token = EventToken;

    fn attach(&self, map: &MapHandle) -> EventToken {
        self.0.attach(map)
    }

    fn detach(&self, map: &MapHandle, token: EventToken) {
        self.0.detach(map, token)
    }
}
