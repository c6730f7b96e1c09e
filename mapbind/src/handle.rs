use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use ahash::AHashMap;
use mapbind_types::{
    Control, Element, Expression, LayerSpec, Popup, RenderedFeature, ScreenPoint, SourceSpec,
    TerrainSpec,
};

use crate::engine::{MapEngine, MarkerId, MarkerSpec};
use crate::error::MapBindError;
use crate::event::{
    EventPropagation, Listener, ListenerId, MapEvent, MapEventKind, OverlayListener,
};
use crate::listeners::ListenerTable;
use crate::readiness::{self, Deferred, Gate, ReadinessState, WaiterId, Waiters};

/// Shared handle to a live map engine instance.
///
/// One handle is created per [`MapProvider`](crate::MapProvider) mount and shared by every
/// binding below it. Cloning the handle is cheap and all clones refer to the same engine.
///
/// The handle forwards calls to the [`MapEngine`] and keeps the event subscription table of the
/// map. Once the provider destroys the engine, every mutation becomes a no-op, queries return
/// nothing and all listeners and deferred callbacks are dropped.
#[derive(Clone)]
pub struct MapHandle {
    inner: Rc<MapInner>,
}

struct MapInner {
    engine: RefCell<Option<Box<dyn MapEngine>>>,
    listeners: RefCell<ListenerTable>,
    overlay_listeners: RefCell<AHashMap<MarkerId, Vec<(ListenerId, OverlayListener)>>>,
    waiters: RefCell<Waiters>,
    readiness: Cell<ReadinessState>,
}

impl MapHandle {
    pub(crate) fn new(engine: Box<dyn MapEngine>) -> Self {
        Self {
            inner: Rc::new(MapInner {
                engine: RefCell::new(Some(engine)),
                listeners: RefCell::default(),
                overlay_listeners: RefCell::default(),
                waiters: RefCell::default(),
                readiness: Cell::default(),
            }),
        }
    }

    /// Returns true if both handles refer to the same engine instance.
    pub fn ptr_eq(&self, other: &MapHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true if the engine instance was destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.inner.engine.borrow().is_none()
    }

    fn with_engine<R>(&self, f: impl FnOnce(&dyn MapEngine) -> R) -> Option<R> {
        self.inner.engine.borrow().as_deref().map(f)
    }

    fn with_engine_mut<R>(&self, f: impl FnOnce(&mut dyn MapEngine) -> R) -> Option<R> {
        let mut engine = self.inner.engine.borrow_mut();
        match engine.as_deref_mut() {
            Some(engine) => Some(f(engine)),
            None => {
                log::debug!("Ignoring call to a destroyed map engine");
                None
            }
        }
    }

    pub(crate) fn destroy(&self) {
        let engine = self.inner.engine.borrow_mut().take();
        let Some(mut engine) = engine else {
            return;
        };

        engine.destroy();
        self.inner.listeners.borrow_mut().clear();
        self.inner.overlay_listeners.borrow_mut().clear();
        self.inner.waiters.borrow_mut().clear();
        log::debug!("Map engine destroyed");
    }

    /// Current readiness state.
    ///
    /// Combines the readiness events seen so far with what the engine reports about itself, and
    /// never goes back to a lower state.
    pub fn readiness(&self) -> ReadinessState {
        let reported = self
            .with_engine(|engine| {
                if engine.is_loaded() {
                    ReadinessState::FullyLoaded
                } else if engine.is_style_loaded() {
                    ReadinessState::StyleReady
                } else {
                    ReadinessState::Initializing
                }
            })
            .unwrap_or_default();

        let state = self.inner.readiness.get().max(reported);
        self.inner.readiness.set(state);
        state
    }

    /// Runs `callback` once the readiness state satisfies `gate`.
    ///
    /// If the gate is already open the callback runs before this method returns. Otherwise it is
    /// queued and runs exactly once, after the readiness event that opens the gate is
    /// dispatched. Callbacks waiting for the same gate run in the order they were queued.
    ///
    /// The returned [`Deferred`] can cancel a queued callback. On a destroyed map the callback
    /// never runs and the deferred is already cancelled.
    pub fn when_ready(&self, gate: Gate, callback: impl FnOnce(&MapHandle) + 'static) -> Deferred {
        if self.is_destroyed() {
            return readiness::cancelled(gate);
        }

        let state = self.readiness();
        if state.satisfies(gate) {
            // Callbacks queued before the engine reported the state go first.
            self.advance(state);
            callback(self);
            return readiness::bound(gate);
        }

        log::debug!("Deferring callback until `{}`", gate.event());
        self.inner
            .waiters
            .borrow_mut()
            .push(gate, Box::new(callback))
    }

    pub(crate) fn cancel_waiter(&self, waiter: WaiterId) {
        self.inner.waiters.borrow_mut().remove(waiter);
    }

    /// Number of callbacks queued by [`MapHandle::when_ready`] that have not run yet.
    pub fn pending_callbacks(&self) -> usize {
        self.inner.waiters.borrow().len()
    }

    fn advance(&self, state: ReadinessState) {
        if state > self.inner.readiness.get() {
            log::debug!("Map readiness advanced to {state:?}");
            self.inner.readiness.set(state);
        }

        let state = self.readiness();
        let ready = self.inner.waiters.borrow_mut().take_ready(state);
        for waiter in ready {
            waiter.run(self);
        }
    }

    /// Registers a data source.
    ///
    /// Fails with [`MapBindError::DuplicateSource`] if a source with the same id exists.
    pub fn add_source(&self, id: &str, spec: SourceSpec) -> Result<(), MapBindError> {
        self.with_engine_mut(|engine| -> Result<(), MapBindError> {
            if engine.has_source(id) {
                return Err(MapBindError::DuplicateSource(id.to_owned()));
            }

            engine.add_source(id, spec)?;
            Ok(())
        })
        .unwrap_or(Err(MapBindError::Destroyed))
    }

    /// Removes a data source. Returns false if there was no source with this id.
    pub fn remove_source(&self, id: &str) -> bool {
        self.with_engine_mut(|engine| {
            if !engine.has_source(id) {
                log::debug!("Source `{id}` is not registered, nothing to remove");
                return false;
            }

            match engine.remove_source(id) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("Failed to remove source `{id}`: {err}");
                    false
                }
            }
        })
        .unwrap_or(false)
    }

    /// Returns true if a source with this id is registered.
    pub fn has_source(&self, id: &str) -> bool {
        self.with_engine(|engine| engine.has_source(id))
            .unwrap_or_default()
    }

    /// Specification of a registered source.
    pub fn source(&self, id: &str) -> Option<SourceSpec> {
        self.with_engine(|engine| engine.source(id)).flatten()
    }

    /// Registers a layer below `before_id`, or on top if `before_id` is `None`.
    ///
    /// Fails with [`MapBindError::DuplicateLayer`] if a layer with the same id exists.
    pub fn add_layer(&self, spec: LayerSpec, before_id: Option<&str>) -> Result<(), MapBindError> {
        self.with_engine_mut(|engine| -> Result<(), MapBindError> {
            if engine.has_layer(&spec.id) {
                return Err(MapBindError::DuplicateLayer(spec.id));
            }

            if let Some(before_id) = before_id {
                if !engine.has_layer(before_id) {
                    log::debug!(
                        "Layer `{before_id}` does not exist, the engine decides where `{}` goes",
                        spec.id
                    );
                }
            }

            engine.add_layer(spec, before_id)?;
            Ok(())
        })
        .unwrap_or(Err(MapBindError::Destroyed))
    }

    /// Removes a layer. Returns false if there was no layer with this id.
    pub fn remove_layer(&self, id: &str) -> bool {
        self.with_engine_mut(|engine| {
            if !engine.has_layer(id) {
                log::debug!("Layer `{id}` is not registered, nothing to remove");
                return false;
            }

            match engine.remove_layer(id) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("Failed to remove layer `{id}`: {err}");
                    false
                }
            }
        })
        .unwrap_or(false)
    }

    /// Returns true if a layer with this id is registered.
    pub fn has_layer(&self, id: &str) -> bool {
        self.with_engine(|engine| engine.has_layer(id))
            .unwrap_or(false)
    }

    /// Specification of a registered layer.
    pub fn layer(&self, id: &str) -> Option<LayerSpec> {
        self.with_engine(|engine| engine.layer(id)).flatten()
    }

    /// Layer ids in draw order, bottom first.
    pub fn layer_order(&self) -> Vec<String> {
        self.with_engine(|engine| engine.layer_order())
            .unwrap_or_default()
    }

    /// Sets or clears the filter of a layer. Returns false if the layer does not exist.
    pub fn set_filter(&self, layer_id: &str, filter: Option<Expression>) -> bool {
        self.with_engine_mut(|engine| {
            if !engine.has_layer(layer_id) {
                log::debug!("Layer `{layer_id}` is not registered, filter is not set");
                return false;
            }

            match engine.set_filter(layer_id, filter) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("Failed to set filter of layer `{layer_id}`: {err}");
                    false
                }
            }
        })
        .unwrap_or(false)
    }

    /// Sets or clears the terrain configuration.
    pub fn set_terrain(&self, terrain: Option<TerrainSpec>) -> Result<(), MapBindError> {
        self.with_engine_mut(|engine| -> Result<(), MapBindError> {
            Ok(engine.set_terrain(terrain)?)
        })
        .unwrap_or(Err(MapBindError::Destroyed))
    }

    /// Active terrain configuration.
    pub fn terrain(&self) -> Option<TerrainSpec> {
        self.with_engine(|engine| engine.terrain()).flatten()
    }

    /// Features rendered at `point`, optionally limited to the given layers.
    pub fn query_rendered_features(
        &self,
        point: ScreenPoint,
        layers: Option<&[&str]>,
    ) -> Vec<RenderedFeature> {
        self.with_engine(|engine| engine.query_rendered_features(point, layers))
            .unwrap_or_default()
    }

    /// Places a control over the map.
    pub fn add_control(&self, control: Control) {
        self.with_engine_mut(|engine| engine.add_control(control));
    }

    /// Creates a point overlay and adds it to the map.
    pub fn add_marker(&self, marker: MarkerSpec) -> Result<MarkerId, MapBindError> {
        self.with_engine_mut(|engine| -> Result<MarkerId, MapBindError> {
            Ok(engine.add_marker(marker)?)
        })
        .unwrap_or(Err(MapBindError::Destroyed))
    }

    /// Removes an overlay together with its popup and element listeners.
    pub fn remove_marker(&self, id: MarkerId) {
        self.inner.overlay_listeners.borrow_mut().remove(&id);
        self.with_engine_mut(|engine| engine.remove_marker(id));
    }

    /// Returns true if the overlay exists.
    pub fn has_marker(&self, id: MarkerId) -> bool {
        self.with_engine(|engine| engine.has_marker(id))
            .unwrap_or(false)
    }

    /// Root element of an overlay.
    pub fn marker_element(&self, id: MarkerId) -> Option<Element> {
        self.with_engine(|engine| engine.marker_element(id))
            .flatten()
    }

    /// Attaches a popup to an overlay.
    pub fn set_marker_popup(&self, id: MarkerId, popup: Popup) -> Result<(), MapBindError> {
        self.with_engine_mut(|engine| -> Result<(), MapBindError> {
            Ok(engine.set_marker_popup(id, popup)?)
        })
        .unwrap_or(Err(MapBindError::Destroyed))
    }

    /// Shows the overlay's popup if it is hidden and hides it otherwise.
    pub fn toggle_marker_popup(&self, id: MarkerId) {
        self.with_engine_mut(|engine| engine.toggle_marker_popup(id));
    }

    /// Popup attached to an overlay.
    pub fn marker_popup(&self, id: MarkerId) -> Option<Popup> {
        self.with_engine(|engine| engine.marker_popup(id)).flatten()
    }

    /// Returns true if the overlay's popup is shown.
    pub fn is_popup_open(&self, id: MarkerId) -> bool {
        self.with_engine(|engine| engine.is_popup_open(id))
            .unwrap_or(false)
    }

    fn subscribe(
        &self,
        kind: MapEventKind,
        scope: Option<&str>,
        once: bool,
        listener: Listener,
    ) -> ListenerId {
        let mut listeners = self.inner.listeners.borrow_mut();
        if self.is_destroyed() {
            // Not stored, so it is never called.
            return listeners.next_id();
        }

        listeners.insert(kind, scope.map(str::to_owned), once, listener)
    }

    /// Subscribes to an event. With a `scope` the listener only receives pointer events over
    /// features of that layer.
    pub fn on(
        &self,
        kind: impl Into<MapEventKind>,
        scope: Option<&str>,
        listener: Listener,
    ) -> ListenerId {
        self.subscribe(kind.into(), scope, false, listener)
    }

    /// Subscribes to the next occurrence of an event. The listener is removed right before it
    /// is called.
    pub fn once(
        &self,
        kind: impl Into<MapEventKind>,
        scope: Option<&str>,
        listener: Listener,
    ) -> ListenerId {
        self.subscribe(kind.into(), scope, true, listener)
    }

    /// Unsubscribes a listener. The event kind and scope must be the ones used when subscribing.
    ///
    /// Returns false if no such subscription exists.
    pub fn off(&self, kind: impl Into<MapEventKind>, scope: Option<&str>, id: ListenerId) -> bool {
        self.inner
            .listeners
            .borrow_mut()
            .remove(&kind.into(), scope, id)
    }

    /// Number of listeners subscribed to `kind` with exactly this scope.
    pub fn listener_count(&self, kind: impl Into<MapEventKind>, scope: Option<&str>) -> usize {
        self.inner.listeners.borrow().count(&kind.into(), scope)
    }

    /// Attaches a click listener to an overlay's root element.
    pub fn on_overlay_click(&self, marker: MarkerId, listener: OverlayListener) -> ListenerId {
        let id = self.inner.listeners.borrow_mut().next_id();
        if !self.is_destroyed() {
            self.inner
                .overlay_listeners
                .borrow_mut()
                .entry(marker)
                .or_default()
                .push((id, listener));
        }

        id
    }

    /// Detaches a click listener from an overlay's root element.
    pub fn off_overlay_click(&self, marker: MarkerId, id: ListenerId) -> bool {
        let mut overlay_listeners = self.inner.overlay_listeners.borrow_mut();
        let Some(listeners) = overlay_listeners.get_mut(&marker) else {
            return false;
        };

        let len = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != len
    }

    /// Delivers an engine event to the subscribed listeners.
    ///
    /// `style.load` and `load` first advance the readiness state and run the callbacks waiting
    /// for it. Listeners then run in subscription order. A listener unsubscribed by an earlier
    /// one during the same dispatch is not called.
    pub fn dispatch(&self, event: impl Into<MapEvent>) {
        let event = event.into();
        if self.is_destroyed() {
            log::debug!("Dropping `{}` event of a destroyed map", event.kind);
            return;
        }

        match event.kind {
            MapEventKind::StyleLoad => self.advance(ReadinessState::StyleReady),
            MapEventKind::Load => self.advance(ReadinessState::FullyLoaded),
            _ => {}
        }

        let entries = self.inner.listeners.borrow().matching(&event.kind);
        for entry in entries {
            if !self.inner.listeners.borrow().contains(entry.id) {
                continue;
            }

            let scoped_event;
            let event = match &entry.scope {
                None => &event,
                Some(layer_id) => {
                    let Some(point) = event.point else {
                        continue;
                    };
                    if !self.has_layer(layer_id) {
                        continue;
                    }

                    let features = self.query_rendered_features(point, Some(&[layer_id.as_str()]));
                    if features.is_empty() {
                        continue;
                    }

                    scoped_event = MapEvent {
                        features,
                        ..event.clone()
                    };
                    &scoped_event
                }
            };

            if entry.once {
                self.inner.listeners.borrow_mut().remove_id(entry.id);
            }

            (entry.listener)(self, event);
        }
    }

    /// Delivers a click on an overlay's root element.
    ///
    /// The overlay's listeners run first. Unless one of them stops propagation, the click then
    /// reaches the map-level `click` listeners as if the map surface was clicked.
    pub fn dispatch_overlay_click(&self, marker: MarkerId, event: MapEvent) {
        let listeners: Vec<OverlayListener> = self
            .inner
            .overlay_listeners
            .borrow()
            .get(&marker)
            .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        let mut propagation = EventPropagation::Propagate;
        for listener in listeners {
            if listener(self, &event) == EventPropagation::Stop {
                propagation = EventPropagation::Stop;
            }
        }

        if propagation == EventPropagation::Propagate {
            self.dispatch(event);
        }
    }
}

impl Debug for MapHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapHandle")
            .field("destroyed", &self.is_destroyed())
            .field("readiness", &self.inner.readiness.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::listener;
    use crate::headless::HeadlessEngine;
    use mapbind_types::{lnglat, LayerKind};

    fn map() -> (MapHandle, HeadlessEngine) {
        let engine = HeadlessEngine::new();
        (MapHandle::new(Box::new(engine.clone())), engine)
    }

    fn counter() -> (Rc<Cell<usize>>, Listener) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, listener(move |_, _| c.set(c.get() + 1)))
    }

    #[test]
    fn when_ready_runs_synchronously_if_gate_is_open() {
        let engine = HeadlessEngine::new().with_style_loaded();
        let map = MapHandle::new(Box::new(engine));
        let ran = Rc::new(Cell::new(false));

        let r = ran.clone();
        let deferred = map.when_ready(Gate::StyleReady, move |_| r.set(true));

        assert!(ran.get());
        assert_eq!(deferred.state(), readiness::DeferredState::Bound);
        assert_eq!(map.pending_callbacks(), 0);
    }

    #[test]
    fn load_opens_both_gates() {
        let (map, _) = map();
        let order = Rc::new(RefCell::new(vec![]));

        for (name, gate) in [("style", Gate::StyleReady), ("load", Gate::FullyLoaded)] {
            let order = order.clone();
            map.when_ready(gate, move |_| order.borrow_mut().push(name));
        }

        map.dispatch(MapEventKind::Load);

        assert_eq!(*order.borrow(), vec!["style", "load"]);
        assert_eq!(map.readiness(), ReadinessState::FullyLoaded);
    }

    #[test]
    fn queued_callbacks_run_before_newer_ones_when_engine_reports_ready() {
        let (map, engine) = map();
        let order = Rc::new(RefCell::new(vec![]));

        let first = order.clone();
        map.when_ready(Gate::StyleReady, move |_| first.borrow_mut().push("first"));
        engine.set_style_loaded(true);
        let second = order.clone();
        map.when_ready(Gate::StyleReady, move |_| second.borrow_mut().push("second"));
        map.dispatch(MapEventKind::StyleLoad);

        assert_eq!(*order.borrow(), vec!["first", "second"]);
        assert_eq!(map.pending_callbacks(), 0);
    }

    #[test]
    fn readiness_never_regresses() {
        let (map, engine) = map();
        map.dispatch(MapEventKind::Load);
        engine.set_loaded(false);

        assert_eq!(map.readiness(), ReadinessState::FullyLoaded);
    }

    #[test]
    fn cancelled_callback_never_runs() {
        let (map, _) = map();
        let ran = Rc::new(Cell::new(false));

        let r = ran.clone();
        let deferred = map.when_ready(Gate::StyleReady, move |_| r.set(true));
        assert!(deferred.cancel(&map));
        assert!(!deferred.cancel(&map));

        map.dispatch(MapEventKind::StyleLoad);

        assert!(!ran.get());
        assert_eq!(deferred.state(), readiness::DeferredState::Cancelled);
    }

    #[test]
    fn once_listener_fires_once() {
        let (map, _) = map();
        let (count, listener) = counter();
        map.once(MapEventKind::Load, None, listener);

        map.dispatch(MapEventKind::Load);
        map.dispatch(MapEventKind::Load);

        assert_eq!(count.get(), 1);
        assert_eq!(map.listener_count(MapEventKind::Load, None), 0);
    }

    #[test]
    fn listener_removed_during_dispatch_is_not_called() {
        let (map, _) = map();
        let (count, second) = counter();
        let second_id = Rc::new(Cell::new(None));

        let id = second_id.clone();
        map.on(
            MapEventKind::Click,
            None,
            listener(move |map, _| {
                if let Some(id) = id.get() {
                    map.off(MapEventKind::Click, None, id);
                }
            }),
        );
        second_id.set(Some(map.on(MapEventKind::Click, None, second)));

        map.dispatch(MapEvent::click(ScreenPoint::new(1.0, 1.0), lnglat!(0.0, 0.0)));

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn scoped_listener_needs_features_under_pointer() {
        let engine = HeadlessEngine::new().with_style_loaded();
        let map = MapHandle::new(Box::new(engine.clone()));
        let (count, listener) = counter();
        map.on(MapEventKind::Click, Some("roads"), listener);

        let point = ScreenPoint::new(10.0, 10.0);
        map.dispatch(MapEvent::click(point, lnglat!(0.0, 0.0)));
        assert_eq!(count.get(), 0);

        map.add_layer(LayerSpec::new("roads", LayerKind::Line), None)
            .expect("failed to add layer");
        map.dispatch(MapEvent::click(point, lnglat!(0.0, 0.0)));
        assert_eq!(count.get(), 0);

        engine.add_rendered_feature(point, RenderedFeature::new("roads"));
        map.dispatch(MapEvent::click(point, lnglat!(0.0, 0.0)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn destroyed_map_ignores_everything() {
        let (map, engine) = map();
        let (count, listener) = counter();
        map.on(MapEventKind::Load, None, listener);
        let deferred = map.when_ready(Gate::StyleReady, |_| panic!("must not run"));

        map.destroy();
        map.dispatch(MapEventKind::Load);

        assert!(engine.is_destroyed());
        assert_eq!(count.get(), 0);
        assert_eq!(deferred.state(), readiness::DeferredState::Cancelled);
        assert!(!map.remove_layer("anything"));
        assert!(matches!(
            map.add_source("a", SourceSpec::Vector { url: "u".into() }),
            Err(MapBindError::Destroyed)
        ));
    }

    #[test]
    fn missing_targets_are_no_ops() {
        let (map, engine) = map();

        assert!(!map.remove_layer("missing"));
        assert!(!map.remove_source("missing"));
        assert!(!map.set_filter("missing", None));
        assert!(engine.calls().is_empty());
    }
}
