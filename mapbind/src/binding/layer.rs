use std::cell::Cell;
use std::rc::Rc;

use mapbind_types::LayerSpec;

use crate::binding::Binding;
use crate::error::MapBindError;
use crate::handle::MapHandle;
use crate::readiness::{Deferred, Gate};

/// Registers a style layer while attached.
///
/// The layer is added once the map style is loaded, below the `before` layer when one is given
/// and exists, on top otherwise. If a layer with the same id already exists, a warning is
/// logged and the existing layer is left alone, including on detach.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerBinding {
    spec: LayerSpec,
    before: Option<String>,
}

impl LayerBinding {
    /// Creates a binding for the given layer.
    pub fn new(spec: LayerSpec) -> Self {
        Self { spec, before: None }
    }

    /// Inserts the layer below the layer with id `before`.
    pub fn before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Id of the layer.
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// Specification of the layer.
    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }
}

/// Result of attaching a [`LayerBinding`].
#[derive(Debug)]
pub struct LayerToken {
    deferred: Deferred,
    registered: Rc<Cell<bool>>,
}

impl LayerToken {
    /// Pending or completed registration.
    pub fn deferred(&self) -> &Deferred {
        &self.deferred
    }

    /// Returns true if the layer was created by this binding.
    pub fn is_registered(&self) -> bool {
        self.registered.get()
    }
}

impl Binding for LayerBinding {
    type Token = LayerToken;

    fn attach(&self, map: &MapHandle) -> LayerToken {
        let registered = Rc::new(Cell::new(false));
        let flag = registered.clone();
        let spec = self.spec.clone();
        let before = self.before.clone();

        let deferred = map.when_ready(Gate::StyleReady, move |map| {
            let id = spec.id.clone();
            if map.has_layer(&id) {
                log::warn!("Layer `{id}` already exists, skipping registration");
                return;
            }

            match map.add_layer(spec, before.as_deref()) {
                Ok(()) => {
                    log::debug!("Layer `{id}` added");
                    flag.set(true);
                }
                Err(MapBindError::DuplicateLayer(_)) => {
                    log::warn!("Layer `{id}` already exists, skipping registration");
                }
                Err(err) => log::error!("Failed to add layer `{id}`: {err}"),
            }
        });

        LayerToken {
            deferred,
            registered,
        }
    }

    fn detach(&self, map: &MapHandle, token: LayerToken) {
        if token.deferred.cancel(map) {
            log::debug!("Registration of layer `{}` cancelled", self.id());
            return;
        }

        if token.registered.replace(false) {
            map.remove_layer(self.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEngine;
    use crate::readiness::DeferredState;
    use crate::MapEventKind;
    use mapbind_types::LayerKind;

    #[test]
    fn layer_waits_for_style() {
        let engine = HeadlessEngine::new();
        let map = MapHandle::new(Box::new(engine.clone()));
        let binding = LayerBinding::new(LayerSpec::new("sky", LayerKind::Sky));

        let token = binding.attach(&map);
        assert_eq!(token.deferred().state(), DeferredState::Pending);
        assert!(!map.has_layer("sky"));

        engine.set_style_loaded(true);
        map.dispatch(MapEventKind::StyleLoad);

        assert!(token.is_registered());
        assert_eq!(map.layer_order(), vec!["sky".to_owned()]);

        binding.detach(&map, token);
        assert!(!map.has_layer("sky"));
    }

    #[test]
    fn layer_is_inserted_before_existing_layer() {
        let engine = HeadlessEngine::new().with_style_loaded();
        let map = MapHandle::new(Box::new(engine));

        let labels = LayerBinding::new(LayerSpec::new("labels", LayerKind::Symbol));
        let roads = LayerBinding::new(LayerSpec::new("roads", LayerKind::Line)).before("labels");
        let _labels = labels.attach(&map);
        let _roads = roads.attach(&map);

        assert_eq!(
            map.layer_order(),
            vec!["roads".to_owned(), "labels".to_owned()]
        );
    }

    #[test]
    fn layers_keep_attach_order_across_style_load() {
        let engine = HeadlessEngine::new();
        let map = MapHandle::new(Box::new(engine.clone()));

        let _first = LayerBinding::new(LayerSpec::new("first", LayerKind::Fill)).attach(&map);
        engine.set_style_loaded(true);
        let _second = LayerBinding::new(LayerSpec::new("second", LayerKind::Line)).attach(&map);
        map.dispatch(MapEventKind::StyleLoad);

        assert_eq!(
            map.layer_order(),
            vec!["first".to_owned(), "second".to_owned()]
        );
    }

    #[test]
    fn missing_before_layer_adds_on_top() {
        let engine = HeadlessEngine::new().with_style_loaded();
        let map = MapHandle::new(Box::new(engine));

        let roads = LayerBinding::new(LayerSpec::new("roads", LayerKind::Line)).before("labels");
        let token = roads.attach(&map);

        assert!(token.is_registered());
        assert_eq!(map.layer_order(), vec!["roads".to_owned()]);
    }

    #[test]
    fn duplicate_layer_is_kept_on_detach() {
        let engine = HeadlessEngine::new().with_style_loaded();
        let map = MapHandle::new(Box::new(engine));
        let first = LayerBinding::new(LayerSpec::new("roads", LayerKind::Line));
        let second = LayerBinding::new(LayerSpec::new("roads", LayerKind::Fill));

        let _first_token = first.attach(&map);
        let second_token = second.attach(&map);
        assert!(!second_token.is_registered());

        second.detach(&map, second_token);
        assert_eq!(
            map.layer("roads").map(|layer| layer.kind),
            Some(LayerKind::Line)
        );
    }

    #[test]
    fn detach_before_style_cancels_registration() {
        let engine = HeadlessEngine::new();
        let map = MapHandle::new(Box::new(engine.clone()));
        let binding = LayerBinding::new(LayerSpec::new("sky", LayerKind::Sky));

        let token = binding.attach(&map);
        let deferred = token.deferred().clone();
        binding.detach(&map, token);
        assert_eq!(deferred.state(), DeferredState::Cancelled);

        engine.set_style_loaded(true);
        map.dispatch(MapEventKind::StyleLoad);
        assert!(!map.has_layer("sky"));
    }
}
