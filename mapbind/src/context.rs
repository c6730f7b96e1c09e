//! Ownership of the engine instance and its publication to the bindings below it.

use mapbind_types::Surface;

use crate::binding::{Binding, Mounted, MountedBinding};
use crate::engine::EngineFactory;
use crate::error::MapBindError;
use crate::handle::MapHandle;
use crate::options::MapOptions;

/// Key of a binding attached through [`MapProvider::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildKey(u64);

/// Creates the map engine for a drawing surface, shares it with descendant bindings and
/// destroys it when unmounted.
///
/// The provider is the only owner allowed to create or destroy the engine. Bindings get the
/// engine through the [`MapContext`] published by the provider.
///
/// ```no_run
/// use mapbind::{HeadlessEngine, LayerBinding, MapOptions, MapProvider};
/// use mapbind::mapbind_types::{lnglat, LayerKind, LayerSpec, Surface};
///
/// let engine = HeadlessEngine::new();
/// let mut provider = MapProvider::new(
///     MapOptions::new(lnglat!(-118.4912, 34.0119)),
///     engine.factory(),
/// );
///
/// provider.mount(Some(&Surface::new("map"))).expect("failed to create engine");
/// provider
///     .attach(LayerBinding::new(LayerSpec::new("background", LayerKind::Background)))
///     .expect("map is mounted");
/// ```
pub struct MapProvider {
    options: MapOptions,
    factory: Box<dyn EngineFactory>,
    map: Option<MapHandle>,
    children: Vec<(ChildKey, Box<dyn MountedBinding>)>,
    next_child_key: u64,
}

impl MapProvider {
    /// Creates a provider that will create its engine with `factory`.
    pub fn new(options: MapOptions, factory: impl EngineFactory + 'static) -> Self {
        Self {
            options,
            factory: Box::new(factory),
            map: None,
            children: vec![],
            next_child_key: 0,
        }
    }

    /// Options the engine is created with.
    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Creates the engine for `surface` and publishes it to descendants.
    ///
    /// A surface of `None` means the drawing surface is not attached yet. In that case nothing
    /// happens and `Ok(None)` is returned; the host must call `mount` again once it is attached.
    /// Mounting an already mounted provider returns the existing handle.
    pub fn mount(&mut self, surface: Option<&Surface>) -> Result<Option<MapHandle>, MapBindError> {
        if let Some(map) = &self.map {
            log::debug!("Map provider is already mounted");
            return Ok(Some(map.clone()));
        }

        let Some(surface) = surface else {
            log::debug!("Drawing surface is not attached, map is not created");
            return Ok(None);
        };

        let engine = self.factory.create(surface, &self.options)?;
        let map = MapHandle::new(engine);
        if let Some(control) = self.options.navigation_control() {
            map.add_control(control.clone());
        }

        log::debug!("Map created on surface `{}`", surface.id());
        self.map = Some(map.clone());
        Ok(Some(map))
    }

    /// Returns true if the engine exists.
    pub fn is_mounted(&self) -> bool {
        self.map.is_some()
    }

    /// Handle of the engine, if mounted.
    pub fn map(&self) -> Option<&MapHandle> {
        self.map.as_ref()
    }

    /// Context to pass down to descendant bindings.
    ///
    /// The context of an unmounted provider is empty.
    pub fn context(&self) -> MapContext {
        MapContext {
            map: self.map.clone(),
        }
    }

    /// Attaches a binding directly below the provider.
    ///
    /// Fails with [`MapBindError::Configuration`] if the provider is not mounted.
    pub fn attach<B: Binding + 'static>(&mut self, binding: B) -> Result<ChildKey, MapBindError> {
        let mounted = self.context().attach(binding)?;

        let key = ChildKey(self.next_child_key);
        self.next_child_key += 1;
        self.children.push((key, Box::new(mounted)));

        Ok(key)
    }

    /// Detaches a binding attached with [`MapProvider::attach`]. Returns false if the key is
    /// unknown.
    pub fn detach(&mut self, key: ChildKey) -> bool {
        let Some(index) = self.children.iter().position(|(k, _)| *k == key) else {
            return false;
        };

        let (_, child) = self.children.remove(index);
        child.detach();
        true
    }

    /// Number of bindings attached with [`MapProvider::attach`].
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Destroys the engine.
    ///
    /// Everything registered with the engine goes away with it, so attached bindings are
    /// forgotten without running their detach routines.
    pub fn unmount(&mut self) {
        let Some(map) = self.map.take() else {
            return;
        };

        map.destroy();
        self.children.clear();
    }
}

impl Drop for MapProvider {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Map handle as seen by a subtree of bindings.
///
/// Hosts pass the context down the tree instead of sharing the handle globally. A context
/// created outside of a mounted provider is empty, and looking up the map in it fails.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    map: Option<MapHandle>,
}

impl MapContext {
    /// Context without a map, as seen outside of any provider.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Map published by the enclosing provider.
    ///
    /// Fails with [`MapBindError::Configuration`] outside of a mounted provider.
    pub fn map(&self) -> Result<MapHandle, MapBindError> {
        self.map.clone().ok_or(MapBindError::Configuration)
    }

    /// Attaches a binding to the map of this context.
    pub fn attach<B: Binding>(&self, binding: B) -> Result<Mounted<B>, MapBindError> {
        let map = self.map()?;
        Ok(Mounted::new(binding, &map))
    }
}
