//! Mapbind keeps an imperative map engine in sync with a declarative tree of bindings. A host
//! describes what the map should contain (data sources, style layers, event handlers and
//! markers), and mapbind creates these resources on the engine when the bindings are attached,
//! and removes them when they are detached.
//!
//! # Quick start
//!
//! ```no_run
//! use mapbind::{ClickBinding, HeadlessEngine, LayerBinding, MapOptions, MapProvider, SourceBinding};
//! use mapbind::mapbind_types::{lnglat, LayerKind, LayerSpec, Surface};
//!
//! let engine = HeadlessEngine::new();
//! let mut provider = MapProvider::new(MapOptions::new(lnglat!(-118.4912, 34.0119)), engine.factory());
//! provider.mount(Some(&Surface::new("map"))).expect("failed to create map");
//!
//! provider.attach(SourceBinding::vector("streets", "mapbox://mapbox.mapbox-streets-v8")).unwrap();
//! provider
//!     .attach(LayerBinding::new(
//!         LayerSpec::new("roads", LayerKind::Line).with_source("streets", Some("road")),
//!     ))
//!     .unwrap();
//! provider
//!     .attach(ClickBinding::new(|_, event| println!("clicked road at {:?}", event.lng_lat)).with_layer("roads"))
//!     .unwrap();
//! ```
//!
//! # Main components
//!
//! * [`MapProvider`] creates the engine instance for a drawing surface and publishes it to its
//!   descendants as a [`MapContext`]. It is the only owner of the engine and destroys it when
//!   unmounted.
//! * [`MapHandle`] is the shared handle to the engine. It forwards calls to the [`MapEngine`]
//!   implementation, keeps event subscriptions and tracks the [readiness](ReadinessState) of the
//!   map.
//! * [`Binding`]s are the declarative descriptors: [`SourceBinding`], [`LayerBinding`],
//!   [`EventBinding`] and [`MarkerBinding`].
//!
//! Engines reject most changes until their style is loaded. Bindings that depend on the style
//! use [`MapHandle::when_ready`], which runs a callback right away if the map is ready or queues
//! it until the readiness event arrives.
//!
//! Everything runs on one thread. Engine adapters deliver events by calling
//! [`MapHandle::dispatch`].

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod binding;
mod context;
mod engine;
pub mod error;
mod event;
mod handle;
pub mod headless;
mod listeners;
mod options;
mod readiness;

pub use binding::{
    Binding, ClickBinding, EventBinding, LayerBinding, MarkerBinding, Mounted, OnLoadBinding,
    PopupRenderer, RasterDemSource, SourceBinding, SourceDescriptor,
};
pub use context::{ChildKey, MapContext, MapProvider};
pub use engine::{EngineFactory, MapEngine, MarkerId, MarkerSpec};
pub use error::{EngineError, MapBindError};
pub use event::{
    listener, EventPropagation, Listener, ListenerId, MapEvent, MapEventKind, OverlayListener,
};
pub use handle::MapHandle;
pub use headless::HeadlessEngine;
pub use options::MapOptions;
pub use readiness::{Deferred, DeferredState, Gate, ReadinessState};

// Reexport mapbind_types
pub use mapbind_types;
