use std::cell::Cell;
use std::rc::Rc;

use geojson::FeatureCollection;
use mapbind_types::{
    SourceSpec, TerrainSpec, DEFAULT_DEM_MAX_ZOOM, DEFAULT_DEM_TILE_SIZE, DEFAULT_EXAGGERATION,
};

use crate::binding::Binding;
use crate::error::MapBindError;
use crate::handle::MapHandle;
use crate::readiness::{Deferred, Gate};

/// Elevation source that also drives the map terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDemSource {
    id: String,
    url: String,
    tile_size: u32,
    max_zoom: u8,
    exaggeration: f64,
}

impl RasterDemSource {
    /// Creates an elevation source with default tile size, maximum zoom and exaggeration.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            tile_size: DEFAULT_DEM_TILE_SIZE,
            max_zoom: DEFAULT_DEM_MAX_ZOOM,
            exaggeration: DEFAULT_EXAGGERATION,
        }
    }

    /// Sets the tile size in pixels. Defaults to `512`.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Sets the maximum zoom level of the tiles. Defaults to `14`.
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    /// Sets the terrain exaggeration. Defaults to `1.0`.
    pub fn with_exaggeration(mut self, exaggeration: f64) -> Self {
        self.exaggeration = exaggeration;
        self
    }

    /// Terrain exaggeration.
    pub fn exaggeration(&self) -> f64 {
        self.exaggeration
    }
}

/// Data source a [`SourceBinding`] registers.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDescriptor {
    /// Inline feature collection.
    GeoJson {
        /// Source id.
        id: String,
        /// Features of the source.
        data: FeatureCollection,
    },
    /// Remote vector tiles.
    Vector {
        /// Source id.
        id: String,
        /// Tile set URL.
        url: String,
    },
    /// Remote elevation tiles, used as the map terrain.
    RasterDem(RasterDemSource),
}

impl SourceDescriptor {
    /// Id of the source.
    pub fn id(&self) -> &str {
        match self {
            Self::GeoJson { id, .. } | Self::Vector { id, .. } => id,
            Self::RasterDem(dem) => &dem.id,
        }
    }

    /// Specification passed to the engine.
    pub fn spec(&self) -> SourceSpec {
        match self {
            Self::GeoJson { data, .. } => SourceSpec::Geojson { data: data.clone() },
            Self::Vector { url, .. } => SourceSpec::Vector { url: url.clone() },
            Self::RasterDem(dem) => SourceSpec::RasterDem {
                url: dem.url.clone(),
                tile_size: dem.tile_size,
                maxzoom: dem.max_zoom,
            },
        }
    }
}

/// Registers a data source while attached.
///
/// GeoJSON and vector sources are added as soon as the binding is attached. Elevation sources
/// wait for the style to be loaded, and then also become the map terrain.
///
/// If a source with the same id already exists, the binding logs a warning and leaves it alone,
/// including on detach.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBinding {
    descriptor: SourceDescriptor,
}

impl SourceBinding {
    /// Creates a binding for the given source.
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self { descriptor }
    }

    /// Binding for an inline GeoJSON source.
    pub fn geojson(id: impl Into<String>, data: FeatureCollection) -> Self {
        Self::new(SourceDescriptor::GeoJson {
            id: id.into(),
            data,
        })
    }

    /// Binding for a vector tile source.
    pub fn vector(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(SourceDescriptor::Vector {
            id: id.into(),
            url: url.into(),
        })
    }

    /// Binding for an elevation source.
    pub fn raster_dem(source: RasterDemSource) -> Self {
        Self::new(SourceDescriptor::RasterDem(source))
    }

    /// Source this binding registers.
    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// Id of the source.
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }
}

impl From<RasterDemSource> for SourceBinding {
    fn from(source: RasterDemSource) -> Self {
        Self::raster_dem(source)
    }
}

/// Result of attaching a [`SourceBinding`].
#[derive(Debug)]
pub enum SourceToken {
    /// The source was registered on attach, if `registered` is set.
    Immediate {
        /// Whether this binding created the source.
        registered: bool,
    },
    /// The source is registered once the style is loaded.
    Deferred {
        /// Pending registration.
        deferred: Deferred,
        /// Set once this binding created the source.
        registered: Rc<Cell<bool>>,
    },
}

impl SourceToken {
    /// Returns true if the source was created by this binding.
    pub fn is_registered(&self) -> bool {
        match self {
            Self::Immediate { registered } => *registered,
            Self::Deferred { registered, .. } => registered.get(),
        }
    }
}

fn register(map: &MapHandle, id: &str, spec: SourceSpec) -> bool {
    match map.add_source(id, spec) {
        Ok(()) => {
            log::debug!("Source `{id}` added");
            true
        }
        Err(MapBindError::DuplicateSource(_)) => {
            log::warn!("Source `{id}` already exists, skipping registration");
            false
        }
        Err(err) => {
            log::error!("Failed to add source `{id}`: {err}");
            false
        }
    }
}

impl Binding for SourceBinding {
    type Token = SourceToken;

    fn attach(&self, map: &MapHandle) -> SourceToken {
        let SourceDescriptor::RasterDem(dem) = &self.descriptor else {
            let registered = register(map, self.id(), self.descriptor.spec());
            return SourceToken::Immediate { registered };
        };

        let registered = Rc::new(Cell::new(false));
        let id = dem.id.clone();
        let spec = self.descriptor.spec();
        let exaggeration = dem.exaggeration;
        let flag = registered.clone();

        let deferred = map.when_ready(Gate::StyleReady, move |map| {
            if flag.get() || !register(map, &id, spec) {
                return;
            }

            flag.set(true);
            if let Err(err) = map.set_terrain(Some(TerrainSpec::new(id.clone(), exaggeration))) {
                log::error!("Failed to set terrain from source `{id}`: {err}");
            }
        });

        SourceToken::Deferred {
            deferred,
            registered,
        }
    }

    fn detach(&self, map: &MapHandle, token: SourceToken) {
        let id = self.id().to_owned();
        match token {
            SourceToken::Immediate { registered } => {
                if registered {
                    map.remove_source(&id);
                }
            }
            SourceToken::Deferred {
                deferred,
                registered,
            } => {
                if deferred.cancel(map) {
                    log::debug!("Registration of source `{id}` cancelled");
                    return;
                }

                if !registered.get() {
                    return;
                }

                // Registration happened, so the style is loaded and this runs right away.
                map.when_ready(Gate::StyleReady, move |map| {
                    let uses_terrain = map.terrain().is_some_and(|terrain| terrain.source == id);
                    if uses_terrain {
                        if let Err(err) = map.set_terrain(None) {
                            log::error!("Failed to clear terrain of source `{id}`: {err}");
                        }
                    }

                    map.remove_source(&id);
                    registered.set(false);
                });
            }
        }
    }
}
