use serde::{Deserialize, Serialize};

/// Exaggeration applied to terrain when none is given.
pub const DEFAULT_EXAGGERATION: f64 = 1.0;

/// Active terrain configuration of a map.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TerrainSpec {
    /// Id of the elevation source.
    pub source: String,
    /// Multiplier for the elevation values.
    pub exaggeration: f64,
}

impl TerrainSpec {
    /// Creates terrain configuration for the given source.
    pub fn new(source: impl Into<String>, exaggeration: f64) -> Self {
        Self {
            source: source.into(),
            exaggeration,
        }
    }
}
