use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a rendered feature. Engines use either numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeatureId {
    /// Numeric id.
    Number(u64),
    /// String id.
    String(String),
}

impl From<FeatureId> for Value {
    fn from(value: FeatureId) -> Self {
        match value {
            FeatureId::Number(v) => Value::from(v),
            FeatureId::String(v) => Value::from(v),
        }
    }
}

impl From<u64> for FeatureId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Feature returned by a rendered-features query.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderedFeature {
    /// Feature id, if the source provides one.
    pub id: Option<FeatureId>,
    /// Layer the feature was rendered by.
    pub layer: String,
    /// Source the layer draws from.
    pub source: Option<String>,
    /// Layer inside a vector tile source.
    #[serde(rename = "sourceLayer")]
    pub source_layer: Option<String>,
    /// Feature properties.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RenderedFeature {
    /// Creates a feature rendered by `layer` with no further metadata.
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            id: None,
            layer: layer.into(),
            source: None,
            source_layer: None,
            properties: Map::new(),
        }
    }

    /// Sets the feature id.
    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the source and vector tile source layer.
    pub fn with_source(mut self, source: impl Into<String>, source_layer: Option<&str>) -> Self {
        self.source = Some(source.into());
        self.source_layer = source_layer.map(str::to_owned);
        self
    }
}
