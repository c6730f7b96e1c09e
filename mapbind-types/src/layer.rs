use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Style expression, e.g. a filter `["==", ["id"], 42]`.
///
/// Expressions are evaluated by the engine, so they are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Expression(Value);

impl Expression {
    /// Wraps a JSON value as an expression.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Filter expression matching features with the given id.
    pub fn id_eq(id: impl Into<Value>) -> Self {
        Self(Value::Array(vec![
            Value::from("=="),
            Value::Array(vec![Value::from("id")]),
            id.into(),
        ]))
    }

    /// Raw JSON of the expression.
    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Type of a style layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    /// Solid background.
    Background,
    /// Filled polygons.
    Fill,
    /// Lines.
    Line,
    /// Icons and labels.
    Symbol,
    /// Circles at point features.
    Circle,
    /// Extruded polygons.
    FillExtrusion,
    /// Raster imagery.
    Raster,
    /// Shaded relief from elevation data.
    Hillshade,
    /// Point density heatmap.
    Heatmap,
    /// Sky dome.
    Sky,
}

/// Render specification of a style layer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayerSpec {
    /// Unique id of the layer.
    pub id: String,
    /// Layer type.
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Id of the source the layer draws from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Layer inside a vector tile source.
    #[serde(
        default,
        rename = "source-layer",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_layer: Option<String>,
    /// Paint properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
    /// Layout properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    /// Initial filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expression>,
    /// Minimum zoom level the layer is visible at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    /// Maximum zoom level the layer is visible at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
}

impl LayerSpec {
    /// Creates a layer of the given kind with no source and default properties.
    pub fn new(id: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            source: None,
            source_layer: None,
            paint: Map::new(),
            layout: Map::new(),
            filter: None,
            minzoom: None,
            maxzoom: None,
        }
    }

    /// Sets the source and, for vector tile sources, the source layer.
    pub fn with_source(mut self, source: impl Into<String>, source_layer: Option<&str>) -> Self {
        self.source = Some(source.into());
        self.source_layer = source_layer.map(str::to_owned);
        self
    }

    /// Sets a paint property.
    pub fn with_paint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.paint.insert(name.into(), value.into());
        self
    }

    /// Sets a layout property.
    pub fn with_layout(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layout.insert(name.into(), value.into());
        self
    }

    /// Sets the initial filter.
    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }
}
