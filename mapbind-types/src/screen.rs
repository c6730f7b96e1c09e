use serde::{Deserialize, Serialize};

/// Position on the drawing surface in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct ScreenPoint {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

impl ScreenPoint {
    /// Creates a new screen point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Drawing surface a map engine renders into, e.g. a canvas container element.
///
/// A host hands the surface to a provider only once it is attached to the document; until then
/// the host has no `Surface` to give.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Surface {
    id: String,
}

impl Surface {
    /// Creates a surface with the given container id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Id of the container element.
    pub fn id(&self) -> &str {
        &self.id
    }
}
