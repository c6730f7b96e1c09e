use serde::{Deserialize, Serialize};

/// UI controls an engine can place over the map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Control {
    /// Zoom buttons and a compass.
    Navigation {
        /// Show the compass button.
        show_compass: bool,
        /// Show the zoom-in and zoom-out buttons.
        show_zoom: bool,
    },
}

impl Default for Control {
    fn default() -> Self {
        Self::Navigation {
            show_compass: true,
            show_zoom: true,
        }
    }
}
