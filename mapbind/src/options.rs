use mapbind_types::{Control, LngLat};
use serde::{Deserialize, Serialize};

const DEFAULT_STYLE: &str = "mapbox://styles/mapbox/standard";
const DEFAULT_ZOOM: f64 = 10.0;
const DEFAULT_PITCH: f64 = 60.0;
const DEFAULT_BEARING: f64 = -20.0;

/// Initial configuration of a map engine instance.
///
/// Options can be built in code or read from JSON. Every field except the center has a
/// default:
///
/// ```
/// use mapbind::MapOptions;
/// use mapbind::mapbind_types::lnglat;
///
/// let options = MapOptions::new(lnglat!(-118.4912, 34.0119))
///     .with_zoom(12.0)
///     .with_access_token("pk.example");
///
/// let parsed: Result<MapOptions, _> =
///     serde_json::from_str(r#"{"center": [-118.4912, 34.0119], "zoom": 12.0}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapOptions {
    center: LngLat,
    #[serde(default = "default_zoom")]
    zoom: f64,
    #[serde(default = "default_pitch")]
    pitch: f64,
    #[serde(default = "default_bearing")]
    bearing: f64,
    #[serde(default = "default_style")]
    style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default = "default_navigation")]
    navigation_control: Option<Control>,
}

fn default_zoom() -> f64 {
    DEFAULT_ZOOM
}

fn default_pitch() -> f64 {
    DEFAULT_PITCH
}

fn default_bearing() -> f64 {
    DEFAULT_BEARING
}

fn default_style() -> String {
    DEFAULT_STYLE.to_owned()
}

fn default_navigation() -> Option<Control> {
    Some(Control::default())
}

impl MapOptions {
    /// Creates options for a map centered at the given position.
    pub fn new(center: LngLat) -> Self {
        Self {
            center,
            zoom: DEFAULT_ZOOM,
            pitch: DEFAULT_PITCH,
            bearing: DEFAULT_BEARING,
            style: default_style(),
            access_token: None,
            navigation_control: default_navigation(),
        }
    }

    /// Initial center of the map.
    pub fn center(&self) -> LngLat {
        self.center
    }

    /// Sets the initial center of the map.
    pub fn with_center(mut self, center: LngLat) -> Self {
        self.center = center;
        self
    }

    /// Initial zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the initial zoom level.
    ///
    /// Defaults to `10`.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// Initial camera tilt in degrees.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Sets the initial camera tilt in degrees.
    ///
    /// Defaults to `60`.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    /// Initial map rotation in degrees.
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Sets the initial map rotation in degrees.
    ///
    /// Defaults to `-20`.
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    /// URL of the style to load.
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Sets the URL of the style to load.
    ///
    /// Defaults to `mapbox://styles/mapbox/standard`.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Token the engine uses to access the tile service.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Sets the token the engine uses to access the tile service.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Navigation control added when the map is mounted, if any.
    pub fn navigation_control(&self) -> Option<&Control> {
        self.navigation_control.as_ref()
    }

    /// Sets the navigation control added when the map is mounted. `None` disables it.
    ///
    /// Defaults to a control with zoom buttons and a compass.
    pub fn with_navigation_control(mut self, control: Option<Control>) -> Self {
        self.navigation_control = control;
        self
    }
}
