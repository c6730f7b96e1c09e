use serde::{Deserialize, Serialize};

/// Geographic position in degrees.
///
/// Serialized as a `[lng, lat]` pair, which is the order map engines and GeoJSON use.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    /// Creates a new position from longitude and latitude.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Returns the position as a `[lng, lat]` array.
    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        value.to_array()
    }
}

/// Creates a new [`LngLat`] from longitude and latitude values (in degrees).
///
/// ```
/// use mapbind_types::lnglat;
///
/// let point = lnglat!(-118.4912, 34.0119);
/// assert_eq!(point.lat(), 34.0119);
/// ```
#[macro_export]
macro_rules! lnglat {
    ($lng:expr, $lat:expr) => {
        $crate::LngLat::new($lng, $lat)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn serializes_as_pair() {
        let point = lnglat!(-118.4912, 34.0119);
        let json = serde_json::to_string(&point).expect("serialization failed");
        assert_eq!(json, "[-118.4912,34.0119]");

        let parsed: LngLat = serde_json::from_str("[1.5, 2.5]").expect("parsing failed");
        assert_relative_eq!(parsed.lng(), 1.5);
        assert_relative_eq!(parsed.lat(), 2.5);
    }
}
