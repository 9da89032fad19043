//! Geographic coordinates and location keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair of a weather observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl Coordinates {
    /// Creates a coordinate pair
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Partition key of the weather table, `"<lat>_<lon>"`
    ///
    /// Degrees are rendered the way existing tables were keyed: whole values keep
    /// a `.0` suffix (`40.0_-74.0`) and magnitudes below `1e-4` use a two-digit
    /// exponent (`1e-05`).
    #[must_use]
    pub fn location_key(&self) -> String {
        format!("{}_{}", render_degrees(self.lat), render_degrees(self.lon))
    }
}

/// Shortest round-trip rendering with a `.0` suffix on whole numbers
fn render_degrees(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{value:e}");
        return match scientific.split_once('e') {
            Some((mantissa, exponent)) => match exponent.strip_prefix('-') {
                Some(digits) => format!("{mantissa}e-{digits:0>2}"),
                None => format!("{mantissa}e+{exponent:0>2}"),
            },
            None => scientific,
        };
    }
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}
