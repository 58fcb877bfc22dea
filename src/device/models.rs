use serde::{Deserialize, Serialize};

/// Field set reported by the ESP32 on `GET /get`.
///
/// All five fields are required. Unknown keys, including any `time` the
/// firmware adds, are ignored: capture timestamps come from the gateway clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorFields {
    /// Acidity (pH).
    pub ph: f64,
    /// Total dissolved solids, ppm.
    pub tds: f64,
    /// Degrees Celsius
    pub temp: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    pub pump: bool,
}
