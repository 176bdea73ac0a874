//! Anomaly threshold configuration

use serde::Deserialize;

/// Threshold table applied by the validate pool
///
/// A reading strictly beyond its threshold sets the matching flag.
///
/// # Example
///
/// ```toml
/// [anomaly]
/// temperature_max = 35.0
/// battery_min = 40.0
/// altitude_min = 400.0
/// signal_min = -80.0
/// ```
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Temperature (°C) above this is anomalous
    pub temperature_max: f32,
    /// Battery (%) below this is anomalous
    pub battery_min: f32,
    /// Altitude (km) below this is anomalous
    pub altitude_min: f32,
    /// Signal (dB) below this is anomalous
    pub signal_min: f32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            temperature_max: 35.0,
            battery_min: 40.0,
            altitude_min: 400.0,
            signal_min: -80.0,
        }
    }
}
