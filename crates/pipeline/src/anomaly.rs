//! Anomaly policy
//!
//! Threshold rules applied to every decoded payload. All four checks run on
//! every call and are OR'd together, so the result depends on the payload
//! alone.

use downlink_protocol::{AnomalyFlags, TelemetryPayload};

/// Threshold table
///
/// | Field | Condition | Flag |
/// |---|---|---|
/// | temperature | `> temperature_max` | bit 0 |
/// | battery | `< battery_min` | bit 1 |
/// | altitude | `< altitude_min` | bit 2 |
/// | signal | `< signal_min` | bit 3 |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    pub temperature_max: f32,
    pub battery_min: f32,
    pub altitude_min: f32,
    pub signal_min: f32,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            temperature_max: 35.0,
            battery_min: 40.0,
            altitude_min: 400.0,
            signal_min: -80.0,
        }
    }
}

impl AnomalyThresholds {
    /// Compute the anomaly bitmask for a payload
    ///
    /// NaN readings compare false against every threshold and are not flagged.
    pub fn evaluate(&self, payload: &TelemetryPayload) -> AnomalyFlags {
        let mut flags = AnomalyFlags::empty();

        if payload.temperature > self.temperature_max {
            flags |= AnomalyFlags::TEMPERATURE_HIGH;
        }
        if payload.battery < self.battery_min {
            flags |= AnomalyFlags::BATTERY_LOW;
        }
        if payload.altitude < self.altitude_min {
            flags |= AnomalyFlags::ALTITUDE_LOW;
        }
        if payload.signal < self.signal_min {
            flags |= AnomalyFlags::SIGNAL_WEAK;
        }

        flags
    }
}
