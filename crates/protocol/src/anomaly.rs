//! Anomaly bitmask
//!
//! One bit per monitored metric. Bits are independent: any subset may be
//! set at the same time.

use std::fmt;

/// Bit position of the temperature-high flag
pub const TEMPERATURE_BIT: u32 = 0;
/// Bit position of the battery-low flag
pub const BATTERY_BIT: u32 = 1;
/// Bit position of the altitude-low flag
pub const ALTITUDE_BIT: u32 = 2;
/// Bit position of the signal-weak flag
pub const SIGNAL_BIT: u32 = 3;

/// 32-bit anomaly bitmask attached to every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AnomalyFlags(u32);

impl AnomalyFlags {
    pub const TEMPERATURE_HIGH: Self = Self(1 << TEMPERATURE_BIT);
    pub const BATTERY_LOW: Self = Self(1 << BATTERY_BIT);
    pub const ALTITUDE_LOW: Self = Self(1 << ALTITUDE_BIT);
    pub const SIGNAL_WEAK: Self = Self(1 << SIGNAL_BIT);

    /// Every flag with its human-readable description, in bit order
    const DESCRIPTIONS: [(Self, &'static str); 4] = [
        (Self::TEMPERATURE_HIGH, "Temperature anomaly"),
        (Self::BATTERY_LOW, "Battery anomaly"),
        (Self::ALTITUDE_LOW, "Altitude anomaly"),
        (Self::SIGNAL_WEAK, "Signal anomaly"),
    ];

    /// No flags set
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap a raw bitmask
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bitmask
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Descriptions of every set flag, in bit order
    pub fn descriptions(self) -> Vec<&'static str> {
        Self::DESCRIPTIONS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, description)| *description)
            .collect()
    }

    /// Bit position for a metric name ("Temperature", "Battery", ...)
    pub fn bit_position(metric: &str) -> Option<u32> {
        match metric {
            "Temperature" => Some(TEMPERATURE_BIT),
            "Battery" => Some(BATTERY_BIT),
            "Altitude" => Some(ALTITUDE_BIT),
            "Signal" => Some(SIGNAL_BIT),
            _ => None,
        }
    }
}

impl std::ops::BitOr for AnomalyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for AnomalyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for AnomalyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06b}", self.0)
    }
}
