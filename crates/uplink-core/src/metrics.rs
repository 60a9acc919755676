//! Glucose band and pump battery assessment
//!
//! Maps raw readings onto the discrete levels the status page colours and
//! labels by.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;

/// Glucose band a plotted sample falls in
///
/// Thresholds are in mg/dL regardless of the display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseBand {
    /// Value estimated by the pump, not measured
    Estimate,
    /// Below 80 mg/dL
    Low,
    /// 80 to 180 mg/dL
    InRange,
    /// 181 to 260 mg/dL
    High,
    /// Above 260 mg/dL
    VeryHigh,
}

impl GlucoseBand {
    /// Assess the band for a sample value in mg/dL
    pub const fn assess(value: i32, is_estimate: bool) -> Self {
        if is_estimate {
            Self::Estimate
        } else if value < 80 {
            Self::Low
        } else if value <= 180 {
            Self::InRange
        } else if value <= 260 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Get the display color for this band
    pub const fn color(self) -> Rgb565 {
        match self {
            // #0080FF
            Self::Estimate => Rgb565::new(0, 32, 31),
            Self::Low | Self::VeryHigh => Rgb565::RED,
            Self::InRange => Rgb565::GREEN,
            Self::High => Rgb565::YELLOW,
        }
    }
}

/// Pump battery indicator level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Empty,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
    /// No recent status, or the pump reported something other than a
    /// quarter step
    Unknown,
}

impl BatteryLevel {
    /// Map the pump's reported charge onto an indicator level
    pub const fn from_percent(percent: Option<u8>) -> Self {
        match percent {
            Some(0) => Self::Empty,
            Some(25) => Self::Quarter,
            Some(50) => Self::Half,
            Some(75) => Self::ThreeQuarters,
            Some(100) => Self::Full,
            _ => Self::Unknown,
        }
    }

    /// Get the display label for this level
    pub const fn label(self) -> &'static str {
        match self {
            Self::Empty => "0%",
            Self::Quarter => "25%",
            Self::Half => "50%",
            Self::ThreeQuarters => "75%",
            Self::Full => "100%",
            Self::Unknown => "?",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(GlucoseBand::assess(79, false), GlucoseBand::Low);
        assert_eq!(GlucoseBand::assess(80, false), GlucoseBand::InRange);
        assert_eq!(GlucoseBand::assess(180, false), GlucoseBand::InRange);
        assert_eq!(GlucoseBand::assess(181, false), GlucoseBand::High);
        assert_eq!(GlucoseBand::assess(260, false), GlucoseBand::High);
        assert_eq!(GlucoseBand::assess(261, false), GlucoseBand::VeryHigh);
        assert_eq!(GlucoseBand::assess(40, true), GlucoseBand::Estimate);
    }

    #[test]
    fn test_low_and_very_high_share_color() {
        assert_eq!(GlucoseBand::Low.color(), GlucoseBand::VeryHigh.color());
        assert_ne!(GlucoseBand::InRange.color(), GlucoseBand::High.color());
    }

    #[test]
    fn test_battery_levels() {
        assert_eq!(BatteryLevel::from_percent(Some(75)), BatteryLevel::ThreeQuarters);
        assert_eq!(BatteryLevel::from_percent(Some(0)), BatteryLevel::Empty);
        assert_eq!(BatteryLevel::from_percent(Some(60)), BatteryLevel::Unknown);
        assert_eq!(BatteryLevel::from_percent(None), BatteryLevel::Unknown);
    }
}
