//! Display preferences
//!
//! Unit and zoom preferences are persisted and mutated by a collaborator
//! (settings screen, preference store). The core only reacts to their current
//! value; the byte helpers below are the interchange format with that
//! collaborator.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::app_state::AppError;

/// Milliseconds in one hour
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Glucose unit the chart and readouts are expressed in
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlucoseUnit {
    /// Milligrams per decilitre (native unit of every stored sample)
    #[default]
    MgDl,
    /// Millimoles per litre
    Mmol,
}

impl GlucoseUnit {
    /// Get a short label for display
    pub const fn label(self) -> &'static str {
        match self {
            Self::MgDl => "mg/dL",
            Self::Mmol => "mmol/L",
        }
    }
}

/// Width of the visible chart window
///
/// Cycling order is fixed and wraps: 1 → 3 → 6 → 12 → 24 → 1.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomLevel {
    OneHour,
    #[default]
    ThreeHours,
    SixHours,
    TwelveHours,
    TwentyFourHours,
}

impl ZoomLevel {
    /// All zoom levels in cycling order
    pub const ALL: [ZoomLevel; 5] = [
        Self::OneHour,
        Self::ThreeHours,
        Self::SixHours,
        Self::TwelveHours,
        Self::TwentyFourHours,
    ];

    /// Parse a zoom level from its width in hours
    pub const fn from_hours(hours: u8) -> Option<Self> {
        match hours {
            1 => Some(Self::OneHour),
            3 => Some(Self::ThreeHours),
            6 => Some(Self::SixHours),
            12 => Some(Self::TwelveHours),
            24 => Some(Self::TwentyFourHours),
            _ => None,
        }
    }

    /// Width of the window in hours
    pub const fn hours(self) -> u8 {
        match self {
            Self::OneHour => 1,
            Self::ThreeHours => 3,
            Self::SixHours => 6,
            Self::TwelveHours => 12,
            Self::TwentyFourHours => 24,
        }
    }

    /// Width of the window in milliseconds
    pub const fn duration_ms(self) -> i64 {
        self.hours() as i64 * HOUR_MS
    }

    /// The next zoom level in the cycle
    pub const fn next(self) -> Self {
        match self {
            Self::OneHour => Self::ThreeHours,
            Self::ThreeHours => Self::SixHours,
            Self::SixHours => Self::TwelveHours,
            Self::TwelveHours => Self::TwentyFourHours,
            Self::TwentyFourHours => Self::OneHour,
        }
    }

    /// Radius of a plotted sample point in density-independent pixels
    ///
    /// Wider windows hold more points, so the dots shrink.
    pub const fn point_radius(self) -> f32 {
        match self {
            Self::OneHour => 3.0,
            Self::ThreeHours | Self::SixHours => 2.0,
            Self::TwelveHours => 1.65,
            Self::TwentyFourHours => 1.25,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub unit: GlucoseUnit,
    pub zoom: ZoomLevel,
    /// Show extended (diagnostic) log entries instead of normal ones
    pub extended_log: bool,
}

impl Preferences {
    /// Decode preferences persisted by the preference collaborator
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        postcard::from_bytes(bytes).map_err(AppError::Preferences)
    }

    /// Encode preferences for the preference collaborator to persist
    pub fn to_vec(&self) -> Result<Vec<u8>, AppError> {
        postcard::to_allocvec(self).map_err(AppError::Preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_cycle_closure() {
        for start in ZoomLevel::ALL {
            let mut zoom = start;
            for _ in 0..5 {
                zoom = zoom.next();
            }
            assert_eq!(zoom, start, "five cycles must return to {:?}", start);
        }
    }

    #[test]
    fn test_zoom_cycle_order_from_three() {
        let mut zoom = ZoomLevel::ThreeHours;
        let mut seen = [0u8; 5];
        for slot in seen.iter_mut() {
            zoom = zoom.next();
            *slot = zoom.hours();
        }
        assert_eq!(seen, [6, 12, 24, 1, 3]);
    }

    #[test]
    fn test_zoom_from_hours_rejects_other_widths() {
        assert_eq!(ZoomLevel::from_hours(12), Some(ZoomLevel::TwelveHours));
        assert_eq!(ZoomLevel::from_hours(2), None);
        assert_eq!(ZoomLevel::from_hours(0), None);
    }

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.unit, GlucoseUnit::MgDl);
        assert_eq!(prefs.zoom, ZoomLevel::ThreeHours);
        assert!(!prefs.extended_log);
    }

    #[test]
    fn test_preferences_from_persisted_bytes() {
        let prefs = Preferences {
            unit: GlucoseUnit::Mmol,
            zoom: ZoomLevel::TwentyFourHours,
            extended_log: true,
        };
        let bytes = prefs.to_vec().unwrap();
        assert_eq!(Preferences::from_bytes(&bytes).unwrap(), prefs);
    }

    #[test]
    fn test_preferences_truncated_bytes_fail() {
        assert!(matches!(
            Preferences::from_bytes(&[]),
            Err(AppError::Preferences(_))
        ));
    }
}
