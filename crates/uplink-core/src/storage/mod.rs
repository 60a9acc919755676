pub mod log_publisher;
pub mod store;

use alloc::string::String;

use serde::{Deserialize, Serialize};

pub use store::*;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Wall-clock source
///
/// Samples carry device wall-clock timestamps, so the display core needs the
/// same clock rather than a monotonic boot counter.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// A record that can live in a [`Table`] and be ordered by time
pub trait Record: Clone {
    fn timestamp(&self) -> Timestamp;
}

/// CGM trend reported alongside a sensor glucose value
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendCode {
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
}

impl TrendCode {
    /// Parse the trend name used by the pump protocol layer
    ///
    /// The protocol spells the diagonal trends `FOURTY_FIVE_*`; the correct
    /// spelling is accepted too. Anything else is not a trend.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DOUBLE_UP" => Some(Self::DoubleUp),
            "SINGLE_UP" => Some(Self::SingleUp),
            "FOURTY_FIVE_UP" | "FORTY_FIVE_UP" => Some(Self::FortyFiveUp),
            "FLAT" => Some(Self::Flat),
            "FOURTY_FIVE_DOWN" | "FORTY_FIVE_DOWN" => Some(Self::FortyFiveDown),
            "SINGLE_DOWN" => Some(Self::SingleDown),
            "DOUBLE_DOWN" => Some(Self::DoubleDown),
            _ => None,
        }
    }
}

/// One sensor glucose reading
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    /// Sensor glucose in mg/dL. Zero marks a reading slot with no value.
    pub value: i32,
    pub trend: Option<TrendCode>,
    /// Value was estimated by the pump rather than measured
    pub is_estimate: bool,
}

impl Sample {
    pub const fn new(timestamp: Timestamp, value: i32) -> Self {
        Self {
            timestamp,
            value,
            trend: None,
            is_estimate: false,
        }
    }

    pub const fn with_trend(mut self, trend: TrendCode) -> Self {
        self.trend = Some(trend);
        self
    }

    pub const fn estimated(mut self) -> Self {
        self.is_estimate = true;
        self
    }
}

impl Record for Sample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Pump status snapshot
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PumpStatus {
    pub timestamp: Timestamp,
    /// Active insulin on board in units
    pub active_insulin: f32,
    /// Battery charge as reported by the pump (0, 25, 50, 75, 100)
    pub battery_percent: Option<u8>,
}

impl Record for PumpStatus {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Startup,
    Shutdown,
    Option,
    Info,
    Warn,
    Note,
}

/// Which log mode an entry is shown in
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogVisibility {
    /// Shown in normal mode only
    Normal,
    /// Shown in extended mode only
    Extended,
    /// Shown in both modes
    NotApplicable,
}

/// A user-facing log message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub text: String,
    pub category: LogCategory,
    pub visibility: LogVisibility,
}

impl LogEntry {
    /// Whether this entry is shown in the given log mode
    pub fn is_visible(&self, extended: bool) -> bool {
        match self.visibility {
            LogVisibility::NotApplicable => true,
            LogVisibility::Extended => extended,
            LogVisibility::Normal => !extended,
        }
    }
}

impl Record for LogEntry {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_from_protocol_names() {
        assert_eq!(TrendCode::from_name("DOUBLE_UP"), Some(TrendCode::DoubleUp));
        assert_eq!(
            TrendCode::from_name("FOURTY_FIVE_DOWN"),
            Some(TrendCode::FortyFiveDown)
        );
        assert_eq!(
            TrendCode::from_name("FORTY_FIVE_UP"),
            Some(TrendCode::FortyFiveUp)
        );
        assert_eq!(TrendCode::from_name("NONE"), None);
        assert_eq!(TrendCode::from_name(""), None);
    }

    #[test]
    fn test_log_visibility_by_mode() {
        let entry = |visibility| LogEntry {
            timestamp: 0,
            text: String::new(),
            category: LogCategory::Info,
            visibility,
        };

        assert!(entry(LogVisibility::NotApplicable).is_visible(false));
        assert!(entry(LogVisibility::NotApplicable).is_visible(true));
        assert!(entry(LogVisibility::Normal).is_visible(false));
        assert!(!entry(LogVisibility::Normal).is_visible(true));
        assert!(entry(LogVisibility::Extended).is_visible(true));
        assert!(!entry(LogVisibility::Extended).is_visible(false));
    }
}
