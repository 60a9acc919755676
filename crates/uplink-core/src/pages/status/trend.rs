//! Trend arrow shown next to the latest reading

use crate::storage::TrendCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendGlyph {
    DoubleUpArrow,
    UpArrow,
    RightArrow,
    DownArrow,
    DoubleDownArrow,
    /// No trend available
    FlatDash,
}

/// Glyph plus the rotation it is drawn with, in degrees clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendIndicator {
    pub glyph: TrendGlyph,
    pub rotation_deg: i16,
}

impl TrendIndicator {
    const fn new(glyph: TrendGlyph, rotation_deg: i16) -> Self {
        Self {
            glyph,
            rotation_deg,
        }
    }
}

impl Default for TrendIndicator {
    fn default() -> Self {
        Self::new(TrendGlyph::FlatDash, 0)
    }
}

pub struct TrendClassifier;

impl TrendClassifier {
    /// Map a trend code to its indicator; a missing code gets the flat dash
    pub const fn classify(code: Option<TrendCode>) -> TrendIndicator {
        match code {
            Some(TrendCode::DoubleUp) => TrendIndicator::new(TrendGlyph::DoubleUpArrow, 0),
            Some(TrendCode::SingleUp) => TrendIndicator::new(TrendGlyph::UpArrow, 0),
            Some(TrendCode::FortyFiveUp) => TrendIndicator::new(TrendGlyph::RightArrow, -45),
            Some(TrendCode::Flat) => TrendIndicator::new(TrendGlyph::RightArrow, 0),
            Some(TrendCode::FortyFiveDown) => TrendIndicator::new(TrendGlyph::RightArrow, 45),
            Some(TrendCode::SingleDown) => TrendIndicator::new(TrendGlyph::DownArrow, 0),
            Some(TrendCode::DoubleDown) => TrendIndicator::new(TrendGlyph::DoubleDownArrow, 0),
            None => TrendIndicator::new(TrendGlyph::FlatDash, 0),
        }
    }

    /// Map a raw protocol trend name; unrecognised names get the flat dash
    pub fn classify_name(name: Option<&str>) -> TrendIndicator {
        Self::classify(name.and_then(TrendCode::from_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_table() {
        let cases = [
            ("DOUBLE_UP", TrendGlyph::DoubleUpArrow, 0),
            ("SINGLE_UP", TrendGlyph::UpArrow, 0),
            ("FOURTY_FIVE_UP", TrendGlyph::RightArrow, -45),
            ("FLAT", TrendGlyph::RightArrow, 0),
            ("FOURTY_FIVE_DOWN", TrendGlyph::RightArrow, 45),
            ("SINGLE_DOWN", TrendGlyph::DownArrow, 0),
            ("DOUBLE_DOWN", TrendGlyph::DoubleDownArrow, 0),
        ];
        for (name, glyph, rotation_deg) in cases {
            assert_eq!(
                TrendClassifier::classify_name(Some(name)),
                TrendIndicator {
                    glyph,
                    rotation_deg
                },
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_unknown_and_missing_default_to_dash() {
        let dash = TrendIndicator::default();
        assert_eq!(dash.glyph, TrendGlyph::FlatDash);
        assert_eq!(TrendClassifier::classify(None), dash);
        assert_eq!(TrendClassifier::classify_name(None), dash);
        for name in ["", "NONE", "flat", "NOT_COMPUTABLE", "RATE_OUT_OF_RANGE"] {
            assert_eq!(TrendClassifier::classify_name(Some(name)), dash);
        }
    }
}
