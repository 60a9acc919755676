//! Status page: glucose chart, headline readouts and the reading age label
//!
//! The page keeps live queries over the CGM sample and pump status tables,
//! recomputes the chart window and headline when they change, and drives a
//! [`RefreshScheduler`](crate::scheduler::RefreshScheduler) that ages the
//! "minutes since last reading" label between data updates.

mod constants;
mod page;
mod trend;
mod window;

pub use page::{Headline, PlotPoint, ReadingAge, StatusPage, StatusState};
pub use trend::{TrendClassifier, TrendGlyph, TrendIndicator};
pub use window::{DisplayWindow, WindowCalculator, chart_samples};
