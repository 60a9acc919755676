//! Application-wide run state and error types for uplink

use thiserror_no_std::Error;

use crate::storage::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    /// Views are torn down, no subscriptions or timers are held
    Stopped,
    /// Views are visible and reacting to store changes
    Running,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(&'static str),
    #[error("Unknown row: {0}")]
    UnknownRow(RowId),
    #[error("Preferences decode failed: {0}")]
    Preferences(postcard::Error),
}
