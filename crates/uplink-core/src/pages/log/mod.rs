//! Live log view
//!
//! [`LogStream`] keeps a filtered, ordered view over the log table, follows
//! new entries while the user is at the bottom, and provides search
//! navigation to earlier warnings, notes and session starts.

mod constants;
mod scroll;
mod stream;

pub use scroll::ScrollState;
pub use stream::{LogStream, LogView, ScrollCommand, ScrollMode};
