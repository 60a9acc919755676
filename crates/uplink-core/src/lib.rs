//! Hardware-independent core library for uplink
//!
//! This crate contains the reactive display layer of the uplink CGM/pump
//! telemetry uploader: live subscriptions over the sample and log stores,
//! chart window calculation, trend classification, the recency-aligned refresh
//! scheduler and the auto-scrolling log stream.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod change_feed;
pub mod config;
pub mod display_manager;
pub mod metrics;
pub mod pages;
pub mod scheduler;
pub mod storage;
pub mod ui;
