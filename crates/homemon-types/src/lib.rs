//! Shared domain types for the home-monitor workspace.

pub mod capture;
pub mod clock;
pub mod config;
pub mod frame;

mod errors;

pub use errors::{MonitorError, Result};
