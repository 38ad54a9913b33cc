pub mod chart;
pub mod cli;
pub mod commands;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod format;
pub mod logging;
pub mod status;
pub mod tui;

pub use error::{Error, Result};
