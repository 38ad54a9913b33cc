mod app;
mod chart;
mod ui;

use crate::chart::ChartOptions;
use crate::error::Result;
use crate::feed::FeedEvent;
use std::sync::mpsc::Receiver;
use std::time::Duration;

pub use app::{App, FeedState};
pub use chart::TerminalChart;

/// Run the interactive dashboard until the user quits or the duration limit hits
pub fn run(
    feed: Receiver<FeedEvent>,
    options: ChartOptions,
    max_duration: Option<Duration>,
) -> Result<()> {
    let mut app = App::new(feed, options, max_duration);
    app.run()
}
