use crate::chart::{Axis, ChartConfig, ChartData, ChartOptions, ChartRenderer, MetricTable};
use crate::dispatch::{FeedStats, StreamDispatcher};
use crate::error::{Error, Result};
use crate::feed::FeedEvent;
use crate::format;
use comfy_table::{Cell, Table};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// How long to block on the feed before re-checking stop conditions
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Renderer without a surface: remembers the last configuration and snapshot.
#[derive(Debug, Default)]
pub struct SnapshotRenderer {
    config: Option<ChartConfig>,
    data: ChartData,
    redraws: u64,
}

impl SnapshotRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&ChartConfig> {
        self.config.as_ref()
    }

    /// `set_data` calls so far, the initial clear included
    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl ChartRenderer for SnapshotRenderer {
    fn configure(&mut self, config: &ChartConfig) -> Result<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn set_data(&mut self, data: ChartData) -> Result<()> {
        if !data.is_aligned() {
            return Err(Error::Render("columns differ in length".to_string()));
        }
        self.data = data;
        self.redraws += 1;
        Ok(())
    }

    fn data(&self) -> &ChartData {
        &self.data
    }
}

/// Consume the feed without a terminal UI until it closes, Ctrl-C, or the
/// duration limit, then print a summary to stdout.
pub fn run(
    feed: Receiver<FeedEvent>,
    options: ChartOptions,
    duration: Option<Duration>,
) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(format!("Failed to set Ctrl-C handler: {}", e))))?;

    let mut dispatcher = StreamDispatcher::new(options, MetricTable::builtin(), SnapshotRenderer::new());
    let stats = consume_until(&mut dispatcher, &feed, &running, duration);

    println!("{}", status_table(&dispatcher));
    println!("{}", series_table(&dispatcher));
    println!(
        "{} ticks, {} malformed, {} status errors, {} chart errors",
        dispatcher.ticks(),
        stats.malformed,
        stats.status_errors,
        stats.chart_errors
    );

    match stats.closed {
        Some(Some(reason)) => Err(Error::Feed(reason)),
        _ => Ok(()),
    }
}

fn consume_until<R: ChartRenderer>(
    dispatcher: &mut StreamDispatcher<R>,
    feed: &Receiver<FeedEvent>,
    running: &AtomicBool,
    duration: Option<Duration>,
) -> FeedStats {
    let start = Instant::now();
    let mut stats = FeedStats::default();

    tracing::info!("consuming feed (Ctrl-C to stop)");

    while running.load(Ordering::SeqCst) && !stats.is_closed() {
        if let Some(max) = duration
            && start.elapsed() >= max
        {
            tracing::info!("duration limit reached");
            break;
        }

        match feed.recv_timeout(RECV_TIMEOUT) {
            Ok(event) => {
                let before = dispatcher.ticks();
                dispatcher.consume(event, &mut stats);
                if dispatcher.ticks() > before {
                    log_tick(dispatcher);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                dispatcher.consume(FeedEvent::Closed(Some("feed disconnected".into())), &mut stats);
            }
        }
    }

    stats
}

fn log_tick<R: ChartRenderer>(dispatcher: &StreamDispatcher<R>) {
    let Some(session) = dispatcher.session() else {
        tracing::info!(tick = dispatcher.ticks(), "tick without chart");
        return;
    };
    let data = session.view().renderer().data();
    tracing::info!(
        tick = dispatcher.ticks(),
        at = %session.view().config().format_time_point(data.latest_time()),
        points = data.len(),
        "tick"
    );
}

fn status_table<R: ChartRenderer>(dispatcher: &StreamDispatcher<R>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["App", "Instance", "Status", "Since", "Uptime"]);
    for row in dispatcher.board().rows() {
        table.add_row(vec![
            Cell::new(row.app),
            Cell::new(row.addr),
            Cell::new(&row.status.text),
            Cell::new(row.time),
            Cell::new(row.duration),
        ]);
    }
    table
}

fn series_table<R: ChartRenderer>(dispatcher: &StreamDispatcher<R>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Series", "Axis", "Latest"]);

    let Some(session) = dispatcher.session() else {
        return table;
    };
    let data = session.view().renderer().data();
    for style in &session.view().config().series {
        let axis = match style.axis {
            Axis::Left => "left",
            Axis::Right => "right",
        };
        table.add_row(vec![
            Cell::new(style.index),
            Cell::new(&style.label),
            Cell::new(axis),
            Cell::new(style.format_value(data.latest(style.index))),
        ]);
    }

    for skipped in session.registry().skipped() {
        table.add_row(vec![
            Cell::new(""),
            Cell::new(skipped.to_string()),
            Cell::new("skipped"),
            Cell::new(format::NO_DATA),
        ]);
    }
    table
}
