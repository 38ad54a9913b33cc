//! Per-tick handling of feed messages.

use crate::chart::{
    ChartOptions, ChartRenderer, ChartView, MetricTable, SeriesRegistry, SlidingWindowStore,
};
use crate::error::{Error, Result};
use crate::feed::{App, FeedEvent, FeedMessage, Sample};
use crate::status::StatusBoard;

/// Registry, window and view of one dashboard session. Built once, from the
/// first tick that carries a sample.
pub struct ChartSession<R> {
    registry: SeriesRegistry,
    store: SlidingWindowStore,
    view: ChartView<R>,
}

impl<R: ChartRenderer> ChartSession<R> {
    fn push(&mut self, sample: &Sample) -> Result<()> {
        let row = self.registry.row(sample);
        self.store.append(sample.timestamp, &row)?;
        self.view.update(self.store.snapshot())
    }

    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SlidingWindowStore {
        &self.store
    }

    pub fn view(&self) -> &ChartView<R> {
        &self.view
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartStep {
    /// Heartbeat tick; the chart was not touched
    NoSample,
    /// A row was appended and the chart redrawn
    Updated { constructed: bool },
}

#[derive(Debug)]
pub struct TickReport {
    /// Status fields that could not be written this tick
    pub status_errors: Vec<Error>,
    pub chart: ChartStep,
}

/// Controller-side counters for the feed
#[derive(Debug, Default)]
pub struct FeedStats {
    pub messages: u64,
    pub malformed: u64,
    pub status_errors: u64,
    pub chart_errors: u64,
    pub last_error: Option<String>,
    /// Set once the producer stops; holds its failure, if any
    pub closed: Option<Option<String>>,
}

impl FeedStats {
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }
}

pub struct StreamDispatcher<R> {
    options: ChartOptions,
    metrics: MetricTable,
    board: StatusBoard,
    renderer: Option<R>,
    session: Option<ChartSession<R>>,
    ticks: u64,
}

impl<R: ChartRenderer> StreamDispatcher<R> {
    pub fn new(options: ChartOptions, metrics: MetricTable, renderer: R) -> Self {
        StreamDispatcher {
            options,
            metrics,
            board: StatusBoard::new(),
            renderer: Some(renderer),
            session: None,
            ticks: 0,
        }
    }

    /// Create the status cells for `apps`. Must happen before the first
    /// `handle`; instances not laid out get `MissingStatusTarget` errors.
    pub fn lay_out(&mut self, apps: &[App]) {
        self.board.lay_out(apps);
    }

    /// Process one message to completion.
    ///
    /// Status updates always run and their failures are collected, not
    /// raised. Chart construction or redraw failures are returned; status
    /// updates already applied stay applied.
    pub fn handle(&mut self, msg: &FeedMessage) -> Result<TickReport> {
        self.ticks += 1;

        let mut status_errors = Vec::new();
        for instance in msg.apps.iter().flat_map(|app| &app.instances) {
            for err in self.board.apply(instance) {
                tracing::warn!(addr = %instance.addr, error = %err, "status update failed");
                status_errors.push(err);
            }
        }

        let Some(sample) = &msg.sample else {
            tracing::debug!(tick = self.ticks, "heartbeat tick");
            return Ok(TickReport {
                status_errors,
                chart: ChartStep::NoSample,
            });
        };

        let constructed = self.session.is_none();
        let session = match self.session.take() {
            Some(session) => session,
            None => self.build_session(sample, &msg.apps)?,
        };
        let session = self.session.insert(session);
        session.push(sample)?;

        tracing::debug!(
            tick = self.ticks,
            timestamp = sample.timestamp,
            points = session.store.len(),
            "chart updated"
        );

        Ok(TickReport {
            status_errors,
            chart: ChartStep::Updated { constructed },
        })
    }

    /// Controller step for one channel event. Lays out the status board from
    /// the first message's topology, then dispatches; failures are counted
    /// and logged rather than returned so the feed keeps flowing.
    pub fn consume(&mut self, event: FeedEvent, stats: &mut FeedStats) {
        match event {
            FeedEvent::Message(msg) => {
                stats.messages += 1;
                if !self.board.is_laid_out() {
                    self.lay_out(&msg.apps);
                }
                match self.handle(&msg) {
                    Ok(report) => {
                        if let Some(err) = report.status_errors.last() {
                            stats.last_error = Some(err.to_string());
                        }
                        stats.status_errors += report.status_errors.len() as u64;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "chart refresh failed");
                        stats.chart_errors += 1;
                        stats.last_error = Some(e.to_string());
                    }
                }
            }
            FeedEvent::Malformed(reason) => {
                stats.malformed += 1;
                stats.last_error = Some(reason);
            }
            FeedEvent::Closed(reason) => {
                match &reason {
                    Some(r) => tracing::error!(reason = %r, "feed closed"),
                    None => tracing::info!("feed closed"),
                }
                stats.closed = Some(reason);
            }
        }
    }

    fn build_session(&mut self, sample: &Sample, apps: &[App]) -> Result<ChartSession<R>> {
        let registry = SeriesRegistry::discover(sample, apps, &self.metrics);
        let renderer = self
            .renderer
            .take()
            .ok_or_else(|| Error::Render("renderer lost in an earlier construction".to_string()))?;
        let view = match ChartView::construct(&self.options, registry.descriptors(), renderer) {
            Ok(view) => view,
            Err((e, renderer)) => {
                // Keep the renderer so the next sample tick retries
                self.renderer = Some(renderer);
                return Err(e);
            }
        };
        let store = SlidingWindowStore::for_width(registry.len(), self.options.width);

        tracing::info!(
            series = registry.len(),
            skipped = registry.skipped().len(),
            capacity = store.capacity(),
            "chart constructed"
        );

        Ok(ChartSession {
            registry,
            store,
            view,
        })
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn session(&self) -> Option<&ChartSession<R>> {
        self.session.as_ref()
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Messages handled so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartConfig, ChartData};
    use crate::feed::{Instance, Status};

    #[derive(Default)]
    struct Counting {
        configures: usize,
        data: ChartData,
    }

    impl ChartRenderer for Counting {
        fn configure(&mut self, _config: &ChartConfig) -> Result<()> {
            self.configures += 1;
            Ok(())
        }

        fn set_data(&mut self, data: ChartData) -> Result<()> {
            self.data = data;
            Ok(())
        }

        fn data(&self) -> &ChartData {
            &self.data
        }
    }

    struct Broken;

    impl ChartRenderer for Broken {
        fn configure(&mut self, _config: &ChartConfig) -> Result<()> {
            Err(Error::Render("no surface".into()))
        }

        fn set_data(&mut self, _data: ChartData) -> Result<()> {
            Ok(())
        }

        fn data(&self) -> &ChartData {
            unreachable!()
        }
    }

    /// Fails its first `configure`, then behaves
    #[derive(Default)]
    struct FlakyOnce {
        attempts: usize,
        data: ChartData,
    }

    impl ChartRenderer for FlakyOnce {
        fn configure(&mut self, _config: &ChartConfig) -> Result<()> {
            self.attempts += 1;
            if self.attempts == 1 {
                return Err(Error::Render("transient".into()));
            }
            Ok(())
        }

        fn set_data(&mut self, data: ChartData) -> Result<()> {
            self.data = data;
            Ok(())
        }

        fn data(&self) -> &ChartData {
            &self.data
        }
    }

    fn message(timestamp: i64, values: &[(&str, f64)]) -> FeedMessage {
        FeedMessage {
            apps: vec![App {
                name: "svc".into(),
                instances: vec![Instance {
                    name: String::new(),
                    addr: "a:1".into(),
                    status: Status::Up,
                    time: "t".into(),
                    duration: "d".into(),
                }],
            }],
            sample: Some(Sample {
                timestamp,
                value: values.iter().map(|&(k, v)| (k, v)).collect(),
            }),
        }
    }

    #[test]
    fn test_constructs_once() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), Counting::default());
        let first = message(1, &[("a:1,cpu_usage", 1.0)]);
        dispatcher.lay_out(&first.apps);

        let report = dispatcher.handle(&first).unwrap();
        assert_eq!(report.chart, ChartStep::Updated { constructed: true });
        for t in 2..6 {
            let report = dispatcher.handle(&message(t, &[("a:1,cpu_usage", 1.0)])).unwrap();
            assert_eq!(report.chart, ChartStep::Updated { constructed: false });
        }

        let session = dispatcher.session().unwrap();
        assert_eq!(session.view().renderer().configures, 1);
        assert_eq!(session.store().len(), 5);
        assert_eq!(dispatcher.ticks(), 5);
    }

    #[test]
    fn test_heartbeat_before_first_sample() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), Counting::default());
        let mut msg = message(1, &[]);
        msg.sample = None;
        dispatcher.lay_out(&msg.apps);

        let report = dispatcher.handle(&msg).unwrap();
        assert_eq!(report.chart, ChartStep::NoSample);
        assert!(report.status_errors.is_empty());
        assert!(dispatcher.session().is_none());
        assert_eq!(dispatcher.board().get("a:1,status").unwrap().text, "UP");
    }

    #[test]
    fn test_status_applies_even_when_chart_fails() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), Broken);
        let msg = message(1, &[("a:1,cpu_usage", 1.0)]);
        dispatcher.lay_out(&msg.apps);

        assert!(matches!(dispatcher.handle(&msg), Err(Error::Render(_))));
        assert_eq!(dispatcher.board().get("a:1,status").unwrap().text, "UP");
        assert!(dispatcher.session().is_none());
    }

    #[test]
    fn test_construction_retried_after_failure() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), FlakyOnce::default());
        let first = message(1, &[("a:1,cpu_usage", 1.0)]);
        dispatcher.lay_out(&first.apps);

        match dispatcher.handle(&first) {
            Err(Error::Render(reason)) => assert_eq!(reason, "transient"),
            other => panic!("expected a render error, got {:?}", other),
        }
        assert!(dispatcher.session().is_none());

        let report = dispatcher.handle(&message(2, &[("a:1,cpu_usage", 2.0)])).unwrap();
        assert_eq!(report.chart, ChartStep::Updated { constructed: true });
        let session = dispatcher.session().unwrap();
        assert_eq!(session.view().renderer().attempts, 2);
        assert_eq!(session.view().renderer().data().time, vec![2]);

        let report = dispatcher.handle(&message(3, &[("a:1,cpu_usage", 3.0)])).unwrap();
        assert_eq!(report.chart, ChartStep::Updated { constructed: false });
    }

    #[test]
    fn test_consume_lays_out_and_counts() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), Counting::default());
        let mut stats = FeedStats::default();

        dispatcher.consume(FeedEvent::Message(message(1, &[("a:1,cpu_usage", 1.0)])), &mut stats);
        dispatcher.consume(FeedEvent::Malformed("bad frame".into()), &mut stats);
        assert!(!stats.is_closed());
        dispatcher.consume(FeedEvent::Closed(None), &mut stats);

        assert_eq!(stats.messages, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.status_errors, 0);
        assert_eq!(stats.last_error.as_deref(), Some("bad frame"));
        assert!(stats.is_closed());
        assert_eq!(dispatcher.board().len(), 1);
    }

    #[test]
    fn test_consume_counts_chart_failures() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), Broken);
        let mut stats = FeedStats::default();
        dispatcher.consume(FeedEvent::Message(message(1, &[("a:1,cpu_usage", 1.0)])), &mut stats);
        assert_eq!(stats.chart_errors, 1);
        assert_eq!(dispatcher.board().get("a:1,status").unwrap().text, "UP");
    }

    #[test]
    fn test_missing_status_targets_are_collected() {
        let mut dispatcher =
            StreamDispatcher::new(ChartOptions::default(), MetricTable::builtin(), Counting::default());
        // Never laid out
        let report = dispatcher.handle(&message(1, &[("a:1,cpu_usage", 1.0)])).unwrap();
        assert_eq!(report.status_errors.len(), 3);
        assert_eq!(report.chart, ChartStep::Updated { constructed: true });
    }
}
