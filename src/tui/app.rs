use crate::chart::{ChartOptions, MetricTable};
use crate::dispatch::{FeedStats, StreamDispatcher};
use crate::error::Result;
use crate::feed::FeedEvent;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::*};
use std::io::{self, stdout};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use super::chart::TerminalChart;
use super::ui;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the feed stands, as shown in the header badge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedState {
    Live,
    Paused,
    Closed,
}

/// TUI dashboard: one feed, one status board, one chart
pub struct App {
    dispatcher: StreamDispatcher<TerminalChart>,
    feed: Receiver<FeedEvent>,
    stats: FeedStats,
    max_duration: Option<Duration>,
    start_time: Instant,
    running: bool,
    paused: bool,
    // Redraw once even while paused (badge change, resize)
    dirty: bool,
}

impl App {
    pub fn new(
        feed: Receiver<FeedEvent>,
        options: ChartOptions,
        max_duration: Option<Duration>,
    ) -> Self {
        App {
            dispatcher: StreamDispatcher::new(options, MetricTable::builtin(), TerminalChart::new()),
            feed,
            stats: FeedStats::default(),
            max_duration,
            start_time: Instant::now(),
            running: true,
            paused: false,
            dirty: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        while self.running {
            if let Some(max) = self.max_duration
                && self.start_time.elapsed() >= max
            {
                tracing::info!("duration limit reached");
                break;
            }

            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key.code, key.modifiers);
                    }
                    Event::Resize(_, _) => self.dirty = true,
                    _ => {}
                }
            }

            self.drain_feed();

            if !self.paused || std::mem::take(&mut self.dirty) {
                terminal.draw(|frame| ui::render(frame, self))?;
            }
        }

        tracing::info!(
            ticks = self.dispatcher.ticks(),
            malformed = self.stats.malformed,
            "dashboard stopped"
        );
        Ok(())
    }

    /// Dispatch every event already queued; each one completes before the next.
    pub(super) fn drain_feed(&mut self) {
        if self.stats.is_closed() {
            return;
        }
        loop {
            match self.feed.try_recv() {
                Ok(event) => {
                    let closing = matches!(event, FeedEvent::Closed(_));
                    self.dispatcher.consume(event, &mut self.stats);
                    if closing {
                        self.dirty = true;
                        return;
                    }
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    // Producer died without saying goodbye
                    self.dispatcher
                        .consume(FeedEvent::Closed(Some("feed disconnected".into())), &mut self.stats);
                    self.dirty = true;
                    return;
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false
            }
            KeyCode::Char('p') => {
                self.paused = !self.paused;
                self.dirty = true;
            }
            _ => {}
        }
    }

    pub fn dispatcher(&self) -> &StreamDispatcher<TerminalChart> {
        &self.dispatcher
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    pub fn feed_state(&self) -> FeedState {
        if self.stats.is_closed() {
            FeedState::Closed
        } else if self.paused {
            FeedState::Paused
        } else {
            FeedState::Live
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_frame;
    use std::sync::mpsc;

    const TICK: &str = r#"{"apps":[{"name":"svc","instances":[{"addr":"h:1","status":"UP","time":"t","duration":"d"}]}],
        "sample":{"timestamp":1000,"value":{"h:1,cpu_usage":12.5}}}"#;

    fn new_app() -> (App, mpsc::Sender<FeedEvent>) {
        let (tx, rx) = mpsc::channel();
        (App::new(rx, ChartOptions::default(), None), tx)
    }

    #[test]
    fn test_drains_every_pending_event() {
        let (mut app, tx) = new_app();
        for _ in 0..3 {
            tx.send(FeedEvent::Message(parse_frame(TICK).unwrap())).unwrap();
        }
        tx.send(FeedEvent::Malformed("junk".into())).unwrap();

        app.drain_feed();
        assert_eq!(app.dispatcher().ticks(), 3);
        assert_eq!(app.stats().malformed, 1);
        assert_eq!(app.feed_state(), FeedState::Live);
    }

    #[test]
    fn test_pause_keeps_dispatching() {
        let (mut app, tx) = new_app();
        app.handle_key(KeyCode::Char('p'), KeyModifiers::NONE);
        assert_eq!(app.feed_state(), FeedState::Paused);

        tx.send(FeedEvent::Message(parse_frame(TICK).unwrap())).unwrap();
        app.drain_feed();
        assert_eq!(app.dispatcher().ticks(), 1);
        assert!(app.dispatcher().session().is_some());
    }

    #[test]
    fn test_disconnect_closes_feed() {
        let (mut app, tx) = new_app();
        drop(tx);
        app.drain_feed();
        assert_eq!(app.feed_state(), FeedState::Closed);
        assert_eq!(
            app.stats().closed,
            Some(Some("feed disconnected".to_string()))
        );
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _tx) = new_app();
        app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(!app.running);

        let (mut app, _tx) = new_app();
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.running);
    }
}
