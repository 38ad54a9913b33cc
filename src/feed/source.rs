use super::demo::DemoFeed;
use super::{FeedMessage, FrameDecoder, parse_frame};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// What the dispatcher sees on its channel
#[derive(Debug)]
pub enum FeedEvent {
    Message(FeedMessage),
    /// A frame that did not parse; the feed keeps going
    Malformed(String),
    /// The producer stopped; carries the reason if it failed
    Closed(Option<String>),
}

#[derive(Debug, Clone)]
pub enum FeedSource {
    Stdin,
    File(PathBuf),
    Demo {
        interval: Duration,
        ticks: Option<u64>,
    },
}

impl FeedSource {
    /// `-` means stdin
    pub fn from_path(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            FeedSource::Stdin
        } else {
            FeedSource::File(path)
        }
    }
}

/// Start the single producer thread and hand back the consuming end.
pub fn spawn(source: FeedSource) -> Result<Receiver<FeedEvent>> {
    let (tx, rx) = mpsc::channel();

    match source {
        FeedSource::File(path) => {
            let file = File::open(&path)
                .map_err(|e| Error::Feed(format!("cannot open {}: {}", path.display(), e)))?;
            spawn_named("feed-file", move || {
                let closed = read_frames(BufReader::new(file), &tx);
                let _ = tx.send(FeedEvent::Closed(closed.err().map(|e| e.to_string())));
            })?;
        }
        FeedSource::Stdin => {
            spawn_named("feed-stdin", move || {
                let stdin = io::stdin();
                let closed = read_frames(stdin.lock(), &tx);
                let _ = tx.send(FeedEvent::Closed(closed.err().map(|e| e.to_string())));
            })?;
        }
        FeedSource::Demo { interval, ticks } => {
            spawn_named("feed-demo", move || {
                run_demo(interval, ticks, &tx);
                let _ = tx.send(FeedEvent::Closed(None));
            })?;
        }
    }

    Ok(rx)
}

fn spawn_named<F>(name: &str, f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new().name(name.to_string()).spawn(f)?;
    Ok(())
}

/// Decode frames from `reader` and forward them until EOF or until the
/// consumer hangs up.
pub fn read_frames<R: BufRead>(mut reader: R, tx: &Sender<FeedEvent>) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "skipping feed line with invalid UTF-8");
                if buf.starts_with(b"data:") {
                    decoder.skip_frame();
                }
                if tx.send(FeedEvent::Malformed(format!("invalid UTF-8 in feed: {}", e))).is_err() {
                    return Ok(());
                }
                continue;
            }
        };

        if let Some(payload) = decoder.push_line(line)
            && !forward(&payload, tx)
        {
            return Ok(());
        }
    }

    if let Some(payload) = decoder.finish() {
        forward(&payload, tx);
    }
    Ok(())
}

/// Returns false once the receiver is gone.
fn forward(payload: &str, tx: &Sender<FeedEvent>) -> bool {
    let event = match parse_frame(payload) {
        Ok(msg) => FeedEvent::Message(msg),
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed feed frame");
            FeedEvent::Malformed(e.to_string())
        }
    };
    tx.send(event).is_ok()
}

fn run_demo(interval: Duration, ticks: Option<u64>, tx: &Sender<FeedEvent>) {
    let mut feed = DemoFeed::new();
    loop {
        if ticks.is_some_and(|max| feed.ticks() >= max) {
            break;
        }
        let msg = feed.next_message(chrono::Utc::now().timestamp_millis());
        if tx.send(FeedEvent::Message(msg)).is_err() {
            break;
        }
        thread::sleep(interval);
    }
}
