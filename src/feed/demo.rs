//! Deterministic synthetic feed for trying the dashboard without a backend.

use super::{App, FeedMessage, Instance, Sample, SampleValues, Status};
use crate::error::Result;
use std::f64::consts::PI;
use std::io::Write;
use std::time::Duration;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;
const MB: f64 = 1024.0 * 1024.0;

/// Every Nth tick carries no sample
const HEARTBEAT_EVERY: u64 = 7;
/// Every Nth tick drops the flapping instance's CPU key
const GAP_EVERY: u64 = 5;

const FLAPPING_ADDR: &str = "10.0.0.2:8080";

pub struct DemoFeed {
    tick: u64,
    started_ms: Option<i64>,
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoFeed {
    pub fn new() -> Self {
        DemoFeed {
            tick: 0,
            started_ms: None,
        }
    }

    /// Number of messages produced so far
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn next_message(&mut self, now_ms: i64) -> FeedMessage {
        let tick = self.tick;
        self.tick += 1;
        let started_ms = *self.started_ms.get_or_insert(now_ms);

        let flapping_down = (tick / 20) % 2 == 1;
        let apps = topology(started_ms, now_ms, flapping_down);

        if tick > 0 && tick % HEARTBEAT_EVERY == 0 {
            return FeedMessage { apps, sample: None };
        }

        let t = tick as f64;
        let mut value = SampleValues::new();
        value.insert("localhost:9090,mem_used_bytes", 180.0 * MB + wave(t, 40.0) * 30.0 * MB);
        value.insert("10.0.0.1:8080,cpu_usage", 35.0 + wave(t, 12.0) * 20.0);
        value.insert("10.0.0.1:8080,mem_used_percent", 55.0 + wave(t, 30.0) * 10.0);
        if !flapping_down && (tick == 0 || tick % GAP_EVERY != 0) {
            value.insert(
                format!("{},cpu_usage", FLAPPING_ADDR),
                60.0 + wave(t + 3.0, 9.0) * 25.0,
            );
        }
        value.insert("redis-primary,mem_used_bytes", 1.2 * GB + wave(t, 60.0) * 0.2 * GB);
        // Not a known metric kind; filtered by the registry
        value.insert("10.0.0.1:8080,gc_pause_seconds", 0.002 + wave(t, 5.0) * 0.001);

        FeedMessage {
            apps,
            sample: Some(Sample {
                timestamp: now_ms,
                value,
            }),
        }
    }
}

fn wave(t: f64, period: f64) -> f64 {
    (2.0 * PI * t / period).sin()
}

fn topology(started_ms: i64, now_ms: i64, flapping_down: bool) -> Vec<App> {
    let since = crate::format::format_datetime(started_ms);
    let uptime = Duration::from_millis((now_ms - started_ms).max(0) as u64);
    // Whole seconds keep the text stable between redraws
    let uptime = humantime::format_duration(Duration::from_secs(uptime.as_secs())).to_string();

    let up = |name: &str, addr: &str| Instance {
        name: name.to_string(),
        addr: addr.to_string(),
        status: Status::Up,
        time: since.clone(),
        duration: uptime.clone(),
    };

    let flapping = if flapping_down {
        Instance {
            status: Status::Down,
            duration: String::new(),
            ..up("go", FLAPPING_ADDR)
        }
    } else {
        up("go", FLAPPING_ADDR)
    };

    vec![
        App {
            name: "prom".to_string(),
            instances: vec![up("prom", "localhost:9090")],
        },
        App {
            name: "go".to_string(),
            instances: vec![up("go", "10.0.0.1:8080"), flapping],
        },
        App {
            name: "redis".to_string(),
            instances: vec![up("redis", "redis-primary")],
        },
    ]
}

/// Write the demo feed as SSE frames until `ticks` messages have been sent.
pub fn emit<W: Write>(out: &mut W, interval: Duration, ticks: Option<u64>) -> Result<()> {
    let mut feed = DemoFeed::new();
    loop {
        if ticks.is_some_and(|max| feed.ticks() >= max) {
            return Ok(());
        }
        let msg = feed.next_message(chrono::Utc::now().timestamp_millis());
        writeln!(out, "data: {}\n", serde_json::to_string(&msg)?)?;
        out.flush()?;
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FrameDecoder, parse_frame};

    #[test]
    fn test_first_tick_has_sample() {
        let mut feed = DemoFeed::new();
        let msg = feed.next_message(1_000);
        let sample = msg.sample.unwrap();
        assert_eq!(sample.timestamp, 1_000);
        assert_eq!(sample.value.len(), 6);
        assert_eq!(msg.apps.len(), 3);
    }

    #[test]
    fn test_heartbeat_and_gap_ticks() {
        let mut feed = DemoFeed::new();
        let messages: Vec<FeedMessage> = (0..15).map(|i| feed.next_message(i * 2000)).collect();

        assert!(messages[7].sample.is_none());
        assert!(messages[14].sample.is_none());

        let gap = messages[5].sample.as_ref().unwrap();
        assert_eq!(gap.value.get("10.0.0.2:8080,cpu_usage"), None);
        let full = messages[6].sample.as_ref().unwrap();
        assert!(full.value.get("10.0.0.2:8080,cpu_usage").is_some());
    }

    #[test]
    fn test_flapping_instance_goes_down() {
        let mut feed = DemoFeed::new();
        let msg = (0..21).map(|i| feed.next_message(i)).last().unwrap();
        let go = msg.apps.iter().find(|a| a.name == "go").unwrap();
        assert_eq!(go.instances[1].status, Status::Down);
    }

    #[test]
    fn test_emit_writes_sse_frames() {
        let mut out = Vec::new();
        emit(&mut out, Duration::ZERO, Some(2)).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut decoder = FrameDecoder::new();
        let payloads: Vec<String> = text.lines().filter_map(|l| decoder.push_line(l)).collect();
        assert_eq!(payloads.len(), 2);
        assert!(parse_frame(&payloads[0]).unwrap().sample.is_some());
    }
}
