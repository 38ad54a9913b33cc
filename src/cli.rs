use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "opsdash")]
#[command(about = "Live operations dashboard for instance health and telemetry feeds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Feed to consume: a file of SSE frames or JSON lines, or '-' for stdin
    #[arg(long, short = 'f', conflicts_with = "demo")]
    pub feed: Option<PathBuf>,

    /// Consume a built-in synthetic feed instead of a real one
    #[arg(long, conflicts_with = "feed")]
    pub demo: bool,

    /// Tick interval of the synthetic feed
    #[arg(long, short = 'i', default_value = "2s", value_parser = parse_duration)]
    pub interval: Duration,

    /// Chart title
    #[arg(long, default_value = "CPU/MEM")]
    pub title: String,

    /// Rendering surface width in pixels (sets the visible window size)
    #[arg(long, default_value = "800")]
    pub width: u32,

    /// Rendering surface height in pixels
    #[arg(long, default_value = "400")]
    pub height: u32,

    /// Stop after this long (default: until the feed closes or Ctrl-C)
    #[arg(long, short = 'd', value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Disable TUI, log ticks and print a summary at the end
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Write logs to this file (TUI mode discards logs otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a synthetic SSE feed to stdout
    Demo {
        /// Tick interval
        #[arg(long, short = 'i', default_value = "2s", value_parser = parse_duration)]
        interval: Duration,

        /// Number of ticks to emit (default: unbounded)
        #[arg(long, short = 'n')]
        ticks: Option<u64>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 500ms, 2s, 1m, 90",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        // Dashboard mode needs a feed
        if self.command.is_none() && self.feed.is_none() && !self.demo {
            return Err("Either --feed or --demo is required".to_string());
        }

        if self.width == 0 || self.width > 10000 {
            return Err(format!(
                "Width must be between 1 and 10000 pixels, got {}",
                self.width
            ));
        }

        if self.height == 0 || self.height > 10000 {
            return Err(format!(
                "Height must be between 1 and 10000 pixels, got {}",
                self.height
            ));
        }

        if self.interval.is_zero() {
            return Err("Interval must be greater than zero".to_string());
        }

        Ok(())
    }
}
