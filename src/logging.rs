use crate::error::{Error, Result};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines go.
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    /// The TUI owns the terminal and no log file was requested
    Discard,
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(target: LogTarget<'_>, default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init()
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        LogTarget::Discard => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init()
        }
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_reported() {
        // Whichever call installs the global subscriber, the next one must fail
        let _ = init(LogTarget::Discard, "info");
        assert!(matches!(
            init(LogTarget::Discard, "debug"),
            Err(Error::Logging(_))
        ));
    }

    #[test]
    fn test_unopenable_log_file() {
        let err = init(LogTarget::File(Path::new("/nonexistent/dir/opsdash.log")), "info")
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
