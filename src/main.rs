use anyhow::Context;
use clap::Parser;
use opsdash::chart::ChartOptions;
use opsdash::cli::{Cli, Command};
use opsdash::error::exit_code;
use opsdash::feed::{self, FeedSource};
use opsdash::logging::{self, LogTarget};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(dash_err) = e.downcast_ref::<opsdash::Error>() {
                ExitCode::from(dash_err.exit_code() as u8)
            } else if e.to_string().starts_with("Invalid arguments") {
                ExitCode::from(exit_code::INVALID_ARGUMENTS as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Validate CLI arguments
    cli.validate()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Invalid arguments")?;

    match cli.command {
        Some(Command::Demo { interval, ticks }) => {
            let stdout = std::io::stdout();
            opsdash::feed::demo::emit(&mut stdout.lock(), interval, ticks)?;
        }
        Some(Command::Completions { shell }) => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "opsdash", &mut std::io::stdout());
        }
        None => {
            run_dashboard(&cli)?;
        }
    }

    Ok(())
}

fn run_dashboard(cli: &Cli) -> anyhow::Result<()> {
    let log_target = match (&cli.log_file, cli.quiet) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::Discard,
    };
    logging::init(log_target, &cli.log_level).context("Failed to initialize logging")?;

    let source = match &cli.feed {
        Some(path) => FeedSource::from_path(path.clone()),
        None => FeedSource::Demo {
            interval: cli.interval,
            ticks: None,
        },
    };
    tracing::info!(?source, "starting feed");
    let events = feed::spawn(source)?;

    let options = ChartOptions {
        title: cli.title.clone(),
        width: cli.width,
        height: cli.height,
    };

    if cli.quiet {
        opsdash::commands::headless::run(events, options, cli.duration)?;
    } else {
        opsdash::tui::run(events, options, cli.duration)?;
    }

    Ok(())
}
