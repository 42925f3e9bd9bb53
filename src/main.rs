//! lectio - daily reading-plan EPUB builder

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lectio::config::LogLevel;
use lectio::{ChapterFallback, Config, OutputMode};

#[derive(Parser)]
#[command(name = "lectio")]
#[command(version, about = "Build daily reading-plan EPUBs from a source EPUB", long_about = None)]
#[command(after_help = "EXAMPLES:
    lectio                                   Per-day packages with default paths
    lectio --mode combined -o out            One package for the whole plan
    lectio --source bible.epub --lenient     Read a packed EPUB, relaxed references
    lectio --config plan.toml --report r.json")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reading schedule file
    #[arg(short, long, value_name = "FILE")]
    schedule: Option<PathBuf>,

    /// Source e-book: unpacked directory or .epub file
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Navigation document inside the source (default: discovered)
    #[arg(long, value_name = "PATH")]
    nav: Option<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// One package per day or one for the whole plan
    #[arg(short, long, value_enum)]
    mode: Option<OutputMode>,

    /// What to do when a chapter cannot be found
    #[arg(long, value_enum)]
    fallback: Option<ChapterFallback>,

    /// Accept references with trailing ranges such as "Быт. 1-2"
    #[arg(long)]
    lenient: bool,

    /// Write the run report as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors and suppress the summary
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.schedule {
            config.paths.schedule = path.clone();
        }
        if let Some(path) = &self.source {
            config.paths.source = path.clone();
        }
        if let Some(nav) = &self.nav {
            config.paths.nav = Some(nav.clone());
        }
        if let Some(path) = &self.output {
            config.paths.output = path.clone();
        }
        if let Some(mode) = self.mode {
            config.output.mode = mode;
        }
        if let Some(fallback) = self.fallback {
            config.resolve.fallback = fallback;
        }
        if self.lenient {
            config.resolve.lenient_references = true;
        }
    }

    fn log_level(&self, configured: LogLevel) -> LogLevel {
        match (self.quiet, self.verbose) {
            (true, _) => LogLevel::Error,
            (false, 0) => configured,
            (false, 1) => LogLevel::Debug,
            (false, _) => LogLevel::Trace,
        }
    }
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    cli.apply(&mut config);
    init_tracing(cli.log_level(config.log_level));

    let report = match lectio::run(&config) {
        Ok(report) => report,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &cli.report {
        if let Err(e) = report.write_json(path) {
            error!(path = %path.display(), "Cannot write report: {e}");
            return ExitCode::FAILURE;
        }
        info!(path = %path.display(), "Report written");
    }

    if !cli.quiet {
        print!("{report}");
    }
    ExitCode::SUCCESS
}
