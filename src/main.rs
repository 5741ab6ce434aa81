//! agenda-get - fetch the latest planning commission agendas.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agenda_get::{
    Config, DirSink, HttpFetcher, Orchestrator, Progress, Reporter, SilentProgress, SiteTask,
    Task, TerminalProgress, catalog,
};

#[derive(Debug, Parser)]
#[command(name = "agenda-get", version, about = "Download the latest planning commission agendas")]
struct Cli {
    /// Directory to save agendas in (default: $HOME/agendas)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only fetch this site (repeatable)
    #[arg(short, long = "site", value_name = "NAME")]
    sites: Vec<String>,

    /// Don't draw the progress line
    #[arg(long)]
    no_progress: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// List known sites and exit
    #[arg(long)]
    list: bool,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Load the config file, if any, and apply flag overrides on top
    fn config(&self) -> agenda_get::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.out_dir {
            config.output.dir = Some(dir.clone());
        }
        if !self.sites.is_empty() {
            config.sites = self.sites.clone();
        }
        if self.no_progress {
            config.progress.enabled = false;
        }
        if let Some(secs) = self.timeout {
            config.http.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    fn log_filter(&self) -> EnvFilter {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so they never break the progress line on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(cli.log_filter())
        .init();

    if cli.list {
        for site in catalog::catalog() {
            println!("{:<14} {}", site.entity(), site.base_url());
        }
        return ExitCode::SUCCESS;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "run failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> agenda_get::Result<()> {
    let config = cli.config()?;
    let out_dir = match &config.output.dir {
        Some(dir) => dir.clone(),
        None => agenda_get::default_output_dir()?,
    };
    agenda_get::prepare_output_dir(&out_dir, config.output.clear_on_start).await?;

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let today = chrono::Local::now().date_naive();
    let tasks: Vec<Arc<dyn Task>> = catalog::select(&config.sites)?
        .into_iter()
        .map(|site| Arc::new(SiteTask::new(site, fetcher.clone(), today)) as Arc<dyn Task>)
        .collect();

    let progress: Arc<dyn Progress> = if config.progress.enabled {
        Arc::new(TerminalProgress::new(&config.progress))
    } else {
        Arc::new(SilentProgress::new())
    };
    let orchestrator = Orchestrator::new(progress, Arc::new(DirSink::new(&out_dir)));

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(agenda_get::cancel_on_signal(cancel.clone()));

    let outcome = orchestrator
        .run(&cancel, tasks, &mut Reporter::stdout(&out_dir))
        .await;
    signals.abort();

    let summary = outcome?;
    tracing::info!(
        out_dir = %out_dir.display(),
        succeeded = summary.succeeded,
        failed = summary.failed,
        "agendas fetched"
    );
    Ok(())
}
