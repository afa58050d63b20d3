//! Binary entrypoint for the photo slideshow server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use photo_slideshow::tasks::{advance, files};
use photo_slideshow::{Configuration, Slideshow, web};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "photo-slideshow",
    version,
    about = "Serve a rotating slideshow of a photo directory over HTTP"
)]
struct Cli {
    /// Path to YAML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the photo directory
    #[arg(long, value_name = "DIR")]
    photos: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Override the advance interval (e.g. "4s", "1m")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Scan subdirectories too
    #[arg(long)]
    recursive: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<Configuration> {
        let mut cfg = match &self.config {
            Some(path) => Configuration::from_yaml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Configuration::default(),
        };
        if let Some(dir) = &self.photos {
            cfg.photo_library_path = dir.clone();
        }
        if let Some(addr) = self.bind {
            cfg.server.bind_address = addr;
        }
        if let Some(interval) = self.interval {
            cfg.advance_interval = interval;
        }
        if self.recursive {
            cfg.recursive = true;
        }
        cfg.validated().context("validating configuration")
    }
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photo_slideshow={level}").parse()?)
        .add_directive("notify=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = cli.load_config()?;
    info!(
        photos = %cfg.photo_library_path.display(),
        recursive = cfg.recursive,
        advance = %humantime::format_duration(cfg.advance_interval),
        rescan = %humantime::format_duration(cfg.rescan_interval),
        "configuration loaded"
    );

    let slideshow = Slideshow::new();
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutdown signal received; stopping");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Rescans
    tasks.spawn({
        let cfg = cfg.clone();
        let slideshow = slideshow.clone();
        let cancel = cancel.clone();
        async move {
            files::run(cfg, slideshow, cancel)
                .await
                .context("files task failed")
        }
    });

    // Advance timer
    tasks.spawn({
        let slideshow = slideshow.clone();
        let cancel = cancel.clone();
        let period = cfg.advance_interval;
        async move {
            advance::run(slideshow, period, cancel)
                .await
                .context("advance task failed")
        }
    });

    // HTTP
    tasks.spawn({
        let slideshow = slideshow.clone();
        let cancel = cancel.clone();
        let page = web::PageOptions::from_config(&cfg);
        let bind = cfg.server.bind_address;
        async move {
            web::run(bind, slideshow, page, cancel)
                .await
                .context("web server failed")
        }
    });

    drain(&mut tasks, &cancel).await
}

/// Wait for every task. The first task to finish (normally via cancellation)
/// stops the rest; the first failure becomes the process result.
async fn drain(tasks: &mut JoinSet<Result<()>>, cancel: &CancellationToken) -> Result<()> {
    let mut first_error: Option<anyhow::Error> = None;
    while let Some(res) = tasks.join_next().await {
        let err = match res {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(e) => Some(anyhow::Error::new(e).context("task panicked or was aborted")),
        };
        if let Some(e) = err {
            tracing::error!("task error: {e:?}");
            first_error.get_or_insert(e);
        }
        cancel.cancel();
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler failed: {err}");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to register SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
