//! Headless host for the backdrop engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use photo_backdrop::config::AppConfig;
use photo_backdrop::events::ControlCommand;
use photo_backdrop::scan::fill_assets;
use photo_backdrop::tasks::{control, frames, settings_watch};

#[derive(Debug, Parser)]
#[command(name = "backdrop", version, about = "Procedural photo backdrop renderer")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "backdrop.yaml")]
    config: PathBuf,

    /// Image directory used when the scene lists no assets
    #[arg(long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Render this many frames, then exit
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("photo_backdrop={level}")
            .parse()
            .context("invalid log directive")?,
    );
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));
    // A pending stdin read cannot be interrupted; do not wait for it.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = AppConfig::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if let Some(library) = &cli.library {
        cfg.library = Some(library.clone());
    }
    let mut scene = cfg.scene.clone();
    fill_assets(&mut scene, cfg.library.as_deref())?;
    tracing::info!(
        config = %cli.config.display(),
        assets = scene.assets.len(),
        transition = %scene.transition,
        hold = %humantime::format_duration(scene.hold),
        "configuration loaded"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let (settings_tx, settings_rx) = mpsc::channel(8); // Watcher -> Frames
    let (control_tx, control_rx) = mpsc::channel::<ControlCommand>(16); // Stdin -> Frames

    let mut tasks = JoinSet::new();

    tasks.spawn({
        let path = cli.config.clone();
        let library = cli.library.clone();
        let initial = scene.clone();
        let cancel = cancel.clone();
        async move {
            settings_watch::run(path, library, initial, settings_tx, cancel)
                .await
                .context("settings task failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            control::run(BufReader::new(tokio::io::stdin()), control_tx, cancel)
                .await
                .context("control task failed")
        }
    });

    tasks.spawn({
        let cancel = cancel.clone();
        let max_frames = cli.frames;
        async move {
            frames::run(cfg, scene, settings_rx, control_rx, cancel, max_frames)
                .await
                .context("frame loop failed")
        }
    });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("task error: {e:?}");
                cancel.cancel();
            }
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
