use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use render_link::{
    ConnectionManager, FileConfig, LinkConfig, Profile, ProtocolSet, ViewConfig, load_config,
};
use remote_view::{RemoteViewOptions, ViewBinder};

mod surface;
mod term;

#[derive(Parser)]
#[command(name = "rscope")]
#[command(about = "Attach a local surface to a remotely rendered 3D scene")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Custom config directory (defaults to the current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the render server and bind a view (default)
    View(ViewArgs),
}

#[derive(Parser, Default)]
struct ViewArgs {
    /// Render server host
    #[arg(long)]
    host: Option<String>,

    /// Render server WebSocket port
    #[arg(long)]
    port: Option<u16>,

    /// Remote application to initialize
    #[arg(long)]
    application: Option<String>,

    /// Configuration profile
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        None => run_view(ViewArgs::default(), &config_dir).await,
        Some(Commands::View(args)) => run_view(args, &config_dir).await,
    }
}

async fn run_view(args: ViewArgs, config_dir: &Path) -> Result<()> {
    // Setup logging
    let default_directive = if args.debug {
        "rscope=debug,render_link=debug,remote_view=debug,info"
    } else {
        "rscope=info,render_link=info,remote_view=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let figment = load_config(config_dir, args.profile.as_ref());
    let mut file_config: FileConfig = figment.extract().context("Invalid configuration")?;
    if let Some(host) = args.host {
        file_config.session.host = host;
    }
    if let Some(port) = args.port {
        file_config.session.port = port;
    }
    if let Some(application) = args.application {
        file_config.session.application = application;
    }

    let link_config = LinkConfig::from_file(&file_config.session);
    let view_config = ViewConfig::from_file(&file_config.view);

    info!(
        "Connecting to {} (application {})",
        link_config.session_url(),
        link_config.application
    );

    let mut manager = ConnectionManager::new(link_config, ProtocolSet::default());
    let (mut client_rx, mut busy_rx) = manager.acquire();

    // Resize feed: terminal size now, refreshed on SIGWINCH.
    let initial_size = term::surface_size().unwrap_or((80, 24));
    let (resize_tx, resize_rx) = watch::channel(initial_size);
    #[cfg(unix)]
    spawn_resize_listener(resize_tx.clone());

    let options = RemoteViewOptions {
        interactive_ratio: view_config.interactive_ratio,
        ..Default::default()
    };
    let stats = surface::StatsSurface::new(resize_rx.clone());
    let mut binder = ViewBinder::mount(Box::new(stats), options, resize_rx);

    info!("LOADING");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = client_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let link = client_rx.borrow_and_update().clone();
                if let Some(link) = link {
                    match binder.bind(&link).await {
                        Ok(()) => {
                            info!("view bound to session {}", link.connection().session().id());
                        }
                        Err(e) => error!("bind failed: {}", e),
                    }
                }
            }
            changed = busy_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if *busy_rx.borrow_and_update() {
                    info!("LOADING");
                }
            }
        }
    }

    info!("Shutting down");
    binder.unmount().await;
    manager.shutdown().await;
    drop(resize_tx);
    Ok(())
}

/// Refresh the resize feed whenever the terminal reports a size change.
#[cfg(unix)]
fn spawn_resize_listener(resize_tx: watch::Sender<(u32, u32)>) {
    tokio::spawn(async move {
        let mut sigwinch = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::window_change(),
        ) {
            Ok(signal) => signal,
            Err(e) => {
                error!("SIGWINCH handler unavailable: {}", e);
                return;
            }
        };
        while sigwinch.recv().await.is_some() {
            if let Ok(size) = term::surface_size() {
                let _ = resize_tx.send(size);
            }
        }
    });
}
