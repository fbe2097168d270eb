//! Marks AI-generated images with a small icon in one corner.
//!
//! Usage:
//!   ai_image_icon mark <IMAGE> <ICON|all> [-o OUTPUT]   Mark a single image file
//!   ai_image_icon serve --icon <PATH>                   Serve marking over HTTP

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use application::marker_service::{resolve_icon_path, MarkerService, ALL_ICONS};
use application::settings::{resolve_overlay_config, OverlayOverrides};
use domain::corner::Corner;
use domain::overlay_config::OverlayConfig;
use infrastructure::axum_handler::{router, AppState, DEFAULT_MAX_UPLOAD_BYTES};
use infrastructure::external_image_fetcher::DefaultExternalImageFetcher;
use infrastructure::icon_compositor::DefaultIconCompositor;
use infrastructure::logging::init_logging;

#[derive(Parser)]
#[command(
    name = "ai_image_icon",
    about = "Add an AI-generated marker icon to images",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an icon to an image file
    Mark {
        /// Path to the base image
        image: PathBuf,

        /// Icon file, a name inside --icon-dir (e.g. white_on_black.png), or "all"
        icon: String,

        /// Output path (ignored with "all")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory holding the PNG icons
        #[arg(long, default_value = "icon/png")]
        icon_dir: PathBuf,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Serve the marker over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:3300")]
        addr: SocketAddr,

        /// Icon applied to every request
        #[arg(long)]
        icon: PathBuf,

        /// Largest accepted request body in bytes
        #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: usize,

        #[command(flatten)]
        overlay: OverlayArgs,
    },
}

#[derive(Args)]
struct OverlayArgs {
    /// Icon height as a divisor of the image height [default: 40]
    #[arg(long)]
    icon_height_ratio: Option<f64>,

    /// Edge padding as a divisor of the image height [default: 100]
    #[arg(long)]
    padding_ratio: Option<f64>,

    /// top-left, top-right, bottom-left or bottom-right [default: bottom-right]
    #[arg(long)]
    corner: Option<Corner>,

    /// JSON file with overlay settings; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

impl OverlayArgs {
    fn resolve(&self) -> anyhow::Result<OverlayConfig> {
        let overrides = OverlayOverrides {
            icon_height_ratio: self.icon_height_ratio,
            padding_ratio: self.padding_ratio,
            corner: self.corner,
        };
        resolve_overlay_config(self.config.as_deref(), &overrides).context("Invalid overlay settings")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Mark {
            image,
            icon,
            output,
            icon_dir,
            overlay,
        } => mark(&image, &icon, output.as_deref(), &icon_dir, &overlay.resolve()?),
        Commands::Serve {
            addr,
            icon,
            max_upload_bytes,
            overlay,
        } => {
            let config = overlay.resolve()?;
            tokio::runtime::Runtime::new()
                .context("Failed to start the async runtime")?
                .block_on(serve(addr, &icon, config, max_upload_bytes))
        }
    }
}

fn mark(
    image: &Path,
    icon: &str,
    output: Option<&Path>,
    icon_dir: &Path,
    config: &OverlayConfig,
) -> anyhow::Result<()> {
    let service = MarkerService::new(Arc::new(DefaultIconCompositor::new()));

    if icon.eq_ignore_ascii_case(ALL_ICONS) {
        if output.is_some() {
            warn!("--output is ignored when marking with all icons");
        }
        let written = service
            .mark_with_all_icons(image, icon_dir, config)
            .with_context(|| format!("Failed to mark {}", image.display()))?;
        for path in written {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let icon_path = resolve_icon_path(icon, icon_dir);
    let written = service
        .mark_file(image, &icon_path, output, config)
        .with_context(|| format!("Failed to mark {}", image.display()))?;
    println!("{}", written.display());
    Ok(())
}

async fn serve(
    addr: SocketAddr,
    icon_path: &Path,
    config: OverlayConfig,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let marker_service = Arc::new(MarkerService::new(Arc::new(DefaultIconCompositor::new())));
    let icon = marker_service
        .load_icon(icon_path)
        .with_context(|| format!("Failed to load icon {}", icon_path.display()))?;

    let state = Arc::new(AppState {
        marker_service,
        fetcher: Arc::new(DefaultExternalImageFetcher::new()),
        icon: Arc::new(icon),
        config,
        max_upload_bytes,
    });

    info!("Listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .await
        .context("HTTP server failed")
}
