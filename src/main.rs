//! cliprig: drives a web video editor to assemble and export short videos.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cliprig::assets::{self, MediaAsset, MediaKind};
use cliprig::config::Config;
use cliprig::export::ExportConductor;
use cliprig::logging::DailyLogger;
use cliprig::ok;
use cliprig::placement::Placer;
use cliprig::session::EditorSession;
use cliprig::surface::{Surface, WebDriverSurface};

/// Environment variable overriding the WebDriver endpoint.
const WEBDRIVER_URL_ENV: &str = "CLIPRIG_WEBDRIVER_URL";

/// Parse and validate the retry count (1-10).
fn parse_retries(s: &str) -> Result<u32, String> {
    let retries: u32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=10).contains(&retries) {
        return Err(format!("Retries must be between 1 and 10, got {}", retries));
    }
    Ok(retries)
}

/// Parse and validate drag interpolation steps (1-100).
fn parse_steps(s: &str) -> Result<u32, String> {
    let steps: u32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=100).contains(&steps) {
        return Err(format!("Steps must be between 1 and 100, got {}", steps));
    }
    Ok(steps)
}

/// cliprig: timeline placement and export automation for a web video editor
#[derive(Parser)]
#[command(name = "cliprig")]
#[command(version, about = "Timeline placement and export automation for a web video editor")]
#[command(after_help = "EXAMPLES:
    # Full run: open editor, place all media, mute, export
    cliprig run

    # Placement only, against a local chromedriver
    cliprig place --webdriver http://localhost:9515

    # Export with more attempts
    cliprig export --max-retries 5

    # Show the derived processing order without touching the browser
    cliprig order
")]
struct Cli {
    /// Path to the config file (default: ~/.config/cliprig/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for daily log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    /// Mirror DBG records to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the editor, place all media, mute original audio, and export
    Run {
        /// WebDriver endpoint (overrides config and environment)
        #[arg(long)]
        webdriver: Option<String>,

        /// Maximum full export attempts
        #[arg(long, value_parser = parse_retries)]
        max_retries: Option<u32>,

        /// Pointer interpolation steps per drag
        #[arg(long, value_parser = parse_steps)]
        drag_steps: Option<u32>,
    },
    /// Place media onto the timeline without exporting
    Place {
        #[arg(long)]
        webdriver: Option<String>,

        #[arg(long, value_parser = parse_steps)]
        drag_steps: Option<u32>,
    },
    /// Run only the export/render/download sequence
    Export {
        #[arg(long)]
        webdriver: Option<String>,

        #[arg(long, value_parser = parse_retries)]
        max_retries: Option<u32>,
    },
    /// Print the processing order derived from the media directories
    Order,
}

#[tokio::main]
async fn main() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    if let Err(e) = DailyLogger::init(cli.log_dir.clone(), cli.debug) {
        eprintln!("failed to install logger: {}", e);
        std::process::exit(1);
    }

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Ok(url) = std::env::var(WEBDRIVER_URL_ENV) {
        config.editor.webdriver_url = url;
    }

    let exit_code = match cli.command {
        Commands::Run {
            webdriver,
            max_retries,
            drag_steps,
        } => {
            apply_overrides(&mut config, webdriver, max_retries, drag_steps);
            cmd_run(&config).await
        }
        Commands::Place { webdriver, drag_steps } => {
            apply_overrides(&mut config, webdriver, None, drag_steps);
            cmd_place(&config).await
        }
        Commands::Export { webdriver, max_retries } => {
            apply_overrides(&mut config, webdriver, max_retries, None);
            cmd_export(&config).await
        }
        Commands::Order => cmd_order(&config),
    };

    std::process::exit(exit_code);
}

fn apply_overrides(
    config: &mut Config,
    webdriver: Option<String>,
    max_retries: Option<u32>,
    drag_steps: Option<u32>,
) {
    if let Some(url) = webdriver {
        config.editor.webdriver_url = url;
    }
    if let Some(retries) = max_retries {
        config.export.max_retries = retries;
    }
    if let Some(steps) = drag_steps {
        config.placement.drag_steps = steps;
    }
}

/// Discover all media in processing order: background audio first, then
/// narration, then video, each kind internally in descending prefix order.
fn gather_assets(config: &Config) -> std::io::Result<Vec<MediaAsset>> {
    let mut all = assets::order_assets(
        &config.media.background_audio_dir,
        ".mp3",
        MediaKind::BackgroundAudio,
    )?;
    all.extend(assets::order_assets(
        &config.media.narration_audio_dir,
        ".mp3",
        MediaKind::NarrationAudio,
    )?);
    all.extend(assets::order_assets(
        &config.media.video_dir,
        ".mp4",
        MediaKind::Video,
    )?);
    Ok(all)
}

async fn connect(config: &Config) -> Option<WebDriverSurface> {
    match WebDriverSurface::connect(
        &config.editor.webdriver_url,
        &config.editor.download_dir,
        std::time::Duration::from_secs(config.editor.load_timeout_secs),
    )
    .await
    {
        Ok(surface) => Some(surface),
        Err(e) => {
            log::error!(
                "could not start a session on {}: {}",
                config.editor.webdriver_url,
                e
            );
            None
        }
    }
}

async fn place_assets(surface: &dyn Surface, config: &Config) -> bool {
    let assets = match gather_assets(config) {
        Ok(assets) => assets,
        Err(e) => {
            log::error!("media discovery failed: {}", e);
            return false;
        }
    };
    if assets.is_empty() {
        log::warn!("no media found, nothing to place");
        return false;
    }

    let session = EditorSession::new(surface, config);
    session.arrange_timeline_panel().await;

    let placer = Placer::new(surface, &config.placement);
    let reports = placer.place_all(&assets).await;

    let placed = reports.iter().filter(|r| r.placed).count();
    ok!("{}/{} asset(s) placed", placed, reports.len());
    placed == reports.len()
}

async fn cmd_run(config: &Config) -> i32 {
    let Some(surface) = connect(config).await else {
        return 1;
    };

    let session = EditorSession::new(&surface, config);
    if let Err(e) = session.open().await {
        log::error!("failed to open the editor: {}", e);
        return 1;
    }

    place_assets(&surface, config).await;
    session.mute_all_tracks().await;

    let conductor = ExportConductor::new(&surface, &config.export, config.media.output_dir.clone());
    match conductor.export().await {
        Ok(path) => {
            ok!("final video saved to {}", path.display());
            0
        }
        Err(e) => {
            log::error!("{}", e);
            1
        }
    }
}

async fn cmd_place(config: &Config) -> i32 {
    let Some(surface) = connect(config).await else {
        return 1;
    };
    let session = EditorSession::new(&surface, config);
    if let Err(e) = session.open().await {
        log::error!("failed to open the editor: {}", e);
        return 1;
    }
    if place_assets(&surface, config).await {
        0
    } else {
        1
    }
}

async fn cmd_export(config: &Config) -> i32 {
    let Some(surface) = connect(config).await else {
        return 1;
    };
    let conductor = ExportConductor::new(&surface, &config.export, config.media.output_dir.clone());
    match conductor.export().await {
        Ok(path) => {
            ok!("final video saved to {}", path.display());
            0
        }
        Err(e) => {
            log::error!("{}", e);
            1
        }
    }
}

fn cmd_order(config: &Config) -> i32 {
    match gather_assets(config) {
        Ok(assets) => {
            for asset in &assets {
                println!("{:<18} {:>12}  {}", asset.kind.label(), asset.order_key, asset.id);
            }
            0
        }
        Err(e) => {
            log::error!("media discovery failed: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retries_bounds() {
        assert_eq!(parse_retries("3"), Ok(3));
        assert!(parse_retries("0").is_err());
        assert!(parse_retries("11").is_err());
        assert!(parse_retries("abc").is_err());
    }

    #[test]
    fn test_parse_steps_bounds() {
        assert_eq!(parse_steps("15"), Ok(15));
        assert!(parse_steps("0").is_err());
        assert!(parse_steps("101").is_err());
    }
}
