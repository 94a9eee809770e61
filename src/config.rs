//! Configuration file handling for cliprig.
//!
//! Loads configuration from `~/.config/cliprig/config.toml` or a custom path.
//! Every timing, coordinate, and directory the orchestrator uses lives here
//! so tests can shrink waits to milliseconds and point at throwaway dirs.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file structure for cliprig.
/// Loaded from ~/.config/cliprig/config.toml (or custom path via --config).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Remote editor surface settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    /// URL of the editor project page.
    #[serde(default = "default_editor_url")]
    pub url: String,
    /// WebDriver endpoint driving the browser.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Directory the browser is configured to drop native downloads into.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Viewport size the session is expected to run at. Drop coordinates
    /// below assume this exact size.
    #[serde(default = "default_viewport")]
    pub viewport: (u32, u32),
    /// Seconds to let the editor settle after the page load event.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// Timeout in seconds for the initial page load.
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
}

/// Local media directories and the output destination.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_background_dir")]
    pub background_audio_dir: PathBuf,
    #[serde(default = "default_narration_dir")]
    pub narration_audio_dir: PathBuf,
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// A fixed point on the surface, in CSS pixels.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Timing and geometry for timeline placement.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementConfig {
    /// Drop target for narration audio drags.
    #[serde(default = "default_narration_drop")]
    pub narration_drop: Point,
    /// Drop target for video drags.
    #[serde(default = "default_video_drop")]
    pub video_drop: Point,
    /// Pointer interpolation steps per drag gesture.
    #[serde(default = "default_drag_steps")]
    pub drag_steps: u32,
    /// Poll interval in milliseconds while waiting on an added indicator.
    #[serde(default = "default_badge_poll_ms")]
    pub badge_poll_ms: u64,
    /// Total budget in milliseconds for the predecessor indicator wait.
    #[serde(default = "default_dependency_wait_ms")]
    pub dependency_wait_ms: u64,
    /// Budget in milliseconds for the post-placement indicator wait.
    #[serde(default = "default_confirm_wait_ms")]
    pub confirm_wait_ms: u64,
    /// Timeout in milliseconds when waiting for the card panel to exist.
    #[serde(default = "default_panel_wait_ms")]
    pub panel_wait_ms: u64,
    /// Start of the one-off drag that repositions the timeline panel.
    #[serde(default = "default_panel_drag_from")]
    pub panel_drag_from: Point,
    /// End of the one-off drag that repositions the timeline panel.
    #[serde(default = "default_panel_drag_to")]
    pub panel_drag_to: Point,
}

/// Timing and retry policy for the export sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Maximum full export attempts before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay in milliseconds between export attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Timeout in milliseconds for each export control to appear.
    #[serde(default = "default_selector_wait_ms")]
    pub selector_wait_ms: u64,
    /// Render progress poll interval in milliseconds.
    #[serde(default = "default_render_poll_ms")]
    pub render_poll_ms: u64,
    /// Total render budget in milliseconds.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,
    /// Budget in milliseconds for the native download to materialize.
    #[serde(default = "default_download_wait_ms")]
    pub download_wait_ms: u64,
    /// Pause in milliseconds between export dialog steps.
    #[serde(default = "default_step_pause_ms")]
    pub step_pause_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            url: default_editor_url(),
            webdriver_url: default_webdriver_url(),
            download_dir: default_download_dir(),
            viewport: default_viewport(),
            settle_secs: default_settle_secs(),
            load_timeout_secs: default_load_timeout_secs(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            background_audio_dir: default_background_dir(),
            narration_audio_dir: default_narration_dir(),
            video_dir: default_video_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            narration_drop: default_narration_drop(),
            video_drop: default_video_drop(),
            drag_steps: default_drag_steps(),
            badge_poll_ms: default_badge_poll_ms(),
            dependency_wait_ms: default_dependency_wait_ms(),
            confirm_wait_ms: default_confirm_wait_ms(),
            panel_wait_ms: default_panel_wait_ms(),
            panel_drag_from: default_panel_drag_from(),
            panel_drag_to: default_panel_drag_to(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            selector_wait_ms: default_selector_wait_ms(),
            render_poll_ms: default_render_poll_ms(),
            render_timeout_ms: default_render_timeout_ms(),
            download_wait_ms: default_download_wait_ms(),
            step_pause_ms: default_step_pause_ms(),
        }
    }
}

impl PlacementConfig {
    pub fn badge_poll(&self) -> Duration {
        Duration::from_millis(self.badge_poll_ms)
    }

    pub fn dependency_wait(&self) -> Duration {
        Duration::from_millis(self.dependency_wait_ms)
    }

    pub fn confirm_wait(&self) -> Duration {
        Duration::from_millis(self.confirm_wait_ms)
    }

    pub fn panel_wait(&self) -> Duration {
        Duration::from_millis(self.panel_wait_ms)
    }
}

impl ExportConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn selector_wait(&self) -> Duration {
        Duration::from_millis(self.selector_wait_ms)
    }

    pub fn render_poll(&self) -> Duration {
        Duration::from_millis(self.render_poll_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn download_wait(&self) -> Duration {
        Duration::from_millis(self.download_wait_ms)
    }

    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }
}

fn default_editor_url() -> String {
    "https://www.capcut.com/editor?start_tab=video&enter_from=create_project&tab=all".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("cliprig-downloads")
}

fn default_viewport() -> (u32, u32) {
    (1280, 720)
}

fn default_settle_secs() -> u64 {
    10
}

fn default_load_timeout_secs() -> u64 {
    120
}

fn default_background_dir() -> PathBuf {
    PathBuf::from("media_audios_fundo")
}

fn default_narration_dir() -> PathBuf {
    PathBuf::from("media_audios_narracao")
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("media_videos_downloads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("video_final_youtube")
}

fn default_narration_drop() -> Point {
    Point { x: 466.0, y: 587.0 }
}

fn default_video_drop() -> Point {
    Point { x: 468.0, y: 539.0 }
}

fn default_drag_steps() -> u32 {
    15
}

fn default_badge_poll_ms() -> u64 {
    500
}

fn default_dependency_wait_ms() -> u64 {
    30_000
}

fn default_confirm_wait_ms() -> u64 {
    15_000
}

fn default_panel_wait_ms() -> u64 {
    30_000
}

fn default_panel_drag_from() -> Point {
    Point { x: 843.0, y: 492.0 }
}

fn default_panel_drag_to() -> Point {
    Point { x: 804.0, y: 247.0 }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    3_000
}

fn default_selector_wait_ms() -> u64 {
    15_000
}

fn default_render_poll_ms() -> u64 {
    2_000
}

fn default_render_timeout_ms() -> u64 {
    900_000
}

fn default_download_wait_ms() -> u64 {
    60_000
}

fn default_step_pause_ms() -> u64 {
    1_000
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("cliprig/config.toml")
}
