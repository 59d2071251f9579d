//! Configuration loading and typed config structures for Wavegrid.
//!
//! The canonical configuration lives in `wavegrid-config.yaml` next to the
//! binaries. Every section and field has a default, so an empty file (or
//! no file at all) yields a working setup. Endpoint settings can be
//! overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `WAVEGRID_GATEWAY_URL` | `endpoints.gateway_url` |
//! | `WAVEGRID_ML_URL` | `endpoints.ml_service_url` |
//! | `WAVEGRID_PORT` | `endpoints.gateway_port` |
//! | `WAVEGRID_MODE` | `screen.mode` |

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;
use wavegrid_types::SessionKind;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `wavegrid-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WavegridConfig {
    /// Grid game rules and tempos.
    #[serde(default)]
    pub game: GameConfig,

    /// Drawing surface geometry and palette.
    #[serde(default)]
    pub drawing: DrawingConfig,

    /// Frame capture cadence and encoding quality.
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Classification-to-command mapping knobs.
    #[serde(default)]
    pub control: ControlConfig,

    /// Gateway and classifier service endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Which screen the host binary runs.
    #[serde(default)]
    pub screen: ScreenConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WavegridConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides and validation apply either way.
    ///
    /// # Errors
    ///
    /// As [`WavegridConfig::from_file`]. A missing file is not an error,
    /// but an override that leaves the defaults invalid is.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        Self::load_or_default_with(path, |key| std::env::var(key).ok())
    }

    fn load_or_default_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_yaml(&contents)?
        } else {
            Self::default()
        };
        config.finish(lookup)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_yaml(yaml)?.finish(|key| std::env::var(key).ok())
    }

    fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    fn finish(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        self.apply_overrides_from(lookup);
        self.validate()?;
        Ok(self)
    }

    /// Apply `WAVEGRID_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.endpoints.apply_overrides_from(&lookup);
        if let Some(val) = lookup("WAVEGRID_MODE") {
            match SessionKind::from_name(&val) {
                Some(mode) => self.screen.mode = mode,
                None => warn!(value = %val, "ignoring unknown WAVEGRID_MODE"),
            }
        }
    }

    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let game = &self.game;
        if game.grid_width <= 0 || game.grid_height <= 0 {
            return Err(invalid("game.grid_width", "grid must be at least 1x1"));
        }
        if game.start_x < 0
            || game.start_y < 0
            || game.start_x >= game.grid_width
            || game.start_y >= game.grid_height
        {
            return Err(invalid("game.start_x", "start cell must lie inside the grid"));
        }
        for (field, value) in [
            ("game.default_tempo_ms", game.default_tempo_ms),
            ("game.fast_tempo_ms", game.fast_tempo_ms),
            ("game.slow_tempo_ms", game.slow_tempo_ms),
            ("game.min_tempo_ms", game.min_tempo_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "tempo must be positive"));
            }
        }
        if self.drawing.palette.is_empty() {
            return Err(invalid("drawing.palette", "palette needs at least one colour"));
        }
        for (field, profile) in [
            ("capture.detect", self.capture.detect),
            ("capture.game", self.capture.game),
            ("capture.draw", self.capture.draw),
        ] {
            if profile.interval_ms == 0 {
                return Err(invalid(field, "interval must be positive"));
            }
            if !(1..=100).contains(&profile.quality) {
                return Err(invalid(field, "quality must be in 1..=100"));
            }
        }
        if !(0.0..=1.0).contains(&self.control.min_confidence) {
            return Err(invalid("control.min_confidence", "must be in [0, 1]"));
        }
        let endpoints = &self.endpoints;
        if !(endpoints.gateway_url.starts_with("ws://")
            || endpoints.gateway_url.starts_with("wss://"))
        {
            return Err(invalid("endpoints.gateway_url", "must be a ws:// or wss:// URL"));
        }
        if !(endpoints.ml_service_url.starts_with("http://")
            || endpoints.ml_service_url.starts_with("https://"))
        {
            return Err(invalid("endpoints.ml_service_url", "must be an http:// or https:// URL"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

/// Grid game rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Grid width in cells.
    #[serde(default = "default_grid_size")]
    pub grid_width: i32,

    /// Grid height in cells.
    #[serde(default = "default_grid_size")]
    pub grid_height: i32,

    /// Column of the single starting segment.
    #[serde(default = "default_start")]
    pub start_x: i32,

    /// Row of the single starting segment.
    #[serde(default = "default_start")]
    pub start_y: i32,

    /// Tempo after `start()` and when the mouth closes.
    #[serde(default = "default_tempo_ms")]
    pub default_tempo_ms: u64,

    /// Tempo selected by `open_hand` or an open mouth.
    #[serde(default = "default_fast_tempo_ms")]
    pub fast_tempo_ms: u64,

    /// Tempo selected by `fist`.
    #[serde(default = "default_slow_tempo_ms")]
    pub slow_tempo_ms: u64,

    /// Floor for the progressive speed-up on eating.
    #[serde(default = "default_min_tempo_ms")]
    pub min_tempo_ms: u64,

    /// How much faster each food makes the gesture-steered game.
    #[serde(default = "default_speedup_step_ms")]
    pub speedup_step_ms: u64,

    /// Score per food eaten.
    #[serde(default = "default_points_per_food")]
    pub points_per_food: u32,

    /// Food placement seed. `0` draws from OS entropy.
    #[serde(default)]
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: default_grid_size(),
            grid_height: default_grid_size(),
            start_x: default_start(),
            start_y: default_start(),
            default_tempo_ms: default_tempo_ms(),
            fast_tempo_ms: default_fast_tempo_ms(),
            slow_tempo_ms: default_slow_tempo_ms(),
            min_tempo_ms: default_min_tempo_ms(),
            speedup_step_ms: default_speedup_step_ms(),
            points_per_food: default_points_per_food(),
            seed: 0,
        }
    }
}

/// Drawing surface settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DrawingConfig {
    /// Canvas width in pixels.
    #[serde(default = "default_canvas_width")]
    pub canvas_width: f32,

    /// Canvas height in pixels.
    #[serde(default = "default_canvas_height")]
    pub canvas_height: f32,

    /// Ink colours, cycled by `ChangeColor`.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// Ink line width.
    #[serde(default = "default_ink_width")]
    pub ink_width: f32,

    /// Eraser line width.
    #[serde(default = "default_eraser_width")]
    pub eraser_width: f32,

    /// Where saved drawings are written.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_width(),
            canvas_height: default_canvas_height(),
            palette: default_palette(),
            ink_width: default_ink_width(),
            eraser_width: default_eraser_width(),
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

/// Sampling period and JPEG quality for one kind of screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CaptureProfile {
    /// Milliseconds between frames.
    pub interval_ms: u64,
    /// JPEG quality, `1..=100`.
    pub quality: u8,
}

/// Frame capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptureConfig {
    /// Directory of JPEG files replayed as the capture device.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Profile for the live detection readout.
    #[serde(default = "default_detect_profile")]
    pub detect: CaptureProfile,

    /// Profile for both grid game screens.
    #[serde(default = "default_game_profile")]
    pub game: CaptureProfile,

    /// Profile for the drawing surface.
    #[serde(default = "default_draw_profile")]
    pub draw: CaptureProfile,
}

impl CaptureConfig {
    /// The profile used by a screen of the given kind.
    pub const fn profile(&self, kind: SessionKind) -> CaptureProfile {
        match kind {
            SessionKind::Detect => self.detect,
            SessionKind::Snake | SessionKind::Face => self.game,
            SessionKind::Draw => self.draw,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            detect: default_detect_profile(),
            game: default_game_profile(),
            draw: default_draw_profile(),
        }
    }
}

/// Classification-to-command mapping settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControlConfig {
    /// Events below this confidence map to no command. `0.0` disables
    /// the gate.
    #[serde(default)]
    pub min_confidence: f32,
}

/// Gateway and classifier service endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the gateway's duplex channel, e.g. `ws://localhost:8000`.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Base URL of the classifier service.
    #[serde(default = "default_ml_service_url")]
    pub ml_service_url: String,

    /// Port the gateway listens on.
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    /// Timeout for one classifier request.
    #[serde(default = "default_ml_timeout_ms")]
    pub ml_timeout_ms: u64,
}

impl EndpointsConfig {
    fn apply_overrides_from(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("WAVEGRID_GATEWAY_URL") {
            self.gateway_url = val;
        }
        if let Some(val) = lookup("WAVEGRID_ML_URL") {
            self.ml_service_url = val;
        }
        if let Some(val) = lookup("WAVEGRID_PORT") {
            match val.parse() {
                Ok(port) => self.gateway_port = port,
                Err(_) => warn!(value = %val, "ignoring unparseable WAVEGRID_PORT"),
            }
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            ml_service_url: default_ml_service_url(),
            gateway_port: default_gateway_port(),
            ml_timeout_ms: default_ml_timeout_ms(),
        }
    }
}

/// Host binary settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScreenConfig {
    /// Which screen to run.
    #[serde(default = "default_mode")]
    pub mode: SessionKind,

    /// Start streaming immediately instead of waiting for `start` on stdin.
    #[serde(default)]
    pub autostart: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            autostart: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_grid_size() -> i32 {
    20
}

const fn default_start() -> i32 {
    10
}

const fn default_tempo_ms() -> u64 {
    150
}

const fn default_fast_tempo_ms() -> u64 {
    80
}

const fn default_slow_tempo_ms() -> u64 {
    200
}

const fn default_min_tempo_ms() -> u64 {
    60
}

const fn default_speedup_step_ms() -> u64 {
    2
}

const fn default_points_per_food() -> u32 {
    10
}

const fn default_canvas_width() -> f32 {
    800.0
}

const fn default_canvas_height() -> f32 {
    600.0
}

fn default_palette() -> Vec<String> {
    ["#a855f7", "#ef4444", "#3b82f6", "#10b981", "#f59e0b", "#ec4899"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

const fn default_ink_width() -> f32 {
    5.0
}

const fn default_eraser_width() -> f32 {
    30.0
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("drawings")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("frames")
}

const fn default_detect_profile() -> CaptureProfile {
    CaptureProfile {
        interval_ms: 200,
        quality: 70,
    }
}

const fn default_game_profile() -> CaptureProfile {
    CaptureProfile {
        interval_ms: 200,
        quality: 60,
    }
}

const fn default_draw_profile() -> CaptureProfile {
    CaptureProfile {
        interval_ms: 100,
        quality: 60,
    }
}

fn default_gateway_url() -> String {
    "ws://localhost:8000".to_owned()
}

fn default_ml_service_url() -> String {
    "http://localhost:8001".to_owned()
}

const fn default_gateway_port() -> u16 {
    8000
}

const fn default_ml_timeout_ms() -> u64 {
    5000
}

const fn default_mode() -> SessionKind {
    SessionKind::Detect
}

fn default_log_level() -> String {
    "info".to_owned()
}
