//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Sections missing from a file fall back to their defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::pose::EngineOptions;

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Connection settings for the remote analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Base URL all endpoints are resolved against
    /// (e.g. `http://localhost:8000/api`).
    pub base_url: String,
    /// Bearer token attached to every request; `None` or empty sends none.
    pub api_token: Option<String>,
    /// Maximum seconds to wait for any single request.
    pub timeout_secs: u64,
    /// Exercise the session is for.  The first CLI argument overrides it.
    pub exercise_id: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            api_token: None,
            timeout_secs: 10,
            exercise_id: "1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Camera, inference and feedback-throttling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index (only used with the `camera` feature).
    pub camera_index: u32,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Minimum milliseconds between two analysis requests.
    pub emit_interval_ms: u64,
    /// Joints at or below this visibility are not drawn.
    pub visibility_threshold: f32,
    /// Options the pose engine is configured with once at startup.
    pub engine: EngineOptions,
    /// Recorded landmark sequence (animation JSON) replayed instead of a
    /// live model.  `None` replays the exercise's reference animation.
    pub replay_file: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            width: 640,
            height: 480,
            emit_interval_ms: 2000,
            visibility_threshold: 0.5,
            engine: EngineOptions::default(),
            replay_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AnimationConfig
// ---------------------------------------------------------------------------

/// Reference animation playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Keyframes per second.
    pub fps: u32,
    /// Local animation JSON used when the service provides none.
    pub animation_file: Option<PathBuf>,
}

impl AnimationConfig {
    /// Time between two keyframes; `fps == 0` is treated as 1.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            animation_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Toggles pause/resume (e.g. `"F8"`).
    pub pause_key: String,
    /// Opens the finish-session dialog (e.g. `"F10"`).
    pub finish_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            pause_key: "F8".into(),
            finish_key: "F10".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial inner window size `(width, height)`.
    pub window_size: (f32, f32),
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
    /// List per-joint angle deviations under the feedback text.
    pub show_angle_errors: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (1100.0, 640.0),
            always_on_top: false,
            show_angle_errors: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use pose_coach::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Analysis service connection.
    pub analysis: AnalysisConfig,
    /// Camera / inference / throttling.
    pub capture: CaptureConfig,
    /// Reference animation playback.
    pub animation: AnimationConfig,
    /// Global hotkey bindings.
    pub hotkey: HotkeyConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply command-line overrides: the first positional argument, when
    /// present and non-empty, selects the exercise.
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(id) = args.into_iter().next().filter(|s| !s.trim().is_empty()) {
            self.analysis.exercise_id = id.trim().to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
