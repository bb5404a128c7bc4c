//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\pose-coach\
//!   macOS:   ~/Library/Application Support/pose-coach/
//!   Linux:   ~/.config/pose-coach/
//!
//! Data dir (cached reference animations):
//!   Windows: %LOCALAPPDATA%\pose-coach\animations\
//!   macOS:   ~/Library/Application Support/pose-coach/animations/
//!   Linux:   ~/.local/share/pose-coach/animations/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory of `<exercise_id>.json` animation files used offline.
    pub animations_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "pose-coach";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let animations_dir = data_dir.join("animations");

        Self {
            config_dir,
            settings_file,
            animations_dir,
        }
    }

    /// Offline animation file for `exercise_id`.
    pub fn animation_file(&self, exercise_id: &str) -> PathBuf {
        self.animations_dir.join(format!("{exercise_id}.json"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.animations_dir.ends_with("animations"));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
    }

    #[test]
    fn animation_file_named_after_exercise() {
        let paths = AppPaths::new();
        let file = paths.animation_file("shoulder-raise");
        assert!(file.starts_with(&paths.animations_dir));
        assert!(file.file_name().is_some_and(|n| n == "shoulder-raise.json"));
    }
}
