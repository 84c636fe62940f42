//! XDG Base Directory paths for weft.
//!
//! Plugin directories, the settings file and the host config all live under
//! XDG paths, on every platform.

use std::path::PathBuf;

const APP_DIR: &str = "weft";

/// Get the weft config directory.
///
/// Returns `$XDG_CONFIG_HOME/weft` if set, otherwise `~/.config/weft`.
/// User plugins, `settings.toml` and `config.toml` live here.
///
/// # Examples
///
/// ```
/// use weft_paths::config_dir;
///
/// let plugins = config_dir().join("plugins");
/// assert!(plugins.ends_with("weft/plugins"));
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the weft data directory.
///
/// Returns `$XDG_DATA_HOME/weft` if set, otherwise `~/.local/share/weft`.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default location of the user plugin directory
pub fn user_plugin_dir() -> PathBuf {
    config_dir().join("plugins")
}

/// Default location of the persisted plugin settings
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

fn xdg_dir(var: &str, home_fallback: &str) -> PathBuf {
    match std::env::var(var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => dirs::home_dir()
            .map(|home| home.join(home_fallback))
            .unwrap_or_else(|| PathBuf::from(home_fallback))
            .join(APP_DIR),
    }
}
