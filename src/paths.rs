use std::path::PathBuf;
use std::sync::OnceLock;

/// XDG-compliant directory layout for intervo.
///
/// On Linux this follows the XDG Base Directory Specification:
///   Config:  $XDG_CONFIG_HOME/intervo  (~/.config/intervo)
///   Data:    $XDG_DATA_HOME/intervo    (~/.local/share/intervo)
///
/// On macOS both resolve under ~/Library/Application Support/intervo.
///
/// The `dirs` crate handles platform detection. We cache the resolved
/// base paths in static OnceLock cells so directory lookup only happens once.

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Root data directory: $XDG_DATA_HOME/intervo
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("intervo")
    })
}

/// Root config directory: $XDG_CONFIG_HOME/intervo
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("intervo")
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Database path: <data_dir>/intervo.db
pub fn db_path() -> PathBuf {
    data_dir().join("intervo.db")
}
