//! Application Settings
//!
//! Persistent settings stored as JSON in ~/.config/ufdsp/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};
use tracing::debug;

use crate::constants::{dsp, limits, paths};
use crate::error::{Result, UfError};

// ============================================================================
// Cached Settings
// ============================================================================

static SETTINGS_CACHE: OnceLock<RwLock<Option<AppSettings>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<Option<AppSettings>> {
    SETTINGS_CACHE.get_or_init(|| RwLock::new(None))
}

/// Get cached settings, loading from disk on first use
pub fn get_cached_settings() -> AppSettings {
    if let Ok(guard) = get_cache().read() {
        if let Some(ref settings) = *guard {
            return settings.clone();
        }
    }

    let settings = load_settings().unwrap_or_default();
    if let Ok(mut guard) = get_cache().write() {
        *guard = Some(settings.clone());
    }
    settings
}

/// Drop the cached copy; the next access rereads the file
pub fn invalidate_settings_cache() {
    if let Ok(mut guard) = get_cache().write() {
        *guard = None;
    }
}

fn update_cache(settings: &AppSettings) {
    if let Ok(mut guard) = get_cache().write() {
        *guard = Some(settings.clone());
    }
}

// ============================================================================
// Settings Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub dsp: DspSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where packages come from and what the loader accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DspSettings {
    /// Directories scanned in order
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// File extensions treated as packages (case-insensitive)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Larger files are rejected without being read
    #[serde(default = "default_max_package_bytes")]
    pub max_package_bytes: u64,
}

impl Default for DspSettings {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            extensions: default_extensions(),
            max_package_bytes: default_max_package_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive used when RUST_LOG is unset ("info", "ufdsp=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(paths::SYSTEM_DSP_DIR)]
}

fn default_extensions() -> Vec<String> {
    dsp::PACKAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_max_package_bytes() -> u64 {
    limits::MAX_PACKAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// Load / Save
// ============================================================================

/// Path of the settings file, creating its directory when missing
pub fn get_settings_path() -> Result<PathBuf> {
    let dir = paths::user_config_dir().ok_or_else(|| UfError::config("Could not determine config directory"))?;

    if !dir.exists() {
        fs::create_dir_all(&dir)
            .map_err(|e| UfError::config(format!("Failed to create config directory: {}", e)))?;
    }

    Ok(dir.join(paths::SETTINGS_FILE))
}

/// Load settings from the default location
pub fn load_settings() -> Result<AppSettings> {
    load_settings_from(&get_settings_path()?)
}

/// Load settings from `path`; a missing file yields defaults
pub fn load_settings_from(path: &Path) -> Result<AppSettings> {
    if !path.exists() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return Ok(AppSettings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| UfError::config(format!("Failed to read settings file: {}", e)))?;

    let settings: AppSettings = serde_json::from_str(&content)
        .map_err(|e| UfError::config(format!("Failed to parse settings JSON: {}", e)))?;

    if settings.dsp.max_package_bytes == 0 {
        return Err(UfError::config("dsp.max_package_bytes must be greater than zero"));
    }
    Ok(settings)
}

/// Save settings to the default location and refresh the cache
pub fn save_settings(settings: &AppSettings) -> Result<()> {
    save_settings_to(&get_settings_path()?, settings)?;
    update_cache(settings);
    Ok(())
}

/// Atomic write: temp file, sync, rename
pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    use std::io::Write;

    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| UfError::config(format!("Failed to serialize settings: {}", e)))?;

    let temp_path = path.with_extension("json.tmp");

    let mut file = fs::File::create(&temp_path)
        .map_err(|e| UfError::config(format!("Failed to create temp file: {}", e)))?;
    file.write_all(json.as_bytes())
        .map_err(|e| UfError::config(format!("Failed to write to temp file: {}", e)))?;
    file.sync_all()
        .map_err(|e| UfError::config(format!("Failed to sync temp file: {}", e)))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| UfError::config(format!("Failed to rename temp file: {}", e)))?;
    Ok(())
}

/// Load, modify and save in one step
pub fn update_setting<F>(updater: F) -> Result<AppSettings>
where
    F: FnOnce(&mut AppSettings),
{
    let mut settings = load_settings()?;
    updater(&mut settings);
    save_settings(&settings)?;
    Ok(settings)
}
