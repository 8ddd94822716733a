use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::pdf::{DEFAULT_CACHE_SIZE, DEFAULT_DENSITY, Zoom};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagenote";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Document opened when no file is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_document: Option<PathBuf>,

    #[serde(default = "default_scale")]
    pub initial_scale: f32,

    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Terminal pixels per PDF point at scale 1.0
    #[serde(default = "default_density")]
    pub render_density: f32,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_true")]
    pub show_notes_panel: bool,

    /// Where exported notes are written; the working directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_scale() -> f32 {
    Zoom::DEFAULT_SCALE
}

fn default_zoom_step() -> f32 {
    Zoom::DEFAULT_STEP
}

fn default_density() -> f32 {
    DEFAULT_DENSITY
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            default_document: None,
            initial_scale: default_scale(),
            zoom_step: default_zoom_step(),
            render_density: default_density(),
            cache_size: default_cache_size(),
            show_notes_panel: true,
            export_dir: None,
        }
    }
}

impl Settings {
    /// Zoom configured from these settings, with bad values replaced by defaults
    pub fn zoom(&self) -> Zoom {
        let mut zoom = Zoom::with_step(self.zoom_step);
        zoom.set(self.initial_scale);
        zoom
    }

    pub fn density(&self) -> f32 {
        if self.render_density.is_finite() && self.render_density > 0.0 {
            self.render_density
        } else {
            warn!(
                "Ignoring invalid render_density {}, using {DEFAULT_DENSITY}",
                self.render_density
            );
            DEFAULT_DENSITY
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

/// File the settings were loaded from; saving is a no-op until one is known
static SETTINGS_PATH: LazyLock<RwLock<Option<PathBuf>>> = LazyLock::new(|| RwLock::new(None));

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path`, or from the user config directory
pub fn load_settings(path: Option<&Path>) {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = get_settings();
        save_settings_to_file(&settings, &path);
    }
    set_settings_path(path);
}

fn set_settings_path(path: PathBuf) {
    let mut current = SETTINGS_PATH
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *current = Some(path);
}

fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                replace_settings(settings);
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings() {
    let path = SETTINGS_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let Some(path) = path else {
        debug!("No settings file in use, not saving");
        return;
    };

    let settings = get_settings();
    save_settings_to_file(&settings, &path);
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let body = match serde_yaml::to_string(settings) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, format!("{SETTINGS_HEADER}{body}")) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pagenote settings
# ============================================================================
# default_document: path opened when no file is given (built-in sample if unset)
# initial_scale:    zoom scale for new documents, 0.5 to 5.0
# zoom_step:        amount added or removed by one zoom key press
# render_density:   terminal pixels per PDF point at scale 1.0
# cache_size:       rendered pages kept for instant revisits
# export_dir:       where `x` writes exported notes

"#;

// Public API for accessing/modifying settings

pub fn get_settings() -> Settings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn replace_settings(settings: Settings) {
    let mut global = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
    *global = settings;
}

pub fn get_default_document() -> Option<PathBuf> {
    SETTINGS
        .read()
        .map(|s| s.default_document.clone())
        .unwrap_or_default()
}

pub fn get_export_dir() -> Option<PathBuf> {
    SETTINGS
        .read()
        .map(|s| s.export_dir.clone())
        .unwrap_or_default()
}

pub fn is_notes_panel_shown() -> bool {
    SETTINGS.read().map(|s| s.show_notes_panel).unwrap_or(true)
}

pub fn set_notes_panel_shown(shown: bool) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.show_notes_panel = shown;
    }
    save_settings();
}
