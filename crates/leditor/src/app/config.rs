use std::path::{Path, PathBuf};

use leditor_catalog_manager::LoaderOptions;
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "leditor.toml";

/// Content of `leditor.toml`. Relative paths are relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub tile_directories: Vec<PathBuf>,
    pub prop_directories: Vec<PathBuf>,
    /// textures of the ropes and longs, which have no descriptor file
    pub props_assets_directory: Option<PathBuf>,
    /// loader steps run between two frames
    pub steps_per_frame: usize,
    pub loader: LoaderOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tile_directories: vec![PathBuf::from("assets/tiles")],
            prop_directories: vec![PathBuf::from("assets/props")],
            props_assets_directory: Some(PathBuf::from("assets/props")),
            steps_per_frame: 20,
            loader: LoaderOptions::default(),
        }
    }
}

impl EditorConfig {
    /// Reads the config of the data directory, writing the default one first if there is none.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Self::default();
            let text = toml::to_string_pretty(&config)
                .into_diagnostic()
                .wrap_err("failed to serialize default configuration")?;
            std::fs::write(&path, text)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote default configuration");
            return Ok(config);
        }
        let text = std::fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid configuration in {}", path.display()))
    }

    /// Same config with every path anchored to `data_dir`.
    pub fn resolved(mut self, data_dir: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = data_dir.join(&*p);
            }
        };
        self.tile_directories.iter_mut().for_each(resolve);
        self.prop_directories.iter_mut().for_each(resolve);
        self.props_assets_directory.iter_mut().for_each(resolve);
        self
    }
}
