use std::path::PathBuf;

use miette::{Context, IntoDiagnostic, Result};

/// Overrides the platform data directory when set.
pub const DATA_DIR_ENV: &str = "LEDITOR_DATA_DIR";

/// Leditor data directory.
/// We read a path from env `LEDITOR_DATA_DIR` or use data_local_dir/leditor, where data_local_dir is platform specific.
/// Configuration, logs and by default the assets all live inside it.
pub fn get_leditor_dir() -> Result<PathBuf> {
    let dir = if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        PathBuf::from(env_dir) //may still be an invalid path
    } else {
        directories_next::ProjectDirs::from("com.leditor", "", "leditor")
            .ok_or(miette::miette!(
                "getting project path failed for some reason"
            ))?
            .data_local_dir()
            .to_path_buf()
    };
    std::fs::create_dir_all(&dir)
        .into_diagnostic()
        .wrap_err(dir.display().to_string())
        .wrap_err("failed to create leditor directory")?;
    Ok(dir)
}
