use std::path::{Path, PathBuf};

use egui::{ColorImage, TextureHandle};
use image::RgbaImage;
use leditor_core::TEXTURE_EXTENSION;
use tracing::trace;

use crate::TextureError;

/// Turns decoded images into whatever the renderer draws with.
///
/// Uploads have to happen on the thread that owns the graphics context, which is why the loader
/// only calls this from `proceed`.
pub trait TextureUploader {
    type Texture;
    fn upload(&mut self, name: &str, image: RgbaImage) -> Result<Self::Texture, TextureError>;
}

impl TextureUploader for egui::Context {
    type Texture = TextureHandle;

    fn upload(&mut self, name: &str, image: RgbaImage) -> Result<TextureHandle, TextureError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureError::Upload {
                name: name.to_string(),
                message: format!("image is empty ({}x{})", image.width(), image.height()),
            });
        }
        let size = [image.width() as _, image.height() as _];
        Ok(self.load_texture(
            name,
            ColorImage::from_rgba_unmultiplied(size, image.as_raw()),
            egui::TextureOptions {
                // tiles are pixel art
                magnification: egui::TextureFilter::Nearest,
                minification: egui::TextureFilter::Nearest,
                wrap_mode: egui::TextureWrapMode::ClampToEdge,
            },
        ))
    }
}

/// `<directory>/<name>.png`, or any file of the directory whose stem matches the name ignoring
/// case.
/// Packs are authored on case insensitive file systems.
pub fn resolve_texture_path(directory: &Path, name: &str) -> Result<PathBuf, TextureError> {
    let exact = directory.join(format!("{name}.{TEXTURE_EXTENSION}"));
    if exact.is_file() {
        return Ok(exact);
    }
    let missing = || TextureError::Missing {
        path: exact.clone(),
    };
    let entries = std::fs::read_dir(directory).map_err(|_| missing())?;
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.eq_ignore_ascii_case(name))
            .unwrap_or(false);
        if matches && path.is_file() {
            trace!(?path, name, "texture found ignoring case");
            return Ok(path);
        }
    }
    Err(missing())
}

pub fn load_image(path: &Path) -> Result<RgbaImage, TextureError> {
    let img = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
            TextureError::Missing {
                path: path.to_path_buf(),
            }
        }
        source => TextureError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;
    Ok(img.into_rgba8())
}
