use std::path::{Path, PathBuf};

use image::RgbaImage;
use leditor_catalog_models::{Category, ItemDefinition, PropDefinition, TileDefinition};

use crate::{ImportError, TextureError};

/// Everything the loader needs to know about one family of items.
///
/// The loader itself never looks inside a definition beyond its name.
pub trait ItemKind: 'static {
    type Definition: ItemDefinition + Send + 'static;

    /// Used in log messages.
    const LABEL: &'static str;

    /// Runs on the rayon pool, once per pack directory.
    fn import(descriptor: &Path) -> Result<Vec<Category<Self::Definition>>, ImportError>;

    fn texture_path(
        directory: &Path,
        definition: &Self::Definition,
    ) -> Result<PathBuf, TextureError> {
        crate::io::resolve_texture_path(directory, definition.name())
    }

    /// Last chance to reshape the decoded image before it is uploaded.
    fn prepare_image(_definition: &Self::Definition, image: RgbaImage) -> RgbaImage {
        image
    }
}

pub struct Tiles;

impl ItemKind for Tiles {
    type Definition = TileDefinition;
    const LABEL: &'static str = "tiles";

    fn import(descriptor: &Path) -> Result<Vec<Category<TileDefinition>>, ImportError> {
        crate::io::parse_descriptor(descriptor)
    }

    /// Apart from box tiles, tile images start with a one pixel header row which is not part of
    /// the preview.
    fn prepare_image(definition: &TileDefinition, image: RgbaImage) -> RgbaImage {
        if definition.is_box() || image.height() <= 1 {
            return image;
        }
        image::imageops::crop_imm(&image, 0, 1, image.width(), image.height() - 1).to_image()
    }
}

pub struct Props;

impl ItemKind for Props {
    type Definition = PropDefinition;
    const LABEL: &'static str = "props";

    fn import(descriptor: &Path) -> Result<Vec<Category<PropDefinition>>, ImportError> {
        crate::io::parse_descriptor(descriptor)
    }
}
