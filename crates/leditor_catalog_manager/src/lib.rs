//! Incremental loading of tile and prop packs into catalogs.
//!
//! A pack is a directory holding a descriptor file and one png per item. The [CatalogLoader]
//! imports the descriptors on the rayon pool, then uploads the textures and fills the catalog
//! one item per call so that the editor stays responsive while starting.

mod error;
pub mod io;
mod manager;

pub use error::{ImportError, LoaderError, TextureError};
pub use io::TextureUploader;
pub use manager::{
    CatalogLoader, ItemKind, LoadPhase, LoaderOptions, PropCatalog, PropLoader, Props, TileCatalog,
    TileLoader, Tiles,
};
