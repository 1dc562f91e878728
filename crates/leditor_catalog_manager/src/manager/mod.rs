mod kind;
mod loader;

pub use kind::{ItemKind, Props, Tiles};
pub use loader::{
    CatalogLoader, LoadPhase, LoaderOptions, PropCatalog, PropLoader, TileCatalog, TileLoader,
};
