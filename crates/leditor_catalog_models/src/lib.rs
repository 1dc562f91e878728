//! Plain data for the editor's tile and prop catalogs.
//!
//! Nothing here touches the disk or the graphics context, textures are a type parameter.

pub mod catalog;
pub mod category;
pub mod color;
pub mod definition;
pub mod pack;

pub use catalog::{Catalog, CatalogBuilder, CatalogCategory, CatalogEntry, CatalogError};
pub use category::Category;
pub use color::Color;
pub use definition::{
    builtin, unquote, FromPropertyList, ItemDefinition, PropDefinition, PropKind, PropertyList,
    TileDefinition,
};
pub use pack::{ImportedPack, Pack};
