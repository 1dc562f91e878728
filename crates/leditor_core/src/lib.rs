/*
the editor is split the same way for every asset kind
1. a models crate with plain data (definitions, catalogs)
2. a manager crate that knows how to get that data off the disk and onto the gpu
3. the binary, which owns the graphics context and drives the managers once per frame

this crate only holds what every one of them needs.
*/

pub mod task;
pub mod trace;

/// Name of the descriptor file every pack directory must contain.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "Init.txt";

/// Extension of the per item raster files.
pub const TEXTURE_EXTENSION: &str = "png";
