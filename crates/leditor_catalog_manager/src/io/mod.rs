mod descriptor;
mod texture;

pub use descriptor::{parse_descriptor, parse_descriptor_str};
pub use texture::{load_image, resolve_texture_path, TextureUploader};
