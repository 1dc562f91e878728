use serde::{Deserialize, Serialize};

/// Display color of a category, 8 bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Descriptor files write channels as plain integers, anything out of range is clamped.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Self {
        let clamp = |c: i64| c.clamp(0, u8::MAX as i64) as u8;
        Self::new(clamp(r), clamp(g), clamp(b))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "color({}, {}, {})", self.r, self.g, self.b)
    }
}
