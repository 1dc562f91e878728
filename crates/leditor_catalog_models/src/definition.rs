use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Raw `#key:value` pairs of a descriptor line, in declaration order.
/// Keys are stored without the leading `#`, values are kept unparsed.
pub type PropertyList = IndexMap<SmolStr, String>;

/// The loader treats definitions as opaque, the name is the only thing it reads.
/// It is used to find the texture of the item and to index it in the catalog.
pub trait ItemDefinition {
    fn name(&self) -> &str;
}

/// Built from one item line of a descriptor file.
pub trait FromPropertyList: Sized {
    fn from_property_list(name: SmolStr, properties: PropertyList) -> Self;
}

/// Strips the surrounding double quotes of a string literal.
pub fn unquote(value: &str) -> Option<&str> {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|_| value.len() >= 2)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub name: SmolStr,
    /// value of `#tp`, it decides how the tile image is laid out
    pub tile_type: Option<SmolStr>,
    pub properties: PropertyList,
}

impl TileDefinition {
    pub const BOX_TYPE: &'static str = "box";

    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            tile_type: None,
            properties: Default::default(),
        }
    }

    pub fn with_type(mut self, tile_type: impl Into<SmolStr>) -> Self {
        self.tile_type = Some(tile_type.into());
        self
    }

    /// Box tiles have no header row in their image.
    pub fn is_box(&self) -> bool {
        self.tile_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case(Self::BOX_TYPE))
            .unwrap_or(false)
    }
}

impl ItemDefinition for TileDefinition {
    fn name(&self) -> &str {
        &self.name
    }
}

impl FromPropertyList for TileDefinition {
    fn from_property_list(name: SmolStr, properties: PropertyList) -> Self {
        let tile_type = properties
            .get("tp")
            .map(|v| unquote(v).unwrap_or(v.as_str()))
            .map(SmolStr::from);
        Self {
            name,
            tile_type,
            properties,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropKind {
    #[default]
    Standard,
    Rope,
    Long,
    /// a tile placed as a prop, it shares the tile's texture
    Tile,
}

impl PropKind {
    fn from_descriptor_type(tp: &str) -> Self {
        if tp.eq_ignore_ascii_case("rope") {
            PropKind::Rope
        } else if tp.eq_ignore_ascii_case("long") {
            PropKind::Long
        } else {
            PropKind::Standard
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropDefinition {
    pub name: SmolStr,
    pub kind: PropKind,
    pub properties: PropertyList,
}

impl PropDefinition {
    pub fn new(name: impl Into<SmolStr>, kind: PropKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: Default::default(),
        }
    }

    pub fn from_tile(tile: &TileDefinition) -> Self {
        Self {
            name: tile.name.clone(),
            kind: PropKind::Tile,
            properties: tile.properties.clone(),
        }
    }
}

impl ItemDefinition for PropDefinition {
    fn name(&self) -> &str {
        &self.name
    }
}

impl FromPropertyList for PropDefinition {
    fn from_property_list(name: SmolStr, properties: PropertyList) -> Self {
        let kind = properties
            .get("tp")
            .map(|v| PropKind::from_descriptor_type(unquote(v).unwrap_or(v.as_str())))
            .unwrap_or_default();
        Self {
            name,
            kind,
            properties,
        }
    }
}

/// Props that are not declared in any descriptor file, only their textures ship with the props.
pub mod builtin {
    use super::{PropDefinition, PropKind};
    use crate::Color;

    pub const ROPES_CATEGORY: &str = "Ropes";
    pub const LONGS_CATEGORY: &str = "Longs";
    pub const CATEGORY_COLOR: Color = Color::BLACK;

    const ROPE_NAMES: [&str; 18] = [
        "Wire",
        "Tube",
        "ThickWire",
        "RidgedTube",
        "Fuel Hose",
        "Broken Fuel Hose",
        "Large Chain",
        "Large Chain 2",
        "Bike Chain",
        "Zero-G Tube",
        "Zero-G Wire",
        "Fat Hose",
        "Wire Bunch",
        "Wire Bunch 2",
        "Big Big Pipe",
        "Ring Chain",
        "Christmas Wire",
        "Ornate Wire",
    ];

    const LONG_NAMES: [&str; 8] = [
        "Cabinet Clamp",
        "Drill Suspender",
        "Thick Chain",
        "Drill",
        "Piston",
        "Stretched Pipe",
        "Twisted Thread",
        "Stretched Wire",
    ];

    pub fn ropes() -> Vec<PropDefinition> {
        ROPE_NAMES
            .iter()
            .map(|name| PropDefinition::new(*name, PropKind::Rope))
            .collect()
    }

    pub fn longs() -> Vec<PropDefinition> {
        LONG_NAMES
            .iter()
            .map(|name| PropDefinition::new(*name, PropKind::Long))
            .collect()
    }
}
