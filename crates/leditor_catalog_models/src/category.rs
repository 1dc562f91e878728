use smol_str::SmolStr;

use crate::Color;

/// A named, colored group of items as declared inside one pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category<D> {
    pub name: SmolStr,
    pub color: Color,
    pub items: Vec<D>,
}

impl<D> Category<D> {
    pub fn new(name: impl Into<SmolStr>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
            items: Vec::new(),
        }
    }

    pub fn with_items(name: impl Into<SmolStr>, color: Color, items: Vec<D>) -> Self {
        Self {
            name: name.into(),
            color,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
