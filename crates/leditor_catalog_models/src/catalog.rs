use std::collections::HashMap;

use indexmap::{map::Entry, IndexMap};
use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::warn;

use crate::{Color, ItemDefinition};

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("category \"{0}\" not found")]
    #[diagnostic(
        code(leditor::catalog::category_not_found),
        help("register the category before registering its items")
    )]
    CategoryNotFound(SmolStr),
}

#[derive(Debug, Clone)]
pub struct CatalogEntry<D, T> {
    pub name: SmolStr,
    pub definition: D,
    pub texture: T,
}

#[derive(Debug, Clone)]
pub struct CatalogCategory<D, T> {
    name: SmolStr,
    color: Color,
    items: IndexMap<SmolStr, CatalogEntry<D, T>>,
}

impl<D, T> CatalogCategory<D, T> {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn color(&self) -> Color {
        self.color
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    /// Items in declaration order.
    pub fn items(&self) -> impl Iterator<Item = &CatalogEntry<D, T>> {
        self.items.values()
    }
    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(SmolStr::as_str)
    }
    pub fn get(&self, item: &str) -> Option<&CatalogEntry<D, T>> {
        self.items.get(item)
    }
}

/// Immutable, name indexed result of a loader run.
///
/// Categories keep the order in which packs were submitted and then the order in which they were
/// declared, items keep their declaration order inside their category.
/// To change anything, run a new loader.
#[derive(Debug, Clone)]
pub struct Catalog<D, T> {
    categories: IndexMap<SmolStr, CatalogCategory<D, T>>,
    /// item name -> index of the first category holding it
    item_categories: HashMap<SmolStr, usize>,
}

impl<D, T> Default for Catalog<D, T> {
    fn default() -> Self {
        Self {
            categories: Default::default(),
            item_categories: Default::default(),
        }
    }
}

impl<D, T> Catalog<D, T> {
    pub fn categories(&self) -> impl Iterator<Item = &CatalogCategory<D, T>> {
        self.categories.values()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(SmolStr::as_str)
    }

    pub fn category(&self, name: &str) -> Option<&CatalogCategory<D, T>> {
        self.categories.get(name)
    }

    pub fn items(&self, category: &str) -> Option<impl Iterator<Item = &CatalogEntry<D, T>>> {
        self.category(category).map(CatalogCategory::items)
    }

    pub fn get(&self, category: &str, item: &str) -> Option<&CatalogEntry<D, T>> {
        self.category(category).and_then(|c| c.get(item))
    }

    /// Lookup by item name only, the first category (in catalog order) holding it wins.
    pub fn find(&self, item: &str) -> Option<(&CatalogCategory<D, T>, &CatalogEntry<D, T>)> {
        let index = *self.item_categories.get(item)?;
        let (_, category) = self.categories.get_index(index)?;
        category.get(item).map(|entry| (category, entry))
    }

    pub fn category_of(&self, item: &str) -> Option<&str> {
        self.find(item).map(|(category, _)| category.name())
    }

    pub fn category_color(&self, name: &str) -> Option<Color> {
        self.category(name).map(CatalogCategory::color)
    }

    pub fn contains_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    pub fn contains_item(&self, item: &str) -> bool {
        self.item_categories.contains_key(item)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn item_count(&self) -> usize {
        self.categories.values().map(CatalogCategory::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Every item of every category, flattened in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = (&CatalogCategory<D, T>, &CatalogEntry<D, T>)> {
        self.categories
            .values()
            .flat_map(|category| category.items().map(move |entry| (category, entry)))
    }
}

/// Collects registrations in the order they are presented, then freezes them into a [Catalog].
///
/// There is no uniqueness check: registering a known category again changes its color,
/// registering a known item again replaces its definition and texture. In both cases the
/// original position is kept and a warning is logged.
#[derive(Debug)]
pub struct CatalogBuilder<D, T> {
    categories: IndexMap<SmolStr, CatalogCategory<D, T>>,
}

impl<D, T> Default for CatalogBuilder<D, T> {
    fn default() -> Self {
        Self {
            categories: Default::default(),
        }
    }
}

impl<D, T> CatalogBuilder<D, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn register_category(&mut self, name: impl Into<SmolStr>, color: Color) -> &mut Self {
        let name = name.into();
        match self.categories.entry(name.clone()) {
            Entry::Occupied(mut occupied) => {
                warn!(category = %name, "category registered twice, keeping the last color");
                occupied.get_mut().color = color;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CatalogCategory {
                    name,
                    color,
                    items: Default::default(),
                });
            }
        }
        self
    }

    pub fn register_item(
        &mut self,
        category: &str,
        definition: D,
        texture: T,
    ) -> Result<&mut Self, CatalogError>
    where
        D: ItemDefinition,
    {
        let row = self
            .categories
            .get_mut(category)
            .ok_or_else(|| CatalogError::CategoryNotFound(category.into()))?;
        let name = SmolStr::from(definition.name());
        let previous = row.items.insert(
            name.clone(),
            CatalogEntry {
                name: name.clone(),
                definition,
                texture,
            },
        );
        if previous.is_some() {
            warn!(category, item = %name, "item registered twice, keeping the last one");
        }
        Ok(self)
    }

    pub fn build(self) -> Catalog<D, T> {
        let mut item_categories = HashMap::new();
        for (index, category) in self.categories.values().enumerate() {
            for item in category.items.keys() {
                item_categories.entry(item.clone()).or_insert(index);
            }
        }
        Catalog {
            categories: self.categories,
            item_categories,
        }
    }
}
