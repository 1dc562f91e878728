use std::path::PathBuf;

use crate::Category;

/// What the descriptor importer hands back for one directory.
#[derive(Debug, Clone)]
pub struct ImportedPack<D> {
    pub directory: PathBuf,
    pub categories: Vec<Category<D>>,
}

impl<D> ImportedPack<D> {
    pub fn new(directory: impl Into<PathBuf>, categories: Vec<Category<D>>) -> Self {
        Self {
            directory: directory.into(),
            categories,
        }
    }

    pub fn item_count(&self) -> usize {
        self.categories.iter().map(Category::len).sum()
    }
}

/// One directory's contribution while it goes through the loader.
///
/// `textures` runs parallel to `categories`: `textures[c].len() == categories[c].items.len()`.
/// The slots start empty and are filled in place, one per loader step.
#[derive(Debug)]
pub struct Pack<D, T> {
    pub directory: PathBuf,
    pub categories: Vec<Category<D>>,
    pub textures: Vec<Vec<Option<T>>>,
}

impl<D, T> Pack<D, T> {
    pub fn new(imported: ImportedPack<D>) -> Self {
        let textures = imported
            .categories
            .iter()
            .map(|c| std::iter::repeat_with(|| None).take(c.len()).collect())
            .collect();
        Self {
            directory: imported.directory,
            categories: imported.categories,
            textures,
        }
    }

    pub fn item_count(&self) -> usize {
        self.textures.iter().map(Vec::len).sum()
    }

    pub fn loaded_textures(&self) -> usize {
        self.textures.iter().flatten().filter(|t| t.is_some()).count()
    }
}
