use std::{collections::VecDeque, path::PathBuf, time::SystemTime};

use leditor_catalog_models::{
    Catalog, CatalogBuilder, Category, Color, ImportedPack, ItemDefinition, Pack,
    PropDefinition, TileDefinition,
};
use leditor_core::{
    task::{PendingTask, TaskCounter},
    DEFAULT_DESCRIPTOR_NAME,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::{debug, error, info, info_span, trace};

use super::kind::{ItemKind, Props, Tiles};
use crate::{io::load_image, ImportError, LoaderError, TextureUploader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// file looked up at the root of every pack directory
    pub descriptor_name: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            descriptor_name: DEFAULT_DESCRIPTOR_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Constructed,
    Started,
    PackLoading,
    TextureLoading,
    CatalogBuilding,
    Done,
    Faulted,
}

type ImportTask<D> = PendingTask<Result<ImportedPack<D>, ImportError>>;

/// pack -> category -> item position of the texture phase
#[derive(Debug, Default, Clone, Copy)]
struct Cursor {
    pack: usize,
    category: usize,
    item: usize,
}

impl Cursor {
    /// Moves forward until it points at an existing slot.
    /// Returns false once every pack is exhausted.
    fn seek<D, T>(&mut self, packs: &[Pack<D, T>]) -> bool {
        while let Some(pack) = packs.get(self.pack) {
            match pack.textures.get(self.category) {
                Some(slots) if self.item < slots.len() => return true,
                Some(_) => {
                    self.category += 1;
                    self.item = 0;
                }
                None => {
                    self.pack += 1;
                    self.category = 0;
                    self.item = 0;
                }
            }
        }
        false
    }
}

struct PendingCategory<D, T> {
    name: SmolStr,
    color: Color,
    registered: bool,
    entries: std::vec::IntoIter<(D, T)>,
}

/// Loads the categories, items and textures of a set of pack directories into a [Catalog],
/// one small step at a time so that the host can keep drawing frames in between.
///
/// ```text
/// new -> start -> [include_*] -> proceed until true -> build
/// ```
///
/// The work is split into three phases which run strictly in order:
/// 1. collecting the result of the background import of each pack, in submission order
/// 2. decoding and uploading one texture per item, on the caller's thread
/// 3. registering one item per step into the catalog builder
///
/// Each step of each phase is one unit of [Self::total_progress], so the number of
/// successful `proceed` calls needed to finish is known as soon as [Self::start] returns.
/// Any error moves the loader to [LoadPhase::Faulted] for good.
pub struct CatalogLoader<K: ItemKind, T> {
    options: LoaderOptions,
    directories: Vec<PathBuf>,
    phase: LoadPhase,
    task_counter: TaskCounter,
    imports: Vec<Option<ImportTask<K::Definition>>>,
    import_cursor: usize,
    packs: Vec<Pack<K::Definition, T>>,
    texture_cursor: Cursor,
    assembly: VecDeque<PendingCategory<K::Definition, T>>,
    builder: CatalogBuilder<K::Definition, T>,
    total_progress: usize,
    progress: usize,
    started_at: Option<SystemTime>,
}

pub type TileLoader<T = egui::TextureHandle> = CatalogLoader<Tiles, T>;
pub type PropLoader<T = egui::TextureHandle> = CatalogLoader<Props, T>;
pub type TileCatalog<T = egui::TextureHandle> = Catalog<TileDefinition, T>;
pub type PropCatalog<T = egui::TextureHandle> = Catalog<PropDefinition, T>;

impl<K: ItemKind, T> CatalogLoader<K, T> {
    /// Every directory must exist and contain the descriptor file. Nothing is read yet.
    pub fn new<I, P>(directories: I, options: LoaderOptions) -> Result<Self, LoaderError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut checked = Vec::new();
        for directory in directories {
            let directory: PathBuf = directory.into();
            if !directory.is_dir() {
                return Err(LoaderError::DirectoryNotFound(directory));
            }
            if !directory.join(&options.descriptor_name).is_file() {
                return Err(LoaderError::DescriptorNotFound {
                    directory,
                    descriptor: options.descriptor_name.clone(),
                });
            }
            checked.push(directory);
        }
        Ok(Self {
            options,
            directories: checked,
            phase: LoadPhase::Constructed,
            task_counter: TaskCounter::new(),
            imports: Vec::new(),
            import_cursor: 0,
            packs: Vec::new(),
            texture_cursor: Cursor::default(),
            assembly: VecDeque::new(),
            builder: CatalogBuilder::new(),
            total_progress: 0,
            progress: 0,
            started_at: None,
        })
    }

    /// Imports every pack in parallel on the rayon pool and waits for all of them to be parsed, so
    /// that the total amount of work is known. Calling it again does nothing.
    ///
    /// Import failures are kept and returned by the `proceed` call that reaches the pack.
    pub fn start(&mut self) {
        if self.phase != LoadPhase::Constructed {
            return;
        }
        debug!(kind = K::LABEL, packs = self.directories.len(), "loader started");
        self.started_at = Some(SystemTime::now());
        self.imports = self
            .directories
            .iter()
            .map(|directory| {
                let directory = directory.clone();
                let descriptor = directory.join(&self.options.descriptor_name);
                Some(PendingTask::spawn(&self.task_counter, move || {
                    let _span = info_span!("import", kind = K::LABEL, ?directory).entered();
                    K::import(&descriptor)
                        .map(|categories| ImportedPack::new(directory, categories))
                }))
            })
            .collect();

        let mut items = 0;
        for task in self.imports.iter_mut().flatten() {
            if let Ok(Ok(imported)) = task.wait() {
                items += imported.item_count();
            }
        }
        self.total_progress = self.imports.len() + 2 * items;
        self.phase = LoadPhase::Started;
        debug!(
            kind = K::LABEL,
            total_progress = self.total_progress,
            "packs imported"
        );
    }

    fn check_includable(&self) -> Result<(), LoaderError> {
        match self.phase {
            LoadPhase::Started => Ok(()),
            LoadPhase::Faulted => Err(LoaderError::Faulted),
            _ => Err(LoaderError::InvalidOperation(
                "items can only be included after start and before the first proceed",
            )),
        }
    }

    /// Adds a pack that is not described by any descriptor file. It goes through the texture
    /// and catalog phases after every directory given at construction.
    pub fn include_defined(
        &mut self,
        category: impl Into<SmolStr>,
        color: Color,
        items: Vec<K::Definition>,
        texture_directory: impl Into<PathBuf>,
    ) -> Result<(), LoaderError> {
        self.check_includable()?;
        let texture_directory = texture_directory.into();
        if !texture_directory.is_dir() {
            return Err(LoaderError::DirectoryNotFound(texture_directory));
        }
        let imported = ImportedPack::new(
            texture_directory,
            vec![Category::with_items(category, color, items)],
        );
        self.total_progress += 1 + 2 * imported.item_count();
        self.imports.push(Some(PendingTask::ready(Ok(imported))));
        Ok(())
    }

    /// Registers every category and item of an already built catalog, reusing its textures.
    /// They come before the items of any pack and cost no progress.
    pub fn include_catalog<D, F>(
        &mut self,
        source: &Catalog<D, T>,
        mut convert: F,
    ) -> Result<(), LoaderError>
    where
        T: Clone,
        F: FnMut(&D) -> K::Definition,
    {
        self.check_includable()?;
        for category in source.categories() {
            self.builder.register_category(category.name(), category.color());
            for entry in category.items() {
                self.builder.register_item(
                    category.name(),
                    convert(&entry.definition),
                    entry.texture.clone(),
                )?;
            }
        }
        debug!(
            kind = K::LABEL,
            categories = source.category_count(),
            items = source.item_count(),
            "catalog included"
        );
        Ok(())
    }

    /// Does one unit of work. Returns true once the catalog can be built.
    pub fn proceed<U>(&mut self, uploader: &mut U) -> Result<bool, LoaderError>
    where
        U: TextureUploader<Texture = T>,
    {
        match self.phase {
            LoadPhase::Constructed => {
                return Err(LoaderError::InvalidOperation("proceed called before start"));
            }
            LoadPhase::Faulted => return Err(LoaderError::Faulted),
            LoadPhase::Done => return Ok(true),
            LoadPhase::Started => {
                self.phase = LoadPhase::PackLoading;
                // there may be nothing to do at all
                self.settle();
                if self.phase == LoadPhase::Done {
                    return Ok(true);
                }
            }
            _ => {}
        }
        let step = match self.phase {
            LoadPhase::PackLoading => self.load_next_pack(),
            LoadPhase::TextureLoading => self.load_next_texture(uploader),
            LoadPhase::CatalogBuilding => self.register_next_item(),
            _ => Err(LoaderError::InvalidOperation("loader is not in a working phase")),
        };
        if let Err(e) = step {
            error!(
                kind = K::LABEL,
                phase = ?self.phase,
                progress = self.progress,
                "loader faulted: {e}"
            );
            self.phase = LoadPhase::Faulted;
            return Err(e);
        }
        self.progress += 1;
        self.settle();
        Ok(self.phase == LoadPhase::Done)
    }

    /// Runs up to `budget` units of work, meant to be called once per frame.
    pub fn proceed_frame<U>(
        &mut self,
        uploader: &mut U,
        budget: usize,
    ) -> Result<bool, LoaderError>
    where
        U: TextureUploader<Texture = T>,
    {
        for _ in 0..budget.max(1) {
            if self.proceed(uploader)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn load_next_pack(&mut self) -> Result<(), LoaderError> {
        let task = self
            .imports
            .get_mut(self.import_cursor)
            .and_then(Option::take)
            .ok_or(LoaderError::InvalidOperation("pack already consumed"))?;
        // already finished during start, this does not block
        let imported = task.take()??;
        trace!(
            kind = K::LABEL,
            directory = ?imported.directory,
            categories = imported.categories.len(),
            "pack loaded"
        );
        self.packs.push(Pack::new(imported));
        self.import_cursor += 1;
        Ok(())
    }

    fn load_next_texture<U>(&mut self, uploader: &mut U) -> Result<(), LoaderError>
    where
        U: TextureUploader<Texture = T>,
    {
        let Cursor {
            pack,
            category,
            item,
        } = self.texture_cursor;
        let pack = &mut self.packs[pack];
        let definition = &pack.categories[category].items[item];
        let path = K::texture_path(&pack.directory, definition)?;
        let image = K::prepare_image(definition, load_image(&path)?);
        trace!(kind = K::LABEL, ?path, "uploading texture");
        let texture = uploader.upload(definition.name(), image)?;
        pack.textures[category][item] = Some(texture);
        self.texture_cursor.item += 1;
        Ok(())
    }

    fn register_next_item(&mut self) -> Result<(), LoaderError> {
        let category = self
            .assembly
            .front_mut()
            .ok_or(LoaderError::InvalidOperation("no item left to register"))?;
        let (definition, texture) = category
            .entries
            .next()
            .ok_or(LoaderError::InvalidOperation("no item left to register"))?;
        self.builder.register_item(&category.name, definition, texture)?;
        Ok(())
    }

    /// Moves the texture slots of the packs into the queue of categories to register.
    fn prepare_assembly(&mut self) {
        for pack in self.packs.drain(..) {
            for (category, textures) in pack.categories.into_iter().zip(pack.textures) {
                let entries: Vec<(K::Definition, T)> = category
                    .items
                    .into_iter()
                    .zip(textures)
                    .filter_map(|(definition, texture)| texture.map(|t| (definition, t)))
                    .collect();
                self.assembly.push_back(PendingCategory {
                    name: category.name,
                    color: category.color,
                    registered: false,
                    entries: entries.into_iter(),
                });
            }
        }
    }

    /// Registers categories until the next one holding an item. Empty categories are
    /// registered on the way.
    fn seek_category(&mut self) -> bool {
        while let Some(category) = self.assembly.front_mut() {
            if !category.registered {
                self.builder.register_category(category.name.clone(), category.color);
                category.registered = true;
            }
            if category.entries.len() > 0 {
                return true;
            }
            self.assembly.pop_front();
        }
        false
    }

    /// Advances through phases that have no work left, so that completion is reported by the
    /// same call that did the last unit.
    fn settle(&mut self) {
        if self.phase == LoadPhase::PackLoading && self.import_cursor == self.imports.len() {
            debug!(kind = K::LABEL, "pack load complete");
            self.phase = LoadPhase::TextureLoading;
        }
        if self.phase == LoadPhase::TextureLoading && !self.texture_cursor.seek(&self.packs) {
            debug!(kind = K::LABEL, "texture load complete");
            self.phase = LoadPhase::CatalogBuilding;
            self.prepare_assembly();
        }
        if self.phase == LoadPhase::CatalogBuilding && !self.seek_category() {
            debug!(kind = K::LABEL, "catalog build complete");
            self.phase = LoadPhase::Done;
            let elapsed = self
                .started_at
                .and_then(|start| start.elapsed().ok())
                .unwrap_or_default();
            info!(
                kind = K::LABEL,
                categories = self.builder.category_count(),
                progress = self.progress,
                "loading took {} ms",
                elapsed.as_millis()
            );
        }
    }

    /// Consumes the loader. Only valid once `proceed` returned true.
    pub fn build(self) -> Result<Catalog<K::Definition, T>, LoaderError> {
        match self.phase {
            LoadPhase::Done => Ok(self.builder.build()),
            LoadPhase::Faulted => Err(LoaderError::Faulted),
            _ => Err(LoaderError::InvalidOperation("build called before loading completed")),
        }
    }

    /// Same as [Self::build] but the catalog is assembled on the rayon pool.
    pub fn build_in_background(
        self,
    ) -> PendingTask<Result<Catalog<K::Definition, T>, LoaderError>>
    where
        T: Send + 'static,
    {
        if self.phase != LoadPhase::Done {
            return PendingTask::ready(self.build());
        }
        let counter = self.task_counter.clone();
        let builder = self.builder;
        PendingTask::spawn(&counter, move || Ok(builder.build()))
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }
    pub fn is_started(&self) -> bool {
        self.phase != LoadPhase::Constructed
    }
    pub fn is_done(&self) -> bool {
        self.phase == LoadPhase::Done
    }
    pub fn is_faulted(&self) -> bool {
        self.phase == LoadPhase::Faulted
    }
    pub fn pack_load_completed(&self) -> bool {
        matches!(
            self.phase,
            LoadPhase::TextureLoading | LoadPhase::CatalogBuilding | LoadPhase::Done
        )
    }
    pub fn texture_load_completed(&self) -> bool {
        matches!(self.phase, LoadPhase::CatalogBuilding | LoadPhase::Done)
    }
    pub fn catalog_build_completed(&self) -> bool {
        self.is_done()
    }
    /// Units of work needed to finish. Fixed once started, grows only with `include_defined`.
    pub fn total_progress(&self) -> usize {
        self.total_progress
    }
    /// Units of work done so far.
    pub fn progress(&self) -> usize {
        self.progress
    }
}

impl<T: Clone> CatalogLoader<Props, T> {
    /// Tiles can be placed as props, they keep the texture that was uploaded for the tile.
    pub fn include_tiles(
        &mut self,
        tiles: &Catalog<TileDefinition, T>,
    ) -> Result<(), LoaderError> {
        self.include_catalog(tiles, PropDefinition::from_tile)
    }
}
