use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use image::{Rgba, RgbaImage};
use leditor_catalog_manager::{
    CatalogLoader, ImportError, ItemKind, LoadPhase, LoaderError, LoaderOptions, PropLoader,
    TextureError, TextureUploader, TileLoader, Tiles,
};
use leditor_catalog_models::{
    builtin, Category, Color, PropDefinition, PropKind, TileDefinition,
};
use rstest::{fixture, rstest};
use similar_asserts::assert_eq;
use tempfile::TempDir;

/// Keeps track of what was uploaded, the texture is just a label.
#[derive(Default)]
struct Recorder {
    uploads: Vec<(String, (u32, u32))>,
}

impl TextureUploader for Recorder {
    type Texture = String;

    fn upload(&mut self, name: &str, image: RgbaImage) -> Result<String, TextureError> {
        self.uploads.push((name.to_string(), image.dimensions()));
        Ok(format!("tex:{name}"))
    }
}

type Layout<'a> = &'a [(&'a str, &'a [&'a str])];

fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]))
        .save(path)
        .unwrap();
}

/// Writes a descriptor and a 2x3 png per item.
/// Items are box tiles unless their name says otherwise.
fn write_pack(root: &Path, name: &str, layout: Layout) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    let mut descriptor = String::from("-- generated\n");
    for (category, items) in layout {
        descriptor.push_str(&format!("-[\"{category}\", color(10, 20, 30)]\n"));
        for item in items.iter() {
            let tp = if item.starts_with("Struct") {
                "voxelStruct"
            } else {
                "box"
            };
            descriptor.push_str(&format!("[#nm:\"{item}\", #sz:point(1,1), #tp:\"{tp}\"]\n"));
            write_png(&dir.join(format!("{item}.png")), 2, 3);
        }
    }
    std::fs::write(dir.join("Init.txt"), descriptor).unwrap();
    dir
}

fn run_to_end<K: ItemKind>(
    loader: &mut CatalogLoader<K, String>,
    uploader: &mut Recorder,
) -> usize {
    let mut calls = 0;
    loop {
        calls += 1;
        if loader.proceed(uploader).unwrap() {
            return calls;
        }
        assert!(calls < 10_000, "loader never finished");
    }
}

fn shape<D, T>(catalog: &leditor_catalog_models::Catalog<D, T>) -> Vec<(String, Vec<String>)> {
    catalog
        .categories()
        .map(|c| {
            (
                c.name().to_string(),
                c.item_names().map(str::to_string).collect(),
            )
        })
        .collect()
}

#[fixture]
fn root() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[rstest]
fn test_single_category_pack(root: TempDir) {
    let dir = write_pack(root.path(), "ropes", &[("Ropes", &["Wire", "Tube", "Chain"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    assert_eq!(loader.total_progress(), 7);

    let mut uploader = Recorder::default();
    for _ in 0..6 {
        assert!(!loader.proceed(&mut uploader).unwrap());
    }
    assert!(loader.proceed(&mut uploader).unwrap());
    assert!(loader.is_done());
    assert_eq!(loader.progress(), 7);

    let catalog = loader.build().unwrap();
    assert_eq!(catalog.category_count(), 1);
    let ropes: Vec<(&str, &str)> = catalog
        .items("Ropes")
        .unwrap()
        .map(|e| (e.name.as_str(), e.texture.as_str()))
        .collect();
    assert_eq!(
        ropes,
        vec![("Wire", "tex:Wire"), ("Tube", "tex:Tube"), ("Chain", "tex:Chain")]
    );
    assert_eq!(catalog.category_color("Ropes"), Some(Color::new(10, 20, 30)));
}

#[rstest]
fn test_packs_keep_submission_order(root: TempDir) {
    let first = write_pack(
        root.path(),
        "first",
        &[("Stone", &["Block", "Slab"]), ("Empty", &[]), ("Metal", &["Grate"])],
    );
    let second = write_pack(root.path(), "second", &[("Wood", &["Plank"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([&first, &second], LoaderOptions::default()).unwrap();
    loader.start();
    assert_eq!(loader.total_progress(), 2 + 2 * 4);

    let mut uploader = Recorder::default();
    let calls = run_to_end(&mut loader, &mut uploader);
    assert_eq!(calls, loader.total_progress());
    assert_eq!(loader.progress(), loader.total_progress());

    let uploaded: Vec<&str> = uploader.uploads.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(uploaded, vec!["Block", "Slab", "Grate", "Plank"]);

    let catalog = loader.build().unwrap();
    assert_eq!(
        shape(&catalog),
        vec![
            ("Stone".into(), vec!["Block".into(), "Slab".into()]),
            ("Empty".into(), vec![]),
            ("Metal".into(), vec!["Grate".into()]),
            ("Wood".into(), vec!["Plank".into()]),
        ]
    );
}

/// Waits before parsing for the number of milliseconds read from a `delay` file next to the
/// descriptor.
struct Delayed;

impl ItemKind for Delayed {
    type Definition = TileDefinition;
    const LABEL: &'static str = "delayed";

    fn import(descriptor: &Path) -> Result<Vec<Category<TileDefinition>>, ImportError> {
        let delay = descriptor
            .parent()
            .and_then(|dir| std::fs::read_to_string(dir.join("delay")).ok())
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(0);
        std::thread::sleep(Duration::from_millis(delay));
        leditor_catalog_manager::io::parse_descriptor(descriptor)
    }
}

#[rstest]
fn test_order_does_not_depend_on_import_timing(root: TempDir) {
    let names = ["a", "b", "c", "d"];
    let dirs: Vec<PathBuf> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let dir = write_pack(root.path(), name, &[(*name, &["Block"])]);
            // the first pack finishes last
            std::fs::write(dir.join("delay"), ((names.len() - i) * 30).to_string()).unwrap();
            dir
        })
        .collect();
    let mut loader: CatalogLoader<Delayed, String> =
        CatalogLoader::new(dirs, LoaderOptions::default()).unwrap();
    loader.start();
    run_to_end(&mut loader, &mut Recorder::default());
    let catalog = loader.build().unwrap();
    assert_eq!(catalog.category_names().collect::<Vec<_>>(), names.to_vec());
}

#[rstest]
fn test_start_is_idempotent(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    assert!(!loader.is_started());
    loader.start();
    loader.start();
    assert!(loader.is_started());
    assert_eq!(loader.total_progress(), 3);
    assert_eq!(run_to_end(&mut loader, &mut Recorder::default()), 3);
}

#[rstest]
fn test_proceed_after_done_does_nothing(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    let mut uploader = Recorder::default();
    run_to_end(&mut loader, &mut uploader);
    for _ in 0..3 {
        assert!(loader.proceed(&mut uploader).unwrap());
    }
    assert_eq!(loader.progress(), 3);
    assert_eq!(uploader.uploads.len(), 1);
    assert_eq!(loader.build().unwrap().item_count(), 1);
}

#[rstest]
fn test_missing_directory(root: TempDir) {
    let good = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let missing = root.path().join("nowhere");
    let err = TileLoader::<String>::new([good, missing.clone()], LoaderOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, LoaderError::DirectoryNotFound(path) if path == missing));
}

#[rstest]
fn test_missing_descriptor(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let options = LoaderOptions {
        descriptor_name: "Other.txt".into(),
    };
    let err = TileLoader::<String>::new([&dir], options).err().unwrap();
    assert!(matches!(
        err,
        LoaderError::DescriptorNotFound { directory, descriptor }
            if directory == dir && descriptor == "Other.txt"
    ));
}

#[rstest]
fn test_proceed_before_start(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    let mut uploader = Recorder::default();
    assert!(matches!(loader.proceed(&mut uploader), Err(LoaderError::InvalidOperation(_))));
    assert_eq!(loader.phase(), LoadPhase::Constructed);
    assert_eq!(loader.progress(), 0);
    assert!(uploader.uploads.is_empty());

    // nothing was poisoned
    loader.start();
    assert_eq!(run_to_end(&mut loader, &mut uploader), 3);
}

#[test]
fn test_no_directories() {
    let mut loader: TileLoader<String> =
        CatalogLoader::new(Vec::<PathBuf>::new(), LoaderOptions::default()).unwrap();
    loader.start();
    assert_eq!(loader.total_progress(), 0);
    assert!(loader.proceed(&mut Recorder::default()).unwrap());
    assert_eq!(loader.progress(), 0);
    assert!(loader.build().unwrap().is_empty());
}

#[rstest]
fn test_build_before_done(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    loader.proceed(&mut Recorder::default()).unwrap();
    assert!(matches!(loader.build(), Err(LoaderError::InvalidOperation(_))));
}

#[rstest]
fn test_phases_are_reported_in_order(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block", "Slab"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    assert_eq!(loader.phase(), LoadPhase::Started);
    let mut uploader = Recorder::default();
    let mut phases = vec![];
    while !loader.proceed(&mut uploader).unwrap() {
        phases.push((
            loader.phase(),
            loader.pack_load_completed(),
            loader.texture_load_completed(),
        ));
    }
    assert_eq!(
        phases,
        vec![
            (LoadPhase::TextureLoading, true, false),
            (LoadPhase::TextureLoading, true, false),
            (LoadPhase::CatalogBuilding, true, true),
            (LoadPhase::CatalogBuilding, true, true),
        ]
    );
    assert!(loader.catalog_build_completed());
}

#[rstest]
fn test_include_defined(root: TempDir) {
    let dir = write_pack(root.path(), "props", &[("Pots", &["Pot"])]);
    let assets = root.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    let ropes = builtin::ropes();
    for rope in &ropes {
        write_png(&assets.join(format!("{}.png", rope.name)), 1, 4);
    }

    let mut loader: PropLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    assert!(matches!(
        loader.include_defined(
            builtin::ROPES_CATEGORY,
            builtin::CATEGORY_COLOR,
            ropes.clone(),
            &assets,
        ),
        Err(LoaderError::InvalidOperation(_))
    ));
    loader.start();
    assert_eq!(loader.total_progress(), 3);
    loader
        .include_defined(builtin::ROPES_CATEGORY, builtin::CATEGORY_COLOR, ropes.clone(), &assets)
        .unwrap();
    assert_eq!(loader.total_progress(), 3 + 1 + 2 * ropes.len());

    let mut uploader = Recorder::default();
    assert_eq!(run_to_end(&mut loader, &mut uploader), loader.total_progress());
    assert!(matches!(
        loader.include_defined(
            builtin::LONGS_CATEGORY,
            builtin::CATEGORY_COLOR,
            builtin::longs(),
            &assets,
        ),
        Err(LoaderError::InvalidOperation(_))
    ));

    let catalog = loader.build().unwrap();
    assert_eq!(catalog.category_names().collect::<Vec<_>>(), vec!["Pots", "Ropes"]);
    assert_eq!(catalog.category_color("Ropes"), Some(Color::BLACK));
    let wire = catalog.get("Ropes", "Wire").unwrap();
    assert_eq!(wire.definition.kind, PropKind::Rope);
    assert_eq!(wire.texture, "tex:Wire");
}

#[rstest]
fn test_include_defined_needs_texture_directory(root: TempDir) {
    let dir = write_pack(root.path(), "props", &[("Pots", &["Pot"])]);
    let mut loader: PropLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    let err = loader
        .include_defined("Ropes", Color::BLACK, builtin::ropes(), root.path().join("missing"))
        .unwrap_err();
    assert!(matches!(err, LoaderError::DirectoryNotFound(_)));
    assert_eq!(loader.total_progress(), 3);
}

#[rstest]
fn test_import_error_faults_the_loader(root: TempDir) {
    let good = write_pack(root.path(), "good", &[("Stone", &["Block"])]);
    let bad = root.path().join("bad");
    std::fs::create_dir_all(&bad).unwrap();
    std::fs::write(bad.join("Init.txt"), "[#nm:\"Orphan\"]\n").unwrap();

    let mut loader: TileLoader<String> =
        CatalogLoader::new([good, bad], LoaderOptions::default()).unwrap();
    loader.start();
    // the broken pack only accounts for its own import
    assert_eq!(loader.total_progress(), 2 + 2);

    let mut uploader = Recorder::default();
    assert!(!loader.proceed(&mut uploader).unwrap());
    let err = loader.proceed(&mut uploader).unwrap_err();
    assert!(matches!(err, LoaderError::Import(ImportError::OrphanItem { line: 1, .. })));
    assert!(loader.is_faulted());
    assert!(matches!(loader.proceed(&mut uploader), Err(LoaderError::Faulted)));
    assert!(matches!(loader.build(), Err(LoaderError::Faulted)));
}

#[rstest]
fn test_missing_texture_faults_the_loader(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block", "Slab"])]);
    std::fs::remove_file(dir.join("Slab.png")).unwrap();
    let mut loader: TileLoader<String> =
        CatalogLoader::new([&dir], LoaderOptions::default()).unwrap();
    loader.start();

    let mut uploader = Recorder::default();
    assert!(!loader.proceed(&mut uploader).unwrap());
    assert!(!loader.proceed(&mut uploader).unwrap());
    let err = loader.proceed(&mut uploader).unwrap_err();
    assert!(matches!(
        err,
        LoaderError::Texture(TextureError::Missing { path }) if path == dir.join("Slab.png")
    ));
    assert_eq!(loader.progress(), 2);
    assert!(matches!(loader.proceed(&mut uploader), Err(LoaderError::Faulted)));
}

#[rstest]
fn test_texture_lookup_ignores_case(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    std::fs::rename(dir.join("Block.png"), dir.join("block.png")).unwrap();
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    run_to_end(&mut loader, &mut Recorder::default());
    assert!(loader.build().unwrap().contains_item("Block"));
}

#[rstest]
fn test_tile_header_row_is_cropped(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block", "StructPipe"])]);
    let mut loader: TileLoader = CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    let mut ctx = egui::Context::default();
    while !loader.proceed(&mut ctx).unwrap() {}
    let catalog = loader.build().unwrap();
    assert_eq!(catalog.get("Stone", "Block").unwrap().texture.size(), [2, 3]);
    assert_eq!(catalog.get("Stone", "StructPipe").unwrap().texture.size(), [2, 2]);
}

#[rstest]
fn test_proceed_frame(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block", "Slab"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    let mut uploader = Recorder::default();
    assert!(!loader.proceed_frame(&mut uploader, 3).unwrap());
    assert_eq!(loader.progress(), 3);
    assert!(loader.proceed_frame(&mut uploader, 10).unwrap());
    assert_eq!(loader.progress(), 5);
}

#[rstest]
fn test_build_in_background(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"]), ("Metal", &["Grate"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    run_to_end(&mut loader, &mut Recorder::default());
    let catalog = loader.build_in_background().take().unwrap().unwrap();
    assert_eq!(catalog.category_of("Grate"), Some("Metal"));
}

#[rstest]
fn test_build_in_background_before_done(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let mut loader: TileLoader<String> =
        CatalogLoader::new([dir], LoaderOptions::default()).unwrap();
    loader.start();
    let result = loader.build_in_background().take().unwrap();
    assert!(matches!(result, Err(LoaderError::InvalidOperation(_))));
}

#[rstest]
fn test_include_tiles_reuses_textures(root: TempDir) {
    let tiles_dir = write_pack(root.path(), "tiles", &[("Stone", &["Block", "Slab"])]);
    let props_dir = write_pack(root.path(), "props", &[("Pots", &["Pot"])]);

    let mut uploader = Recorder::default();
    let mut tiles: TileLoader<String> =
        CatalogLoader::new([tiles_dir], LoaderOptions::default()).unwrap();
    tiles.start();
    run_to_end(&mut tiles, &mut uploader);
    let tiles = tiles.build().unwrap();

    let mut props: PropLoader<String> =
        CatalogLoader::new([props_dir], LoaderOptions::default()).unwrap();
    props.start();
    props.include_tiles(&tiles).unwrap();
    assert_eq!(props.total_progress(), 3);
    assert_eq!(run_to_end(&mut props, &mut uploader), 3);
    let props = props.build().unwrap();

    assert_eq!(props.category_names().collect::<Vec<_>>(), vec!["Stone", "Pots"]);
    let slab = props.get("Stone", "Slab").unwrap();
    assert_eq!(slab.definition.kind, PropKind::Tile);
    assert_eq!(slab.texture, "tex:Slab");
    // tiles were uploaded once, for the tile loader
    let uploaded: Vec<&str> = uploader.uploads.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(uploaded, vec!["Block", "Slab", "Pot"]);
}

#[rstest]
fn test_catalog_includes_only_between_start_and_first_proceed(root: TempDir) {
    let tiles_dir = write_pack(root.path(), "tiles", &[("Stone", &["Block"])]);
    let props_dir = write_pack(root.path(), "props", &[("Pots", &["Pot", "Vase"])]);

    let mut uploader = Recorder::default();
    let mut tiles: TileLoader<String> =
        CatalogLoader::new([tiles_dir], LoaderOptions::default()).unwrap();
    tiles.start();
    run_to_end(&mut tiles, &mut uploader);
    let tiles = tiles.build().unwrap();

    let mut props: PropLoader<String> =
        CatalogLoader::new([props_dir], LoaderOptions::default()).unwrap();
    assert!(matches!(props.include_tiles(&tiles), Err(LoaderError::InvalidOperation(_))));
    assert!(matches!(
        props.include_catalog(&tiles, PropDefinition::from_tile),
        Err(LoaderError::InvalidOperation(_))
    ));
    assert!(!props.is_started());

    props.start();
    assert!(!props.proceed(&mut uploader).unwrap());
    assert!(matches!(props.include_tiles(&tiles), Err(LoaderError::InvalidOperation(_))));
    assert!(matches!(
        props.include_catalog(&tiles, PropDefinition::from_tile),
        Err(LoaderError::InvalidOperation(_))
    ));
    // rejected includes leave the loader usable
    assert!(!props.is_faulted());
    assert_eq!(run_to_end(&mut props, &mut uploader) + 1, props.total_progress());
    let props = props.build().unwrap();
    assert_eq!(props.category_names().collect::<Vec<_>>(), vec!["Pots"]);
    assert!(!props.contains_item("Block"));
}

#[rstest]
fn test_tiles_kind_is_usable_directly(root: TempDir) {
    let dir = write_pack(root.path(), "tiles", &[("Stone", &["StructBeam"])]);
    let categories = Tiles::import(&dir.join("Init.txt")).unwrap();
    assert!(!categories[0].items[0].is_box());
}
