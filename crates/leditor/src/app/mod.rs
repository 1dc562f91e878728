mod config;
mod init;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use leditor_catalog_manager::{
    CatalogLoader, LoadPhase, LoaderError, PropCatalog, PropLoader, TileCatalog, TileLoader,
};
use leditor_catalog_models::builtin;
use leditor_core::task::PendingTask;
use miette::{Context, Result};
use tracing::{error, info, trace};

use self::config::EditorConfig;
use self::init::get_leditor_dir;

type CatalogTask<C> = PendingTask<std::result::Result<C, LoaderError>>;

/// Frame budget of the splash screen, about 60 fps.
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Time left to sleep once a frame took `elapsed`.
fn frame_delay(elapsed: Duration) -> Duration {
    FRAME_TIME.saturating_sub(elapsed)
}

/// What the splash screen is waiting for.
enum LoadingStage {
    Tiles {
        tiles: TileLoader,
        props: PropLoader,
    },
    TileCatalog {
        build: CatalogTask<TileCatalog>,
        props: PropLoader,
    },
    Props {
        tiles: TileCatalog,
        props: PropLoader,
    },
    PropCatalog {
        tiles: TileCatalog,
        build: CatalogTask<PropCatalog>,
    },
    Ready {
        tiles: TileCatalog,
        props: PropCatalog,
    },
}

impl LoadingStage {
    /// One frame worth of loading.
    fn advance(self, egui_context: &mut egui::Context, steps_per_frame: usize) -> Result<Self> {
        Ok(match self {
            LoadingStage::Tiles { mut tiles, props } => {
                if tiles
                    .proceed_frame(egui_context, steps_per_frame)
                    .wrap_err("failed to load tiles")?
                {
                    LoadingStage::TileCatalog {
                        build: tiles.build_in_background(),
                        props,
                    }
                } else {
                    LoadingStage::Tiles { tiles, props }
                }
            }
            LoadingStage::TileCatalog { mut build, mut props } => {
                if build.is_finished() {
                    let tiles = build.take()??;
                    // tiles can be placed as props,
                    // the prop loader must know them before it proceeds
                    props.include_tiles(&tiles)?;
                    LoadingStage::Props { tiles, props }
                } else {
                    LoadingStage::TileCatalog { build, props }
                }
            }
            LoadingStage::Props { tiles, mut props } => {
                if props
                    .proceed_frame(egui_context, steps_per_frame)
                    .wrap_err("failed to load props")?
                {
                    LoadingStage::PropCatalog {
                        tiles,
                        build: props.build_in_background(),
                    }
                } else {
                    LoadingStage::Props { tiles, props }
                }
            }
            LoadingStage::PropCatalog { tiles, mut build } => {
                if build.is_finished() {
                    LoadingStage::Ready {
                        tiles,
                        props: build.take()??,
                    }
                } else {
                    LoadingStage::PropCatalog { tiles, build }
                }
            }
            ready @ LoadingStage::Ready { .. } => ready,
        })
    }

    /// Label and progress shown on the splash screen.
    fn status(&self) -> (&'static str, usize, usize) {
        match self {
            LoadingStage::Tiles { tiles, .. } => (
                phase_label(tiles.phase(), "Loading Tiles", "Loading Tile Textures"),
                tiles.progress(),
                tiles.total_progress(),
            ),
            LoadingStage::TileCatalog { .. } => ("Building Tile Dex", 1, 1),
            LoadingStage::Props { props, .. } => (
                phase_label(props.phase(), "Loading Props", "Loading Prop Textures"),
                props.progress(),
                props.total_progress(),
            ),
            LoadingStage::PropCatalog { .. } => ("Building Prop Dex", 1, 1),
            LoadingStage::Ready { .. } => ("Ready", 1, 1),
        }
    }
}

fn phase_label(phase: LoadPhase, packs: &'static str, textures: &'static str) -> &'static str {
    match phase {
        LoadPhase::Constructed | LoadPhase::Started | LoadPhase::PackLoading => packs,
        LoadPhase::TextureLoading => textures,
        _ => "Building Table",
    }
}

pub struct Leditor {
    egui_context: egui::Context,
    steps_per_frame: usize,
    stage: LoadingStage,
}

impl Leditor {
    pub fn new(config: EditorConfig) -> Result<Self> {
        let mut tiles: TileLoader =
            CatalogLoader::new(&config.tile_directories, config.loader.clone())
                .wrap_err("failed to create tile loader")?;
        let mut props: PropLoader =
            CatalogLoader::new(&config.prop_directories, config.loader.clone())
                .wrap_err("failed to create prop loader")?;
        tiles.start();
        props.start();
        if let Some(assets) = &config.props_assets_directory {
            props.include_defined(
                builtin::ROPES_CATEGORY,
                builtin::CATEGORY_COLOR,
                builtin::ropes(),
                assets,
            )?;
            props.include_defined(
                builtin::LONGS_CATEGORY,
                builtin::CATEGORY_COLOR,
                builtin::longs(),
                assets,
            )?;
        }
        info!(
            tiles = tiles.total_progress(),
            props = props.total_progress(),
            "loaders started"
        );
        Ok(Self {
            egui_context: egui::Context::default(),
            steps_per_frame: config.steps_per_frame,
            stage: LoadingStage::Tiles { tiles, props },
        })
    }

    /// Runs frames until both catalogs are available.
    pub fn load_catalogs(mut self) -> Result<(TileCatalog, PropCatalog)> {
        let start = std::time::SystemTime::now();
        let mut frame_count: u64 = 0;
        let mut last_label = "";
        loop {
            let frame_start = Instant::now();
            let mut uploader = self.egui_context.clone();
            self.stage = self.stage.advance(&mut uploader, self.steps_per_frame)?;
            frame_count += 1;

            let (label, progress, total) = self.stage.status();
            if label != last_label {
                info!(frame_count, "{label}");
                last_label = label;
            }
            let output = self.egui_context.run(egui::RawInput::default(), |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.label(label);
                    ui.add(
                        egui::ProgressBar::new(progress as f32 / total.max(1) as f32)
                            .text(format!("{progress} / {total}")),
                    );
                });
            });
            self.present(output);

            if let LoadingStage::Ready { tiles, props } = self.stage {
                let elapsed = start.elapsed().unwrap_or_default();
                info!(
                    frame_count,
                    tile_categories = tiles.category_count(),
                    tiles = tiles.item_count(),
                    prop_categories = props.category_count(),
                    props = props.item_count(),
                    "catalogs loaded in {} ms",
                    elapsed.as_millis()
                );
                return Ok((tiles, props));
            }
            // one splash frame per FRAME_TIME
            std::thread::sleep(frame_delay(frame_start.elapsed()));
        }
    }

    /// There is no window yet, the frame is tessellated and dropped.
    fn present(&self, output: egui::FullOutput) {
        let textures = output.textures_delta.set.len();
        let primitives = self
            .egui_context
            .tessellate(output.shapes, output.pixels_per_point);
        trace!(textures, primitives = primitives.len(), "frame presented");
    }
}

pub fn start_leditor() {
    let leditor_path: PathBuf = match get_leditor_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("failed to create leditor dir: {e:?}");
            panic!("failed to create leditor dir: {e:?}");
        }
    };

    let log_file_flush_guard = match leditor_core::trace::install_tracing(&leditor_path) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("failed to install tracing: {e:?}");
            panic!("failed to install tracing: {e:?}");
        }
    };

    if let Err(e) = rayon::ThreadPoolBuilder::default()
        .panic_handler(|panic_info| {
            error!(?panic_info, "rayon thread paniced.");
        })
        .build_global()
    {
        error!(
            ?e,
            "failed to set panic handler and build global threadpool for rayon"
        );
    }

    let result = config::EditorConfig::load_or_create(&leditor_path)
        .map(|config| config.resolved(&leditor_path))
        .and_then(Leditor::new)
        .and_then(Leditor::load_catalogs);
    if let Err(e) = result {
        error!("failed to load catalogs");
        eprintln!("{e:?}");
    }
    std::mem::drop(log_file_flush_guard);
}
