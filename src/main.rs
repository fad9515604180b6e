mod app;
mod config;
mod content;
mod diagram;
mod gate;
mod prefs;
mod state;
mod theme;
mod ui;

use app::FolioApp;
use config::{Config, ConfigSource};
use content::Catalog;
use eframe::egui;
use prefs::store::FileStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "folio starting");
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "configuration loaded"),
        ConfigSource::Defaults(path) => {
            info!(path = %path.display(), "no configuration file, using defaults")
        }
    }

    let catalog = Catalog::load_builtin()?;
    info!(
        gallery = catalog.site.projects.len(),
        groups = catalog.groups.len(),
        case_studies = catalog.case_studies.len(),
        "content loaded"
    );

    let storage_dir = config.storage.resolved_dir();
    let (store, warnings) = FileStore::open(&storage_dir);
    for warning in warnings {
        warn!(dir = %storage_dir.display(), "storage: {warning}");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("folio-runtime")
        .build()?;

    let engine = diagram::engine_from_config(&config.diagrams);
    info!(engine = engine.name(), "diagram engine ready");

    let app = FolioApp::new(catalog, Box::new(store), engine, runtime.handle().clone());
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([720.0, 560.0])
            .with_title("Folio"),
        ..Default::default()
    };

    eframe::run_native(
        "Folio",
        native_options,
        Box::new(move |creation_context| {
            egui_extras::install_image_loaders(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
