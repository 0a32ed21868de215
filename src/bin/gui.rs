use anyhow::anyhow;
use eframe::egui;
use grid_collage_editor::{EditorConfig, GridCollageApp};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => EditorConfig::load(&path)?,
        None => EditorConfig::default(),
    };
    let app = GridCollageApp::new(config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Grid Collage Editor")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Grid Collage Editor",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow!("{}", e))
}
