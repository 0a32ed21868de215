use anyhow::{Context, Result};
use clap::Parser;
use grid_collage_editor::{
    loader, Editor, EditorConfig, ExportCoordinator, ExportFormat, FsFileReader, InputEvent,
    MenuCommand, PdfAssembler, RasterRenderer,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Compose a collage grid from image files and text and export it
#[derive(Debug, Parser)]
#[command(name = "grid_collage_editor", version)]
struct Args {
    /// JSON config with initial control values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of columns
    #[arg(long, allow_negative_numbers = true)]
    columns: Option<i64>,

    /// Gap between cells in pixels
    #[arg(long, allow_negative_numbers = true)]
    spacing: Option<i64>,

    /// Title text shown above the grid
    #[arg(long)]
    title: Option<String>,

    /// Image files, one cell each, in order
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Text cells, appended after the images
    #[arg(long = "text")]
    texts: Vec<String>,

    /// Output format: png, jpg or pdf
    #[arg(long, default_value = "png")]
    format: ExportFormat,

    /// Directory that receives grid.<ext>
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let mut editor = Editor::new(&config)?;

    if let Some(columns) = args.columns {
        editor.handle(InputEvent::ColumnCountChanged(columns))?;
    }
    if let Some(spacing) = args.spacing {
        editor.handle(InputEvent::CellSpacingChanged(spacing))?;
    }
    if let Some(title) = args.title {
        editor.set_title_text(title);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("grid-worker")
        .enable_all()
        .build()
        .context("Failed to start worker runtime")?;

    let decoded = runtime.block_on(loader::read_batch(&FsFileReader, args.images));
    let added = editor.append_decoded(decoded);
    log::info!("added {} image cells", added.len());

    for text in args.texts {
        let id = editor.append_text_cell();
        editor.click_cell(id)?;
        editor.apply_menu_command(MenuCommand::SetText(text))?;
    }

    let renderer = RasterRenderer::from_config(&config.export)?;
    let coordinator = ExportCoordinator::new(
        Arc::new(renderer),
        Arc::new(PdfAssembler::new(&config.export)),
    )
    .with_jpeg_quality(config.export.jpeg_quality);

    let artifact = runtime
        .block_on(coordinator.export(&mut editor, args.format))
        .with_context(|| format!("Failed to export {}", args.format))?;
    let path = artifact.save_in(&args.out)?;

    println!(
        "Wrote {} ({} cells, {} x {} tracks)",
        path.display(),
        editor.cells().len(),
        editor.column_count(),
        editor.row_count()
    );
    Ok(())
}
