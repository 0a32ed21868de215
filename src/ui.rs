use crate::{
    loader, render::Scene, Axis, CellContent, CellId, EditorConfig, Editor, ExportArtifact,
    ExportCoordinator, ExportError, ExportFormat, FileDecodeError, FontFamily, FsFileReader,
    ImageRef, InputEvent, MenuCommand, MenuEntry, PdfAssembler, RasterRenderer, TextAlign,
};
use crate::selection::MenuId;
use anyhow::{Context as _, Result};
use egui::{
    pos2, vec2, Align2, Color32, FontId, LayerId, Order, Pos2, Rect, Sense, Stroke, TextureHandle, Vec2,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

type ImageBatch = Vec<Result<ImageRef, FileDecodeError>>;

const SELECTION_COLOR: Color32 = Color32::from_rgb(13, 110, 253);
const TEXT_CELL_FILL: Color32 = Color32::from_rgb(248, 249, 250);
const CELL_TEXT_SIZE: f32 = 16.0;

/// Work finished on the worker runtime
enum WorkerResult {
    Exported(Result<ExportArtifact, ExportError>),
    ImagesLoaded(ImageBatch),
}

/// Main application state
pub struct GridCollageApp {
    /// The editing session
    editor: Editor,

    /// Runs exports off the UI thread
    coordinator: ExportCoordinator,

    /// Runtime for exports and file decoding
    runtime: tokio::runtime::Runtime,

    /// Results sent back by worker tasks
    result_tx: mpsc::UnboundedSender<WorkerResult>,
    result_rx: mpsc::UnboundedReceiver<WorkerResult>,

    /// Textures of image cells, decoded once
    textures: HashMap<CellId, TextureHandle>,

    /// Directory receiving exported artifacts
    export_dir: PathBuf,

    /// UI state
    ui_state: UiState,

    /// Status message
    status_message: String,
}

#[derive(Default)]
struct UiState {
    /// Raw control values, validated by the editor
    column_input: i64,
    spacing_input: i64,
    title_size_input: i64,

    /// Title text buffer
    title_buffer: String,

    /// Path typed into the "add image" field
    image_path: String,

    /// Index of the cell being dragged
    dragging_from: Option<usize>,

    /// A cell took this frame's click
    cell_hit: bool,
}

impl GridCollageApp {
    pub fn new(config: EditorConfig) -> Result<Self> {
        let editor = Editor::new(&config)?;
        let renderer = RasterRenderer::from_config(&config.export)?;
        let coordinator = ExportCoordinator::new(
            Arc::new(renderer),
            Arc::new(PdfAssembler::new(&config.export)),
        )
        .with_jpeg_quality(config.export.jpeg_quality);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("grid-worker")
            .enable_all()
            .build()
            .context("Failed to start worker runtime")?;
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            editor,
            coordinator,
            runtime,
            result_tx,
            result_rx,
            textures: HashMap::new(),
            export_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            ui_state: UiState::default(),
            status_message: "Drop images or add text to start a grid".to_string(),
        };
        app.ui_state.title_buffer = app.editor.title().text.clone();
        app.sync_inputs();
        Ok(app)
    }

    /// Route an input to the editor, reporting rejected values in the status bar
    fn apply(&mut self, input: InputEvent) {
        if let Err(e) = self.editor.handle(input) {
            log::debug!("input rejected: {}", e);
            self.status_message = format!("⚠ {}", e);
            self.sync_inputs();
        }
    }

    /// Reset the numeric controls to the values the editor holds
    fn sync_inputs(&mut self) {
        self.ui_state.column_input = self.editor.column_count() as i64;
        self.ui_state.spacing_input = i64::from(self.editor.gap_px());
        self.ui_state.title_size_input = i64::from(self.editor.title().size_px);
    }

    fn start_export(&mut self, ctx: &egui::Context, format: ExportFormat) {
        if self.coordinator.is_busy() {
            self.status_message = "⚠ An export is already running".to_string();
            return;
        }

        let export = self.coordinator.export(&mut self.editor, format);
        let result_tx = self.result_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let _ = result_tx.send(WorkerResult::Exported(export.await));
            ctx.request_repaint();
        });
        self.status_message = format!("Exporting {}...", format.file_name());
    }

    fn load_images(&mut self, ctx: &egui::Context, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        log::debug!("loading {} image file(s)", paths.len());
        let result_tx = self.result_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let batch = loader::read_batch(&FsFileReader, paths).await;
            let _ = result_tx.send(WorkerResult::ImagesLoaded(batch));
            ctx.request_repaint();
        });
    }

    /// Collect finished exports and image decodes
    fn poll_background(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            match result {
                WorkerResult::Exported(Ok(artifact)) => {
                    self.status_message = match artifact.save_in(&self.export_dir) {
                        Ok(path) => format!("✓ Exported {}", path.display()),
                        Err(e) => format!("❌ {:#}", e),
                    };
                }
                WorkerResult::Exported(Err(e)) => {
                    self.status_message = format!("❌ Export failed: {}", e);
                }
                WorkerResult::ImagesLoaded(batch) => {
                    let total = batch.len();
                    let added = self.editor.append_decoded(batch);
                    self.status_message = if added.len() == total {
                        format!("✓ Added {} image(s)", added.len())
                    } else {
                        format!("⚠ Added {} of {} image(s)", added.len(), total)
                    };
                }
            }
        }

        let editor = &self.editor;
        self.textures.retain(|id, _| editor.cell(*id).is_some());
    }

    fn render_ui(&mut self, ctx: &egui::Context) {
        self.poll_background();

        let click_pos = ctx.input(|i| {
            if i.pointer.primary_clicked() {
                i.pointer.interact_pos()
            } else {
                None
            }
        });
        self.ui_state.cell_hit = false;

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        self.load_images(ctx, dropped);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.apply(InputEvent::ClickedOutside);
        }

        // Toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("📝 Add Text").clicked() {
                    self.apply(InputEvent::AddTextCell);
                }
                ui.separator();

                ui.label("Image:");
                ui.text_edit_singleline(&mut self.ui_state.image_path);
                if ui.button("🖼 Add Image").clicked() && !self.ui_state.image_path.trim().is_empty() {
                    let path = PathBuf::from(self.ui_state.image_path.trim());
                    self.ui_state.image_path.clear();
                    let ctx = ui.ctx().clone();
                    self.load_images(&ctx, vec![path]);
                }
                ui.separator();

                let idle = !self.coordinator.is_busy();
                for format in ExportFormat::ALL {
                    let label = format!("⬇ {}", format.extension().to_uppercase());
                    if ui.add_enabled(idle, egui::Button::new(label)).clicked() {
                        let ctx = ui.ctx().clone();
                        self.start_export(&ctx, format);
                    }
                }
                ui.separator();

                ui.label(format!("Cells: {}", self.editor.cells().len()));
                ui.label(format!(
                    "Grid: {} × {}",
                    self.editor.column_count(),
                    self.editor.row_count()
                ));
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
            });
        });

        // Left panel (layout and title controls)
        egui::SidePanel::left("controls_panel")
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_layout_controls(ui);
                    ui.separator();
                    self.render_title_controls(ui);
                });
            });

        // Central panel (grid)
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                self.render_grid(ui);
            });
        });

        self.render_context_menu(ctx);

        // Any click that no cell took and that missed the menu and its
        // popups counts as a click outside, panels included
        if let Some(pos) = click_pos {
            let menu_layer = self.editor.selection().menu().map(|m| menu_layer(m.id));
            if !self.ui_state.cell_hit && is_outside_click(ctx.layer_id_at(pos), menu_layer) {
                self.apply(InputEvent::ClickedOutside);
            }
        }
    }

    /// Columns, spacing and per-track lengths
    fn render_layout_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Layout");

        ui.horizontal(|ui| {
            ui.label("Columns:");
            if ui.add(egui::DragValue::new(&mut self.ui_state.column_input)).changed() {
                self.apply(InputEvent::ColumnCountChanged(self.ui_state.column_input));
            }
        });
        ui.horizontal(|ui| {
            ui.label("Spacing (px):");
            if ui.add(egui::DragValue::new(&mut self.ui_state.spacing_input)).changed() {
                self.apply(InputEvent::CellSpacingChanged(self.ui_state.spacing_input));
            }
        });

        for (axis, label) in [(Axis::Column, "Column widths"), (Axis::Row, "Row heights")] {
            ui.label(label);
            let count = match axis {
                Axis::Column => self.editor.column_count(),
                Axis::Row => self.editor.row_count(),
            };
            ui.horizontal_wrapped(|ui| {
                for index in 0..count {
                    let Some(length) = self.editor.tracks().track_length(axis, index) else {
                        continue;
                    };
                    let mut value = length as i64;
                    if ui.add(egui::DragValue::new(&mut value).suffix("px")).changed() {
                        self.apply(InputEvent::TrackLengthChanged { axis, index, value });
                    }
                }
            });
        }
    }

    fn render_title_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Title");

        if ui.text_edit_singleline(&mut self.ui_state.title_buffer).changed() {
            let text = self.ui_state.title_buffer.clone();
            self.apply(InputEvent::TitleTextChanged(text));
        }

        let current = self.editor.title().font;
        let mut font = current;
        egui::ComboBox::from_label("Title font")
            .selected_text(font.name())
            .show_ui(ui, |ui| {
                for option in FontFamily::ALL {
                    ui.selectable_value(&mut font, option, option.name());
                }
            });
        if font != current {
            self.apply(InputEvent::TitleFontChanged(font));
        }

        ui.horizontal(|ui| {
            ui.label("Size (px):");
            if ui.add(egui::DragValue::new(&mut self.ui_state.title_size_input)).changed() {
                self.apply(InputEvent::TitleSizeChanged(self.ui_state.title_size_input));
            }
        });

        let current = self.editor.title().align;
        let mut align = current;
        ui.horizontal(|ui| {
            for option in TextAlign::ALL {
                ui.radio_value(&mut align, option, option.as_str());
            }
        });
        if align != current {
            self.apply(InputEvent::TitleAlignChanged(align));
        }
    }

    /// Draw title and cells, and turn pointer input into editor events
    fn render_grid(&mut self, ui: &mut egui::Ui) {
        let scene = self.editor.scene();
        let title_height = if scene.title.is_visible() {
            scene.title.size_px as f32 * 1.5
        } else {
            0.0
        };
        let grid_width = scene.tracks.extent(Axis::Column, scene.gap_px) as f32;
        let grid_height = scene.tracks.extent(Axis::Row, scene.gap_px) as f32;
        let desired = vec2(grid_width, grid_height + title_height).max(ui.available_size());

        let (response, painter) = ui.allocate_painter(desired, Sense::hover());
        let origin = response.rect.min;

        if title_height > 0.0 {
            let (x, anchor) = match scene.title.align {
                TextAlign::Left => (origin.x, Align2::LEFT_TOP),
                TextAlign::Center => (origin.x + grid_width / 2.0, Align2::CENTER_TOP),
                TextAlign::Right => (origin.x + grid_width, Align2::RIGHT_TOP),
            };
            painter.text(
                pos2(x, origin.y),
                anchor,
                &scene.title.text,
                egui_font(scene.title.font, scene.title.size_px as f32),
                Color32::BLACK,
            );
        }

        let grid_origin = origin + vec2(0.0, title_height);
        let rects: Vec<Rect> = scene
            .cells
            .iter()
            .map(|cell| cell_screen_rect(&scene, cell.placement, grid_origin))
            .collect();

        let pointer = ui.input(|i| i.pointer.interact_pos());
        for (index, (cell, rect)) in scene.cells.iter().zip(&rects).enumerate() {
            match &cell.content {
                CellContent::Image(image) => match self.texture_for(ui.ctx(), cell.id, image) {
                    Some(texture) => {
                        let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                        painter.image(texture.id(), *rect, uv, Color32::WHITE);
                    }
                    None => {
                        painter.rect_filled(*rect, 0.0, Color32::from_rgb(255, 230, 230));
                    }
                },
                CellContent::Text { text, style } => {
                    painter.rect_filled(*rect, 2.0, TEXT_CELL_FILL);
                    painter.rect_stroke(*rect, 2.0, Stroke::new(1.0, Color32::LIGHT_GRAY));
                    let inner = rect.shrink(8.0);
                    let (x, anchor) = match style.align {
                        TextAlign::Left => (inner.left(), Align2::LEFT_TOP),
                        TextAlign::Center => (inner.center().x, Align2::CENTER_TOP),
                        TextAlign::Right => (inner.right(), Align2::RIGHT_TOP),
                    };
                    let (shown, color) = if text.is_empty() {
                        ("Enter text...", Color32::GRAY)
                    } else {
                        (text.as_str(), Color32::BLACK)
                    };
                    painter.with_clip_rect(*rect).text(
                        pos2(x, inner.top()),
                        anchor,
                        shown,
                        egui_font(style.font, CELL_TEXT_SIZE),
                        color,
                    );
                }
            }

            if cell.selected {
                painter.rect_stroke(*rect, 0.0, Stroke::new(3.0, SELECTION_COLOR));
            }

            let cell_response = ui.interact(
                *rect,
                egui::Id::new(("grid_cell", cell.id)),
                Sense::click_and_drag(),
            );
            if cell_response.clicked() {
                self.ui_state.cell_hit = true;
                self.apply(InputEvent::CellClicked(cell.id));
            }
            if cell_response.drag_started() {
                self.ui_state.cell_hit = true;
                self.ui_state.dragging_from = Some(index);
            }
            if cell_response.drag_stopped() {
                if let (Some(from), Some(pos)) = (self.ui_state.dragging_from.take(), pointer) {
                    if let Some(to) = drop_target(&rects, pos) {
                        if from != to {
                            self.apply(InputEvent::ReorderCompleted { from, to });
                        }
                    }
                }
            }
        }

        // Drop indicator
        if let (Some(_), Some(pos)) = (self.ui_state.dragging_from, pointer) {
            if let Some(target) = drop_target(&rects, pos) {
                painter.rect_stroke(rects[target], 0.0, Stroke::new(2.0, Color32::from_rgb(0, 160, 120)));
            }
        }
    }

    /// Context menu for the selected cell
    fn render_context_menu(&mut self, ctx: &egui::Context) {
        let Some(menu) = self.editor.selection().menu().cloned() else {
            return;
        };
        let text = self
            .editor
            .cell(menu.cell)
            .and_then(|c| c.content.as_text())
            .map(str::to_string);

        let mut command = None;
        egui::Window::new(format!("Cell {}", menu.cell))
            .id(menu_window_id(menu.id))
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                for entry in &menu.entries {
                    match entry {
                        MenuEntry::Remove => {
                            if ui.button("🗑 Remove").clicked() {
                                command = Some(MenuCommand::Remove);
                            }
                        }
                        MenuEntry::Font { options, current } => {
                            let mut font = *current;
                            egui::ComboBox::from_label("Font")
                                .selected_text(font.name())
                                .show_ui(ui, |ui| {
                                    for option in options {
                                        ui.selectable_value(&mut font, *option, option.name());
                                    }
                                });
                            if font != *current {
                                command = Some(MenuCommand::SetFont(font));
                            }
                        }
                        MenuEntry::Align { current } => {
                            ui.horizontal(|ui| {
                                for align in TextAlign::ALL {
                                    if ui.selectable_label(*current == align, align.short_label()).clicked() {
                                        command = Some(MenuCommand::SetAlign(align));
                                    }
                                }
                            });
                        }
                    }
                }

                if let Some(mut buffer) = text {
                    ui.separator();
                    if ui.text_edit_multiline(&mut buffer).changed() {
                        command = Some(MenuCommand::SetText(buffer));
                    }
                }
            });

        if let Some(command) = command {
            self.apply(InputEvent::Menu(command));
        }
    }

    fn texture_for(&mut self, ctx: &egui::Context, id: CellId, image: &ImageRef) -> Option<TextureHandle> {
        if let Some(texture) = self.textures.get(&id) {
            return Some(texture.clone());
        }

        let decoded = match loader::decode_image(image) {
            Ok(decoded) => decoded.to_rgba8(),
            Err(e) => {
                log::warn!("cell {} image unreadable: {}", id, e);
                return None;
            }
        };
        let size = [decoded.width() as usize, decoded.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, decoded.as_raw());
        let texture = ctx.load_texture(format!("cell-{}", id), color_image, egui::TextureOptions::LINEAR);
        self.textures.insert(id, texture.clone());
        Some(texture)
    }
}

fn egui_font(font: FontFamily, size: f32) -> FontId {
    if font.is_monospace() {
        FontId::monospace(size)
    } else {
        FontId::proportional(size)
    }
}

fn cell_screen_rect(scene: &Scene, placement: crate::Placement, origin: Pos2) -> Rect {
    match scene.cell_rect(placement) {
        Some((x, y, w, h)) => Rect::from_min_size(origin + vec2(x as f32, y as f32), vec2(w as f32, h as f32)),
        None => Rect::from_min_size(origin, Vec2::ZERO),
    }
}

fn menu_window_id(menu: MenuId) -> egui::Id {
    egui::Id::new(("context_menu", menu))
}

/// Layer the context menu window is drawn on
fn menu_layer(menu: MenuId) -> LayerId {
    LayerId::new(Order::Middle, menu_window_id(menu))
}

/// Whether a click on `layer` lands outside the open menu and its popups
fn is_outside_click(layer: Option<LayerId>, menu: Option<LayerId>) -> bool {
    match layer {
        None => true,
        Some(layer) if Some(layer) == menu => false,
        Some(layer) => matches!(layer.order, Order::Background | Order::PanelResizeLine | Order::Middle),
    }
}

/// Index of the cell under the pointer
fn drop_target(rects: &[Rect], pos: Pos2) -> Option<usize> {
    rects.iter().position(|r| r.contains(pos))
}

impl eframe::App for GridCollageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_ui(ctx);
    }
}
