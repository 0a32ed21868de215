//! Render model and the software snapshot renderer

use crate::cell::{CellContent, CellId, FontFamily, TextAlign};
use crate::config::ExportConfig;
use crate::error::SnapshotError;
use crate::grid::Placement;
use crate::loader;
use crate::selection::ContextMenu;
use crate::title::TitleStyle;
use crate::tracks::{Axis, TrackTemplates};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::Context;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Immutable description of what to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Cells in reading order
    pub cells: Vec<SceneCell>,
    pub tracks: TrackTemplates,
    /// Gap between tracks, both axes
    pub gap_px: u32,
    pub title: TitleStyle,
    /// Menu of the selected cell, if any
    pub menu: Option<ContextMenu>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCell {
    pub id: CellId,
    pub placement: Placement,
    pub content: CellContent,
    pub selected: bool,
}

impl Scene {
    pub fn has_selection(&self) -> bool {
        self.cells.iter().any(|c| c.selected) || self.menu.is_some()
    }

    /// Pixel rectangle `(x, y, width, height)` of a placement relative to the
    /// grid origin
    pub fn cell_rect(&self, placement: Placement) -> Option<(u32, u32, u32, u32)> {
        let width = *self.tracks.columns.get(placement.column)?;
        let height = *self.tracks.rows.get(placement.row)?;
        Some((
            self.tracks.offset(Axis::Column, placement.column, self.gap_px),
            self.tracks.offset(Axis::Row, placement.row, self.gap_px),
            width,
            height,
        ))
    }
}

/// Produces a bitmap of the exportable region of a scene
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, scene: &Scene) -> Result<RgbaImage, SnapshotError>;
}

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_CELL_FILL: Rgba<u8> = Rgba([248, 249, 250, 255]);
const CELL_BORDER: Rgba<u8> = Rgba([222, 226, 230, 255]);
const SELECTION_BORDER: Rgba<u8> = Rgba([13, 110, 253, 255]);
const INK: Rgba<u8> = Rgba([33, 37, 41, 255]);

/// Font size used inside text cells
const CELL_TEXT_PX: f32 = 16.0;

/// Inner padding of text cells
const CELL_TEXT_INSET: u32 = 8;

/// Largest bitmap a snapshot may allocate
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Software renderer drawing a scene into an RGBA bitmap
pub struct RasterRenderer {
    padding: u32,
    font: Option<FontVec>,
}

impl RasterRenderer {
    pub fn new(padding: u32) -> Self {
        Self {
            padding,
            font: None,
        }
    }

    /// Renderer for the export settings, loading the configured font
    pub fn from_config(config: &ExportConfig) -> anyhow::Result<Self> {
        let mut renderer = Self::new(config.padding_px);
        if let Some(path) = &config.font_path {
            renderer = renderer.with_font_file(path)?;
        }
        Ok(renderer)
    }

    pub fn with_font_file(mut self, path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("Failed to parse font: {}", path.display()))?;
        self.font = Some(font);
        Ok(self)
    }

    fn title_height(&self, title: &TitleStyle) -> u32 {
        if title.is_visible() {
            (title.size_px as f32 * 1.5).ceil() as u32
        } else {
            0
        }
    }

    /// Draw the scene synchronously
    pub fn render(&self, scene: &Scene) -> Result<RgbaImage, SnapshotError> {
        let grid_width = scene.tracks.extent(Axis::Column, scene.gap_px);
        let grid_height = scene.tracks.extent(Axis::Row, scene.gap_px);
        let title_height = self.title_height(&scene.title);

        let (width, height) = canvas_size(grid_width, grid_height.saturating_add(title_height), self.padding)
            .ok_or_else(|| {
                SnapshotError::Rejected(format!(
                    "grid of {}x{} px exceeds the {} pixel canvas limit",
                    grid_width, grid_height, MAX_CANVAS_PIXELS
                ))
            })?;
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        if title_height > 0 {
            let area = (self.padding, self.padding, grid_width, title_height);
            self.draw_text_block(
                &mut canvas,
                area,
                &scene.title.text,
                scene.title.font,
                scene.title.size_px as f32,
                scene.title.align,
            );
        }

        let origin_y = self.padding + title_height;
        for cell in &scene.cells {
            let Some((x, y, w, h)) = scene.cell_rect(cell.placement) else {
                log::warn!("cell {} has no track at {:?}", cell.id, cell.placement);
                continue;
            };
            let rect = (self.padding + x, origin_y + y, w, h);

            match &cell.content {
                CellContent::Image(image) => {
                    let decoded = loader::decode_image(image).map_err(|e| SnapshotError::ImageDecode {
                        cell: cell.id,
                        reason: e.to_string(),
                    })?;
                    let tile = decoded.resize_to_fill(w, h, FilterType::Triangle).to_rgba8();
                    imageops::overlay(&mut canvas, &tile, rect.0 as i64, rect.1 as i64);
                }
                CellContent::Text { text, style } => {
                    fill_rect(&mut canvas, rect, TEXT_CELL_FILL);
                    stroke_rect(&mut canvas, rect, 1, CELL_BORDER);
                    let inner = inset(rect, CELL_TEXT_INSET);
                    self.draw_text_block(&mut canvas, inner, text, style.font, CELL_TEXT_PX, style.align);
                }
            }

            if cell.selected {
                stroke_rect(&mut canvas, rect, 3, SELECTION_BORDER);
            }
        }

        Ok(canvas)
    }

    /// Draw `text` line by line inside `area`, clipped to it
    fn draw_text_block(
        &self,
        canvas: &mut RgbaImage,
        area: (u32, u32, u32, u32),
        text: &str,
        family: FontFamily,
        size_px: f32,
        align: TextAlign,
    ) {
        let line_height = size_px * 1.25;
        for (line_no, line) in text.lines().enumerate() {
            let top = area.1 as f32 + line_no as f32 * line_height;
            if top + line_height > (area.1 + area.3) as f32 {
                break;
            }
            match &self.font {
                Some(font) => draw_glyph_line(canvas, font, area, top, line, size_px, align),
                None => draw_placeholder_line(canvas, area, top, line, family, size_px, align),
            }
        }
    }
}

/// Padded canvas dimensions, or `None` when they overflow or exceed
/// `MAX_CANVAS_PIXELS`
fn canvas_size(content_width: u32, content_height: u32, padding: u32) -> Option<(u32, u32)> {
    let margin = padding.checked_mul(2)?;
    let width = content_width.checked_add(margin)?;
    let height = content_height.checked_add(margin)?;
    let pixels = u64::from(width) * u64::from(height);
    (pixels <= MAX_CANVAS_PIXELS).then_some((width, height))
}

#[async_trait]
impl SnapshotSource for RasterRenderer {
    async fn snapshot(&self, scene: &Scene) -> Result<RgbaImage, SnapshotError> {
        self.render(scene)
    }
}

fn aligned_x(area: (u32, u32, u32, u32), line_width: f32, align: TextAlign) -> f32 {
    let free = (area.2 as f32 - line_width).max(0.0);
    let offset = match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => free / 2.0,
        TextAlign::Right => free,
    };
    area.0 as f32 + offset
}

fn draw_glyph_line(
    canvas: &mut RgbaImage,
    font: &FontVec,
    area: (u32, u32, u32, u32),
    top: f32,
    line: &str,
    size_px: f32,
    align: TextAlign,
) {
    let scale = PxScale::from(size_px);
    let scaled_font = font.as_scaled(scale);

    let line_width: f32 = line
        .chars()
        .map(|c| scaled_font.h_advance(scaled_font.glyph_id(c)))
        .sum();
    let baseline = top + scaled_font.ascent();
    let mut x_offset = aligned_x(area, line_width, align);
    let right = (area.0 + area.2) as f32;

    for c in line.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        let advance = scaled_font.h_advance(glyph_id);
        if x_offset + advance > right {
            break;
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(x_offset, baseline));
        if let Some(outlined) = scaled_font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = bounds.min.x as i64 + px as i64;
                let y = bounds.min.y as i64 + py as i64;
                blend_pixel(canvas, x, y, INK, coverage);
            });
        }

        x_offset += advance;
    }
}

/// Without a font, words are drawn as bars of their approximate width
fn draw_placeholder_line(
    canvas: &mut RgbaImage,
    area: (u32, u32, u32, u32),
    top: f32,
    line: &str,
    family: FontFamily,
    size_px: f32,
    align: TextAlign,
) {
    let char_width = if family.is_monospace() { size_px * 0.6 } else { size_px * 0.5 };
    let line_width = (line.chars().count() as f32 * char_width).min(area.2 as f32);
    let mut x = aligned_x(area, line_width, align);
    let bar_top = (top + size_px * 0.3) as u32;
    let bar_height = (size_px * 0.5).max(1.0) as u32;
    let right = x + line_width;

    for word in line.split(' ') {
        let word_width = word.chars().count() as f32 * char_width;
        let end = (x + word_width).min(right);
        if end > x {
            fill_rect(canvas, (x as u32, bar_top, (end - x) as u32, bar_height), INK);
        }
        x += word_width + char_width;
        if x >= right {
            break;
        }
    }
}

fn inset(rect: (u32, u32, u32, u32), by: u32) -> (u32, u32, u32, u32) {
    (
        rect.0 + by,
        rect.1 + by,
        rect.2.saturating_sub(2 * by),
        rect.3.saturating_sub(2 * by),
    )
}

fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let under = pixel.0[channel] as f32;
        let over = color.0[channel] as f32;
        pixel.0[channel] = (under + (over - under) * alpha).round() as u8;
    }
}

fn fill_rect(canvas: &mut RgbaImage, rect: (u32, u32, u32, u32), color: Rgba<u8>) {
    let x_end = (rect.0 + rect.2).min(canvas.width());
    let y_end = (rect.1 + rect.3).min(canvas.height());
    for y in rect.1..y_end {
        for x in rect.0..x_end {
            canvas.put_pixel(x, y, color);
        }
    }
}

fn stroke_rect(canvas: &mut RgbaImage, rect: (u32, u32, u32, u32), thickness: u32, color: Rgba<u8>) {
    let (x, y, w, h) = rect;
    let t = thickness.min(w / 2).min(h / 2).max(1);
    fill_rect(canvas, (x, y, w, t), color);
    fill_rect(canvas, (x, (y + h).saturating_sub(t), w, t), color);
    fill_rect(canvas, (x, y, t, h), color);
    fill_rect(canvas, ((x + w).saturating_sub(t), y, t, h), color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{ImageRef, TextStyle};
    use crate::loader::encode_data_uri;
    use futures::executor::block_on;
    use image::ImageFormat;
    use std::io::Cursor;

    fn red_png_uri() -> ImageRef {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        encode_data_uri("image/png", &bytes)
    }

    fn scene(cells: Vec<SceneCell>, title: &str) -> Scene {
        Scene {
            cells,
            tracks: TrackTemplates {
                columns: vec![40, 60],
                rows: vec![30],
            },
            gap_px: 10,
            title: TitleStyle {
                text: title.to_string(),
                ..TitleStyle::default()
            },
            menu: None,
        }
    }

    #[test]
    fn test_oversized_grid_rejected_without_panicking() {
        let mut huge = scene(vec![], "Title");
        huge.tracks.columns = vec![3_000_000_000, 3_000_000_000];
        huge.tracks.rows = vec![u32::MAX];
        huge.title.size_px = u32::MAX;

        let renderer = RasterRenderer::new(u32::MAX);
        assert!(matches!(renderer.render(&huge), Err(SnapshotError::Rejected(_))));
        assert!(matches!(
            block_on(renderer.snapshot(&huge)),
            Err(SnapshotError::Rejected(_))
        ));
    }

    #[test]
    fn test_canvas_limit() {
        assert_eq!(canvas_size(100, 50, 5), Some((110, 60)));
        assert_eq!(canvas_size(u32::MAX, 1, 1), None);
        assert_eq!(canvas_size(1, 1, u32::MAX), None);
        assert_eq!(canvas_size(10_000, 10_000, 0), None);
    }

    #[test]
    fn test_canvas_size_follows_tracks_and_gap() {
        let renderer = RasterRenderer::new(5);
        let image = renderer.render(&scene(vec![], "")).unwrap();
        assert_eq!(image.dimensions(), (40 + 10 + 60 + 10, 30 + 10));

        let titled = renderer.render(&scene(vec![], "Title")).unwrap();
        assert_eq!(titled.height(), 30 + 10 + 36);
    }

    #[test]
    fn test_image_cell_is_drawn_in_its_track() {
        let cell = SceneCell {
            id: CellId::from_raw(0),
            placement: Placement { row: 0, column: 1 },
            content: CellContent::Image(red_png_uri()),
            selected: false,
        };
        let renderer = RasterRenderer::new(0);
        let image = block_on(renderer.snapshot(&scene(vec![cell], ""))).unwrap();

        // Second column starts after 40px track and 10px gap
        let inside = image.get_pixel(75, 15);
        assert!(inside.0[0] > 250 && inside.0[1] < 5 && inside.0[2] < 5);
        assert_eq!(image.get_pixel(45, 15), &BACKGROUND);
    }

    #[test]
    fn test_text_cell_gets_fill_and_ink() {
        let cell = SceneCell {
            id: CellId::from_raw(0),
            placement: Placement { row: 0, column: 0 },
            content: CellContent::Text {
                text: "hello world".to_string(),
                style: TextStyle::default(),
            },
            selected: false,
        };
        let mut scene = scene(vec![cell], "");
        scene.tracks.columns = vec![200];
        scene.tracks.rows = vec![60];
        let image = RasterRenderer::new(0).render(&scene).unwrap();

        assert_eq!(image.get_pixel(1, 58), &TEXT_CELL_FILL);
        assert!(image.pixels().any(|p| *p == INK));
    }

    #[test]
    fn test_selected_cell_outlined() {
        let cell = SceneCell {
            id: CellId::from_raw(0),
            placement: Placement { row: 0, column: 0 },
            content: CellContent::Text {
                text: String::new(),
                style: TextStyle::default(),
            },
            selected: true,
        };
        let image = RasterRenderer::new(0).render(&scene(vec![cell], "")).unwrap();
        assert_eq!(image.get_pixel(0, 0), &SELECTION_BORDER);
    }

    #[test]
    fn test_broken_image_fails_snapshot() {
        let cell = SceneCell {
            id: CellId::from_raw(7),
            placement: Placement { row: 0, column: 0 },
            content: CellContent::Image(ImageRef::new("data:image/png;base64,AAAA")),
            selected: false,
        };
        let result = RasterRenderer::new(0).render(&scene(vec![cell], ""));
        assert!(matches!(
            result,
            Err(SnapshotError::ImageDecode { cell, .. }) if cell == CellId::from_raw(7)
        ));
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let config = ExportConfig {
            font_path: Some("/nonexistent/font.ttf".into()),
            ..ExportConfig::default()
        };
        assert!(RasterRenderer::from_config(&config).is_err());
    }
}
