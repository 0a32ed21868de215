// Helper functions to build editors and images for integration tests

use grid_collage_editor::{loader, CellId, Editor, EditorConfig, ImageRef};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Encode a solid-colour PNG of the given size
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// A tiny red PNG as a data URI
pub fn red_image() -> ImageRef {
    loader::encode_data_uri("image/png", &png_bytes(4, 4, [220, 20, 20, 255]))
}

/// Editor with default settings
pub fn empty_editor() -> Editor {
    Editor::new(&EditorConfig::default()).unwrap()
}

/// Editor holding `images` image cells followed by `texts` text cells
pub fn mixed_editor(images: usize, texts: usize) -> (Editor, Vec<CellId>) {
    let mut editor = empty_editor();
    let mut ids = Vec::new();
    for _ in 0..images {
        ids.push(editor.append_image_cell(red_image()));
    }
    for _ in 0..texts {
        ids.push(editor.append_text_cell());
    }
    (editor, ids)
}

/// Write a PNG into `dir` and return its path
pub fn write_png(dir: &Path, name: &str, color: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(3, 2, color)).unwrap();
    path
}
