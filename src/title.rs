use crate::cell::{FontFamily, TextAlign};
use crate::error::GridError;
use serde::{Deserialize, Serialize};

/// Largest accepted title font size, in pixels
pub const MAX_TITLE_SIZE: u32 = 512;

/// Style of the document title shown above the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleStyle {
    pub text: String,
    pub font: FontFamily,
    pub size_px: u32,
    pub align: TextAlign,
}

impl Default for TitleStyle {
    fn default() -> Self {
        Self {
            text: "My Grid".to_string(),
            font: FontFamily::Arial,
            size_px: 24,
            align: TextAlign::Center,
        }
    }
}

impl TitleStyle {
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_font(&mut self, font: FontFamily) {
        self.font = font;
    }

    /// Set the font size; zero or anything above `MAX_TITLE_SIZE` is
    /// rejected and the previous size kept
    pub fn set_size(&mut self, size_px: u32) -> Result<(), GridError> {
        if size_px == 0 || size_px > MAX_TITLE_SIZE {
            return Err(GridError::invalid("title font size", size_px));
        }
        self.size_px = size_px;
        Ok(())
    }

    pub fn set_align(&mut self, align: TextAlign) {
        self.align = align;
    }

    pub fn current_style(&self) -> &TitleStyle {
        self
    }

    pub fn is_visible(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
