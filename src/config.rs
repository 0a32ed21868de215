use crate::error::GridError;
use crate::title::{TitleStyle, MAX_TITLE_SIZE};
use crate::tracks::{DEFAULT_TRACK_LENGTH, MAX_CELL_SPACING, MAX_COLUMN_COUNT, MAX_TRACK_LENGTH};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Width of an A4 page in PDF points
pub const A4_WIDTH_PT: f32 = 595.28;

/// Height of an A4 page in PDF points
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Initial values of the editor controls and export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub column_count: usize,
    pub default_track_length: u32,
    pub cell_spacing: u32,
    pub title: TitleStyle,
    pub export: ExportConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            column_count: 3,
            default_track_length: DEFAULT_TRACK_LENGTH,
            cell_spacing: 10,
            title: TitleStyle::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Rasterization and document settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Margin around the exported region in pixels
    pub padding_px: u32,
    /// Quality used for `jpg` output and the embedded PDF image
    pub jpeg_quality: u8,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// TrueType font used to rasterize text; text is drawn as placeholder
    /// bars when unset
    pub font_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            padding_px: 16,
            jpeg_quality: 90,
            page_width_pt: A4_WIDTH_PT,
            page_height_pt: A4_HEIGHT_PT,
            font_path: None,
        }
    }
}

impl EditorConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config from: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create config file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write config to: {}", path.display()))?;
        Ok(())
    }

    /// Check the values the editor model would reject
    pub fn validate(&self) -> Result<(), GridError> {
        if self.column_count == 0 || self.column_count > MAX_COLUMN_COUNT {
            return Err(GridError::invalid(
                "column count",
                i64::try_from(self.column_count).unwrap_or(i64::MAX),
            ));
        }
        if self.default_track_length == 0 || self.default_track_length > MAX_TRACK_LENGTH {
            return Err(GridError::invalid("default track length", self.default_track_length));
        }
        if self.cell_spacing > MAX_CELL_SPACING {
            return Err(GridError::invalid("cell spacing", self.cell_spacing));
        }
        if self.title.size_px == 0 || self.title.size_px > MAX_TITLE_SIZE {
            return Err(GridError::invalid("title font size", self.title.size_px));
        }
        if self.export.jpeg_quality == 0 || self.export.jpeg_quality > 100 {
            return Err(GridError::invalid("jpeg quality", self.export.jpeg_quality));
        }
        if self.export.page_width_pt <= 0.0 || self.export.page_height_pt <= 0.0 {
            return Err(GridError::invalid("page size", self.export.page_width_pt as i64));
        }
        Ok(())
    }
}
