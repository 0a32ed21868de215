use crate::id_generator::IdGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identity of a cell, independent of its grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(u64);

impl CellId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&IdGenerator::encode(self.0))
    }
}

impl FromStr for CellId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdGenerator::decode(s)
            .map(CellId)
            .ok_or_else(|| format!("invalid cell id: {}", s))
    }
}

/// A cell in the grid, either an image or an editable text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Unique identifier, never reused within a session
    pub id: CellId,

    /// Cell content
    pub content: CellContent,
}

impl Cell {
    /// Create a new image cell
    pub fn image(id: CellId, image: ImageRef) -> Self {
        Self {
            id,
            content: CellContent::Image(image),
        }
    }

    /// Create a new empty text cell with the default style
    pub fn text(id: CellId) -> Self {
        Self {
            id,
            content: CellContent::Text {
                text: String::new(),
                style: TextStyle::default(),
            },
        }
    }

    pub fn kind(&self) -> CellKind {
        match self.content {
            CellContent::Image(_) => CellKind::Image,
            CellContent::Text { .. } => CellKind::Text,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind() == CellKind::Text
    }

    /// Style of a text cell
    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.content {
            CellContent::Text { style, .. } => Some(style),
            CellContent::Image(_) => None,
        }
    }

    /// Mutable style of a text cell; image cells are immutable
    pub fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match &mut self.content {
            CellContent::Text { style, .. } => Some(style),
            CellContent::Image(_) => None,
        }
    }

    /// Replace the text of a text cell. Returns false for image cells.
    pub fn set_text(&mut self, new_text: impl Into<String>) -> bool {
        match &mut self.content {
            CellContent::Text { text, .. } => {
                *text = new_text.into();
                true
            }
            CellContent::Image(_) => false,
        }
    }
}

/// Variant tag of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Image,
    Text,
}

/// Cell content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    /// Encoded image reference, immutable after creation
    Image(ImageRef),

    /// Editable text with its own style
    Text { text: String, style: TextStyle },
}

impl CellContent {
    /// Get the text of a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellContent::Text { text, .. } => Some(text),
            CellContent::Image(_) => None,
        }
    }
}

/// Opaque image reference holding an encoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-cell text style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: FontFamily,
    pub align: TextAlign,
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub const ALL: [TextAlign; 3] = [TextAlign::Left, TextAlign::Center, TextAlign::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }

    /// Single-letter label used on alignment buttons
    pub fn short_label(&self) -> &'static str {
        match self {
            TextAlign::Left => "L",
            TextAlign::Center => "C",
            TextAlign::Right => "R",
        }
    }
}

impl FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextAlign::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown alignment: {}", s))
    }
}

/// The fixed font list offered for titles and text cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Arial,
    Verdana,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
    Georgia,
    #[serde(rename = "Courier New")]
    CourierNew,
    Cursive,
    Fantasy,
}

impl FontFamily {
    pub const ALL: [FontFamily; 7] = [
        FontFamily::Arial,
        FontFamily::Verdana,
        FontFamily::TimesNewRoman,
        FontFamily::Georgia,
        FontFamily::CourierNew,
        FontFamily::Cursive,
        FontFamily::Fantasy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::Verdana => "Verdana",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::Georgia => "Georgia",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Cursive => "Cursive",
            FontFamily::Fantasy => "Fantasy",
        }
    }

    pub fn is_monospace(&self) -> bool {
        matches!(self, FontFamily::CourierNew)
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FontFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FontFamily::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown font: {}", s))
    }
}
