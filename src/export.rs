//! Deselect, snapshot, encode

use crate::config::ExportConfig;
use crate::editor::Editor;
use crate::error::ExportError;
use crate::render::SnapshotSource;
use anyhow::{Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpg,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Jpg, ExportFormat::Pdf];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Fixed artifact name, `grid.<ext>`
    pub fn file_name(&self) -> String {
        format!("grid.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// A finished, downloadable export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its fixed name
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("Failed to write export: {}", path.display()))?;
        log::info!("saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Wraps a bitmap into a paged document
pub trait DocumentAssembler: Send + Sync {
    fn assemble(&self, page_image: &RgbaImage) -> Result<Vec<u8>, ExportError>;
}

/// Single-page PDF writer. The image spans the page width at its own aspect
/// ratio, anchored to the top of the page.
#[derive(Debug, Clone)]
pub struct PdfAssembler {
    page_width_pt: f32,
    page_height_pt: f32,
    jpeg_quality: u8,
}

impl PdfAssembler {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            page_width_pt: config.page_width_pt,
            page_height_pt: config.page_height_pt,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new(&ExportConfig::default())
    }
}

impl DocumentAssembler for PdfAssembler {
    fn assemble(&self, page_image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
        if page_image.width() == 0 || page_image.height() == 0 {
            return Err(ExportError::Document("empty snapshot".to_string()));
        }

        let jpeg = encode_jpeg(page_image, self.jpeg_quality)?;
        let (w, h) = (self.page_width_pt, self.page_height_pt);
        let draw_height = page_image.height() as f32 * w / page_image.width() as f32;
        let content = format!(
            "q\n{:.2} 0 0 {:.2} 0 {:.2} cm\n/Im0 Do\nQ\n",
            w,
            draw_height,
            h - draw_height
        );

        let mut pdf = PdfWriter::new();
        pdf.object(b"<< /Type /Catalog /Pages 2 0 R >>");
        pdf.object(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
        pdf.object(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /XObject << /Im0 5 0 R >> >> /Contents 4 0 R >>",
                w, h
            )
            .as_bytes(),
        );
        pdf.stream(&format!("<< /Length {} >>", content.len()), content.as_bytes());
        pdf.stream(
            &format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                page_image.width(),
                page_image.height(),
                jpeg.len()
            ),
            &jpeg,
        );
        Ok(pdf.finish())
    }
}

/// Minimal PDF object writer with a cross-reference table
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        Self {
            buf: b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec(),
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.buf.len());
        let header = format!("{} 0 obj\n", self.offsets.len());
        self.buf.extend_from_slice(header.as_bytes());
    }

    fn object(&mut self, body: &[u8]) {
        self.begin();
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dict: &str, data: &[u8]) {
        self.begin();
        self.buf.extend_from_slice(dict.as_bytes());
        self.buf.extend_from_slice(b"\nstream\n");
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_at = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            xref_at
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;
    Ok(bytes)
}

/// Clears the in-flight flag when an export resolves or is dropped
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs exports one at a time
#[derive(Clone)]
pub struct ExportCoordinator {
    snapshots: Arc<dyn SnapshotSource>,
    documents: Arc<dyn DocumentAssembler>,
    jpeg_quality: u8,
    in_flight: Arc<AtomicBool>,
}

impl ExportCoordinator {
    pub fn new(snapshots: Arc<dyn SnapshotSource>, documents: Arc<dyn DocumentAssembler>) -> Self {
        Self {
            snapshots,
            documents,
            jpeg_quality: ExportConfig::default().jpeg_quality,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Whether an export has started and not yet resolved
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start an export.
    ///
    /// The editor is deselected and its scene captured before this returns,
    /// so the snapshot never shows a selection or an open menu. The returned
    /// future resolves once the snapshot and encoding finish. A second export
    /// while one is pending resolves to `ExportInProgress` and leaves the
    /// editor untouched.
    pub fn export(
        &self,
        editor: &mut Editor,
        format: ExportFormat,
    ) -> BoxFuture<'static, Result<ExportArtifact, ExportError>> {
        let Some(guard) = InFlight::acquire(&self.in_flight) else {
            log::warn!("export to {} rejected, another export is pending", format);
            return future::ready(Err(ExportError::ExportInProgress)).boxed();
        };

        editor.deselect();
        let scene = editor.scene();
        log::info!("exporting {} cells as {}", scene.cells.len(), format);

        let snapshots = Arc::clone(&self.snapshots);
        let documents = Arc::clone(&self.documents);
        let jpeg_quality = self.jpeg_quality;

        async move {
            let _guard = guard;
            let image = snapshots.snapshot(&scene).await?;
            let bytes = match format {
                ExportFormat::Png => encode_png(&image)?,
                ExportFormat::Jpg => encode_jpeg(&image, jpeg_quality)?,
                ExportFormat::Pdf => documents.assemble(&image)?,
            };
            Ok(ExportArtifact {
                file_name: format.file_name(),
                mime: format.mime(),
                bytes,
            })
        }
        .boxed()
    }
}
