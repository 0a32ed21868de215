//! Turning user-supplied files into image references

use crate::cell::ImageRef;
use crate::error::FileDecodeError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use image::DynamicImage;
use std::path::PathBuf;

/// Reads one file handle into a `data:` URI
#[async_trait]
pub trait FileReader: Send + Sync {
    type Handle: Send + 'static;

    async fn read_as_data_url(&self, handle: Self::Handle) -> Result<ImageRef, FileDecodeError>;
}

/// Reads image files from the local file system.
///
/// Reads go through `tokio::fs` and decoding runs on the blocking pool, so
/// this reader must be driven from inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

#[async_trait]
impl FileReader for FsFileReader {
    type Handle = PathBuf;

    async fn read_as_data_url(&self, path: PathBuf) -> Result<ImageRef, FileDecodeError> {
        let bytes = tokio::fs::read(&path).await.map_err(|source| FileDecodeError::Io {
            path: path.clone(),
            source,
        })?;

        let worker_path = path.clone();
        tokio::task::spawn_blocking(move || verify_image(worker_path, bytes))
            .await
            .map_err(|e| FileDecodeError::Io {
                path,
                source: std::io::Error::other(e),
            })?
    }
}

/// Accept `bytes` only if they decode to a complete image
fn verify_image(path: PathBuf, bytes: Vec<u8>) -> Result<ImageRef, FileDecodeError> {
    let format = image::guess_format(&bytes)
        .map_err(|_| FileDecodeError::UnsupportedFormat { path: path.clone() })?;
    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|source| match source {
        image::ImageError::Unsupported(_) => FileDecodeError::UnsupportedFormat { path: path.clone() },
        source => FileDecodeError::Undecodable {
            path: path.clone(),
            source,
        },
    })?;

    log::debug!(
        "read {} ({} bytes, {:?}, {}x{})",
        path.display(),
        bytes.len(),
        format,
        decoded.width(),
        decoded.height()
    );
    Ok(encode_data_uri(format.to_mime_type(), &bytes))
}

/// Decode every handle concurrently. Results keep the input order.
pub async fn read_batch<R: FileReader>(
    reader: &R,
    handles: Vec<R::Handle>,
) -> Vec<Result<ImageRef, FileDecodeError>> {
    join_all(handles.into_iter().map(|h| reader.read_as_data_url(h))).await
}

/// Build a base64 `data:` URI
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> ImageRef {
    ImageRef::new(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Split a base64 `data:` URI into its mime type and payload
pub fn decode_data_uri(image: &ImageRef) -> Result<(String, Vec<u8>), FileDecodeError> {
    let malformed = || FileDecodeError::MalformedDataUri(truncated(image.as_str()));

    let rest = image.as_str().strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let mime = header.strip_suffix(";base64").ok_or_else(malformed)?;
    let bytes = STANDARD.decode(payload.trim()).map_err(|_| malformed())?;

    Ok((mime.to_string(), bytes))
}

/// Decode the image behind a reference
pub fn decode_image(image: &ImageRef) -> Result<DynamicImage, FileDecodeError> {
    let (_, bytes) = decode_data_uri(image)?;
    image::load_from_memory(&bytes)
        .map_err(|e| FileDecodeError::MalformedDataUri(format!("{}: {}", truncated(image.as_str()), e)))
}

fn truncated(uri: &str) -> String {
    uri.chars().take(32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(2, 3, Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_data_uri_round_trip() {
        let uri = encode_data_uri("image/png", &png_bytes());
        assert!(uri.as_str().starts_with("data:image/png;base64,"));

        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, png_bytes());

        let decoded = decode_image(&uri).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 3));
    }

    #[test]
    fn test_malformed_uris() {
        for uri in ["http://example.com/a.png", "data:image/png,raw", "data:image/png;base64"] {
            assert_matches!(
                decode_data_uri(&ImageRef::new(uri)),
                Err(FileDecodeError::MalformedDataUri(_))
            );
        }
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order_and_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("a.png");
        let text = dir.path().join("notes.txt");
        let missing = dir.path().join("missing.png");
        std::fs::write(&good, png_bytes()).unwrap();
        std::fs::write(&text, b"not an image").unwrap();

        let results = read_batch(&FsFileReader, vec![good.clone(), text, missing, good]).await;

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert_matches!(results[1], Err(FileDecodeError::UnsupportedFormat { .. }));
        assert_matches!(results[2], Err(FileDecodeError::Io { .. }));
        assert_eq!(results[3].as_ref().ok(), results[0].as_ref().ok());
    }

    #[tokio::test]
    async fn test_valid_header_with_corrupt_body_rejected() {
        let dir = TempDir::new().unwrap();
        let corrupt = dir.path().join("broken.png");
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend([0u8; 32]);
        std::fs::write(&corrupt, bytes).unwrap();

        let good = dir.path().join("good.png");
        std::fs::write(&good, png_bytes()).unwrap();

        let results = read_batch(&FsFileReader, vec![corrupt, good]).await;
        assert_matches!(results[0], Err(FileDecodeError::Undecodable { .. }));
        assert!(results[1].is_ok());
    }

    /// Reader doing blocking work per handle on the blocking pool, like
    /// `FsFileReader`
    struct SlowReader;

    #[async_trait]
    impl FileReader for SlowReader {
        type Handle = u8;

        async fn read_as_data_url(&self, handle: u8) -> Result<ImageRef, FileDecodeError> {
            tokio::task::spawn_blocking(move || {
                std::thread::sleep(Duration::from_millis(200));
                encode_data_uri("image/png", &[handle])
            })
            .await
            .map_err(|e| FileDecodeError::MalformedDataUri(e.to_string()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_reads_overlap() {
        let started = Instant::now();
        let results = read_batch(&SlowReader, vec![1, 2, 3, 4]).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 4);
        let payloads: Vec<u8> = results
            .iter()
            .map(|r| decode_data_uri(r.as_ref().unwrap()).unwrap().1[0])
            .collect();
        assert_eq!(payloads, vec![1, 2, 3, 4]);
        assert!(elapsed < Duration::from_millis(600), "batch took {:?}", elapsed);
    }
}
