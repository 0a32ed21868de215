mod fixtures;

use assert_matches::assert_matches;
use async_trait::async_trait;
use fixtures::sample_grids::{mixed_editor, write_png};
use futures::executor::block_on;
use grid_collage_editor::{
    loader, Axis, CellContent, EventType, ExportCoordinator, ExportError, ExportFormat,
    FileDecodeError, FsFileReader, InputEvent, PdfAssembler, RasterRenderer, Scene,
    SnapshotError, SnapshotSource,
};
use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};

/// Records every scene it is asked to capture
#[derive(Default)]
struct RecordingSource {
    scenes: Mutex<Vec<Scene>>,
}

#[async_trait]
impl SnapshotSource for RecordingSource {
    async fn snapshot(&self, scene: &Scene) -> Result<RgbaImage, SnapshotError> {
        self.scenes.lock().unwrap().push(scene.clone());
        Ok(RgbaImage::from_pixel(8, 6, Rgba([40, 80, 120, 255])))
    }
}

struct FailingSource;

#[async_trait]
impl SnapshotSource for FailingSource {
    async fn snapshot(&self, _scene: &Scene) -> Result<RgbaImage, SnapshotError> {
        Err(SnapshotError::Rejected("surface unavailable".to_string()))
    }
}

fn coordinator_with(source: Arc<dyn SnapshotSource>) -> ExportCoordinator {
    ExportCoordinator::new(source, Arc::new(PdfAssembler::default()))
}

#[test]
fn test_export_deselects_before_snapshot() {
    let (mut editor, ids) = mixed_editor(2, 1);
    editor.click_cell(ids[2]).unwrap();
    assert!(editor.scene().has_selection());

    let source = Arc::new(RecordingSource::default());
    let coordinator = coordinator_with(source.clone());

    let artifact = block_on(coordinator.export(&mut editor, ExportFormat::Png)).unwrap();
    assert_eq!(artifact.file_name, "grid.png");
    assert_eq!(artifact.mime, "image/png");

    let scenes = source.scenes.lock().unwrap();
    assert_eq!(scenes.len(), 1);
    assert!(!scenes[0].has_selection());
    assert!(scenes[0].menu.is_none());
    assert_eq!(scenes[0].cells.len(), 3);

    assert!(editor.selection().is_idle());
    assert_matches!(
        editor.events().last().map(|e| &e.event),
        Some(EventType::CellDeselected { id, .. }) if *id == ids[2]
    );
}

#[test]
fn test_second_export_rejected_while_pending() {
    let (mut editor, _) = mixed_editor(1, 0);
    let coordinator = coordinator_with(Arc::new(RecordingSource::default()));

    let first = coordinator.export(&mut editor, ExportFormat::Jpg);
    assert!(coordinator.is_busy());

    let second = block_on(coordinator.export(&mut editor, ExportFormat::Pdf));
    assert_matches!(second, Err(ExportError::ExportInProgress));

    let artifact = block_on(first).unwrap();
    assert_eq!(artifact.file_name, "grid.jpg");
    assert_eq!(
        image::guess_format(&artifact.bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
    assert!(!coordinator.is_busy());
}

#[test]
fn test_dropped_export_releases_the_slot() {
    let (mut editor, _) = mixed_editor(1, 0);
    let coordinator = coordinator_with(Arc::new(RecordingSource::default()));

    drop(coordinator.export(&mut editor, ExportFormat::Png));
    assert!(!coordinator.is_busy());
    assert!(block_on(coordinator.export(&mut editor, ExportFormat::Png)).is_ok());
}

#[test]
fn test_snapshot_failure_produces_no_artifact() {
    let (mut editor, _) = mixed_editor(2, 0);
    let coordinator = coordinator_with(Arc::new(FailingSource));

    let result = block_on(coordinator.export(&mut editor, ExportFormat::Pdf));
    assert_matches!(result, Err(ExportError::Snapshot(SnapshotError::Rejected(_))));
    assert!(!coordinator.is_busy());
}

#[test]
fn test_pdf_export_through_raster_renderer() {
    let (mut editor, ids) = mixed_editor(2, 1);
    editor.set_cell_text(ids[2], "Caption").unwrap();
    let coordinator = ExportCoordinator::new(
        Arc::new(RasterRenderer::new(8)),
        Arc::new(PdfAssembler::default()),
    );

    let artifact = block_on(coordinator.export(&mut editor, ExportFormat::Pdf)).unwrap();
    assert_eq!(artifact.file_name, "grid.pdf");
    assert_eq!(artifact.mime, "application/pdf");
    assert!(artifact.bytes.starts_with(b"%PDF-"));
    assert!(artifact.bytes.ends_with(b"%%EOF\n"));

    let dir = tempfile::tempdir().unwrap();
    let path = artifact.save_in(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("grid.pdf"));
    assert_eq!(std::fs::read(path).unwrap(), artifact.bytes);
}

#[tokio::test]
async fn test_file_batch_appends_decoded_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_png(dir.path(), "a.png", [255, 0, 0, 255]);
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not an image").unwrap();
    let missing = dir.path().join("missing.png");
    let second = write_png(dir.path(), "b.png", [0, 0, 255, 255]);

    let results = loader::read_batch(&FsFileReader, vec![first, notes, missing, second]).await;
    assert_eq!(results.len(), 4);
    assert_matches!(&results[1], Err(FileDecodeError::UnsupportedFormat { .. }));
    assert_matches!(&results[2], Err(FileDecodeError::Io { .. }));

    let (mut editor, _) = mixed_editor(0, 0);
    let added = editor.append_decoded(results);
    assert_eq!(added.len(), 2);
    assert_eq!(editor.cells().ids(), added);

    let colors: Vec<[u8; 4]> = added
        .iter()
        .map(|id| {
            let CellContent::Image(image) = &editor.cell(*id).unwrap().content else {
                panic!("cell {} is not an image", id);
            };
            loader::decode_image(image).unwrap().to_rgba8().get_pixel(0, 0).0
        })
        .collect();
    assert_eq!(colors, vec![[255, 0, 0, 255], [0, 0, 255, 255]]);
}

#[tokio::test]
async fn test_image_header_with_garbage_never_becomes_a_cell() {
    let dir = tempfile::tempdir().unwrap();
    let corrupt = dir.path().join("corrupt.png");
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend([0u8; 32]);
    std::fs::write(&corrupt, bytes).unwrap();
    let good = write_png(dir.path(), "good.png", [0, 200, 0, 255]);

    let results = loader::read_batch(&FsFileReader, vec![corrupt, good]).await;
    assert_matches!(&results[0], Err(FileDecodeError::Undecodable { .. }));

    let (mut editor, _) = mixed_editor(0, 0);
    assert_eq!(editor.append_decoded(results).len(), 1);

    let coordinator = ExportCoordinator::new(
        Arc::new(RasterRenderer::new(4)),
        Arc::new(PdfAssembler::default()),
    );
    let artifact = coordinator.export(&mut editor, ExportFormat::Png).await.unwrap();
    assert_eq!(artifact.file_name, "grid.png");
}

#[test]
fn test_extreme_control_values_keep_export_working() {
    let (mut editor, _) = mixed_editor(2, 1);
    let huge = i64::from(u32::MAX);

    for index in 0..2 {
        assert!(editor
            .handle(InputEvent::TrackLengthChanged { axis: Axis::Column, index, value: huge })
            .is_err());
    }
    assert!(editor
        .handle(InputEvent::TrackLengthChanged { axis: Axis::Row, index: 0, value: 3_000_000_000 })
        .is_err());
    assert!(editor.handle(InputEvent::CellSpacingChanged(huge)).is_err());
    assert!(editor.handle(InputEvent::TitleSizeChanged(huge)).is_err());

    let coordinator = ExportCoordinator::new(
        Arc::new(RasterRenderer::new(4)),
        Arc::new(PdfAssembler::default()),
    );
    let artifact = block_on(coordinator.export(&mut editor, ExportFormat::Png)).unwrap();
    let image = image::load_from_memory(&artifact.bytes).unwrap();
    // 3 columns of 150 with 10 px gaps, padded by 4 on each side
    assert_eq!(image.width(), 470 + 8);
}

#[test]
fn test_oversized_scene_fails_export_cleanly() {
    let (mut editor, _) = mixed_editor(0, 1);
    let coordinator = ExportCoordinator::new(
        Arc::new(RasterRenderer::new(u32::MAX)),
        Arc::new(PdfAssembler::default()),
    );

    let result = block_on(coordinator.export(&mut editor, ExportFormat::Png));
    assert_matches!(result, Err(ExportError::Snapshot(SnapshotError::Rejected(_))));
    assert!(!coordinator.is_busy());
}
