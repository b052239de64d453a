//! End-to-end behaviour of the queue: intake, batch conversion, removal with
//! undo, and export.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tokio::sync::mpsc::UnboundedReceiver;
use image_converter_lib::commands::export_results;
use image_converter_lib::core::{
    ActionMode, AppState, BatchSettings, ChannelSink, CoreEvent, EntryStatus, HandleRegistry, ProgressType,
    SourceFile,
    MAX_QUEUE_ENTRIES, UNDO_GRACE_WINDOW,
};
use image_converter_lib::processing::engine::Surface;
use image_converter_lib::processing::{ConversionEngine, NativeExporter, SurfaceExporter, ARCHIVE_NAME};
use image_converter_lib::utils::{ConverterResult, OutputFormat};

fn png(name: &str, width: u32, height: u32) -> SourceFile {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 13) as u8, (y * 29) as u8, 200, 255])
    }));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    SourceFile::new(name, "image/png", out.into_inner())
}

fn app_with(exporter: Arc<dyn SurfaceExporter>) -> (AppState, UnboundedReceiver<CoreEvent>) {
    let (sink, rx) = ChannelSink::new();
    let engine = ConversionEngine::new(exporter, None, HandleRegistry::new());
    (AppState::new(engine, Arc::new(sink)), rx)
}

fn app() -> (AppState, UnboundedReceiver<CoreEvent>) {
    app_with(Arc::new(NativeExporter))
}

fn drain(rx: &mut UnboundedReceiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn notices(events: &[CoreEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::Notice(n) => Some(n.message.clone()),
            _ => None,
        })
        .collect()
}

/// A platform whose encoder silently answers every request with PNG.
struct PngOnly;

impl SurfaceExporter for PngOnly {
    fn export_binary(&self, surface: &Surface, _: OutputFormat, quality: f32) -> ConverterResult<Option<Vec<u8>>> {
        NativeExporter.export_binary(surface, OutputFormat::PNG, quality)
    }

    fn export_data_url(&self, surface: &Surface, _: OutputFormat, quality: f32) -> ConverterResult<String> {
        NativeExporter.export_data_url(surface, OutputFormat::PNG, quality)
    }
}

#[tokio::test(start_paused = true)]
async fn only_raster_images_become_entries() {
    let (state, mut rx) = app();
    let files = vec![
        png("a.png", 8, 8),
        SourceFile::new("notes.txt", "text/plain", b"hello".to_vec()),
        SourceFile::new("logo.svg", "image/svg+xml", b"<svg/>".to_vec()),
        png("b.png", 8, 8),
        png("c.png", 8, 8),
    ];

    let report = state.add_files(files).await;
    assert_eq!(report.dropped_non_image, 2);
    report.staged().await;

    let added: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            CoreEvent::EntryAdded { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["a.png", "b.png", "c.png"]);
    assert_eq!(state.len().await, 3);
    assert_eq!(state.summary().await.action, ActionMode::Ready { pending: 3 });
}

#[tokio::test(start_paused = true)]
async fn queue_never_exceeds_capacity() {
    let (state, _rx) = app();
    for round in 0..3 {
        let files = (0..45)
            .map(|i| SourceFile::new(format!("{round}-{i}.png"), "image/png", vec![0u8; 4]))
            .collect();
        state.add_files(files).await;
        assert!(state.len().await <= MAX_QUEUE_ENTRIES);
    }
    assert_eq!(state.len().await, MAX_QUEUE_ENTRIES);
}

#[tokio::test]
async fn five_entries_one_corrupt() {
    let (state, mut rx) = app();
    state.detect_capabilities().await;
    let files = vec![
        png("1.png", 6, 4),
        png("2.png", 6, 4),
        SourceFile::new("broken.jpg", "image/jpeg", b"\xff\xd8 definitely truncated".to_vec()),
        png("4.png", 6, 4),
        png("5.png", 6, 4),
    ];
    state.add_files(files).await.staged().await;
    drain(&mut rx);

    let summary = state.run_batch(BatchSettings::default()).await.unwrap();
    assert_eq!(summary.converted.len(), 4);
    assert_eq!(summary.failed.len(), 1);

    let entries = state.entries().await;
    let done = entries.iter().filter(|e| e.status == EntryStatus::Done).count();
    let failed: Vec<_> = entries.iter().filter(|e| e.status == EntryStatus::Failed).collect();
    assert_eq!(done, 4);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "broken.jpg");

    let events = drain(&mut rx);
    let failures: Vec<_> = notices(&events)
        .into_iter()
        .filter(|m| m.contains("broken.jpg"))
        .collect();
    assert_eq!(failures.len(), 1);

    // One progress update per processed entry, ending at 5/5.
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::BatchProgress(p) => Some((p.completed_tasks, p.total_tasks)),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first(), Some(&(0, 5)));
    assert_eq!(progress.last(), Some(&(5, 5)));
    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::BatchProgress(p) if p.progress_type == ProgressType::Error => Some(p.completed_tasks),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![3]);
    assert!(!state.is_processing());

    for entry in entries.iter().filter(|e| e.status == EntryStatus::Done) {
        let stats = entry.stats.as_ref().unwrap();
        assert!(stats.saved_percent <= 100);
        let artifact = state.download(&entry.id).await.unwrap();
        assert_eq!(stats.new_size, artifact.bytes.len() as u64);
        assert!(artifact.file_name.ends_with(".webp"));
    }
}

#[tokio::test]
async fn unsupported_platform_converts_to_png_and_says_so_once() {
    let (state, mut rx) = app_with(Arc::new(PngOnly));
    assert!(!state.detect_capabilities().await);
    assert!(!state.detect_capabilities().await);

    state
        .add_files(vec![png("x.png", 5, 5), png("y.png", 7, 3)])
        .await
        .staged()
        .await;
    state.run_batch(BatchSettings::default()).await.unwrap();

    for entry in state.entries().await {
        assert_eq!(entry.extension.as_deref(), Some(".png"));
    }
    let events = drain(&mut rx);
    let webp_notices = notices(&events).into_iter().filter(|m| m.contains("WebP")).count();
    assert_eq!(webp_notices, 1);
}

#[tokio::test]
async fn large_source_is_constrained() {
    let (state, _rx) = app();
    state.detect_capabilities().await;
    let ids = state.add_files(vec![png("wide.png", 5000, 300)]).await.staged().await;
    state.run_batch(BatchSettings { quality: 0.5, ..BatchSettings::default() }).await.unwrap();

    let artifact = state.download(&ids[0]).await.unwrap();
    let decoded = image::load_from_memory(&artifact.bytes).unwrap();
    assert_eq!(decoded.width(), 4096);
    assert_eq!(decoded.height(), 245);
}

#[tokio::test(start_paused = true)]
async fn removal_mid_run_is_skipped() {
    let (state, _rx) = app();
    let ids = state
        .add_files(vec![png("keep.png", 4, 4), png("drop.png", 4, 4)])
        .await
        .staged()
        .await;

    let runner = {
        let state = state.clone();
        tokio::spawn(async move { state.run_batch(BatchSettings::default()).await })
    };
    // Let the run take its snapshot and start on the first entry.
    while !state.is_processing() {
        tokio::task::yield_now().await;
    }
    assert!(state.remove(&ids[1]).await);
    let summary = runner.await.unwrap().unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.converted, vec![ids[0].clone()]);
    assert_eq!(summary.skipped, 1);
    assert!(state.status_of(&ids[1]).await.is_none());
    assert_eq!(state.status_of(&ids[0]).await, Some(EntryStatus::Done));
}

#[tokio::test(start_paused = true)]
async fn done_entries_can_be_undone_only_within_the_window() {
    let (state, _rx) = app();
    let ids = state
        .add_files(vec![png("a.png", 4, 4), png("b.png", 4, 4)])
        .await
        .staged()
        .await;
    state.run_batch(BatchSettings::default()).await.unwrap();
    assert_eq!(state.summary().await.action, ActionMode::Download { done: 2 });

    state.remove(&ids[0]).await;
    state.remove(&ids[1]).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(state.undo(&ids[0]).await);

    tokio::time::sleep(UNDO_GRACE_WINDOW).await;
    assert!(!state.undo(&ids[1]).await);
    assert_eq!(state.len().await, 1);
    assert_eq!(state.status_of(&ids[0]).await, Some(EntryStatus::Done));

    // Preview and result handles of the survivor only.
    assert_eq!(state.handles().live_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn archive_holds_visible_converted_entries() {
    let (state, _rx) = app();
    state.detect_capabilities().await;
    let ids = state
        .add_files(vec![
            png("same.png", 4, 4),
            png("same.jpg", 4, 4),
            png("hidden.png", 4, 4),
            png("pending.png", 4, 4),
        ])
        .await
        .staged()
        .await;
    assert!(state.build_archive().await.unwrap().is_none());

    state.remove(&ids[3]).await;
    state.run_batch(BatchSettings::default()).await.unwrap();
    state.add_files(vec![png("late.png", 4, 4)]).await.staged().await;
    state.remove(&ids[2]).await;

    let archive = state.build_archive().await.unwrap().unwrap();
    assert_eq!(archive.file_name, ARCHIVE_NAME);

    let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes.to_vec())).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["same (1).webp", "same.webp"]);
}

#[tokio::test(start_paused = true)]
async fn no_handles_outlive_their_entries() {
    let (state, _rx) = app();
    let ids = state
        .add_files(vec![png("a.png", 4, 4), png("b.png", 4, 4), png("c.png", 4, 4)])
        .await
        .staged()
        .await;
    state.remove(&ids[2]).await;
    state.run_batch(BatchSettings::default()).await.unwrap();

    for id in &ids[..2] {
        state.remove(id).await;
    }
    tokio::time::sleep(UNDO_GRACE_WINDOW + Duration::from_millis(10)).await;

    assert!(state.is_empty().await);
    assert_eq!(state.handles().live_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn separate_exports_never_overwrite_each_other() {
    let (state, _rx) = app();
    state.detect_capabilities().await;
    state
        .add_files(vec![png("a.png", 4, 4), png("a.jpg", 6, 6)])
        .await
        .staged()
        .await;
    state.run_batch(BatchSettings::default()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = export_results(&state, dir.path(), false).await.unwrap();
    assert_eq!(written.len(), 2);
    assert_ne!(written[0], written[1]);

    let mut on_disk: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, vec!["a (1).webp", "a.webp"]);
}
