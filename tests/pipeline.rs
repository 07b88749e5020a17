//! Pipeline integration tests.
//!
//! The conversion service and pdfium are replaced by the fakes in `common`,
//! so these run offline and without the pdfium library.

mod common;

use common::*;
use slide_visuals::{
    extract, extract_from_bytes, extract_to_file, inspect, inspect_with_config,
    write_atomic, ExtractionConfig, ExtractionProgressCallback, ShapeKind, SlideSelection,
    SlideVisualsError,
};
use std::sync::{Arc, Mutex};

fn config(converter: Arc<ScriptedConverter>, renderer: Arc<FakeRenderer>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .converter(converter)
        .renderer(renderer)
        .build()
        .unwrap()
}

fn write_deck(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path.to_string_lossy().into_owned()
}

// ── Detection ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn visual_slides_are_those_with_visual_shapes() {
    let converter = Arc::new(ScriptedConverter::ok());
    let renderer = Arc::new(FakeRenderer::new(7));
    let cfg = config(converter.clone(), renderer.clone());

    let out = extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg).await.unwrap();

    assert_eq!(out.visual_slides, MIXED_DECK_VISUAL_SLIDES);
    assert_eq!(converter.calls(), 1);
    assert_eq!(
        converter.last_name.lock().unwrap().as_deref(),
        Some("mixed.pptx")
    );
    // Slide n is page n - 1.
    assert_eq!(*renderer.requested.lock().unwrap(), vec![1, 3, 4, 6]);
    let numbers: Vec<usize> = out.images.iter().map(|i| i.slide_number).collect();
    assert_eq!(numbers, MIXED_DECK_VISUAL_SLIDES);
    for image in &out.images {
        assert_eq!(page_of(&image.png) as usize, image.slide_number - 1);
        assert_eq!((image.width, image.height), (40, 30));
    }
}

#[tokio::test]
async fn visual_kinds_narrow_the_detection() {
    let cfg = ExtractionConfig::builder()
        .converter(Arc::new(ScriptedConverter::ok()))
        .renderer(Arc::new(FakeRenderer::new(7)))
        .visual_kinds([ShapeKind::Chart])
        .build()
        .unwrap();

    let out = extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg).await.unwrap();
    assert_eq!(out.visual_slides, vec![4]);
    assert_eq!(out.images.len(), 1);
}

#[tokio::test]
async fn slide_selection_limits_the_candidates() {
    let cfg = ExtractionConfig::builder()
        .converter(Arc::new(ScriptedConverter::ok()))
        .renderer(Arc::new(FakeRenderer::new(7)))
        .slides(SlideSelection::Range(3, 5))
        .build()
        .unwrap();

    let out = extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg).await.unwrap();
    assert_eq!(out.visual_slides, vec![4, 5]);
    assert_eq!(out.stats.selected_slides, 3);
    assert_eq!(out.stats.total_slides, 7);
}

#[tokio::test]
async fn text_only_deck_is_converted_but_nothing_is_rendered() {
    let converter = Arc::new(ScriptedConverter::ok());
    let renderer = Arc::new(FakeRenderer::new(3));
    let cfg = config(converter.clone(), renderer.clone());

    let out = extract_from_bytes(text_only_deck(), "text.pptx", &cfg).await.unwrap();

    assert!(out.visual_slides.is_empty());
    assert!(out.images.is_empty());
    assert!(out.document.is_none());
    assert!(!out.has_images());
    assert_eq!(converter.calls(), 1);
    assert!(out.stats.pdf_bytes > 0);
    assert!(renderer.requested.lock().unwrap().is_empty());
}

// ── Document ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_has_title_then_one_heading_and_picture_per_slide() {
    let cfg = ExtractionConfig::builder()
        .converter(Arc::new(ScriptedConverter::ok()))
        .renderer(Arc::new(FakeRenderer::new(7)))
        .document_title("Q3 Review")
        .build()
        .unwrap();

    let out = extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg).await.unwrap();
    let docx = out.document.expect("document");
    assert_eq!(out.stats.document_bytes, docx.len());

    let body: Vec<Block> = blocks(&docx)
        .into_iter()
        .filter(|b| *b != Block::Other)
        .collect();
    assert_eq!(body[0], Block::Heading(1, "Q3 Review".into()));
    assert_eq!(body.len(), 1 + 2 * MIXED_DECK_VISUAL_SLIDES.len());

    for (i, n) in MIXED_DECK_VISUAL_SLIDES.iter().enumerate() {
        assert_eq!(body[1 + 2 * i], Block::Heading(2, format!("Slide {n}")));
        let Block::Picture(ref rel) = body[2 + 2 * i] else {
            panic!("expected a picture after the heading of slide {n}, got {:?}", body[2 + 2 * i]);
        };
        let png = read_part(&docx, &image_target(&docx, rel));
        assert_eq!(page_of(&png) as usize, n - 1, "picture under 'Slide {n}'");
    }
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_conversion_is_fatal_and_keeps_status_and_body() {
    let converter = Arc::new(ScriptedConverter::failing(500, "soffice crashed"));
    let renderer = Arc::new(FakeRenderer::new(7));
    let cfg = config(converter.clone(), renderer.clone());

    let err = extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg)
        .await
        .unwrap_err();

    match &err {
        SlideVisualsError::ConversionFailed { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "soffice crashed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("500"));
    assert!(renderer.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_conversion_is_reported_for_a_deck_without_visual_slides() {
    let converter = Arc::new(ScriptedConverter::failing(500, "soffice crashed"));
    let renderer = Arc::new(FakeRenderer::new(3));
    let cfg = config(converter.clone(), renderer.clone());

    let err = extract_from_bytes(text_only_deck(), "text.pptx", &cfg)
        .await
        .unwrap_err();

    assert!(
        matches!(err, SlideVisualsError::ConversionFailed { status: 500, ref body } if body == "soffice crashed"),
        "unexpected error: {err}"
    );
    assert_eq!(converter.calls(), 1);
    assert!(renderer.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_pages_are_skipped_not_fatal() {
    // The converter dropped the last two pages.
    let cfg = config(
        Arc::new(ScriptedConverter::ok()),
        Arc::new(FakeRenderer::new(5)),
    );

    let out = extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg).await.unwrap();

    assert_eq!(out.visual_slides, MIXED_DECK_VISUAL_SLIDES);
    let numbers: Vec<usize> = out.images.iter().map(|i| i.slide_number).collect();
    assert_eq!(numbers, vec![2, 4, 5]);
    assert_eq!(out.stats.skipped_slides, vec![7]);
    assert_eq!(out.stats.rendered_slides, 3);
    assert_eq!(out.stats.pdf_pages, 5);
    assert!(out.document.is_some());
}

#[tokio::test]
async fn non_zip_bytes_are_rejected_before_conversion() {
    let converter = Arc::new(ScriptedConverter::ok());
    let cfg = config(converter.clone(), Arc::new(FakeRenderer::new(1)));

    let err = extract_from_bytes(b"%PDF-1.4 not a deck".to_vec(), "slides.pdf", &cfg)
        .await
        .unwrap_err();

    assert!(matches!(err, SlideVisualsError::NotAPresentation { .. }));
    assert_eq!(converter.calls(), 0);
}

#[tokio::test]
async fn missing_file_is_reported() {
    let cfg = config(
        Arc::new(ScriptedConverter::ok()),
        Arc::new(FakeRenderer::new(1)),
    );
    let err = extract("/definitely/not/here.pptx", &cfg).await.unwrap_err();
    assert!(matches!(err, SlideVisualsError::FileNotFound { .. }));
}

// ── Files ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn extract_to_file_writes_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(&dir, "mixed.pptx", &mixed_deck());
    let output = dir.path().join("out/slides.docx");
    let cfg = config(
        Arc::new(ScriptedConverter::ok()),
        Arc::new(FakeRenderer::new(7)),
    );

    let stats = extract_to_file(&input, &output, &cfg).await.unwrap();

    assert_eq!(stats.rendered_slides, 4);
    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), stats.document_bytes);
    assert!(written.starts_with(b"PK\x03\x04"));
}

#[tokio::test]
async fn extract_to_file_writes_nothing_without_visual_slides() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(&dir, "text.pptx", &text_only_deck());
    let output = dir.path().join("slides.docx");
    let cfg = config(
        Arc::new(ScriptedConverter::ok()),
        Arc::new(FakeRenderer::new(3)),
    );

    let stats = extract_to_file(&input, &output, &cfg).await.unwrap();

    assert_eq!(stats.visual_slides, 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn write_atomic_creates_parents_and_replaces_whole_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/png/slide_002.png");

    write_atomic(&path, vec![1; 4096]).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), vec![1; 4096]);

    write_atomic(&path, vec![2; 3]).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), vec![2; 3]);

    // Only the target remains; no temporary files are left behind.
    let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("slide_002.png")]);
}

#[tokio::test]
async fn write_atomic_reports_the_target_path() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let path = blocker.join("nested.docx");

    let err = write_atomic(&path, vec![0]).await.unwrap_err();
    assert!(
        matches!(err, SlideVisualsError::OutputWriteFailed { path: ref p, .. } if *p == path),
        "unexpected: {err:?}"
    );
}

// ── Inspection ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn inspect_lists_shapes_per_slide() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(&dir, "mixed.pptx", &mixed_deck());

    let summary = inspect(&input).await.unwrap();

    assert_eq!(summary.slide_count, 7);
    assert_eq!(summary.visual_slides, MIXED_DECK_VISUAL_SLIDES);
    assert_eq!(
        summary.slides[3].shape_kinds,
        vec![ShapeKind::Placeholder, ShapeKind::Chart, ShapeKind::Table]
    );
    assert!(!summary.slides[2].visual);
    assert!(summary.slides[6].visual);
}

#[tokio::test]
async fn inspect_with_config_uses_the_configured_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(&dir, "mixed.pptx", &mixed_deck());
    let cfg = ExtractionConfig::builder()
        .visual_kinds([ShapeKind::Connector])
        .build()
        .unwrap();

    let summary = inspect_with_config(&input, &cfg).await.unwrap();
    assert_eq!(summary.visual_slides, vec![3]);
}

#[tokio::test]
async fn inspect_summary_follows_the_slide_selection() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(&dir, "mixed.pptx", &mixed_deck());
    let cfg = ExtractionConfig::builder()
        .slides(SlideSelection::Range(3, 5))
        .build()
        .unwrap();

    let summary = inspect_with_config(&input, &cfg).await.unwrap();

    assert_eq!(summary.visual_slides, vec![4, 5]);
    let flagged: Vec<usize> = summary
        .slides
        .iter()
        .filter(|s| s.visual)
        .map(|s| s.number)
        .collect();
    assert_eq!(flagged, summary.visual_slides);
    // Slide 2 has a picture but lies outside the selection.
    assert!(!summary.slides[1].visual);
    assert_eq!(summary.slide_count, 7);
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ExtractionProgressCallback for Recorder {
    fn on_extraction_start(&self, selected_slides: usize) {
        self.events.lock().unwrap().push(format!("start {selected_slides}"));
    }
    fn on_slides_detected(&self, visual_slides: &[usize]) {
        self.events.lock().unwrap().push(format!("detected {visual_slides:?}"));
    }
    fn on_conversion_complete(&self, _pdf_len: usize, _elapsed_ms: u64) {
        self.events.lock().unwrap().push("converted".into());
    }
    fn on_slide_rendered(&self, slide_number: usize, total: usize, _png_len: usize) {
        self.events.lock().unwrap().push(format!("rendered {slide_number}/{total}"));
    }
    fn on_slide_skipped(&self, slide_number: usize, _reason: &str) {
        self.events.lock().unwrap().push(format!("skipped {slide_number}"));
    }
    fn on_extraction_complete(&self, visual_slides: usize, rendered: usize) {
        self.events.lock().unwrap().push(format!("done {rendered}/{visual_slides}"));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_pipeline_order() {
    let recorder = Arc::new(Recorder::default());
    let cfg = ExtractionConfig::builder()
        .converter(Arc::new(ScriptedConverter::ok()))
        .renderer(Arc::new(FakeRenderer::new(6)))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    extract_from_bytes(mixed_deck(), "mixed.pptx", &cfg).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 7",
            "detected [2, 4, 5, 7]",
            "converted",
            "rendered 2/4",
            "rendered 4/4",
            "rendered 5/4",
            "skipped 7",
            "done 3/4",
        ]
    );
}
