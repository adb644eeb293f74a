use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use decksnap_common::error::{DecksnapError, DecksnapResult};
use decksnap_container::{extract, ExtractOutcome};
use decksnap_deck_model::descriptor::{CardRecord, DeckDescriptor};
use decksnap_deck_model::request::{DeckExportRequest, ExportZone, ThumbnailRef, ZoneId};
use decksnap_render_engine::layout::{FOOTER_HEIGHT, HEADER_HEIGHT};
use decksnap_render_engine::{
    export_deck, DirectorySource, ExportOutcome, MemorySource, RenderOptions, ThumbnailSource,
};
use image::{ImageFormat, Rgba, RgbaImage};

const VIEWER_URL: &str = "https://decks.example.com/view?deck=8271&owner=41&rev=3";

fn thumbnail_png(shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_fn(43, 62, |x, y| {
        Rgba([shade, (x * 5) as u8, (y * 4) as u8, 255])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png encode");
    bytes
}

fn options() -> RenderOptions {
    RenderOptions::default().with_stamp_date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
}

fn descriptor() -> DeckDescriptor {
    DeckDescriptor {
        main: vec![CardRecord::new("89631139", "1", "q7Xv", 3)],
        extra: vec![],
        side: vec![CardRecord::new("46986414", "2", "Zk01", 1)],
    }
}

fn source() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with("89631139", thumbnail_png(200))
            .with("46986414", thumbnail_png(90))
            .with("broken", b"\x89PNG but not really".to_vec()),
    )
}

/// Counts fetches so tests can assert that nothing was loaded.
struct CountingSource {
    inner: MemorySource,
    fetches: AtomicUsize,
}

impl ThumbnailSource for CountingSource {
    fn fetch(&self, source_id: &str) -> DecksnapResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(source_id)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn decode(outcome: &ExportOutcome) -> RgbaImage {
    image::load_from_memory(outcome.image.as_bytes())
        .expect("export must be a valid PNG")
        .to_rgba8()
}

#[tokio::test]
async fn empty_deck_renders_header_and_footer_only() {
    let request = DeckExportRequest::default();
    let outcome = export_deck(&request, &DeckDescriptor::default(), source(), &options())
        .await
        .unwrap();

    let img = decode(&outcome);
    assert_eq!(img.height(), (HEADER_HEIGHT + FOOTER_HEIGHT) as u32);
    assert!(outcome.plan.zones.is_empty());
    assert_eq!(
        extract(outcome.image.as_bytes()).unwrap(),
        ExtractOutcome::Found(DeckDescriptor::default())
    );
}

#[tokio::test]
async fn repeated_card_fills_three_cells_in_one_row() {
    let request = DeckExportRequest {
        zones: vec![ExportZone::new(ZoneId::Primary, "Main Deck")
            .with_thumbnail(ThumbnailRef::new("89631139", 3))],
        title: "Blue-Eyes".to_string(),
        ..Default::default()
    };
    let outcome = export_deck(&request, &descriptor(), source(), &options())
        .await
        .unwrap();

    let zone = &outcome.plan.zones[0];
    assert_eq!(zone.cells.len(), 3);
    assert_eq!(zone.rows, 1);
    assert_eq!(outcome.zones[0].rendered, 3);
    assert_eq!(
        extract(outcome.image.as_bytes()).unwrap().found(),
        Some(descriptor())
    );
}

#[tokio::test]
async fn failed_thumbnails_are_compacted_out_of_the_grid() {
    let request = DeckExportRequest {
        zones: vec![
            ExportZone::new(ZoneId::Primary, "Main Deck")
                .with_thumbnail(ThumbnailRef::new("89631139", 2))
                .with_thumbnail(ThumbnailRef::new("missing", 1))
                .with_thumbnail(ThumbnailRef::new("broken", 1))
                .with_thumbnail(ThumbnailRef::new("46986414", 9)),
            ExportZone::new(ZoneId::Auxiliary, "Extra Deck")
                .with_thumbnail(ThumbnailRef::new("missing", 2)),
            ExportZone::new(ZoneId::Reserve, "Side Deck")
                .with_thumbnail(ThumbnailRef::new("46986414", 1)),
        ],
        ..Default::default()
    };
    let outcome = export_deck(&request, &descriptor(), source(), &options())
        .await
        .unwrap();

    let summary: Vec<(ZoneId, usize, usize)> = outcome
        .zones
        .iter()
        .map(|z| (z.zone, z.requested, z.rendered))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ZoneId::Primary, 13, 11),
            (ZoneId::Auxiliary, 2, 0),
            (ZoneId::Reserve, 1, 1),
        ]
    );

    // The all-failed zone is dropped; every drawn grid matches its loads.
    let drawn: Vec<(ZoneId, usize)> = outcome
        .plan
        .zones
        .iter()
        .map(|z| (z.zone_id, z.cells.len()))
        .collect();
    assert_eq!(drawn, vec![(ZoneId::Primary, 11), (ZoneId::Reserve, 1)]);
    assert_eq!(outcome.plan.zones[0].rows, 2);
    assert_eq!(outcome.skipped_cells(), 4);
    assert_eq!(decode(&outcome).height(), outcome.plan.height);
}

fn qr_request(is_private: bool) -> DeckExportRequest {
    DeckExportRequest {
        zones: vec![ExportZone::new(ZoneId::Primary, "Main Deck")
            .with_thumbnail(ThumbnailRef::new("89631139", 4))],
        title: "Chaos".to_string(),
        scale: 2.0,
        include_qr: true,
        qr_payload: Some(VIEWER_URL.to_string()),
        is_private,
        ..Default::default()
    }
}

fn decode_qr_region(img: &RgbaImage, rect: decksnap_render_engine::PixelRect) -> String {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        rect.width as usize,
        rect.height as usize,
        |x, y| {
            let p = img.get_pixel(rect.x + x as u32, rect.y + y as u32).0;
            ((p[0] as u16 + p[1] as u16 + p[2] as u16) / 3) as u8
        },
    );
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "exactly one QR symbol expected");
    let (_, content) = grids[0].decode().expect("QR symbol should decode");
    content
}

#[tokio::test]
async fn private_watermark_keeps_qr_decodable() {
    let public = export_deck(&qr_request(false), &descriptor(), source(), &options())
        .await
        .unwrap();
    let private = export_deck(&qr_request(true), &descriptor(), source(), &options())
        .await
        .unwrap();
    assert_eq!(public.plan, private.plan);

    let rect = public.plan.footer.qr.expect("QR square reserved");
    let (public_img, private_img) = (decode(&public), decode(&private));

    let mut changed = 0usize;
    for (x, y, p) in private_img.enumerate_pixels() {
        if p != public_img.get_pixel(x, y) {
            assert!(rect.contains(x, y), "({x}, {y}) differs outside the QR square");
            changed += 1;
        }
    }
    assert!(changed > 0, "the watermark must be visible");

    assert_eq!(decode_qr_region(&public_img, rect), VIEWER_URL);
    assert_eq!(decode_qr_region(&private_img, rect), VIEWER_URL);
}

#[tokio::test]
async fn invalid_requests_fail_before_loading() {
    let counting = Arc::new(CountingSource {
        inner: MemorySource::new().with("89631139", thumbnail_png(1)),
        fetches: AtomicUsize::new(0),
    });
    let zone = ExportZone::new(ZoneId::Primary, "Main Deck")
        .with_thumbnail(ThumbnailRef::new("89631139", 1));

    let zero_scale = DeckExportRequest {
        zones: vec![zone.clone()],
        scale: 0.0,
        ..Default::default()
    };
    let qr_without_payload = DeckExportRequest {
        zones: vec![zone.clone()],
        include_qr: true,
        qr_payload: Some("   ".to_string()),
        ..Default::default()
    };
    for request in [zero_scale, qr_without_payload] {
        let err = export_deck(&request, &descriptor(), counting.clone(), &options())
            .await
            .unwrap_err();
        assert!(err.is_invalid_request(), "{err}");
    }

    let mut too_many = descriptor();
    too_many.main[0].quantity = 150;
    let request = DeckExportRequest {
        zones: vec![zone.clone()],
        ..Default::default()
    };
    let err = export_deck(&request, &too_many, counting.clone(), &options())
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");

    let oversized_qr = DeckExportRequest {
        zones: vec![zone],
        include_qr: true,
        qr_payload: Some(format!("https://decks.example.com/{}", "x".repeat(4000))),
        ..Default::default()
    };
    let err = export_deck(&oversized_qr, &descriptor(), counting.clone(), &options())
        .await
        .unwrap_err();
    assert!(matches!(err, DecksnapError::Qr { .. }), "{err}");

    assert_eq!(counting.fetches.load(Ordering::SeqCst), 0);
}

fn counting_source() -> Arc<CountingSource> {
    Arc::new(CountingSource {
        inner: MemorySource::new().with("89631139", thumbnail_png(1)),
        fetches: AtomicUsize::new(0),
    })
}

#[tokio::test]
async fn oversized_decks_fail_before_loading() {
    let counting = counting_source();

    // 3000 cells, every repeat count within bounds: 300 rows overflow the
    // canvas height limit.
    let mut main = ExportZone::new(ZoneId::Primary, "Main Deck");
    for _ in 0..40 {
        main = main.with_thumbnail(ThumbnailRef::new("89631139", 75));
    }
    let tall = DeckExportRequest {
        zones: vec![main],
        ..Default::default()
    };
    let err = export_deck(&tall, &descriptor(), counting.clone(), &options())
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");
    assert!(err.to_string().contains("px limit"), "{err}");

    let runaway = DeckExportRequest {
        zones: vec![ExportZone::new(ZoneId::Primary, "Main Deck")
            .with_thumbnail(ThumbnailRef::new("89631139", u32::MAX))],
        ..Default::default()
    };
    let err = export_deck(&runaway, &descriptor(), counting.clone(), &options())
        .await
        .unwrap_err();
    assert!(err.is_invalid_request(), "{err}");

    assert_eq!(counting.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn qr_too_small_to_scan_fails_before_loading() {
    let counting = counting_source();
    let request = DeckExportRequest {
        scale: 0.2,
        ..qr_request(false)
    };
    let err = export_deck(&request, &descriptor(), counting.clone(), &options())
        .await
        .unwrap_err();
    assert!(matches!(err, DecksnapError::Qr { .. }), "{err}");
    assert_eq!(counting.fetches.load(Ordering::SeqCst), 0);

    // Large enough for the symbol: the export succeeds and the code scans.
    let request = DeckExportRequest {
        scale: 1.0,
        ..qr_request(false)
    };
    let outcome = export_deck(&request, &descriptor(), counting.clone(), &options())
        .await
        .unwrap();
    let rect = outcome.plan.footer.qr.expect("QR square reserved");
    assert_eq!(decode_qr_region(&decode(&outcome), rect), VIEWER_URL);
}

#[tokio::test]
async fn same_day_exports_are_byte_identical() {
    let request = qr_request(true);
    let a = export_deck(&request, &descriptor(), source(), &options())
        .await
        .unwrap();
    let b = export_deck(&request, &descriptor(), source(), &options())
        .await
        .unwrap();
    assert_eq!(a.image, b.image);
}

#[tokio::test]
async fn directory_source_feeds_the_pipeline() {
    let dir = std::env::temp_dir().join(format!("decksnap-export-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("89631139.png"), thumbnail_png(30)).unwrap();

    let request = DeckExportRequest {
        zones: vec![ExportZone::new(ZoneId::Reserve, "Side Deck")
            .with_thumbnail(ThumbnailRef::new("89631139", 2))
            .with_thumbnail(ThumbnailRef::new("../escape", 1))],
        ..Default::default()
    };
    let outcome = export_deck(
        &request,
        &descriptor(),
        Arc::new(DirectorySource::new(&dir)),
        &options(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.zones[0].rendered, 2);

    std::fs::remove_dir_all(&dir).unwrap();
}
