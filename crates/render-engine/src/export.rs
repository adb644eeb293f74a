//! Export pipeline: request in, PNG bytes with embedded descriptor out.
//!
//! Stages run strictly in sequence:
//! validate → encode QR → size check → load thumbnails → layout → compose →
//! encode → embed.
//! The size check lays out the requested counts, an upper bound on what
//! loading can produce, so an oversized canvas or a QR symbol too large for
//! its square fails before any fetch. The final layout runs on the loaded
//! counts, so the grid always matches what is drawn. Any failure returns an
//! error and no bytes.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use decksnap_common::clock::resolve_stamp_date;
use decksnap_common::config::RenderDefaults;
use decksnap_common::error::DecksnapResult;
use decksnap_container::metadata::embed;
use decksnap_deck_model::descriptor::DeckDescriptor;
use decksnap_deck_model::request::{DeckExportRequest, ZoneId};
use serde::Serialize;

use crate::assets::RenderAssets;
use crate::compositor::{compose, encode_png, CompositionInput};
use crate::layout::{compute_layout, LayoutPlan, ZoneSize};
use crate::qr::{QrErrorCorrection, QrMatrix};
use crate::thumbnails::{LoadedZone, ThumbnailLoader, ThumbnailSource, DEFAULT_CONCURRENCY};

/// A finished, self-describing PNG.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage(Vec<u8>);

impl EncodedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for EncodedImage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedImage({} bytes)", self.0.len())
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Validating,
    EncodingQr,
    LoadingThumbnails,
    Composing,
    Embedding,
    Complete,
}

impl ExportStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportStage::Validating => "validating",
            ExportStage::EncodingQr => "encoding_qr",
            ExportStage::LoadingThumbnails => "loading_thumbnails",
            ExportStage::Composing => "composing",
            ExportStage::Embedding => "embedding",
            ExportStage::Complete => "complete",
        }
    }
}

/// Progress callback, invoked once as each stage starts.
pub type ProgressCallback = Arc<dyn Fn(ExportStage) + Send + Sync>;

/// Caller-owned rendering options.
#[derive(Clone)]
pub struct RenderOptions {
    pub qr_error_correction: QrErrorCorrection,
    pub thumbnail_concurrency: usize,
    /// Footer date; `None` uses today's local date.
    pub stamp_date: Option<NaiveDate>,
    pub assets: RenderAssets,
    pub progress: Option<ProgressCallback>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            qr_error_correction: QrErrorCorrection::default(),
            thumbnail_concurrency: DEFAULT_CONCURRENCY,
            stamp_date: None,
            assets: RenderAssets::builtin(),
            progress: None,
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("qr_error_correction", &self.qr_error_correction)
            .field("thumbnail_concurrency", &self.thumbnail_concurrency)
            .field("stamp_date", &self.stamp_date)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl RenderOptions {
    /// Options from configured defaults.
    pub fn from_defaults(defaults: &RenderDefaults) -> DecksnapResult<Self> {
        Ok(Self {
            qr_error_correction: defaults.qr_error_correction.parse()?,
            thumbnail_concurrency: defaults.thumbnail_concurrency.max(1),
            ..Self::default()
        })
    }

    pub fn with_stamp_date(mut self, date: NaiveDate) -> Self {
        self.stamp_date = Some(date);
        self
    }

    pub fn with_assets(mut self, assets: RenderAssets) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report(&self, stage: ExportStage) {
        tracing::debug!(stage = stage.as_str(), "Export stage");
        if let Some(progress) = &self.progress {
            progress(stage);
        }
    }
}

/// Requested vs. drawn cells for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneSummary {
    pub zone: ZoneId,
    pub requested: usize,
    pub rendered: usize,
}

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub image: EncodedImage,
    pub plan: LayoutPlan,
    pub zones: Vec<ZoneSummary>,
}

impl ExportOutcome {
    pub fn rendered_cells(&self) -> usize {
        self.zones.iter().map(|z| z.rendered).sum()
    }

    pub fn skipped_cells(&self) -> usize {
        self.zones.iter().map(|z| z.requested - z.rendered).sum()
    }
}

/// Export a deck image.
///
/// Dropping the future before it resolves abandons outstanding thumbnail
/// loads; nothing is produced.
pub async fn export_deck(
    request: &DeckExportRequest,
    descriptor: &DeckDescriptor,
    source: Arc<dyn ThumbnailSource>,
    options: &RenderOptions,
) -> DecksnapResult<ExportOutcome> {
    tracing::info!(
        zones = request.zones.len(),
        cells = request.total_cells(),
        scale = request.scale,
        variant = %request.color_variant,
        include_qr = request.include_qr,
        source = source.name(),
        "Starting deck export"
    );

    options.report(ExportStage::Validating);
    request.validate()?;
    descriptor.validate()?;

    let qr = encode_qr(request, options)?;
    check_requested_size(request, qr.as_ref())?;

    options.report(ExportStage::LoadingThumbnails);
    let loader = ThumbnailLoader::new(source, options.thumbnail_concurrency);
    tracing::debug!(
        cells = request.total_cells(),
        concurrency = loader.max_concurrency(),
        "Loading thumbnails"
    );
    let loaded = loader.load_request(request).await;

    render_loaded(request, descriptor, &loaded, qr.as_ref(), options)
}

/// Synchronous tail of the pipeline for already-loaded thumbnails.
pub fn render_deck(
    request: &DeckExportRequest,
    descriptor: &DeckDescriptor,
    loaded: &[LoadedZone],
    options: &RenderOptions,
) -> DecksnapResult<ExportOutcome> {
    options.report(ExportStage::Validating);
    request.validate()?;
    descriptor.validate()?;
    let qr = encode_qr(request, options)?;
    check_requested_size(request, qr.as_ref())?;
    render_loaded(request, descriptor, loaded, qr.as_ref(), options)
}

/// Lay out the requested cell counts and check that the QR symbol fits its
/// square. Loading only ever shrinks the grid, so passing here bounds the
/// final canvas.
fn check_requested_size(
    request: &DeckExportRequest,
    qr: Option<&QrMatrix>,
) -> DecksnapResult<()> {
    let sizes: Vec<ZoneSize> = request
        .zones
        .iter()
        .map(|zone| {
            ZoneSize::new(zone.zone_id, zone.display_label.clone(), zone.cell_count())
        })
        .collect();
    let plan = compute_layout(&sizes, request.scale, request.include_qr)?;

    if let (Some(qr), Some(rect)) = (qr, plan.footer.qr) {
        qr.ensure_fits(rect)?;
    }
    Ok(())
}

fn encode_qr(request: &DeckExportRequest, options: &RenderOptions) -> DecksnapResult<Option<QrMatrix>> {
    if !request.include_qr {
        return Ok(None);
    }
    options.report(ExportStage::EncodingQr);
    request
        .qr_payload()
        .map(|payload| QrMatrix::encode(payload, options.qr_error_correction))
        .transpose()
}

fn render_loaded(
    request: &DeckExportRequest,
    descriptor: &DeckDescriptor,
    loaded: &[LoadedZone],
    qr: Option<&QrMatrix>,
    options: &RenderOptions,
) -> DecksnapResult<ExportOutcome> {
    options.report(ExportStage::Composing);
    let sizes: Vec<ZoneSize> = loaded
        .iter()
        .map(|zone| ZoneSize::new(zone.zone_id, zone.label.clone(), zone.rendered()))
        .collect();
    let plan = compute_layout(&sizes, request.scale, request.include_qr)?;

    let canvas = compose(CompositionInput {
        plan: &plan,
        zones: loaded,
        request,
        assets: &options.assets,
        qr,
        stamp_date: resolve_stamp_date(options.stamp_date),
    })?;
    let png = encode_png(&canvas)?;

    options.report(ExportStage::Embedding);
    let bytes = embed(&png, descriptor)?;

    let zones: Vec<ZoneSummary> = loaded
        .iter()
        .map(|zone| ZoneSummary {
            zone: zone.zone_id,
            requested: zone.requested,
            rendered: zone.rendered(),
        })
        .collect();

    let outcome = ExportOutcome {
        image: EncodedImage(bytes),
        plan,
        zones,
    };
    options.report(ExportStage::Complete);

    tracing::info!(
        width = outcome.plan.width,
        height = outcome.plan.height,
        bytes = outcome.image.len(),
        rendered = outcome.rendered_cells(),
        skipped = outcome.skipped_cells(),
        "Deck export complete"
    );
    Ok(outcome)
}
