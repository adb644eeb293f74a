//! Render a deck export request to a PNG.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use decksnap_common::clock::parse_stamp_date;
use decksnap_common::config::{AppConfig, RenderDefaults};
use decksnap_deck_model::request::DeckExportRequest;
use decksnap_render_engine::export::{export_deck, ExportStage, RenderOptions};
use decksnap_render_engine::DirectorySource;
use serde_json::Value;

pub struct ExportArgs {
    pub request: PathBuf,
    pub descriptor: PathBuf,
    pub thumbnails: PathBuf,
    pub output: PathBuf,
    pub date: Option<String>,
    pub scale: Option<f64>,
    pub variant: Option<String>,
    pub qr_level: Option<String>,
}

pub async fn run(args: ExportArgs, config: &AppConfig) -> anyhow::Result<()> {
    println!("Exporting deck request: {}", args.request.display());

    let mut request = load_request(&args.request, &config.render)?;
    if let Some(scale) = args.scale {
        request.scale = scale;
    }
    if let Some(variant) = &args.variant {
        request.color_variant = variant.parse()?;
    }
    let descriptor = super::load_descriptor(&args.descriptor)?;

    let mut options = RenderOptions::from_defaults(&config.render)?;
    if let Some(level) = &args.qr_level {
        options.qr_error_correction = level.parse()?;
    }
    if let Some(date) = &args.date {
        let date = parse_stamp_date(date)
            .ok_or_else(|| anyhow::anyhow!("Invalid date: {date}. Use YYYY-MM-DD"))?;
        options = options.with_stamp_date(date);
    }
    options = options.with_progress(Arc::new(|stage: ExportStage| {
        println!("  Stage: {}", stage.as_str());
    }));

    println!("  Thumbnails: {}", args.thumbnails.display());
    println!("  Scale: {}", request.scale);
    println!("  Variant: {}", request.color_variant);

    let source = Arc::new(DirectorySource::new(args.thumbnails));
    let outcome = export_deck(&request, &descriptor, source, &options).await?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, outcome.image.as_bytes())?;

    for zone in &outcome.zones {
        println!(
            "  {}: {}/{} cells rendered",
            zone.zone, zone.rendered, zone.requested
        );
    }
    println!(
        "Export complete: {} ({}x{}, {} bytes)",
        args.output.display(),
        outcome.plan.width,
        outcome.plan.height,
        outcome.image.len()
    );
    Ok(())
}

/// Parse a request file, filling `scale` and `color_variant` from the
/// configured defaults when the file omits them.
fn load_request(path: &Path, defaults: &RenderDefaults) -> anyhow::Result<DeckExportRequest> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read request {}: {e}", path.display()))?;
    let mut value: Value = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("Invalid request {}: {e}", path.display()))?;

    if let Value::Object(map) = &mut value {
        map.entry("scale").or_insert_with(|| Value::from(defaults.scale));
        map.entry("color_variant")
            .or_insert_with(|| Value::from(defaults.color_variant.to_ascii_lowercase()));
    }

    serde_json::from_value(value)
        .map_err(|e| anyhow::anyhow!("Invalid request {}: {e}", path.display()))
}
