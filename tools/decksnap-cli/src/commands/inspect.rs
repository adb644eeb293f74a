//! Show the chunk table of a PNG.

use std::path::PathBuf;

use decksnap_container::chunk::list_chunks;
use decksnap_container::metadata::{extract, ExtractOutcome};

pub fn run(image: PathBuf) -> anyhow::Result<()> {
    let bytes = super::read_image(&image)?;
    let chunks = list_chunks(&bytes)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", image.display()))?;

    println!("Image: {} ({} bytes)", image.display(), bytes.len());
    println!();
    println!(
        "  {:>10}  {:<4}  {:>10}  {:<9}  CRC",
        "OFFSET", "TYPE", "LENGTH", "KIND"
    );
    for chunk in &chunks {
        println!(
            "  {:>10}  {:<4}  {:>10}  {:<9}  {}",
            chunk.offset,
            chunk.chunk_type,
            chunk.length,
            if chunk.critical { "critical" } else { "ancillary" },
            if chunk.crc_valid { "ok" } else { "BAD" }
        );
    }
    println!();

    let status = match extract(&bytes)? {
        ExtractOutcome::Found(d) => format!(
            "present ({} main, {} extra, {} side)",
            d.main.len(),
            d.extra.len(),
            d.side.len()
        ),
        ExtractOutcome::NotFound => "absent".to_string(),
        ExtractOutcome::NotPng => "n/a".to_string(),
    };
    println!("Deck metadata: {status}");
    Ok(())
}
