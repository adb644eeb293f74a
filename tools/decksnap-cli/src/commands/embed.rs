//! Embed a deck descriptor into an existing PNG.

use std::path::PathBuf;

use decksnap_container::metadata::embed;

pub fn run(image: PathBuf, descriptor: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let bytes = super::read_image(&image)?;
    let descriptor = super::load_descriptor(&descriptor)?;

    let embedded = embed(&bytes, &descriptor)
        .map_err(|e| anyhow::anyhow!("Failed to embed into {}: {e}", image.display()))?;
    std::fs::write(&output, &embedded)?;

    println!(
        "Embedded {} cards into {} (+{} bytes)",
        descriptor.main.len() + descriptor.extra.len() + descriptor.side.len(),
        output.display(),
        embedded.len() - bytes.len()
    );
    Ok(())
}
