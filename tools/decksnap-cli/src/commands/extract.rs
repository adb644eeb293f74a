//! Print the deck descriptor embedded in an image.

use std::path::PathBuf;

use decksnap_container::metadata::{extract, ExtractOutcome};

pub fn run(image: PathBuf) -> anyhow::Result<()> {
    let bytes = super::read_image(&image)?;

    match extract(&bytes)? {
        ExtractOutcome::Found(descriptor) => {
            tracing::debug!(path = %image.display(), "Found deck descriptor");
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        ExtractOutcome::NotFound => {
            println!("No deck metadata found in {}", image.display());
        }
        ExtractOutcome::NotPng => {
            return Err(anyhow::anyhow!("{} is not a PNG image", image.display()));
        }
    }
    Ok(())
}
