pub mod config;
pub mod embed;
pub mod export;
pub mod extract;
pub mod inspect;

use std::path::Path;

use decksnap_deck_model::descriptor::DeckDescriptor;

/// Read and validate a descriptor file.
pub fn load_descriptor(path: &Path) -> anyhow::Result<DeckDescriptor> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read descriptor {}: {e}", path.display()))?;
    DeckDescriptor::from_json(&text)
        .map_err(|e| anyhow::anyhow!("Invalid descriptor {}: {e}", path.display()))
}

pub fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))
}
