//! Card thumbnail sources and the concurrent loader.
//!
//! Every `ThumbnailRef` with `repeat_count = n` expands to `n` load
//! requests. Requests run concurrently under a semaphore cap; results are
//! written back by index, so output order never depends on completion
//! order. A failed fetch or decode is logged and leaves a hole (`None`);
//! callers compact the holes before layout.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use decksnap_common::error::{DecksnapError, DecksnapResult};
use decksnap_deck_model::request::{DeckExportRequest, ZoneId};
use image::RgbaImage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Extensions tried when a source id has none.
pub const CANDIDATE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Default number of thumbnails fetched at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Resolves an opaque source id to encoded image bytes.
///
/// Implementations are blocking; the loader runs them on the blocking pool.
pub trait ThumbnailSource: Send + Sync {
    fn fetch(&self, source_id: &str) -> DecksnapResult<Vec<u8>>;

    /// Source name, for logs.
    fn name(&self) -> &str;
}

/// Thumbnails stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a source id to a candidate path, refusing anything that could
    /// escape the root.
    fn relative_path(&self, source_id: &str) -> DecksnapResult<PathBuf> {
        let relative = Path::new(source_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if source_id.trim().is_empty() || escapes {
            return Err(DecksnapError::thumbnail(format!(
                "source id {source_id:?} is not a relative path"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ThumbnailSource for DirectorySource {
    fn fetch(&self, source_id: &str) -> DecksnapResult<Vec<u8>> {
        let path = self.relative_path(source_id)?;
        if path.is_file() {
            return Ok(std::fs::read(&path)?);
        }

        if path.extension().is_none() {
            for ext in CANDIDATE_EXTENSIONS {
                let candidate = path.with_extension(ext);
                if candidate.is_file() {
                    return Ok(std::fs::read(&candidate)?);
                }
            }
        }

        Err(DecksnapError::FileNotFound { path })
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// In-memory thumbnails keyed by source id.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_id: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(source_id.into(), bytes);
    }

    pub fn with(mut self, source_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(source_id, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ThumbnailSource for MemorySource {
    fn fetch(&self, source_id: &str) -> DecksnapResult<Vec<u8>> {
        self.entries
            .get(source_id)
            .cloned()
            .ok_or_else(|| DecksnapError::thumbnail(format!("no thumbnail for {source_id:?}")))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Thumbnails that loaded for one zone, in request order.
#[derive(Debug, Clone)]
pub struct LoadedZone {
    pub zone_id: ZoneId,
    pub label: String,
    /// Cells requested after repeat expansion.
    pub requested: usize,
    /// Successfully decoded cells; failures are already compacted out.
    pub images: Vec<RgbaImage>,
}

impl LoadedZone {
    pub fn rendered(&self) -> usize {
        self.images.len()
    }

    pub fn failed(&self) -> usize {
        self.requested - self.images.len()
    }
}

/// Fetches and decodes thumbnails with bounded concurrency.
#[derive(Clone)]
pub struct ThumbnailLoader {
    source: Arc<dyn ThumbnailSource>,
    max_concurrency: usize,
}

impl ThumbnailLoader {
    pub fn new(source: Arc<dyn ThumbnailSource>, max_concurrency: usize) -> Self {
        Self {
            source,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Load every id. The result has the same length and order as `ids`;
    /// failed entries are `None`.
    ///
    /// Dropping the returned future aborts all outstanding loads.
    pub async fn load_all(&self, ids: &[String]) -> Vec<Option<RgbaImage>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, id) in ids.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let id = id.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Err(DecksnapError::thumbnail("loader was shut down")));
                };
                let result = tokio::task::spawn_blocking(move || {
                    fetch_and_decode(source.as_ref(), &id)
                })
                .await
                .unwrap_or_else(|e| Err(DecksnapError::thumbnail(format!("load task failed: {e}"))));
                (index, result)
            });
        }

        let mut results: Vec<Option<RgbaImage>> = vec![None; ids.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(image))) => results[index] = Some(image),
                Ok((index, Err(err))) => {
                    tracing::warn!(
                        source = self.source.name(),
                        id = %ids[index],
                        error = %err,
                        "Skipping thumbnail"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Thumbnail task did not complete");
                }
            }
        }
        results
    }

    /// Load every zone of `request` in one batch and compact failures out
    /// of each zone.
    pub async fn load_request(&self, request: &DeckExportRequest) -> Vec<LoadedZone> {
        let ids: Vec<String> = request
            .zones
            .iter()
            .flat_map(|zone| zone.expanded_source_ids().map(str::to_string))
            .collect();
        let mut loaded = self.load_all(&ids).await.into_iter();

        let zones: Vec<LoadedZone> = request
            .zones
            .iter()
            .map(|zone| {
                let requested = zone.cell_count();
                let images = loaded.by_ref().take(requested).flatten().collect();
                LoadedZone {
                    zone_id: zone.zone_id,
                    label: zone.display_label.clone(),
                    requested,
                    images,
                }
            })
            .collect();

        let failed: usize = zones.iter().map(LoadedZone::failed).sum();
        tracing::debug!(
            source = self.source.name(),
            requested = ids.len(),
            failed,
            "Loaded thumbnails"
        );
        zones
    }
}

fn fetch_and_decode(source: &dyn ThumbnailSource, id: &str) -> DecksnapResult<RgbaImage> {
    let bytes = source.fetch(id)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| DecksnapError::thumbnail(format!("cannot decode {id:?}: {e}")))?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(DecksnapError::thumbnail(format!("{id:?} has no pixels")));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksnap_deck_model::request::{ExportZone, ThumbnailRef};
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Blocks in `fetch` and records peak concurrency.
    struct SlowSource {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        bytes: Vec<u8>,
    }

    impl SlowSource {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                bytes: png(2, 2, 9),
            }
        }
    }

    impl ThumbnailSource for SlowSource {
        fn fetch(&self, _source_id: &str) -> DecksnapResult<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.bytes.clone())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let source = MemorySource::new()
            .with("a", png(1, 1, 10))
            .with("b", png(2, 1, 20))
            .with("c", png(3, 1, 30));
        let loader = ThumbnailLoader::new(Arc::new(source), 2);

        let results = loader.load_all(&ids(&["c", "a", "b", "a"])).await;
        let widths: Vec<u32> = results.iter().map(|r| r.as_ref().unwrap().width()).collect();
        assert_eq!(widths, vec![3, 1, 2, 1]);
    }

    #[tokio::test]
    async fn test_failures_leave_holes() {
        let source = MemorySource::new()
            .with("good", png(1, 1, 0))
            .with("garbage", b"not an image".to_vec());
        let loader = ThumbnailLoader::new(Arc::new(source), 4);

        let results = loader
            .load_all(&ids(&["good", "missing", "garbage", "good"]))
            .await;
        assert_eq!(results.len(), 4);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_none());
        assert!(results[3].is_some());
    }

    #[tokio::test]
    async fn test_load_request_expands_and_compacts() {
        let source = MemorySource::new().with("dragon", png(4, 6, 200));
        let loader = ThumbnailLoader::new(Arc::new(source), 3);
        let request = DeckExportRequest {
            zones: vec![
                ExportZone::new(ZoneId::Primary, "Main Deck")
                    .with_thumbnail(ThumbnailRef::new("dragon", 3))
                    .with_thumbnail(ThumbnailRef::new("lost", 2)),
                ExportZone::new(ZoneId::Reserve, "Side Deck")
                    .with_thumbnail(ThumbnailRef::new("lost", 1)),
            ],
            ..Default::default()
        };

        let zones = loader.load_request(&request).await;
        assert_eq!(zones.len(), 2);
        assert_eq!((zones[0].requested, zones[0].rendered()), (5, 3));
        assert_eq!((zones[1].requested, zones[1].rendered()), (1, 0));
        assert_eq!(zones[1].failed(), 1);
        assert_eq!(zones[0].label, "Main Deck");
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let source = Arc::new(SlowSource::new(Duration::from_millis(20)));
        let loader = ThumbnailLoader::new(source.clone(), 2);
        assert_eq!(loader.max_concurrency(), 2);

        let results = loader.load_all(&vec!["x".to_string(); 8]).await;
        assert!(results.iter().all(Option::is_some));
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_concurrency_floor_is_one() {
        let loader = ThumbnailLoader::new(Arc::new(MemorySource::new()), 0);
        assert_eq!(loader.max_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_dropping_the_future_cancels_the_batch() {
        let source = Arc::new(SlowSource::new(Duration::from_millis(50)));
        let loader = ThumbnailLoader::new(source, 1);

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            loader.load_all(&vec!["x".to_string(); 20]),
        )
        .await;
        assert!(outcome.is_err(), "20 serial 50ms loads cannot finish in 10ms");
    }

    #[test]
    fn test_directory_source_tries_extensions() {
        let dir = std::env::temp_dir().join(format!("decksnap-thumbs-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("46986414.jpg"), b"jpg bytes").unwrap();
        std::fs::write(dir.join("nested/card.png"), b"png bytes").unwrap();

        let source = DirectorySource::new(&dir);
        assert_eq!(source.fetch("46986414").unwrap(), b"jpg bytes");
        assert_eq!(source.fetch("nested/card").unwrap(), b"png bytes");
        assert_eq!(source.fetch("nested/card.png").unwrap(), b"png bytes");
        assert!(matches!(
            source.fetch("absent"),
            Err(DecksnapError::FileNotFound { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_directory_source_refuses_escapes() {
        let source = DirectorySource::new("/tmp/decksnap-root");
        for id in ["../secret", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(source.fetch(id), Err(DecksnapError::Thumbnail { .. })),
                "{id:?} must be refused"
            );
        }
    }
}
