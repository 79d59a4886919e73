//! Generation-tagged background asset loader.
//! Decode jobs run on worker threads and report back over a channel that the
//! render loop drains once per tick, so a slow decode never blocks a frame.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use image::RgbaImage;
use tracing::{debug, trace, warn};

use crate::processing::resize::limit_max_dim;
use crate::render::surface::Texture;

/// Shared, immutable decoded asset.
pub type AssetHandle = Arc<Texture>;

#[derive(Debug, Clone)]
pub enum SlotState {
    Pending,
    Loaded(AssetHandle),
    /// Kept as a placeholder so slot indices stay aligned with the URL list.
    Failed(String),
}

impl SlotState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Turns an asset URL into pixels. Implementations run on loader threads.
pub trait Decoder: Send + Sync + 'static {
    fn decode(&self, source: &str) -> Result<RgbaImage>;
}

/// Decodes local files (bare paths or `file://` URLs) with EXIF orientation applied.
#[derive(Debug, Clone)]
pub struct FileDecoder {
    max_dim: u32,
}

impl FileDecoder {
    pub fn new(max_dim: u32) -> Self {
        Self { max_dim }
    }
}

impl Decoder for FileDecoder {
    fn decode(&self, source: &str) -> Result<RgbaImage> {
        let path = resolve_source(source)?;
        let img = decode_rgba8_apply_exif(&path)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        limit_max_dim(img, self.max_dim)
    }
}

/// Maps an asset URL onto a local path; remote schemes are not fetched here.
pub fn resolve_source(source: &str) -> Result<PathBuf> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        bail!("empty asset url");
    }
    if let Some(rest) = trimmed.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if let Some((scheme, _)) = trimmed.split_once("://") {
        bail!("unsupported asset url scheme '{scheme}'");
    }
    Ok(PathBuf::from(trimmed))
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
// Missing or unreadable metadata leaves the pixels as decoded.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let img = img.to_rgba8();

    let orientation = read_orientation(path).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;
    trace!(orientation = value, path = %path.display(), "exif orientation");
    u16::try_from(value).ok()
}

struct DecodeJob {
    generation: u64,
    slot: usize,
    source: String,
}

struct Decoded {
    generation: u64,
    slot: usize,
    result: Result<Texture>,
}

/// Per-slot asset loader guarded by a generation counter.
///
/// Every [`AssetLoader::load`] starts a new generation; results tagged with an
/// older generation are dropped when they arrive.
pub struct AssetLoader {
    decoder: Arc<dyn Decoder>,
    generation: u64,
    /// Mirror of `generation` that workers read to skip superseded jobs.
    current: Arc<AtomicU64>,
    slots: Vec<SlotState>,
    jobs: Option<Sender<DecodeJob>>,
    results_tx: Sender<Decoded>,
    results: Receiver<Decoded>,
}

impl AssetLoader {
    /// Starts `workers` decode threads. With zero workers each decode runs
    /// inside [`AssetLoader::load`] and is still only observed by the next poll.
    pub fn spawn(decoder: Arc<dyn Decoder>, workers: usize) -> Self {
        let (results_tx, results) = crossbeam_channel::unbounded::<Decoded>();
        let current = Arc::new(AtomicU64::new(0));
        let jobs = if workers == 0 {
            None
        } else {
            let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<DecodeJob>();
            for index in 0..workers {
                let rx = jobs_rx.clone();
                let tx = results_tx.clone();
                let decoder = Arc::clone(&decoder);
                let current = Arc::clone(&current);
                let spawned = thread::Builder::new()
                    .name(format!("asset-decode-{index}"))
                    .spawn(move || decode_worker(rx, tx, decoder, current));
                if let Err(err) = spawned {
                    warn!(error = %err, index, "failed to spawn decode worker");
                }
            }
            Some(jobs_tx)
        };
        Self {
            decoder,
            generation: 0,
            current,
            slots: Vec::new(),
            jobs,
            results_tx,
            results,
        }
    }

    /// Invalidates every slot and requests `sources` under a fresh generation.
    pub fn load(&mut self, sources: &[String]) -> u64 {
        self.generation += 1;
        self.current.store(self.generation, Ordering::Release);
        self.slots = vec![SlotState::Pending; sources.len()];
        debug!(
            generation = self.generation,
            count = sources.len(),
            "asset load requested"
        );
        for (slot, source) in sources.iter().enumerate() {
            let job = DecodeJob {
                generation: self.generation,
                slot,
                source: source.clone(),
            };
            match &self.jobs {
                Some(jobs) => {
                    if let Err(err) = jobs.send(job) {
                        let job = err.into_inner();
                        self.slots[job.slot] =
                            SlotState::Failed(String::from("decode workers unavailable"));
                    }
                }
                None => {
                    let result = decode_texture(&*self.decoder, &job.source);
                    let _ = self.results_tx.send(Decoded {
                        generation: job.generation,
                        slot: job.slot,
                        result,
                    });
                }
            }
        }
        self.generation
    }

    /// Applies every finished decode without blocking. Returns how many slots resolved.
    pub fn poll(&mut self) -> usize {
        let mut resolved = 0;
        while let Ok(decoded) = self.results.try_recv() {
            if self.apply(decoded) {
                resolved += 1;
            }
        }
        resolved
    }

    /// Blocks until the current generation has no pending slots or `timeout` passes.
    ///
    /// Meant for hosts that preload before their first frame; the tick path
    /// only ever uses [`AssetLoader::poll`].
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();
        while !self.is_settled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(decoded) => {
                    self.apply(decoded);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }

    fn apply(&mut self, decoded: Decoded) -> bool {
        if decoded.generation != self.generation {
            trace!(
                stale = decoded.generation,
                current = self.generation,
                slot = decoded.slot,
                "dropping superseded decode"
            );
            return false;
        }
        let Some(slot) = self.slots.get_mut(decoded.slot) else {
            return false;
        };
        if !slot.is_pending() {
            return false;
        }
        *slot = match decoded.result {
            Ok(texture) => {
                debug!(
                    slot = decoded.slot,
                    width = texture.width(),
                    height = texture.height(),
                    "asset loaded"
                );
                SlotState::Loaded(Arc::new(texture))
            }
            Err(err) => {
                warn!(slot = decoded.slot, error = %format!("{err:#}"), "asset failed to load");
                SlotState::Failed(format!("{err:#}"))
            }
        };
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&SlotState> {
        self.slots.get(index)
    }

    pub fn asset(&self, index: usize) -> Option<&AssetHandle> {
        match self.slots.get(index)? {
            SlotState::Loaded(handle) => Some(handle),
            _ => None,
        }
    }

    /// Indices of slots that decoded successfully, in slot order.
    pub fn loaded_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, SlotState::Loaded(_)))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.count(|s| matches!(s, SlotState::Loaded(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, SlotState::Failed(_)))
    }

    pub fn pending_count(&self) -> usize {
        self.count(SlotState::is_pending)
    }

    fn count(&self, pred: impl Fn(&SlotState) -> bool) -> usize {
        self.slots.iter().filter(|s| pred(s)).count()
    }

    /// True once no slot of the current generation is still pending.
    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
    }

    /// True once every slot resolved and at least one of them loaded.
    pub fn is_ready(&self) -> bool {
        self.is_settled() && self.loaded_count() > 0
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        // closing the job channel lets workers exit after their current decode
        self.jobs.take();
    }
}

fn decode_texture(decoder: &dyn Decoder, source: &str) -> Result<Texture> {
    let rgba = decoder.decode(source)?;
    Texture::from_rgba(&rgba).with_context(|| format!("failed to prepare {source}"))
}

fn decode_worker(
    jobs: Receiver<DecodeJob>,
    results: Sender<Decoded>,
    decoder: Arc<dyn Decoder>,
    current: Arc<AtomicU64>,
) {
    while let Ok(job) = jobs.recv() {
        let latest = current.load(Ordering::Acquire);
        if job.generation != latest {
            trace!(
                stale = job.generation,
                current = latest,
                slot = job.slot,
                "skipping superseded decode job"
            );
            continue;
        }
        let result = decode_texture(&*decoder, &job.source);
        let sent = results.send(Decoded {
            generation: job.generation,
            slot: job.slot,
            result,
        });
        if sent.is_err() {
            break;
        }
    }
}
