// SPDX-License-Identifier: MIT
//! Crash-recovery auto-save slot
//!
//! A single process-wide, overwrite-in-place record holding the same logical
//! payload as the inline container, zlib-compressed and written under a
//! fixed constant name. Written periodically and shortly after any edit
//! (debounced), read once at startup to offer recovery, and explicitly
//! cleared after a successful manual save or dismissal.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::{debug, error};

use crate::codec::ContainerCodec;
use crate::error::BundleError;
use crate::inline::InlineCodec;
use crate::model::Bundle;

/// Fixed name of the auto-save slot file.
pub const AUTOSAVE_SLOT_NAME: &str = "bundle-autosave.json.zz";

/// The auto-save slot in a caller-supplied directory.
#[derive(Debug, Clone)]
pub struct AutosaveSlot {
    dir: PathBuf,
}

impl AutosaveSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(AUTOSAVE_SLOT_NAME)
    }

    /// Overwrite the slot with the current bundle state.
    ///
    /// Two-phase: the payload lands in a temporary file first and is renamed
    /// into place, so an interrupted write never leaves a truncated slot.
    pub fn write(&self, bundle: &Bundle) -> Result<(), BundleError> {
        let json = InlineCodec::new().encode(bundle)?;
        let compressed = compress(&json)?;

        let path = self.path();
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, &compressed)?;
        std::fs::rename(&staging, &path)?;

        debug!(
            path = %path.display(),
            bytes = compressed.len(),
            "auto-save slot written"
        );
        Ok(())
    }

    /// Read the slot, if one exists. An absent slot is not an error.
    pub fn read(&self) -> Result<Option<Bundle>, BundleError> {
        let path = self.path();
        let compressed = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let json = decompress(&compressed)?;
        let bundle = InlineCodec::new().decode(json)?;
        Ok(Some(bundle))
    }

    /// Clear the slot. Already-absent slots are fine.
    pub fn clear(&self) -> Result<(), BundleError> {
        match std::fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fast zlib level: the payload is mostly base64 text and writes happen
/// often, so write speed wins over ratio.
fn compress(data: &[u8]) -> Result<Vec<u8>, BundleError> {
    let estimated = data.len().saturating_mul(6) / 10;
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(estimated.max(256)),
        Compression::fast(),
    );
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, BundleError> {
    let estimated = data.len().saturating_mul(3).max(1024);
    let mut decompressed = Vec::with_capacity(estimated);
    let mut decoder = ZlibDecoder::new(data);
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| BundleError::MalformedContainer(format!("auto-save slot: {e}")))?;
    Ok(decompressed)
}

/// Gate deciding when the slot should be rewritten: either the fixed
/// interval has elapsed, or an edit happened and its debounce window has
/// passed.
pub struct AutosaveTimer {
    interval: Duration,
    debounce: Duration,
    last_write: Mutex<Instant>,
    dirty_since: Mutex<Option<Instant>>,
}

impl AutosaveTimer {
    pub fn new(interval: Duration, debounce: Duration) -> Self {
        Self {
            interval,
            debounce,
            last_write: Mutex::new(Instant::now()),
            dirty_since: Mutex::new(None),
        }
    }

    /// Record that the bundle changed. Repeated edits keep the original
    /// debounce deadline so a burst of edits produces one write.
    pub fn notify_changed(&self) {
        let mut dirty = self.dirty_since.lock().unwrap();
        if dirty.is_none() {
            *dirty = Some(Instant::now());
        }
    }

    /// Whether a write is due now. Returns true at most once per due write.
    pub fn should_write(&self) -> bool {
        let now = Instant::now();

        let debounce_due = {
            let dirty = self.dirty_since.lock().unwrap();
            matches!(*dirty, Some(since) if now.duration_since(since) >= self.debounce)
        };
        let interval_due = {
            let last = self.last_write.lock().unwrap();
            now.duration_since(*last) >= self.interval
        };

        if debounce_due || interval_due {
            *self.last_write.lock().unwrap() = now;
            *self.dirty_since.lock().unwrap() = None;
            true
        } else {
            false
        }
    }
}

/// Drive periodic slot writes until the future is dropped.
///
/// `snapshot` returns the current bundle state, or `None` when there is
/// nothing worth saving. Write failures are logged and do not stop the loop.
pub async fn run_autosave<F>(
    slot: AutosaveSlot,
    timer: std::sync::Arc<AutosaveTimer>,
    tick: Duration,
    snapshot: F,
) where
    F: Fn() -> Option<Bundle>,
{
    let mut ticker = tokio::time::interval(tick);
    loop {
        ticker.tick().await;
        if !timer.should_write() {
            continue;
        }
        let Some(bundle) = snapshot() else { continue };
        if let Err(e) = slot.write(&bundle) {
            error!(error = %e, "auto-save write failed");
        }
    }
}
