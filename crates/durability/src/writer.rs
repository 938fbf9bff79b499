//! Append-only WAL writer
//!
//! One [`Wal`] per database. Appends are serialized by an internal mutex
//! held only for the duration of the write (and fsync, when the mode asks
//! for one), so a slow or failing append never holds any resource lock
//! other than the one its caller already owns.
//!
//! ## Failure Handling
//!
//! ```text
//! append(entry):
//!   write frame ──ok──► fsync per mode ──ok──► Ok
//!        │                    │
//!        └──err───────────────┴──► truncate to pre-append length
//!                                      │
//!                          ok ─────────┴───────── err
//!                          │                      │
//!                    Err(Io), log intact    poison WAL,
//!                                           Err(StorageUnavailable { inconsistent })
//! ```
//!
//! A poisoned WAL rejects every later append: the file may end in a torn
//! frame and appending after it would hide committed entries from recovery.
//!
//! ## Batched Mode
//!
//! Appends sync once the batch fills or the interval has passed. A flusher
//! thread wakes every interval so the tail of a burst is synced even if no
//! further append arrives. Dropping the WAL stops the flusher and syncs
//! whatever is still pending.

use crate::encoding::encode_entry;
use crate::mode::DurabilityMode;
use crate::wal::WalEntry;
use berth_core::error::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Byte sink behind the WAL
///
/// Implemented for [`File`]. Other implementations let tests inject write,
/// sync and truncate failures.
pub trait LogSink: Send {
    /// Append all bytes at the end of the log
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush appended bytes to stable storage
    fn sync(&mut self) -> io::Result<()>;

    /// Cut the log back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        // Opened in append mode, so later writes land at the new end
        self.set_len(len)
    }
}

struct SinkState {
    sink: Box<dyn LogSink>,
    /// Length of the log as of the last successful append
    len: u64,
    /// Appends since the last fsync
    pending: usize,
    last_sync: Instant,
}

impl SinkState {
    fn sync(&mut self) -> io::Result<()> {
        self.sink.sync()?;
        self.pending = 0;
        self.last_sync = Instant::now();
        Ok(())
    }
}

#[derive(Default)]
struct FlushSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Background thread that syncs an idle batched WAL
struct Flusher {
    signal: Arc<FlushSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    fn spawn(state: Arc<Mutex<SinkState>>, mode: DurabilityMode, every: Duration) -> Result<Self> {
        let signal = Arc::new(FlushSignal::default());
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("berth-wal-flush".into())
            .spawn(move || flush_loop(&state, &thread_signal, mode, every))?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("WAL flusher thread panicked");
            }
        }
    }
}

fn flush_loop(state: &Mutex<SinkState>, signal: &FlushSignal, mode: DurabilityMode, every: Duration) {
    let mut stopped = signal.stopped.lock();
    while !*stopped {
        signal.wake.wait_for(&mut stopped, every);
        if *stopped {
            break;
        }
        MutexGuard::unlocked(&mut stopped, || {
            let mut state = state.lock();
            if !mode.sync_due(state.pending, state.last_sync.elapsed()) {
                return;
            }
            if let Err(e) = state.sync() {
                tracing::error!(error = %e, pending = state.pending, "background WAL sync failed");
            }
        });
    }
}

/// Write-ahead log
pub struct Wal {
    mode: DurabilityMode,
    path: Option<PathBuf>,
    /// None when the mode bypasses the log
    state: Option<Arc<Mutex<SinkState>>>,
    poisoned: AtomicBool,
    flusher: Option<Flusher>,
}

impl Wal {
    /// A WAL that accepts and discards every append
    pub fn disabled() -> Self {
        Self {
            mode: DurabilityMode::None,
            path: None,
            state: None,
            poisoned: AtomicBool::new(false),
            flusher: None,
        }
    }

    /// Open (or create) the log file at `path` for appending
    ///
    /// Returns a disabled WAL when `mode` does not require one.
    pub fn open(path: impl AsRef<Path>, mode: DurabilityMode) -> Result<Self> {
        if !mode.requires_wal() {
            return Ok(Self::disabled());
        }

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let len = file.metadata()?.len();

        tracing::debug!(path = %path.display(), len, ?mode, "opened WAL");

        let mut wal = Self::from_sink(Box::new(file), len, mode)?;
        wal.path = Some(path);
        Ok(wal)
    }

    /// Build a WAL over an arbitrary sink already holding `len` bytes
    ///
    /// Starts the background flusher when the mode has an interval.
    pub fn from_sink(sink: Box<dyn LogSink>, len: u64, mode: DurabilityMode) -> Result<Self> {
        let state = Arc::new(Mutex::new(SinkState {
            sink,
            len,
            pending: 0,
            last_sync: Instant::now(),
        }));
        let flusher = match mode.flush_interval() {
            Some(every) => Some(Flusher::spawn(Arc::clone(&state), mode, every)?),
            None => None,
        };

        Ok(Self {
            mode,
            path: None,
            state: Some(state),
            poisoned: AtomicBool::new(false),
            flusher,
        })
    }

    /// Durability mode
    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }

    /// Log file path, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True if appends are written anywhere
    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    /// True after a failed write could not be undone
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Bytes in the log as of the last successful append
    pub fn len(&self) -> u64 {
        self.state.as_ref().map(|s| s.lock().len).unwrap_or(0)
    }

    /// True if nothing has been logged
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one entry
    ///
    /// # Returns
    /// - Ok(()) once the entry is written (and synced, per mode)
    /// - Err(Io) if the write failed and was undone
    /// - Err(StorageUnavailable { inconsistent: true }) if the undo failed or
    ///   the WAL was already poisoned
    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        if self.is_poisoned() {
            return Err(poisoned_error());
        }

        let frame = encode_entry(entry)?;
        let mut state = state.lock();
        let start = state.len;

        match write_frame(&mut state, &frame, self.mode) {
            Ok(()) => {
                state.len = start + frame.len() as u64;
                Ok(())
            }
            Err(write_err) => match state.sink.truncate(start) {
                Ok(()) => {
                    tracing::warn!(error = %write_err, offset = start, "WAL append failed, tail rolled back");
                    Err(Error::Io(write_err))
                }
                Err(truncate_err) => {
                    self.poisoned.store(true, Ordering::SeqCst);
                    tracing::error!(
                        write_error = %write_err,
                        truncate_error = %truncate_err,
                        offset = start,
                        "WAL append failed and could not be rolled back; refusing further writes"
                    );
                    Err(Error::StorageUnavailable {
                        reason: format!(
                            "log write failed ({}) and rollback failed ({})",
                            write_err, truncate_err
                        ),
                        inconsistent: true,
                    })
                }
            },
        }
    }

    /// Force an fsync of everything appended so far
    pub fn flush(&self) -> Result<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        state.lock().sync()?;
        Ok(())
    }
}

/// Write one frame, then sync if the mode says so
///
/// The pending count only includes the frame once it is safely written, so
/// a rolled-back frame is never counted.
fn write_frame(state: &mut SinkState, frame: &[u8], mode: DurabilityMode) -> io::Result<()> {
    state.sink.append(frame)?;
    let pending = state.pending + 1;
    if mode.sync_due(pending, state.last_sync.elapsed()) {
        state.sync()
    } else {
        state.pending = pending;
        Ok(())
    }
}

fn poisoned_error() -> Error {
    Error::StorageUnavailable {
        reason: "write-ahead log is poisoned by an earlier unrecoverable write failure".into(),
        inconsistent: true,
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        // Stop the flusher before the final sync so the two never race
        self.flusher.take();
        if let Some(state) = &self.state {
            let mut state = state.lock();
            if state.pending > 0 {
                if let Err(e) = state.sync() {
                    tracing::warn!(error = %e, pending = state.pending, "final WAL sync failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for Wal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wal")
            .field("mode", &self.mode)
            .field("path", &self.path)
            .field("enabled", &self.is_enabled())
            .field("poisoned", &self.is_poisoned())
            .finish()
    }
}
