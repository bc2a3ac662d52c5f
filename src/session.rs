//! # Print Session Manager
//!
//! The single stateful component of the crate. Owns at most one live
//! printer connection and exposes the high-level print operations the UI
//! calls. Everything else in the crate is either pure (protocol, raster) or
//! a platform seam (transports).
//!
//! ## State Machine
//!
//! ```text
//! Disconnected → Connecting → Connected
//!        ↑            │            │
//!        └────────────┴────────────┘   (failure, disconnect, link drop)
//! ```
//!
//! ## Single-Flight Connect
//!
//! All session internals live behind one async mutex. Overlapping
//! `ensure_connected()` callers serialize on it: the first runs discovery,
//! the rest find the session connected and return immediately. There is
//! never more than one discovery/connect attempt in flight.
//!
//! ## Retry Policy
//!
//! Exactly one retry per print operation, covering the whole attempt: a
//! connect that fails inside a print operation, a write that fails, or a
//! link that drops mid-stream all cause the session to mark itself
//! disconnected, reconnect once, and replay the **entire** job from its init
//! byte — thermal printers have no mid-job resume, so a partial job is a
//! failed job. A second failure is terminal and surfaces to the caller.
//! Explicit `connect()` is the one path with no automatic retry: it is the
//! user-gesture path and surfaces errors directly.
//!
//! ## Chunking
//!
//! Jobs are written in 180-byte chunks, sequentially — BLE characteristics
//! serialize writes, so concurrency buys nothing and corrupts ordering.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::protocol::label::{self, LabelContent};
use crate::raster::RasterImage;
use crate::transport::{PrinterDevice, Transport};

/// Chunk size for job writes (bytes). Conservative for BLE links whose
/// negotiated MTU is unknown.
pub const DEFAULT_CHUNK_SIZE: usize = 180;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Connected,
            _ => SessionState::Disconnected,
        }
    }
}

/// The one live connection, constructed whole on connect and discarded
/// whole on disconnect — never mutated field-by-field.
#[derive(Debug, Clone)]
pub struct Connection {
    /// The printer discovery settled on
    pub device: PrinterDevice,
}

/// Session tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Per-write chunk size
    pub chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

struct Inner {
    transport: Box<dyn Transport>,
    connection: Option<Connection>,
}

/// # Session Manager
///
/// Exposes `connect`/`disconnect`/`is_connected` plus the print operations.
/// `connect()` must be invoked from a user-gesture handler on platforms that
/// gate Bluetooth permission prompts on gesture freshness (the BLE-web
/// transport documents this precondition).
pub struct SessionManager {
    inner: Mutex<Inner>,
    // Mirror of the state machine for the cheap synchronous read; the
    // mutex-guarded connection is authoritative.
    state: AtomicU8,
    // Raised by disconnect() so an in-flight job fails at its next chunk
    // boundary instead of disconnect queuing behind the whole job.
    abort: AtomicBool,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: Box<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                transport,
                connection: None,
            }),
            state: AtomicU8::new(SessionState::Disconnected as u8),
            abort: AtomicBool::new(false),
            config,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a connection is currently believed live
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Explicit user-initiated connect. Errors surface directly — the
    /// automatic retry applies only inside print operations.
    pub async fn connect(&self) -> Result<PrinterDevice, Error> {
        let mut inner = self.inner.lock().await;
        self.ensure_connected_locked(&mut inner).await?;
        inner
            .connection
            .as_ref()
            .map(|c| c.device.clone())
            .ok_or_else(|| Error::Connection("connection lost during connect".to_string()))
    }

    /// Tear down the connection. The only way to abort a job in progress:
    /// the job fails at its next chunk boundary and the awaiting print call
    /// gets a write error, with no automatic retry.
    pub async fn disconnect(&self) -> Result<(), Error> {
        // Raise the abort flag before taking the lock so an in-flight job
        // observes it between chunks rather than running to completion.
        self.abort.store(true, Ordering::Release);
        let mut inner = self.inner.lock().await;
        self.abort.store(false, Ordering::Release);
        inner.connection = None;
        self.set_state(SessionState::Disconnected);
        inner.transport.disconnect().await
    }

    /// Connect if not already connected. Overlapping callers share the one
    /// in-flight attempt's outcome.
    pub async fn ensure_connected(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        self.ensure_connected_locked(&mut inner).await
    }

    /// The device of the live connection, if any
    pub async fn current_device(&self) -> Option<PrinterDevice> {
        let inner = self.inner.lock().await;
        inner.connection.as_ref().map(|c| c.device.clone())
    }

    /// Print plain text lines as one job
    pub async fn print_text(&self, lines: &[String]) -> Result<(), Error> {
        let job = label::text_job(lines);
        self.submit(&job).await
    }

    /// Print one shelf label
    pub async fn print_simple_label(&self, content: &LabelContent) -> Result<(), Error> {
        // Validation failures must surface before any connection attempt
        let job = label::label_job(content)?;
        self.submit(&job).await
    }

    /// Print `copies` of the same label as fully independent jobs, run
    /// sequentially. Each copy gets its own init and feed/cut; a failure
    /// stops the run and reports which copy died.
    pub async fn print_simple_label_copies(
        &self,
        content: &LabelContent,
        copies: u32,
    ) -> Result<(), Error> {
        for copy in 0..copies {
            self.print_simple_label(content).await.map_err(|err| {
                warn!("label copy {}/{} failed: {err}", copy + 1, copies);
                err
            })?;
        }
        Ok(())
    }

    /// Print a pre-rasterized image as one job
    pub async fn print_image(&self, raster: &RasterImage) -> Result<(), Error> {
        let job = label::image_job(raster)?;
        self.submit(&job).await
    }

    /// Submit one complete job with the single-retry policy. The connect is
    /// part of the attempt: a retryable failure from it gets the same one
    /// reconnect as a failed write.
    async fn submit(&self, job: &[u8]) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        let first = match self.ensure_connected_locked(&mut inner).await {
            Ok(()) => self.write_job(&mut inner, job).await,
            Err(err) => Err(err),
        };

        match first {
            Ok(()) => Ok(()),
            Err(err) if err.is_retryable() && !self.abort.load(Ordering::Acquire) => {
                warn!("print failed ({err}), reconnecting for one retry");
                self.drop_connection(&mut inner).await;
                self.ensure_connected_locked(&mut inner).await?;
                // Replay from the first byte: partial jobs cannot resume
                self.write_job(&mut inner, job).await.map_err(|err| {
                    self.set_state(SessionState::Disconnected);
                    warn!("print failed after retry: {err}");
                    err
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Write a job in sequential fixed-size chunks
    async fn write_job(&self, inner: &mut Inner, job: &[u8]) -> Result<(), Error> {
        debug!(
            "writing {} bytes in {} chunks",
            job.len(),
            job.len().div_ceil(self.config.chunk_size)
        );
        for chunk in job.chunks(self.config.chunk_size) {
            if self.abort.load(Ordering::Acquire) {
                return Err(Error::Write("job aborted by disconnect".to_string()));
            }
            inner.transport.write(chunk).await?;
        }
        Ok(())
    }

    async fn ensure_connected_locked(&self, inner: &mut Inner) -> Result<(), Error> {
        // Detect transport-level drops the platform noticed before we did
        if inner.connection.is_some() && inner.transport.is_connected() {
            self.set_state(SessionState::Connected);
            return Ok(());
        }

        inner.connection = None;
        self.set_state(SessionState::Connecting);
        match inner.transport.connect(None).await {
            Ok(device) => {
                info!("connected to {} ({:?})", device.display_name, device.kind);
                inner.connection = Some(Connection { device });
                self.set_state(SessionState::Connected);
                Ok(())
            }
            Err(err) => {
                self.set_state(SessionState::Disconnected);
                Err(err)
            }
        }
    }

    async fn drop_connection(&self, inner: &mut Inner) {
        inner.connection = None;
        self.set_state(SessionState::Disconnected);
        if let Err(err) = inner.transport.disconnect().await {
            debug!("disconnect during retry teardown failed: {err}");
        }
    }
}
