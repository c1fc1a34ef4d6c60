//! Periodic rescanning on a background thread.
//!
//! The driver scans once immediately, opens its ready latch, then rescans on
//! every tick until cancelled. Cancellation is observed between scans; a scan
//! that is already running always finishes.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, tick, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::search::Searcher;

/// Default interval between rescans.
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Handle to a running scan driver thread.
pub struct ScanDriver {
    cancel_tx: Option<Sender<()>>,
    ready_rx: Receiver<()>,
    ready: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScanDriver {
    /// Start the driver thread. The first scan begins immediately.
    pub fn spawn(searcher: Arc<Searcher>, interval: Duration) -> Result<Self> {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let (ready_tx, ready_rx) = bounded::<()>(0);
        let ready = Arc::new(AtomicBool::new(false));

        let thread_ready = Arc::clone(&ready);
        let handle = std::thread::Builder::new()
            .name("scan-driver".to_string())
            .spawn(move || run(searcher, interval, cancel_rx, ready_tx, thread_ready))
            .context("Failed to spawn scan driver thread")?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            ready_rx,
            ready,
            handle: Some(handle),
        })
    }

    /// True once the first scan has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Block until the first scan has completed.
    ///
    /// Fails if the driver thread exited before finishing it.
    pub fn wait_ready(&self) -> Result<()> {
        // Never sent on; returns once the driver drops its sender.
        let _ = self.ready_rx.recv();
        if self.is_ready() {
            Ok(())
        } else {
            anyhow::bail!("Scan driver exited before the initial scan completed")
        }
    }

    /// Like [`ScanDriver::wait_ready`] but gives up after `timeout`.
    /// Returns whether the driver is ready.
    pub fn wait_ready_timeout(&self, timeout: Duration) -> bool {
        match self.ready_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            _ => self.is_ready(),
        }
    }

    /// Ask the driver to stop after any scan in progress.
    pub fn cancel(&mut self) {
        if self.cancel_tx.take().is_some() {
            debug!("Scan driver cancellation requested");
        }
    }

    /// Cancel and wait for the driver thread to exit.
    pub fn shutdown(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                tracing::error!("Scan driver thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for ScanDriver {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run(
    searcher: Arc<Searcher>,
    interval: Duration,
    cancel: Receiver<()>,
    ready_tx: Sender<()>,
    ready: Arc<AtomicBool>,
) {
    info!(
        root = %searcher.root().display(),
        interval = %humantime::format_duration(interval),
        "Scan driver started"
    );

    searcher.scan();
    ready.store(true, Ordering::Release);
    drop(ready_tx);

    let ticker = tick(interval);
    loop {
        select! {
            recv(cancel) -> _ => {
                info!("Scan driver cancelled");
                return;
            }
            recv(ticker) -> _ => {
                let started = Instant::now();
                debug!("Periodic rescan triggered");
                searcher.scan();
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Periodic rescan finished");
            }
        }
    }
}
