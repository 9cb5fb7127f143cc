//! Off-thread isosurface rebuilds

use meld_core::{Color, MeldError, MeshData, Result};
use meld_field::{build_isosurface, LatticeParams, PointSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

/// Runs at most one rebuild at a time on a worker thread.
///
/// The caller polls for the finished mesh from the render thread. A request
/// made while a build is in flight is refused; the caller keeps its rebuild
/// flag set and retries on a later frame.
pub struct BackgroundRebuild {
    in_flight: Arc<AtomicBool>,
    tx: mpsc::Sender<Result<MeshData>>,
    rx: mpsc::Receiver<Result<MeshData>>,
}

impl Default for BackgroundRebuild {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundRebuild {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a build from a snapshot of the sources. Returns false if one is
    /// already running. If the worker thread cannot be started the request
    /// still counts as taken: the next `poll` or `wait` yields a
    /// `ResourceError` and the worker is idle again.
    pub fn request(&self, sources: Vec<PointSource>, params: LatticeParams, color: Color) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let tx = self.tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let spawned = std::thread::Builder::new()
            .name("meld-rebuild".into())
            .spawn(move || {
                let result = build_isosurface(&sources, &params, color);
                if let Err(e) = &result {
                    log::warn!("background rebuild failed: {}", e);
                }
                let _ = tx.send(result);
                in_flight.store(false, Ordering::Release);
            });

        if let Err(e) = spawned {
            self.report_spawn_failure(e);
        }
        true
    }

    fn report_spawn_failure(&self, error: std::io::Error) {
        log::error!("failed to start rebuild thread: {}", error);
        self.in_flight.store(false, Ordering::Release);
        let _ = self.tx.send(Err(MeldError::ResourceError(format!(
            "failed to start rebuild thread: {}",
            error
        ))));
    }

    /// Take the finished result, if any
    pub fn poll(&self) -> Option<Result<MeshData>> {
        self.rx.try_recv().ok()
    }

    /// Block until the running build (if any) finishes
    pub fn wait(&self) -> Option<Result<MeshData>> {
        if !self.is_busy() {
            return self.poll();
        }
        self.rx.recv().ok()
    }
}
