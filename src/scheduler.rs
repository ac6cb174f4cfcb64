//! Background generation with per-tick delivery
//!
//! Every request runs as its own blocking task on a tokio runtime. Finished
//! results are queued together with their callback, and [`GenerationScheduler::tick`]
//! drains both queues on the caller's thread, so callbacks only ever run there.
//!
//! Requests cannot be cancelled. A result for a chunk that has since scrolled
//! out of view is still delivered and the callback must check relevance.
//! A failed build is logged and its callback is dropped without being called.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::compositor::MapData;
use crate::error::{Result, TerrainError};
use crate::generator::TerrainGenerator;
use crate::heightfield::HeightField;
use crate::mesh::TerrainMesh;

/// Callback run on the tick thread with the caller's context and the result.
pub type Callback<C, T> = Box<dyn FnOnce(&mut C, T) + Send>;

/// Thread-safe FIFO of finished results.
struct CompletionQueue<C, T> {
    entries: Arc<Mutex<VecDeque<(Callback<C, T>, T)>>>,
}

impl<C, T> Clone for CompletionQueue<C, T> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries) }
    }
}

impl<C, T> CompletionQueue<C, T> {
    fn new() -> Self {
        Self { entries: Arc::new(Mutex::new(VecDeque::new())) }
    }

    fn push(&self, callback: Callback<C, T>, result: T) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((callback, result));
    }

    /// Take everything queued so far. The lock is released before callbacks run.
    fn take_all(&self) -> VecDeque<(Callback<C, T>, T)> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Decrements the in-flight counter when a worker finishes, even by panicking.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Callbacks delivered by one [`GenerationScheduler::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivered {
    pub height_fields: usize,
    pub meshes: usize,
}

/// Runs height field and mesh builds off the update thread.
pub struct GenerationScheduler<C: 'static> {
    runtime: tokio::runtime::Runtime,
    generator: Arc<TerrainGenerator>,
    height_fields: CompletionQueue<C, MapData>,
    meshes: CompletionQueue<C, TerrainMesh>,
    in_flight: Arc<AtomicUsize>,
    issued: AtomicUsize,
}

impl<C: 'static> GenerationScheduler<C> {
    /// Start a runtime. `worker_threads` caps the blocking pool; `None` keeps tokio's default.
    pub fn new(generator: Arc<TerrainGenerator>, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.worker_threads(1).thread_name("terrain-worker");
        if let Some(threads) = worker_threads {
            builder.max_blocking_threads(threads.max(1));
        }
        let runtime = builder
            .build()
            .map_err(|e| TerrainError::Runtime(format!("failed to start worker runtime: {}", e)))?;

        Ok(Self {
            runtime,
            generator,
            height_fields: CompletionQueue::new(),
            meshes: CompletionQueue::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            issued: AtomicUsize::new(0),
        })
    }

    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }

    /// Requests started but not yet queued for delivery.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Total requests ever issued.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    /// Results waiting for the next tick.
    pub fn pending_deliveries(&self) -> usize {
        self.height_fields.len() + self.meshes.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.pending_deliveries() == 0
    }

    fn start_request(&self) -> InFlightGuard {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.in_flight))
    }

    /// Compose the height field and colour buffer for a chunk centre.
    ///
    /// Panics if `lod` is outside the LOD table.
    pub fn request_height_field<F>(&self, center: (f32, f32), lod: usize, callback: F)
    where
        F: FnOnce(&mut C, MapData) + Send + 'static,
    {
        assert!(
            lod < self.generator.lod_count(),
            "LOD {} outside table of {} levels",
            lod,
            self.generator.lod_count()
        );
        let guard = self.start_request();
        let generator = Arc::clone(&self.generator);
        let queue = self.height_fields.clone();
        self.runtime.spawn_blocking(move || {
            let _guard = guard;
            let data = generator.map_data(center, lod);
            queue.push(Box::new(callback), data);
        });
    }

    /// Build the mesh for `field` at `lod`.
    ///
    /// Panics if `lod` is outside the LOD table.
    pub fn request_mesh<F>(&self, field: Arc<HeightField>, lod: usize, callback: F)
    where
        F: FnOnce(&mut C, TerrainMesh) + Send + 'static,
    {
        assert!(
            lod < self.generator.lod_count(),
            "LOD {} outside table of {} levels",
            lod,
            self.generator.lod_count()
        );
        let guard = self.start_request();
        let generator = Arc::clone(&self.generator);
        let queue = self.meshes.clone();
        self.runtime.spawn_blocking(move || {
            let _guard = guard;
            match generator.mesh(&field, lod) {
                Ok(mesh) => queue.push(Box::new(callback), mesh),
                Err(e) => log::error!("mesh build for LOD {} failed: {}", lod, e),
            }
        });
    }

    /// Drain both queues and run every callback against `ctx`.
    pub fn tick(&self, ctx: &mut C) -> Delivered {
        let mut delivered = Delivered::default();
        for (callback, data) in self.height_fields.take_all() {
            callback(ctx, data);
            delivered.height_fields += 1;
        }
        for (callback, mesh) in self.meshes.take_all() {
            callback(ctx, mesh);
            delivered.meshes += 1;
        }
        delivered
    }

    /// Block until no request is running, or `timeout` elapses. Returns whether
    /// the workers went idle. Intended for tools and tests, not the update loop.
    pub fn wait_for_workers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }
}
