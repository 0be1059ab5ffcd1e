//! Bounded exploration of the Pachner graph.
//!
//! [`Triangulation::retriangulate`] walks every triangulation reachable from
//! a starting one by Pachner moves that never exceed `size + height`
//! simplices, calling a visitor once per isomorphism class. Only moves on
//! faces of dimension `1..d` are used; the `1-(d+1)` and `(d+1)-1` moves are
//! left out so the vertex count stays fixed.
//!
//! Work is shared through a single queue guarded by a `parking_lot` mutex and
//! condition variable. Classes are deduplicated by isomorphism signature in a
//! concurrent [`DashSet`]. The visitor runs under a lock, so it never needs to
//! be `Sync`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use dashmap::DashSet;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::core::triangulation::Triangulation;

/// Default worker count, from `PACHNER_RETRI_THREADS` (1 if unset or
/// unparsable).
fn default_threads() -> usize {
    static THREADS: OnceLock<usize> = OnceLock::new();
    *THREADS.get_or_init(|| {
        std::env::var("PACHNER_RETRI_THREADS")
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(1)
    })
}

// =============================================================================
// PROGRESS TRACKING
// =============================================================================

#[derive(Debug, Default)]
struct ProgressState {
    depth: usize,
    finished: bool,
}

#[derive(Debug, Default)]
struct ProgressInner {
    cancelled: AtomicBool,
    discovered: AtomicUsize,
    processed: AtomicUsize,
    state: Mutex<ProgressState>,
}

/// Shared progress and cancellation handle for a retriangulation run.
///
/// Clones share the same counters, so one clone can be handed to the search
/// while another is polled or cancelled from a different thread.
///
/// # Examples
///
/// ```rust
/// use pachner::triangulation::retriangulate::ProgressTracker;
///
/// let tracker = ProgressTracker::new();
/// let handle = tracker.clone();
/// handle.cancel();
/// assert!(tracker.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ProgressTracker {
    inner: Arc<ProgressInner>,
}

impl ProgressTracker {
    /// A fresh tracker with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the search to stop at the next work item.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Distinct triangulations found so far, the starting one included.
    #[must_use]
    pub fn discovered(&self) -> usize {
        self.inner.discovered.load(Ordering::Relaxed)
    }

    /// Triangulations whose neighbours have been fully enumerated.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.inner.processed.load(Ordering::Relaxed)
    }

    /// Largest number of moves from the start among processed triangulations.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.state.lock().depth
    }

    /// Whether the search has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.state.lock().finished
    }

    /// Processed over discovered, as a percentage. The total is not known in
    /// advance, so this can move backwards while the frontier grows.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.is_finished() {
            return 100.0;
        }
        let discovered = self.discovered();
        if discovered == 0 {
            return 0.0;
        }
        100.0 * self.processed() as f64 / discovered as f64
    }

    fn record_discovery(&self) {
        self.inner.discovered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processed(&self, depth: usize) {
        self.inner.processed.fetch_add(1, Ordering::Relaxed);
        let mut state = self.inner.state.lock();
        if depth > state.depth {
            state.depth = depth;
            debug!(depth, discovered = self.discovered(), "retriangulation reached new depth");
        }
    }

    fn finish(&self) {
        self.inner.state.lock().finished = true;
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for [`Triangulation::retriangulate`].
///
/// # Examples
///
/// ```rust
/// use pachner::triangulation::retriangulate::RetriangulateOptionsBuilder;
///
/// let options = RetriangulateOptionsBuilder::default()
///     .height(2)
///     .threads(4)
///     .build()
///     .unwrap();
/// assert_eq!(options.height, 2);
/// assert!(options.use_isosig_dedup);
/// ```
#[derive(Builder, Clone, Debug)]
pub struct RetriangulateOptions {
    /// How many simplices above the starting size the search may go.
    #[builder(default)]
    pub height: usize,
    /// Worker threads; 0 and 1 both run on the calling thread.
    #[builder(default = "default_threads()")]
    pub threads: usize,
    /// Deduplicate by isomorphism signature. Always honoured as `true`.
    #[builder(default = "true")]
    pub use_isosig_dedup: bool,
    /// Shared progress and cancellation handle.
    #[builder(setter(strip_option), default)]
    pub progress: Option<ProgressTracker>,
}

impl Default for RetriangulateOptions {
    fn default() -> Self {
        Self {
            height: 0,
            threads: default_threads(),
            use_isosig_dedup: true,
            progress: None,
        }
    }
}

impl RetriangulateOptions {
    /// Default options with the given height.
    #[must_use]
    pub fn with_height(height: usize) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }
}

// =============================================================================
// SEARCH
// =============================================================================

struct Queue {
    items: VecDeque<(Triangulation, usize)>,
    /// Items popped but not yet fully expanded.
    active: usize,
    stopped: bool,
}

struct Search<'a, F> {
    dim: usize,
    max_size: usize,
    seen: DashSet<String>,
    queue: Mutex<Queue>,
    ready: Condvar,
    action: Mutex<F>,
    found: AtomicBool,
    cancel_reported: AtomicBool,
    progress: Option<&'a ProgressTracker>,
}

impl<F> Search<'_, F>
where
    F: FnMut(&str, &Triangulation) -> bool + Send,
{
    fn cancelled(&self) -> bool {
        let Some(progress) = self.progress else {
            return false;
        };
        if !progress.is_cancelled() {
            return false;
        }
        if !self.cancel_reported.swap(true, Ordering::AcqRel) {
            warn!(
                discovered = progress.discovered(),
                processed = progress.processed(),
                "retriangulation cancelled"
            );
        }
        true
    }

    fn stop(&self) {
        self.queue.lock().stopped = true;
        self.ready.notify_all();
    }

    /// Records a new class and runs the visitor. Returns false once the
    /// search should stop.
    fn visit(&self, sig: &str, tri: &Triangulation) -> bool {
        if let Some(progress) = self.progress {
            progress.record_discovery();
        }
        let mut action = self.action.lock();
        if self.found.load(Ordering::Acquire) {
            return false;
        }
        if action(sig, tri) {
            self.found.store(true, Ordering::Release);
            return false;
        }
        true
    }

    fn next_item(&self) -> Option<(Triangulation, usize)> {
        let mut queue = self.queue.lock();
        loop {
            if queue.stopped {
                return None;
            }
            if let Some(item) = queue.items.pop_front() {
                queue.active += 1;
                return Some(item);
            }
            if queue.active == 0 {
                queue.stopped = true;
                self.ready.notify_all();
                return None;
            }
            self.ready.wait(&mut queue);
        }
    }

    fn expand(&self, tri: &Triangulation, depth: usize) -> Vec<(Triangulation, usize)> {
        let mut next = Vec::new();
        trace!(size = tri.size(), depth, "expanding triangulation");
        for k in 1..self.dim {
            // A legal move on a k-face trades d + 1 - k simplices for k + 1.
            if tri.size() + 2 * k > self.max_size + self.dim {
                continue;
            }
            for i in 0..tri.count_faces(k) {
                if self.found.load(Ordering::Acquire) || self.cancelled() {
                    return next;
                }
                if !tri.has_pachner(k, i) {
                    continue;
                }
                let mut moved = tri.clone();
                if !matches!(moved.pachner(k, i, true, true), Ok(true)) {
                    continue;
                }
                let sig = moved.iso_sig();
                if !self.seen.insert(sig.clone()) {
                    continue;
                }
                if !self.visit(&sig, &moved) {
                    return next;
                }
                next.push((moved, depth + 1));
            }
        }
        next
    }

    fn worker(&self, id: usize) {
        debug!(worker = id, "retriangulation worker started");
        while let Some((tri, depth)) = self.next_item() {
            let children = if self.cancelled() {
                Vec::new()
            } else {
                self.expand(&tri, depth)
            };
            if let Some(progress) = self.progress {
                progress.record_processed(depth);
            }
            let halt = self.found.load(Ordering::Acquire) || self.cancelled();
            let mut queue = self.queue.lock();
            queue.active -= 1;
            if halt {
                queue.stopped = true;
            } else {
                queue.items.extend(children);
            }
            drop(queue);
            self.ready.notify_all();
        }
        debug!(worker = id, "retriangulation worker stopped");
    }
}

impl Triangulation {
    /// Visits every triangulation reachable from this one by Pachner moves
    /// on faces of dimension `1..d` without exceeding `size + height`
    /// simplices, once per isomorphism class, this triangulation included.
    ///
    /// The visitor receives the isomorphism signature and a representative.
    /// Returning `true` stops the search. The return value is `true` exactly
    /// when the visitor stopped it; cancellation through
    /// [`ProgressTracker::cancel`] returns `false`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::retriangulate::RetriangulateOptions;
    /// use pachner::triangulation::standard;
    ///
    /// let knot = standard::figure_eight();
    /// let mut count = 0;
    /// knot.retriangulate(&RetriangulateOptions::with_height(2), |_, _| {
    ///     count += 1;
    ///     false
    /// });
    /// assert_eq!(count, 6);
    /// ```
    pub fn retriangulate<F>(&self, options: &RetriangulateOptions, action: F) -> bool
    where
        F: FnMut(&str, &Triangulation) -> bool + Send,
    {
        if !options.use_isosig_dedup {
            debug!("signature deduplication cannot be disabled; ignoring");
        }
        let search = Search {
            dim: self.dim(),
            max_size: self.size() + options.height,
            seen: DashSet::new(),
            queue: Mutex::new(Queue {
                items: VecDeque::new(),
                active: 0,
                stopped: false,
            }),
            ready: Condvar::new(),
            action: Mutex::new(action),
            found: AtomicBool::new(false),
            cancel_reported: AtomicBool::new(false),
            progress: options.progress.as_ref(),
        };
        if search.cancelled() {
            return false;
        }

        let sig = self.iso_sig();
        search.seen.insert(sig.clone());
        if search.visit(&sig, self) {
            search.queue.lock().items.push_back((self.clone(), 0));
            let threads = options.threads.max(1);
            debug!(
                size = self.size(),
                height = options.height,
                threads,
                "starting retriangulation"
            );
            if threads == 1 {
                search.worker(0);
            } else {
                thread::scope(|scope| {
                    for id in 0..threads {
                        let search = &search;
                        scope.spawn(move || search.worker(id));
                    }
                });
            }
        }
        search.stop();

        if let Some(progress) = search.progress {
            progress.finish();
        }
        let found = search.found.load(Ordering::Acquire);
        debug!(classes = search.seen.len(), found, "retriangulation finished");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collections::FastHashSet;
    use crate::triangulation::standard;

    fn classes(tri: &Triangulation, height: usize, threads: usize) -> FastHashSet<String> {
        let options = RetriangulateOptionsBuilder::default()
            .height(height)
            .threads(threads)
            .build()
            .unwrap();
        let mut found = FastHashSet::default();
        let stopped = tri.retriangulate(&options, |sig, _| {
            assert!(found.insert(sig.to_owned()), "{sig} visited twice");
            false
        });
        assert!(!stopped);
        found
    }

    // =========================================================================
    // COUNTS
    // =========================================================================

    #[test]
    fn test_figure_eight_classes_by_height() {
        let knot = standard::figure_eight();
        for (height, expected) in [(0, 1), (1, 2), (2, 6), (3, 61)] {
            assert_eq!(classes(&knot, height, 1).len(), expected, "height {height}");
        }
    }

    #[test]
    fn test_threads_find_the_same_classes() {
        let knot = standard::figure_eight();
        let serial = classes(&knot, 3, 1);
        let parallel = classes(&knot, 3, 4);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_representatives_respect_the_size_cap() {
        let knot = standard::figure_eight();
        let options = RetriangulateOptions::with_height(2);
        knot.retriangulate(&options, |sig, tri| {
            assert!(tri.size() <= knot.size() + 2, "{sig}");
            assert_eq!(tri.iso_sig(), sig);
            assert_eq!(tri.count_vertices(), 1);
            false
        });
    }

    #[test]
    fn test_surface_flips_keep_the_size() {
        // Edge flips are the only moves in dimension 2, and the one-vertex
        // torus on two triangles is unique.
        assert_eq!(classes(&standard::torus(), 0, 1).len(), 1);
        assert_eq!(classes(&standard::torus(), 2, 1).len(), 1);
    }

    // =========================================================================
    // STOPPING
    // =========================================================================

    #[test]
    fn test_visitor_can_stop_the_search() {
        let knot = standard::figure_eight();
        for threads in [1, 3] {
            let options = RetriangulateOptionsBuilder::default()
                .height(3)
                .threads(threads)
                .build()
                .unwrap();
            let mut calls = 0;
            let stopped = knot.retriangulate(&options, |_, _| {
                calls += 1;
                calls == 2
            });
            assert!(stopped);
            assert_eq!(calls, 2);
        }
    }

    #[test]
    fn test_cancelled_search_returns_without_visiting() {
        let tracker = ProgressTracker::new();
        tracker.cancel();
        let options = RetriangulateOptionsBuilder::default()
            .height(3)
            .progress(tracker.clone())
            .build()
            .unwrap();
        let mut calls = 0;
        let stopped = standard::figure_eight().retriangulate(&options, |_, _| {
            calls += 1;
            false
        });
        assert!(!stopped);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_cancelling_from_the_visitor() {
        let tracker = ProgressTracker::new();
        let handle = tracker.clone();
        let options = RetriangulateOptionsBuilder::default()
            .height(3)
            .progress(tracker.clone())
            .build()
            .unwrap();
        let mut calls = 0;
        let stopped = standard::figure_eight().retriangulate(&options, |_, _| {
            calls += 1;
            if calls == 3 {
                handle.cancel();
            }
            false
        });
        assert!(!stopped);
        assert!(calls < 61);
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_progress_counts_every_class() {
        let tracker = ProgressTracker::new();
        assert!(tracker.percent().abs() < f64::EPSILON);
        let options = RetriangulateOptionsBuilder::default()
            .height(2)
            .threads(2)
            .progress(tracker.clone())
            .build()
            .unwrap();
        standard::figure_eight().retriangulate(&options, |_, _| false);
        assert_eq!(tracker.discovered(), 6);
        assert_eq!(tracker.processed(), 6);
        assert!(tracker.depth() >= 1);
        assert!((tracker.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builder_defaults() {
        let options = RetriangulateOptionsBuilder::default().build().unwrap();
        assert_eq!(options.height, 0);
        assert!(options.use_isosig_dedup);
        assert!(options.progress.is_none());
        assert_eq!(options.threads, default_threads());
    }
}
