//! Lazily built skeleton cache.
//!
//! A triangulation keeps its [`Skeleton`] behind an [`ArcSwapOption`] tagged
//! with the generation it was built from. Every mutation bumps the
//! triangulation's generation and clears the slot; the next read rebuilds the
//! snapshot once (through `rcu`, so concurrent first readers share one build)
//! and hands out clones of the same `Arc`.

use crate::core::skeleton::Skeleton;
use arc_swap::ArcSwapOption;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Storage and lifecycle of a cached skeleton.
///
/// Implementors provide the slot, the generation tag and a way to build a
/// skeleton from scratch; the provided methods implement the caching protocol.
pub trait PropertyCache {
    /// The slot holding the cached skeleton.
    fn skeleton_slot(&self) -> &ArcSwapOption<Skeleton>;

    /// Generation the cached skeleton was built from (0 if none).
    fn cached_generation(&self) -> &AtomicU64;

    /// Current generation of the underlying structure; never 0.
    fn generation(&self) -> u64;

    /// Builds a fresh skeleton for the current state.
    fn build_skeleton(&self) -> Skeleton;

    /// Returns the cached skeleton, building it if it is missing or stale.
    fn cached_skeleton(&self) -> Arc<Skeleton> {
        let current = self.generation();
        // ORDERING: Acquire pairs with the Release store below so a matching
        // generation implies the slot holds the skeleton built for it.
        if self.cached_generation().load(Ordering::Acquire) == current
            && let Some(existing) = self.skeleton_slot().load_full()
        {
            return existing;
        }

        // Build at most once even if rcu retries.
        let mut built: Option<Arc<Skeleton>> = None;
        let previous = self.skeleton_slot().rcu(|old| {
            if let Some(existing) = old
                && self.cached_generation().load(Ordering::Acquire) == current
            {
                return Some(Arc::clone(existing));
            }
            Some(Arc::clone(
                built.get_or_insert_with(|| Arc::new(self.build_skeleton())),
            ))
        });
        self.cached_generation().store(current, Ordering::Release);

        match built {
            Some(fresh) => fresh,
            None => previous.unwrap_or_else(|| {
                let fresh = Arc::new(self.build_skeleton());
                self.skeleton_slot().store(Some(Arc::clone(&fresh)));
                fresh
            }),
        }
    }

    /// Drops the cached skeleton.
    fn invalidate(&self) {
        self.skeleton_slot().store(None);
        // ORDERING: Release makes the cleared slot visible before the reset tag.
        self.cached_generation().store(0, Ordering::Release);
    }

    /// Whether a skeleton for the current generation is cached.
    fn has_cached_skeleton(&self) -> bool {
        self.cached_generation().load(Ordering::Acquire) == self.generation()
            && self.skeleton_slot().load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::perm::Perm;
    use crate::core::triangulation::Triangulation;
    use std::thread;

    #[test]
    fn test_skeleton_is_reused_until_mutation() {
        let mut tri = Triangulation::new(3);
        tri.new_simplices(2);
        assert!(!tri.has_cached_skeleton());
        let first = tri.cached_skeleton();
        let second = tri.cached_skeleton();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(tri.has_cached_skeleton());

        tri.join(0, 0, 1, Perm::identity(4)).unwrap();
        assert!(!tri.has_cached_skeleton(), "mutation must invalidate");
        let third = tri.cached_skeleton();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.count_faces(2), 7);
    }

    #[test]
    fn test_concurrent_readers_share_one_snapshot() {
        let mut tri = Triangulation::new(3);
        tri.new_simplices(3);
        let snapshots: Vec<Arc<Skeleton>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| tri.cached_skeleton())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let last = tri.cached_skeleton();
        assert!(snapshots.iter().all(|s| s.size() == 3));
        assert!(Arc::ptr_eq(snapshots.last().unwrap(), &last) || tri.has_cached_skeleton());
    }

    #[test]
    fn test_invalidate_clears_slot() {
        let mut tri = Triangulation::new(2);
        tri.new_simplex("");
        let _ = tri.cached_skeleton();
        tri.invalidate();
        assert!(!tri.has_cached_skeleton());
        assert_eq!(tri.cached_skeleton().count_faces(0), 3);
    }
}
