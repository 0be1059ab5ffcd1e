use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// `HashMap` with the `rustc_hash` hasher.
///
/// Keys in this crate are simplex and face indices produced internally, so a
/// fast non-cryptographic hasher is appropriate. Do not use with
/// attacker-controlled keys.
///
/// # Examples
///
/// ```rust
/// use pachner::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<(usize, usize), usize> = FastHashMap::default();
/// map.insert((0, 3), 1);
/// assert_eq!(map.get(&(0, 3)), Some(&1));
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// `HashSet` with the `rustc_hash` hasher.
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized vector: inline for up to `N` elements, heap beyond.
///
/// # Size Guidelines
///
/// - **N=8**: vertex labels of a simplex (dimension ≤ 7)
/// - **N=16**: per-face scratch lists, link vertex classes
///
/// # Examples
///
/// ```rust
/// use pachner::core::collections::SmallBuffer;
///
/// let mut labels: SmallBuffer<usize, 8> = SmallBuffer::new();
/// labels.extend(0..4);
/// assert!(!labels.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// A facet of a particular simplex: `(simplex, facet)`.
pub type SimplexFacet = (usize, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_collections_basic_operations() {
        let mut map: FastHashMap<SimplexFacet, usize> = FastHashMap::default();
        assert!(map.is_empty());
        map.insert((0, 2), 5);
        map.insert((1, 0), 6);
        assert_eq!(map.get(&(0, 2)), Some(&5));
        assert_eq!(map.len(), 2);

        let mut set: FastHashSet<SimplexFacet> = FastHashSet::default();
        assert!(set.insert((3, 1)));
        assert!(!set.insert((3, 1)), "duplicate insert must report false");
    }

    #[test]
    fn test_small_buffer_stack_allocation() {
        let mut labels: SmallBuffer<usize, 8> = SmallBuffer::new();
        labels.extend(0..8);
        assert!(!labels.spilled());
        labels.push(99);
        assert!(labels.spilled());
    }
}
