//! Permutations of `{0, …, n-1}` for `n ≤ 16`.
//!
//! A [`Perm`] stores the image of each point in a 4-bit nibble of a single
//! `u64`, so composition and inversion never allocate and a permutation is
//! `Copy`. Permutations are ranked lexicographically by their image sequence:
//! the identity has index 0 and the reversal has index `n! - 1`. That ranking
//! is what isomorphism signatures encode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use thiserror::Error;

/// Largest supported degree.
pub const MAX_PERM_DEGREE: usize = 16;

/// `FACTORIALS[k] = k!` for `k ≤ 16`.
pub const FACTORIALS: [u64; MAX_PERM_DEGREE + 1] = {
    let mut table = [1_u64; MAX_PERM_DEGREE + 1];
    let mut k = 1;
    while k <= MAX_PERM_DEGREE {
        table[k] = table[k - 1] * k as u64;
        k += 1;
    }
    table
};

/// Errors raised when constructing a permutation from untrusted data.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PermError {
    /// The degree is zero or larger than [`MAX_PERM_DEGREE`].
    #[error("Permutation degree {degree} is outside 1..={max}", max = MAX_PERM_DEGREE)]
    DegreeOutOfRange {
        /// Requested degree.
        degree: usize,
    },
    /// The image list repeats a point or names a point outside the range.
    #[error("Images {images:?} do not form a permutation")]
    NotABijection {
        /// Offending image list.
        images: Vec<usize>,
    },
    /// A lexicographic index was at least `n!`.
    #[error("Permutation index {index} is out of range for degree {degree}")]
    IndexOutOfRange {
        /// Requested index.
        index: u64,
        /// Degree of the permutation.
        degree: usize,
    },
}

/// A permutation of `{0, …, n-1}`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Perm {
    n: u8,
    code: u64,
}

impl Perm {
    /// The identity permutation of degree `n`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `n` is outside `1..=16`.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        debug_assert!((1..=MAX_PERM_DEGREE).contains(&n));
        let mut code = 0_u64;
        for i in 0..n {
            code |= (i as u64) << (4 * i);
        }
        Self { n: n as u8, code }
    }

    /// Builds a permutation from its image sequence.
    ///
    /// # Errors
    ///
    /// Returns [`PermError`] if the degree is unsupported or the images are not a bijection.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::core::perm::Perm;
    ///
    /// let p = Perm::from_images(&[1, 2, 0]).unwrap();
    /// assert_eq!(p.image(0), 1);
    /// assert_eq!(p.inverse().image(1), 0);
    /// assert_eq!(p.sign(), 1);
    /// ```
    pub fn from_images(images: &[usize]) -> Result<Self, PermError> {
        let n = images.len();
        if n == 0 || n > MAX_PERM_DEGREE {
            return Err(PermError::DegreeOutOfRange { degree: n });
        }
        let mut seen = 0_u32;
        let mut code = 0_u64;
        for (i, &img) in images.iter().enumerate() {
            if img >= n || seen & (1 << img) != 0 {
                return Err(PermError::NotABijection {
                    images: images.to_vec(),
                });
            }
            seen |= 1 << img;
            code |= (img as u64) << (4 * i);
        }
        Ok(Self { n: n as u8, code })
    }

    /// Builds a permutation from images that are known to form a bijection.
    pub(crate) fn from_images_unchecked(images: &[usize]) -> Self {
        debug_assert!(Self::from_images(images).is_ok(), "bad images {images:?}");
        let mut code = 0_u64;
        for (i, &img) in images.iter().enumerate() {
            code |= (img as u64) << (4 * i);
        }
        Self {
            n: images.len() as u8,
            code,
        }
    }

    /// The transposition swapping `a` and `b` (the identity if `a == b`).
    #[must_use]
    pub fn transposition(n: usize, a: usize, b: usize) -> Self {
        let mut images: Vec<usize> = (0..n).collect();
        images.swap(a, b);
        Self::from_images_unchecked(&images)
    }

    /// The permutation sending `0..head.len()` to `head` and the remaining points,
    /// in increasing order, to the points not in `head`.
    ///
    /// This is the canonical vertex ordering used for face embeddings.
    #[must_use]
    pub fn ordering(n: usize, head: &[usize]) -> Self {
        let mut images: Vec<usize> = head.to_vec();
        images.extend((0..n).filter(|v| !head.contains(v)));
        Self::from_images_unchecked(&images)
    }

    /// Degree `n` of the permutation.
    #[inline]
    #[must_use]
    pub const fn degree(self) -> usize {
        self.n as usize
    }

    /// The image of `i`.
    #[inline]
    #[must_use]
    pub const fn image(self, i: usize) -> usize {
        ((self.code >> (4 * i)) & 0xF) as usize
    }

    /// The point mapped onto `i`.
    #[must_use]
    pub fn pre_image(self, i: usize) -> usize {
        (0..self.degree())
            .find(|&j| self.image(j) == i)
            .unwrap_or(i)
    }

    /// The image sequence as a vector.
    #[must_use]
    pub fn images(self) -> Vec<usize> {
        (0..self.degree()).map(|i| self.image(i)).collect()
    }

    /// `self ∘ other`, i.e. apply `other` first.
    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        debug_assert_eq!(self.n, other.n, "composing permutations of different degree");
        let mut code = 0_u64;
        for i in 0..self.degree() {
            code |= (self.image(other.image(i)) as u64) << (4 * i);
        }
        Self { n: self.n, code }
    }

    /// The inverse permutation.
    #[must_use]
    pub fn inverse(self) -> Self {
        let mut code = 0_u64;
        for i in 0..self.degree() {
            code |= (i as u64) << (4 * self.image(i));
        }
        Self { n: self.n, code }
    }

    /// `+1` for even permutations, `-1` for odd ones.
    #[must_use]
    pub fn sign(self) -> i32 {
        let n = self.degree();
        let mut visited = 0_u32;
        let mut even = true;
        for start in 0..n {
            if visited & (1 << start) != 0 {
                continue;
            }
            let mut len = 0;
            let mut j = start;
            while visited & (1 << j) == 0 {
                visited |= 1 << j;
                j = self.image(j);
                len += 1;
            }
            if len % 2 == 0 {
                even = !even;
            }
        }
        if even { 1 } else { -1 }
    }

    /// Whether this is the identity.
    #[must_use]
    pub fn is_identity(self) -> bool {
        self == Self::identity(self.degree())
    }

    /// Lexicographic rank of the image sequence among all `n!` permutations.
    #[must_use]
    pub fn index(self) -> u64 {
        let n = self.degree();
        let mut used = 0_u32;
        let mut rank = 0_u64;
        for i in 0..n {
            let img = self.image(i);
            let smaller_unused = (0..img).filter(|&v| used & (1 << v) == 0).count() as u64;
            rank += smaller_unused * FACTORIALS[n - 1 - i];
            used |= 1 << img;
        }
        rank
    }

    /// Inverse of [`Perm::index`].
    ///
    /// # Errors
    ///
    /// Returns [`PermError`] if the degree is unsupported or `index >= n!`.
    pub fn from_index(n: usize, index: u64) -> Result<Self, PermError> {
        if n == 0 || n > MAX_PERM_DEGREE {
            return Err(PermError::DegreeOutOfRange { degree: n });
        }
        if index >= FACTORIALS[n] {
            return Err(PermError::IndexOutOfRange { index, degree: n });
        }
        let mut rest = index;
        let mut avail: Vec<usize> = (0..n).collect();
        let mut images = Vec::with_capacity(n);
        for i in 0..n {
            let f = FACTORIALS[n - 1 - i];
            let pos = (rest / f) as usize;
            rest %= f;
            images.push(avail.remove(pos));
        }
        Ok(Self::from_images_unchecked(&images))
    }

    /// Extends to degree `m ≥ n`, fixing every new point.
    #[must_use]
    pub fn extend(self, m: usize) -> Self {
        let mut images = self.images();
        images.extend(self.degree()..m);
        Self::from_images_unchecked(&images)
    }

    /// Restricts to degree `m ≤ n`.
    ///
    /// # Errors
    ///
    /// Returns [`PermError::NotABijection`] if some point below `m` is sent
    /// to `m` or beyond.
    pub fn truncate(self, m: usize) -> Result<Self, PermError> {
        let images: Vec<usize> = (0..m.min(self.degree())).map(|i| self.image(i)).collect();
        Self::from_images(&images)
    }

    /// Every permutation of degree `n`, in lexicographic order.
    pub fn all(n: usize) -> impl Iterator<Item = Self> {
        (0..FACTORIALS[n]).filter_map(move |i| Self::from_index(n, i).ok())
    }

    /// A uniformly random permutation of degree `n`.
    pub fn random<R: rand::Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        use rand::seq::SliceRandom;
        let mut images: Vec<usize> = (0..n).collect();
        images.shuffle(rng);
        Self::from_images_unchecked(&images)
    }

    /// A uniformly random permutation of the given sign.
    pub fn random_with_sign<R: rand::Rng + ?Sized>(n: usize, sign: i32, rng: &mut R) -> Self {
        let p = Self::random(n, rng);
        if n < 2 || p.sign() == sign {
            p
        } else {
            Self::transposition(n, 0, 1).compose(p)
        }
    }
}

impl Mul for Perm {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.compose(rhs)
    }
}

impl fmt::Debug for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Perm({self})")
    }
}

impl fmt::Display for Perm {
    /// Image sequence in hexadecimal digits, e.g. `1302`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.degree() {
            write!(f, "{:x}", self.image(i))?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_identity_has_index_zero_and_reversal_is_last() {
        for n in 1..=8 {
            assert_eq!(Perm::identity(n).index(), 0, "identity of degree {n}");
            let rev: Vec<usize> = (0..n).rev().collect();
            let p = Perm::from_images(&rev).unwrap();
            assert_eq!(p.index(), FACTORIALS[n] - 1, "reversal of degree {n}");
        }
    }

    #[test]
    fn test_index_round_trips_for_all_small_degrees() {
        for n in 1..=5 {
            for (i, p) in Perm::all(n).enumerate() {
                assert_eq!(p.index(), i as u64);
                assert_eq!(Perm::from_index(n, i as u64).unwrap(), p);
            }
        }
    }

    #[test]
    fn test_lexicographic_order_matches_images() {
        let perms: Vec<Vec<usize>> = Perm::all(4).map(Perm::images).collect();
        let mut sorted = perms.clone();
        sorted.sort();
        assert_eq!(perms, sorted);
        assert_eq!(perms[1], vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_composition_applies_right_operand_first() {
        let a = Perm::from_images(&[1, 2, 0]).unwrap();
        let b = Perm::transposition(3, 0, 1);
        let ab = a * b;
        assert_eq!(ab.images(), vec![2, 1, 0]);
        assert_eq!((a * a.inverse()), Perm::identity(3));
    }

    #[test]
    fn test_sign_of_transpositions_and_cycles() {
        assert_eq!(Perm::identity(5).sign(), 1);
        assert_eq!(Perm::transposition(5, 1, 3).sign(), -1);
        assert_eq!(Perm::from_images(&[1, 2, 3, 0]).unwrap().sign(), -1);
        assert_eq!(Perm::from_images(&[1, 2, 0, 3]).unwrap().sign(), 1);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(matches!(
            Perm::from_images(&[0, 0, 1]),
            Err(PermError::NotABijection { .. })
        ));
        assert!(matches!(
            Perm::from_images(&[]),
            Err(PermError::DegreeOutOfRange { degree: 0 })
        ));
        assert!(matches!(
            Perm::from_index(3, 6),
            Err(PermError::IndexOutOfRange { index: 6, degree: 3 })
        ));
    }

    #[test]
    fn test_ordering_puts_head_first_then_sorted_rest() {
        let p = Perm::ordering(5, &[3, 1]);
        assert_eq!(p.images(), vec![3, 1, 0, 2, 4]);
    }

    #[test]
    fn test_extend_and_truncate_are_inverse() {
        let p = Perm::from_images(&[2, 0, 1]).unwrap();
        let q = p.extend(5);
        assert_eq!(q.images(), vec![2, 0, 1, 3, 4]);
        assert_eq!(q.truncate(3).unwrap(), p);
        assert!(Perm::from_images(&[3, 0, 1, 2]).unwrap().truncate(3).is_err());
    }

    #[test]
    fn test_degree_sixteen_is_supported() {
        let rev: Vec<usize> = (0..16).rev().collect();
        let p = Perm::from_images(&rev).unwrap();
        assert_eq!(p.inverse(), p);
        assert_eq!(p.index(), FACTORIALS[16] - 1);
        assert_eq!(Perm::from_index(16, p.index()).unwrap(), p);
    }

    #[test]
    fn test_random_with_sign_respects_sign() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(Perm::random_with_sign(4, -1, &mut rng).sign(), -1);
            assert_eq!(Perm::random_with_sign(4, 1, &mut rng).sign(), 1);
        }
    }

    #[test]
    fn test_display_uses_hex_digits() {
        let p = Perm::from_images(&[1, 3, 0, 2]).unwrap();
        assert_eq!(p.to_string(), "1302");
        assert_eq!(format!("{p:?}"), "Perm(1302)");
    }
}
