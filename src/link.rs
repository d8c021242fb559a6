//! Per-matrix bookkeeping of explored mutation edges.

/// Maximum number of mutable vertices a [`LinkRecord`] can track.
pub const MAX_LINKS: usize = 64;

#[inline(always)]
const fn bit(v: usize) -> u64 {
    1u64 << v
}

/// Returns a mask with the lowest `n` bits set.
#[inline(always)]
pub const fn all_links(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        bit(n) - 1
    }
}

/// Tracks which of the `n` mutation edges of a visited matrix have been explored,
/// either from the matrix itself or into it from a neighbour.
///
/// Marking index `k` marks its whole orbit. In exact enumeration every orbit is
/// a singleton; in equivalence-collapsed enumeration the orbits are those of the
/// representative's automorphism group, because mutating at two automorphic
/// vertices leads to the same class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRecord {
    links: u64,
    n: usize,
    /// `orbits[k]` is the mask of vertices in the orbit of `k`; empty means singletons.
    orbits: Box<[u64]>,
}

impl LinkRecord {
    /// Creates an empty record for `n` mutable vertices with singleton orbits.
    pub fn new(n: usize) -> Self {
        debug_assert!(n <= MAX_LINKS, "LinkRecord supports at most {MAX_LINKS} vertices");
        Self {
            links: 0,
            n,
            orbits: Box::default(),
        }
    }

    /// Creates an empty record whose marks propagate along `orbits`.
    ///
    /// `orbits[k]` must contain bit `k`, and the masks must partition `0..n`.
    pub fn with_orbits(n: usize, orbits: Vec<u64>) -> Self {
        debug_assert_eq!(orbits.len(), n);
        debug_assert!(orbits.iter().enumerate().all(|(k, &o)| o & bit(k) != 0));
        Self {
            links: 0,
            n,
            orbits: orbits.into_boxed_slice(),
        }
    }

    /// Number of tracked vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Returns `true` if the record tracks no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Raw link bitset.
    #[inline]
    pub fn bits(&self) -> u64 {
        self.links
    }

    /// Orbit mask of vertex `k`.
    #[inline]
    pub fn orbit(&self, k: usize) -> u64 {
        self.orbits.get(k).copied().unwrap_or(bit(k))
    }

    /// Returns whether the edge at `k` has been explored.
    #[inline]
    pub fn is_set(&self, k: usize) -> bool {
        debug_assert!(k < self.n);
        self.links & bit(k) != 0
    }

    /// Marks the edge at `k` and its orbit. Returns `true` if `k` was not yet set.
    ///
    /// Marking is idempotent; whether a repeated mark is legitimate depends on the
    /// caller (see the enumeration engine).
    #[inline]
    pub fn set(&mut self, k: usize) -> bool {
        debug_assert!(k < self.n, "link index {k} out of range for {} vertices", self.n);
        let fresh = !self.is_set(k);
        self.links |= self.orbit(k);
        fresh
    }

    /// Index of the lowest unexplored edge, if any.
    #[inline]
    pub fn next_unset(&self) -> Option<usize> {
        let open = !self.links & all_links(self.n);
        (open != 0).then(|| open.trailing_zeros() as usize)
    }

    /// Number of edges still unexplored.
    #[inline]
    pub fn open_count(&self) -> usize {
        (!self.links & all_links(self.n)).count_ones() as usize
    }

    /// Returns `true` once every edge has been explored; the matrix can then never
    /// be reached through an unexplored edge again.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.links & all_links(self.n) == all_links(self.n)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_open() {
        let r = LinkRecord::new(4);
        assert_eq!(r.open_count(), 4);
        assert_eq!(r.next_unset(), Some(0));
        assert!(!r.is_complete());
    }

    #[test]
    fn setting_all_links_completes_record() {
        let mut r = LinkRecord::new(3);
        assert!(r.set(1));
        assert_eq!(r.next_unset(), Some(0));
        assert!(r.set(0));
        assert!(r.set(2));
        assert!(r.is_complete());
        assert_eq!(r.next_unset(), None);
    }

    #[test]
    fn repeated_set_reports_not_fresh() {
        let mut r = LinkRecord::new(2);
        assert!(r.set(0));
        assert!(!r.set(0));
        assert_eq!(r.bits(), 0b01);
    }

    #[test]
    fn orbit_marks_propagate() {
        // Vertices 0 and 2 are automorphic, 1 is fixed.
        let mut r = LinkRecord::with_orbits(3, vec![0b101, 0b010, 0b101]);
        assert!(r.set(2));
        assert!(r.is_set(0));
        assert!(!r.is_set(1));
        assert!(!r.set(0));
        r.set(1);
        assert!(r.is_complete());
    }

    #[test]
    fn empty_record_is_complete() {
        let r = LinkRecord::new(0);
        assert!(r.is_complete());
        assert!(r.is_empty());
    }

    #[test]
    fn sixty_four_links_fit() {
        let mut r = LinkRecord::new(64);
        for k in 0..64 {
            r.set(k);
        }
        assert!(r.is_complete());
        assert_eq!(all_links(64), u64::MAX);
    }
}
