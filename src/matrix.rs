//! Integer exchange matrices and the mutation operator.
//!
//! An `r x c` exchange matrix has `n = min(r, c)` mutable vertices; rows and
//! columns at index `>= n` belong to frozen vertices and are never mutated
//! directly. All transformations return new matrices.

use crate::error::{QuiverError, Result};
use std::fmt;

/// Absolute value at or above which an entry certifies infinite type.
pub const INFINITE_ENTRY_BOUND: i32 = 3;

/// Smallest `|b[i][j] * b[j][i]|` that certifies infinite type in a connected
/// component of rank at least three. On skew-symmetric input this matches the
/// entry bound.
pub const INFINITE_WEIGHT_PRODUCT: i64 = 5;

// ============================================================================
// ExchangeMatrix
// ============================================================================

/// A row-major integer exchange matrix.
///
/// Equality, ordering and hashing are structural: two matrices are equal iff
/// their dimensions and raw entries agree, regardless of how they were built.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<i32>,
}

impl ExchangeMatrix {
    /// Creates a matrix from row-major entries.
    ///
    /// # Errors
    /// Returns [`QuiverError::DimensionMismatch`] if `entries.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, entries: Vec<i32>) -> Result<Self> {
        if entries.len() != rows * cols {
            return Err(QuiverError::DimensionMismatch {
                expected: rows * cols,
                got: entries.len(),
            });
        }
        Ok(Self { rows, cols, entries })
    }

    /// Creates an all-zero `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: vec![0; rows * cols],
        }
    }

    /// Builds a matrix from a slice of equally long rows.
    ///
    /// # Errors
    /// Returns [`QuiverError::RaggedRow`] if the rows differ in length.
    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut entries = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(QuiverError::RaggedRow {
                    row: i,
                    expected: cols,
                    got: row.len(),
                });
            }
            entries.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            entries,
        })
    }

    /// Number of rows.
    #[inline(always)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline(always)]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of mutable vertices, `min(rows, cols)`.
    #[inline(always)]
    pub fn rank(&self) -> usize {
        self.rows.min(self.cols)
    }

    /// Returns `true` if the matrix has as many rows as columns.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Returns `true` if the matrix has no entries at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row-major view of the entries.
    #[inline]
    pub fn entries(&self) -> &[i32] {
        &self.entries
    }

    /// Entry at `(i, j)`.
    ///
    /// # Panics
    /// Panics if `(i, j)` is outside the matrix.
    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> i32 {
        assert!(i < self.rows && j < self.cols, "entry ({i},{j}) out of range");
        self.entries[i * self.cols + j]
    }

    /// Entry at `(i, j)`, or `None` outside the matrix.
    #[inline]
    pub fn try_get(&self, i: usize, j: usize) -> Option<i32> {
        (i < self.rows && j < self.cols).then(|| self.entries[i * self.cols + j])
    }

    /// Row `i` as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[i32] {
        &self.entries[i * self.cols..(i + 1) * self.cols]
    }

    /// Returns a copy with entry `(i, j)` replaced by `value`.
    ///
    /// # Errors
    /// Returns [`QuiverError::VertexOutOfRange`] if `(i, j)` is outside the matrix.
    pub fn with_entry(&self, i: usize, j: usize, value: i32) -> Result<Self> {
        if i >= self.rows {
            return Err(self.out_of_range(i));
        }
        if j >= self.cols {
            return Err(self.out_of_range(j));
        }
        let mut out = self.clone();
        out.entries[i * self.cols + j] = value;
        Ok(out)
    }

    /// Returns a copy with an arrow of weight `weight` from `i` to `j`:
    /// `b[i][j] = weight` and `b[j][i] = -weight`.
    ///
    /// # Errors
    /// Returns [`QuiverError::VertexOutOfRange`] if either index is not a
    /// row and a column of the matrix.
    pub fn with_arrow(&self, i: usize, j: usize, weight: i32) -> Result<Self> {
        let bound = self.rank();
        for v in [i, j] {
            if v >= bound {
                return Err(self.out_of_range(v));
            }
        }
        let mut out = self.clone();
        out.entries[i * self.cols + j] = weight;
        out.entries[j * self.cols + i] = -weight;
        Ok(out)
    }

    /// Returns `true` if the mutable principal part satisfies `b[i][j] == -b[j][i]`.
    pub fn is_skew_symmetric(&self) -> bool {
        let n = self.rank();
        (0..n).all(|i| (i..n).all(|j| self.get(i, j) == -self.get(j, i)))
    }

    /// Returns `true` if any entry has absolute value at least
    /// [`INFINITE_ENTRY_BOUND`].
    ///
    /// For a connected skew-symmetric matrix with at least three vertices this
    /// certifies that the mutation class is infinite; its absence proves nothing.
    /// See [`ExchangeMatrix::certifies_infinite`] for the variant that also
    /// handles frozen rows, disconnected input and skew-symmetrizable weights.
    #[inline]
    pub fn is_infinite_locally(&self) -> bool {
        self.entries.iter().any(|&b| b.abs() >= INFINITE_ENTRY_BOUND)
    }

    /// Connected components of the mutable part, as vertex masks.
    ///
    /// Vertices `i` and `j` are adjacent if `b[i][j]` or `b[j][i]` is non-zero.
    /// Mutation never merges or splits components.
    pub fn components(&self) -> Vec<u64> {
        let n = self.rank().min(64);
        let mut seen = 0u64;
        let mut out = Vec::new();
        for start in 0..n {
            if seen & (1 << start) != 0 {
                continue;
            }
            let mut comp = 1u64 << start;
            let mut stack = vec![start];
            while let Some(v) = stack.pop() {
                for w in 0..n {
                    let bit = 1u64 << w;
                    if comp & bit == 0 && (self.get(v, w) != 0 || self.get(w, v) != 0) {
                        comp |= bit;
                        stack.push(w);
                    }
                }
            }
            seen |= comp;
            out.push(comp);
        }
        out
    }

    /// Infinite-type certificate for skew-symmetrizable input: some mutable pair
    /// with `|b[i][j] * b[j][i]| >= 5` lies in a component of at least three
    /// vertices.
    ///
    /// On skew-symmetric input this is the entry bound [`INFINITE_ENTRY_BOUND`].
    /// Unlike [`ExchangeMatrix::is_infinite_locally`] it ignores frozen rows and
    /// rank-2 components, whose large entries do not force an infinite class, and
    /// it passes over affine G2 (`|b| = 3` facing `|b| = 1`), whose class is finite.
    pub fn certifies_infinite(&self) -> bool {
        let n = self.rank().min(64);
        if n < 3 {
            return false;
        }
        let mut comps: Option<Vec<u64>> = None;
        for i in 0..n {
            let heavy = (0..n).any(|j| {
                (i64::from(self.get(i, j)) * i64::from(self.get(j, i))).abs() >= INFINITE_WEIGHT_PRODUCT
            });
            if !heavy {
                continue;
            }
            let comps = comps.get_or_insert_with(|| self.components());
            if comps
                .iter()
                .any(|&c| c & (1u64 << i) != 0 && c.count_ones() >= 3)
            {
                return true;
            }
        }
        false
    }

    /// Largest absolute value of any entry.
    pub fn max_abs_entry(&self) -> i32 {
        self.entries.iter().map(|b| b.abs()).max().unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Mutates at vertex `k`.
    ///
    /// Entries in row or column `k` are negated. Every other entry becomes
    /// `b[i][j] + (|b[i][k]| * b[k][j] + b[i][k] * |b[k][j]|) / 2`.
    ///
    /// # Panics
    /// Panics if `k >= self.rank()` or if an entry leaves the `i32` range. Use
    /// [`ExchangeMatrix::try_mutate`] to get an error instead.
    pub fn mutate(&self, k: usize) -> Self {
        match self.try_mutate(k) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible variant of [`ExchangeMatrix::mutate`].
    ///
    /// # Errors
    /// Returns [`QuiverError::MutationIndexOutOfRange`] if `k >= self.rank()` and
    /// [`QuiverError::EntryOverflow`] if an entry leaves the `i32` range.
    pub fn try_mutate(&self, k: usize) -> Result<Self> {
        if k >= self.rank() {
            return Err(QuiverError::MutationIndexOutOfRange {
                index: k,
                mutable: self.rank(),
            });
        }
        let mut out = Self::zeros(self.rows, self.cols);
        self.mutate_into(k, &mut out)?;
        Ok(out)
    }

    /// Writes the mutation at `k` into `out`, reusing its allocation.
    ///
    /// Entries grow without bound along an infinite class, so the arithmetic is
    /// checked. On overflow `out` holds a partial result.
    ///
    /// # Errors
    /// Returns [`QuiverError::EntryOverflow`] if an entry leaves the `i32` range.
    ///
    /// # Panics
    /// Panics if `k >= self.rank()` or if `out` has different dimensions.
    pub fn mutate_into(&self, k: usize, out: &mut Self) -> Result<()> {
        assert!(
            k < self.rank(),
            "mutation index {k} out of range for {} mutable vertices",
            self.rank()
        );
        assert!(
            out.rows == self.rows && out.cols == self.cols,
            "mutation buffer has the wrong shape"
        );

        let c = self.cols;
        let b = &self.entries;
        for i in 0..self.rows {
            let b_ik = b[i * c + k];
            for j in 0..c {
                let b_ij = b[i * c + j];
                let value = if i == k || j == k {
                    b_ij.checked_neg()
                } else {
                    mutated_entry(b_ij, b_ik, b[k * c + j])
                };
                out.entries[i * c + j] = value.ok_or(QuiverError::EntryOverflow { vertex: k })?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Shape changes
    // ------------------------------------------------------------------------

    /// Deletes row `i` and column `j`.
    ///
    /// This is the plain minor. Quiver vertex removal, which also drops the
    /// vertices left isolated, is [`ExchangeMatrix::delete_vertex`]; a vertex
    /// counts as isolated only if it has no arrows at all, frozen ones included,
    /// so a zero row alone is not enough.
    ///
    /// # Errors
    /// Returns [`QuiverError::VertexOutOfRange`] if `i` is not a row or `j` is not
    /// a column.
    pub fn submatrix(&self, i: usize, j: usize) -> Result<Self> {
        if i >= self.rows {
            return Err(self.out_of_range(i));
        }
        if j >= self.cols {
            return Err(self.out_of_range(j));
        }
        let mut entries = Vec::with_capacity((self.rows - 1) * (self.cols - 1));
        for r in (0..self.rows).filter(|&r| r != i) {
            for col in (0..self.cols).filter(|&col| col != j) {
                entries.push(self.entries[r * self.cols + col]);
            }
        }
        Ok(Self {
            rows: self.rows - 1,
            cols: self.cols - 1,
            entries,
        })
    }

    /// Removes mutable vertex `k` from the quiver.
    ///
    /// This deletes row and column `k` and then, repeatedly, every mutable vertex
    /// left without arrows (zero row and zero column, so a vertex with only an
    /// arrow to a frozen vertex stays).
    ///
    /// # Errors
    /// Returns [`QuiverError::VertexOutOfRange`] if `k >= self.rank()`.
    pub fn delete_vertex(&self, k: usize) -> Result<Self> {
        if k >= self.rank() {
            return Err(self.out_of_range(k));
        }
        let mut out = self.submatrix(k, k)?;
        while let Some(v) = out.first_isolated_vertex() {
            out = out.submatrix(v, v)?;
        }
        Ok(out)
    }

    /// All one-vertex deletions, in vertex order.
    pub fn vertex_deletions(&self) -> Vec<Self> {
        (0..self.rank())
            .filter_map(|k| self.delete_vertex(k).ok())
            .collect()
    }

    fn first_isolated_vertex(&self) -> Option<usize> {
        (0..self.rank()).find(|&v| {
            self.row(v).iter().all(|&b| b == 0)
                && (0..self.rows).all(|r| self.entries[r * self.cols + v] == 0)
        })
    }

    /// Pads the matrix with `extra_rows` zero rows and `extra_cols` zero columns.
    pub fn enlarge(&self, extra_rows: usize, extra_cols: usize) -> Self {
        let cols = self.cols + extra_cols;
        let mut out = Self::zeros(self.rows + extra_rows, cols);
        for i in 0..self.rows {
            out.entries[i * cols..i * cols + self.cols].copy_from_slice(self.row(i));
        }
        out
    }

    /// Iterates over every one-vertex extension of a square matrix whose new arrows
    /// have weights in `[-max_weight, max_weight]`.
    ///
    /// The new vertex gets index `n`; extensions leaving it isolated are skipped.
    ///
    /// # Errors
    /// Returns [`QuiverError::NotSquare`] for matrices with frozen vertices.
    pub fn extensions(&self, max_weight: i32) -> Result<Extensions> {
        if !self.is_square() {
            return Err(QuiverError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let max_weight = max_weight.abs();
        let n = self.rank();
        let weights = if n == 0 || max_weight == 0 {
            None
        } else {
            Some(vec![-max_weight; n])
        };
        let total = match weights {
            None => 0,
            Some(_) => (2 * max_weight as usize + 1)
                .checked_pow(n as u32)
                .map_or(usize::MAX, |t| t - 1),
        };
        Ok(Extensions {
            base: self.enlarge(1, 1),
            weights,
            max_weight,
            total,
        })
    }

    fn out_of_range(&self, index: usize) -> QuiverError {
        QuiverError::VertexOutOfRange {
            index,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl fmt::Display for ExchangeMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|b| b.to_string().len())
            .max()
            .unwrap_or(1);
        for i in 0..self.rows {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for (j, b) in self.row(i).iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{b:>width$}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

// ============================================================================
// One-vertex extensions
// ============================================================================

/// Iterator over the one-vertex extensions of a square matrix.
///
/// Produced by [`ExchangeMatrix::extensions`]. Weights run through
/// `[-max_weight, max_weight]^n` in odometer order, skipping the zero vector.
#[derive(Clone, Debug)]
pub struct Extensions {
    base: ExchangeMatrix,
    weights: Option<Vec<i32>>,
    max_weight: i32,
    total: usize,
}

impl Extensions {
    /// Number of extensions produced by a fresh iterator.
    pub fn total(&self) -> usize {
        self.total
    }

    fn advance(&mut self) {
        let Some(weights) = self.weights.as_mut() else {
            return;
        };
        for w in weights.iter_mut() {
            if *w < self.max_weight {
                *w += 1;
                return;
            }
            *w = -self.max_weight;
        }
        // Odometer wrapped: every vector has been produced.
        self.weights = None;
    }
}

impl Iterator for Extensions {
    type Item = ExchangeMatrix;

    fn next(&mut self) -> Option<ExchangeMatrix> {
        loop {
            let weights = self.weights.clone()?;
            self.advance();
            if weights.iter().all(|&w| w == 0) {
                continue;
            }
            let n = weights.len();
            let c = self.base.cols;
            let mut out = self.base.clone();
            for (i, &w) in weights.iter().enumerate() {
                out.entries[n * c + i] = w;
                out.entries[i * c + n] = -w;
            }
            return Some(out);
        }
    }
}

/// `b_ij + (|b_ik| * b_kj + b_ik * |b_kj|) / 2`, or `None` on overflow.
#[inline]
fn mutated_entry(b_ij: i32, b_ik: i32, b_kj: i32) -> Option<i32> {
    let left = b_ik.checked_abs()?.checked_mul(b_kj)?;
    let right = b_ik.checked_mul(b_kj.checked_abs()?)?;
    b_ij.checked_add(left.checked_add(right)? / 2)
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an exchange matrix from text.
///
/// Rules:
/// - `#` starts a comment running to the end of the line.
/// - Rows are separated by newlines or `;`. Blank rows are ignored.
/// - Entries are separated by whitespace and/or `,`. Square brackets are ignored,
///   so `[[0,1],[-1,0]]`-style input is accepted when rows are split by `;`.
/// - All rows must have the same length.
///
/// # Errors
/// Returns an error if no rows are present, a token is not an integer, or the
/// rows are ragged.
pub fn parse_exchange_matrix(text: &str) -> Result<ExchangeMatrix> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(data, _)| data))
        .flat_map(|line| line.split(';'))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut rows: Vec<Vec<i32>> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let mut row = Vec::new();
        for (j, token) in line
            .split(|ch: char| ch.is_whitespace() || ch == ',' || ch == '[' || ch == ']')
            .filter(|t| !t.is_empty())
            .enumerate()
        {
            let value = token.parse::<i32>().map_err(|_| QuiverError::Parse {
                row: i,
                col: j,
                token: token.to_string(),
            })?;
            row.push(value);
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(QuiverError::EmptyMatrix);
    }
    ExchangeMatrix::from_rows(&rows)
}

// ============================================================================
// Tests
// ============================================================================
