//! Error types shared by every module of the crate.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, QuiverError>;

/// Errors reported by matrix construction, parsing, and the classification engine.
///
/// Invalid-input variants are precondition violations: they are reported to the
/// caller as soon as they are detected and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuiverError {
    /// A mutation was requested at an index outside `[0, n)`.
    #[error("mutation index {index} out of range: matrix has {mutable} mutable vertices")]
    MutationIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of mutable vertices.
        mutable: usize,
    },

    /// A row or column index was outside the matrix.
    #[error("vertex {index} out of range for a {rows}x{cols} matrix")]
    VertexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// The entry buffer does not match the declared dimensions.
    #[error("dimension mismatch: expected {expected} entries, got {got}")]
    DimensionMismatch {
        /// Expected number of entries (`rows * cols`).
        expected: usize,
        /// Number of entries supplied.
        got: usize,
    },

    /// The operation is only defined for square matrices.
    #[error("operation requires a square matrix, got {rows}x{cols}")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// No non-empty rows were found while parsing.
    #[error("exchange matrix is empty")]
    EmptyMatrix,

    /// A parsed row has a different length from the first row.
    #[error("row {row} has {got} entries, expected {expected}")]
    RaggedRow {
        /// Row index.
        row: usize,
        /// Expected row length.
        expected: usize,
        /// Actual row length.
        got: usize,
    },

    /// A token could not be parsed as an integer entry.
    #[error("invalid entry {token:?} at row {row}, column {col}")]
    Parse {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// The offending token.
        token: String,
    },

    /// A mutation produced an entry outside the `i32` range.
    #[error("mutation at vertex {vertex} overflows the entry range")]
    EntryOverflow {
        /// Vertex mutated at.
        vertex: usize,
    },

    /// Link bookkeeping uses a `u64` bitset, so at most 64 vertices can be mutable.
    #[error("{n} mutable vertices exceed the supported maximum of 64")]
    TooManyMutableVertices {
        /// Number of mutable vertices.
        n: usize,
    },

    /// The permutation set for size `n` cannot be cached.
    #[error("permutation set for n={n} has weight {weight}, over the cache limit {limit}")]
    PermutationSetTooLarge {
        /// Matrix size.
        n: usize,
        /// Weight of the instance (`n! * n * n`), saturated on overflow.
        weight: u64,
        /// Configured weight limit.
        limit: u64,
    },

    /// A catalogue name could not be resolved.
    #[error("unknown quiver type {0:?}")]
    UnknownType(String),

    /// A bundled fixture disagreed with the engine.
    #[error("catalogue validation failed: {0}")]
    Validation(String),
}
