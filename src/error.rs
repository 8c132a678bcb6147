//! Error types for the crate's I/O and validation boundary. Everything
//! inside the search itself is infallible by construction (grids are dense,
//! moves are always in-bounds) — these variants only ever surface while
//! loading or checking an instance.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("workbook is missing the required sheet {0:?}")]
    MissingSheet(String),

    #[error("sheet {sheet:?} references unknown {kind} {reference:?}")]
    UnknownReference {
        sheet: String,
        kind: &'static str,
        reference: String,
    },

    #[error("sheet {sheet:?} has {rows}x{cols} cells, expected {expected_rows}x{expected_cols}")]
    IncompatibleDimensions {
        sheet: String,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xlsx(#[from] calamine::XlsxError),

    #[error(transparent)]
    Xlsxwriter(#[from] rust_xlsxwriter::XlsxError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A validation finding that doesn't prevent a schedule from being loaded or
/// written, but indicates the input is probably malformed. Surfaced
/// separately from [`Error`] since it never aborts a run — see
/// [`crate::checks`]. Named by the stream's sheet name rather than a
/// [`crate::ids::StreamID`] since this finding is raised before an
/// `Instance` (and its dense ids) exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyStream(pub String);

impl std::fmt::Display for EmptyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream {:?} has no abstracts assigned to it", self.0)
    }
}
