//! Library crate backing the `conf-scheduler` binary: an immutable problem
//! description, two dense-grid local-search stages, and the spreadsheet I/O
//! boundary around them. Exposed as a library (rather than folding
//! everything into `main.rs`) so the delta-correctness, reproducibility and
//! end-to-end properties in `tests/` can exercise the real penalty and
//! search code, not a reimplementation of it.

pub mod checks;
pub mod error;
pub mod grid;
pub mod ids;
pub mod instance;
pub mod io;
pub mod neighbourhood;
pub mod penalties;
pub mod scheduler;
pub mod search;
