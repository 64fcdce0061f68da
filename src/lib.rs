//! Incremental tokenizing parser for YAML 1.2, emitting the YEAST token
//! stream (`spec.md` §1).
//!
//! The pipeline is a single stage — bytes in, tokens out — rather than the
//! scan → parse → compose → construct pipeline a full YAML loader runs:
//! [`source`] supplies bytes, [`encoding`] and [`classifier`] turn them into
//! classified characters, [`frame`] and [`runtime`] drive the named
//! [`productions`] state machine that turns characters into [`token::Token`]s.
//! [`yeast`] renders a token stream in the textual regression format used by
//! the `yaml-test-suite`/`yip_test` tooling this crate's scope is grounded on.

pub mod classifier;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod productions;
pub mod runtime;
pub mod source;
pub mod token;
pub mod yeast;

#[cfg(feature = "python")]
pub mod python;

pub use error::{YipError, YipResult};
pub use runtime::{Parser, ProductionSpec};
pub use source::ByteSource;
pub use token::{Code, Position, Token};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn _rust(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)
}
