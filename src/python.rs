//! PyO3 bindings (feature `python`), mirroring the teacher's `#[pyclass]`/
//! `#[pymethods]` + `#[pymodule]` registration shape in
//! `examples/yaml-pyyaml/src/reader.rs` and `lib.rs`.
//!
//! Exposes the incremental tokenizer to Python as `PyParser`, plus a
//! standalone `decode_one`/`detect_encoding` pair for callers that only need
//! the byte-decoding layer.

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::encoding::{self, Encoding};
use crate::runtime::{Parser, ProductionSpec};
use crate::source::StringSource;
use crate::token::Code;

fn encoding_by_name(name: &str) -> PyResult<Encoding> {
    match name {
        "UTF-8" => Ok(Encoding::Utf8),
        "UTF-16LE" => Ok(Encoding::Utf16Le),
        "UTF-16BE" => Ok(Encoding::Utf16Be),
        "UTF-32LE" => Ok(Encoding::Utf32Le),
        "UTF-32BE" => Ok(Encoding::Utf32Be),
        other => Err(PyValueError::new_err(format!("unknown encoding: {other}"))),
    }
}

/// Decode a single character from `data` at byte offset `offset`, returning
/// `(scalar_value, bytes_consumed)`.
#[pyfunction]
fn decode_one(encoding: &str, data: &[u8], offset: usize) -> PyResult<(i64, usize)> {
    let enc = encoding_by_name(encoding)?;
    let mut pos = offset;
    let code = encoding::decode_one(enc, data, &mut pos);
    Ok((code, pos - offset))
}

/// Detect the likely encoding from a source's first bytes (`spec.md` §4.2).
#[pyfunction]
fn detect_encoding(first_bytes: &[u8]) -> String {
    encoding::detect_encoding(first_bytes).canonical_name().to_string()
}

/// One token, as a plain tuple Python can destructure without a bound class:
/// `(code_letter, text, start_line, start_char, end_line, end_char)`.
type PyToken = (char, String, i64, i64, i64, i64);

/// Incremental YAML 1.2 tokenizer, driving one named production over a
/// string held entirely in memory.
#[pyclass]
pub struct PyParser {
    inner: Parser<StringSource>,
    encoding: Encoding,
    done: bool,
}

#[pymethods]
impl PyParser {
    #[new]
    #[pyo3(signature = (text, production, n=None))]
    fn new(text: String, production: String, n: Option<String>) -> PyResult<Self> {
        let spec = ProductionSpec {
            name: production,
            n,
            c: None,
            t: None,
        };
        let inner = Parser::for_production(StringSource::new(text), spec)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let encoding = inner.encoding();
        Ok(PyParser {
            inner,
            encoding,
            done: false,
        })
    }

    /// Pull the next token, or `None` once `Done` has already been returned
    /// once (mirrors `yip_next_token`'s steady-state-on-`Done` behavior by
    /// stopping Python iteration there instead of repeating it forever).
    fn next_token(&mut self) -> PyResult<Option<PyToken>> {
        if self.done {
            return Ok(None);
        }
        let token = self
            .inner
            .next_token()
            .map_err(|e| PyIOError::new_err(e.to_string()))?;
        if token.code == Code::Done {
            self.done = true;
        }
        let letter = crate::token::code_letter(token.code);
        let text = token.text_as_str(self.encoding).into_owned();
        Ok(Some((
            letter,
            text,
            token.start.line,
            token.start.line_char,
            token.end.line,
            token.end.line_char,
        )))
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>) -> PyResult<Option<PyToken>> {
        slf.next_token()
    }
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(decode_one, m)?)?;
    m.add_function(wrap_pyfunction!(detect_encoding, m)?)?;
    m.add_class::<PyParser>()?;
    Ok(())
}
