//! Error types for the byte-source and parser layers.
//!
//! Decode and grammar failures are *not* represented here — per the runtime
//! contract they are surfaced as `Error` tokens in the token stream itself
//! (see [`crate::token::Code::Error`]). `YipError` is reserved for the one
//! taxon that genuinely aborts a parse: I/O and invalid-argument failures
//! from the byte source (`spec.md` §7, taxon 1).

use std::io;

/// Failure from a [`crate::source::ByteSource`] or [`crate::Parser`] operation.
#[derive(Debug, thiserror::Error)]
pub enum YipError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unknown production: {0}")]
    UnknownProduction(String),

    #[error("source has already been closed")]
    SourceClosed,
}

pub type YipResult<T> = Result<T, YipError>;
