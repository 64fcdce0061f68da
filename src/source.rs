//! Byte Source abstraction (`spec.md` §2, §4.1) and its backends.
//!
//! Mirrors the `YIP_SOURCE` vtable contract from `yip.c`: a source exposes a
//! contiguous `window()` of bytes the parser is free to read, `more()` grows
//! that window by reading further input, `less()` discards consumed bytes
//! from the front of the window, and `close()` releases backing resources.
//!
//! `yip.c` reuses a raw pointer into a realloc'd buffer and must "rebase"
//! every outstanding pointer whenever `more`/`less` moves the buffer
//! (`spec.md` §4.5/§9, Design Note option (a)). This implementation instead
//! tracks an absolute byte offset into the source and asks the source for a
//! slice on demand, so there is nothing to rebase and no unsafe code.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{YipError, YipResult};

/// Minimum growth increment for the stream-reader backend's dynamic buffer,
/// matching `DYNAMIC_SOURCE_MORE_SIZE` in `yip.c`.
const DYNAMIC_GROWTH: usize = 8 * 1024;

/// A source of bytes the parser consumes incrementally.
///
/// Implementors need only guarantee that `window()` returns the bytes
/// between the last `less()` call (or the start of input) and the most
/// recent successful `more()`. The parser never mutates the window.
pub trait ByteSource {
    /// Bytes currently available for the parser to read.
    fn window(&self) -> &[u8];

    /// Attempt to grow the window by reading more input. Returns the number
    /// of bytes appended, which is `0` only at end of input.
    fn more(&mut self) -> YipResult<usize>;

    /// Discard `n` bytes from the front of the window; they are no longer
    /// reachable via `window()`. `n` must not exceed `window().len()`.
    fn less(&mut self, n: usize) -> YipResult<()>;

    /// Release any backing resources. Idempotent: calling `close` again, or
    /// calling `more`/`less` afterwards, must not reopen or reuse the
    /// resource. The provided backends report the latter with
    /// [`YipError::SourceClosed`] rather than silently reading stale state.
    fn close(&mut self) -> YipResult<()> {
        Ok(())
    }
}

/// A source over an in-memory byte slice the caller already owns in full.
/// Grounded in `yip.c`'s `buffer_source` (the whole document is known
/// up-front, so `more()` only ever runs once).
pub struct MemorySource<'a> {
    bytes: &'a [u8],
    consumed: usize,
    exhausted: bool,
    closed: bool,
}

impl<'a> MemorySource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        MemorySource {
            bytes,
            consumed: 0,
            exhausted: false,
            closed: false,
        }
    }
}

impl<'a> ByteSource for MemorySource<'a> {
    fn window(&self) -> &[u8] {
        &self.bytes[self.consumed..]
    }

    fn more(&mut self) -> YipResult<usize> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        if self.exhausted {
            return Ok(0);
        }
        self.exhausted = true;
        Ok(self.bytes.len() - self.consumed)
    }

    fn less(&mut self, n: usize) -> YipResult<()> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        self.consumed += n;
        Ok(())
    }

    fn close(&mut self) -> YipResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// A source that owns a `String`'s UTF-8 bytes. Equivalent to
/// [`MemorySource`] but convenient for callers that start from text rather
/// than raw bytes, matching `yip.c`'s `string_source`.
pub struct StringSource {
    bytes: Vec<u8>,
    consumed: usize,
    exhausted: bool,
    closed: bool,
}

impl StringSource {
    pub fn new(text: String) -> Self {
        StringSource {
            bytes: text.into_bytes(),
            consumed: 0,
            exhausted: false,
            closed: false,
        }
    }
}

impl ByteSource for StringSource {
    fn window(&self) -> &[u8] {
        &self.bytes[self.consumed..]
    }

    fn more(&mut self) -> YipResult<usize> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        if self.exhausted {
            return Ok(0);
        }
        self.exhausted = true;
        Ok(self.bytes.len() - self.consumed)
    }

    fn less(&mut self, n: usize) -> YipResult<()> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        self.consumed += n;
        Ok(())
    }

    fn close(&mut self) -> YipResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// A source backed by any [`Read`] implementor, growing a dynamic buffer in
/// [`DYNAMIC_GROWTH`]-byte increments and periodically compacting consumed
/// bytes out of the front, matching `yip.c`'s `dynamic_more`/`dynamic_less`
/// (the source doesn't know the total length up front, unlike `buffer`).
pub struct StreamSource<R> {
    reader: R,
    buf: Vec<u8>,
    /// Index of the first byte still in the logical window; bytes before
    /// this have been `less()`-ed but not yet physically drained.
    start: usize,
    closed: bool,
}

impl<R: Read> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        StreamSource {
            reader,
            buf: Vec::new(),
            start: 0,
            closed: false,
        }
    }

    /// Drop already-consumed bytes once they make up a large fraction of the
    /// buffer, so the buffer doesn't grow without bound on a long stream.
    /// Amortized linear, as in `yip.c`'s compaction comment.
    fn compact_if_worthwhile(&mut self) {
        if self.start > DYNAMIC_GROWTH && self.start * 2 > self.buf.len() {
            self.buf.drain(..self.start);
            self.start = 0;
        }
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn window(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    fn more(&mut self) -> YipResult<usize> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        let old_len = self.buf.len();
        self.buf.resize(old_len + DYNAMIC_GROWTH, 0);
        let mut total_read = 0;
        loop {
            match self.reader.read(&mut self.buf[old_len + total_read..]) {
                Ok(0) => break,
                Ok(n) => {
                    total_read += n;
                    if old_len + total_read == self.buf.len() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(YipError::Io(e)),
            }
        }
        self.buf.truncate(old_len + total_read);
        Ok(total_read)
    }

    fn less(&mut self, n: usize) -> YipResult<()> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        self.start += n;
        self.compact_if_worthwhile();
        Ok(())
    }

    fn close(&mut self) -> YipResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl StreamSource<File> {
    /// A source reading a file descriptor by repeated `read(2)`, matching
    /// `yip.c`'s `fd_source`.
    pub fn from_path(path: impl AsRef<Path>) -> YipResult<Self> {
        Ok(StreamSource::new(File::open(path)?))
    }
}

/// A source backed by a read-only memory mapping of a file, matching
/// `yip.c`'s `fd_source` in its `mmap`-preferring configuration. The whole
/// file is visible as a single `window()` immediately, like
/// [`MemorySource`], but without a prior read into process memory.
pub struct MmapSource {
    map: memmap2::Mmap,
    consumed: usize,
    exhausted: bool,
    closed: bool,
}

impl MmapSource {
    pub fn from_file(file: &File) -> YipResult<Self> {
        // SAFETY: the mapped file is treated as immutable input for the
        // lifetime of this source; concurrent external truncation/writes to
        // the underlying file are the same hazard `yip.c`'s mmap source
        // carries and are outside this crate's control.
        let map = unsafe { memmap2::Mmap::map(file) }.map_err(YipError::Io)?;
        Ok(MmapSource {
            map,
            consumed: 0,
            exhausted: false,
            closed: false,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> YipResult<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }
}

impl ByteSource for MmapSource {
    fn window(&self) -> &[u8] {
        &self.map[self.consumed..]
    }

    fn more(&mut self) -> YipResult<usize> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        if self.exhausted {
            return Ok(0);
        }
        self.exhausted = true;
        Ok(self.map.len() - self.consumed)
    }

    fn less(&mut self, n: usize) -> YipResult<()> {
        if self.closed {
            return Err(YipError::SourceClosed);
        }
        self.consumed += n;
        Ok(())
    }

    fn close(&mut self) -> YipResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Either a memory-mapped or a buffered-read source, chosen automatically.
/// Mirrors `yip.c`'s `fd_source`, which prefers `mmap` and falls back to
/// `read` when the descriptor doesn't support mapping (pipes, sockets,
/// ttys).
pub enum AutoSource {
    Mmap(MmapSource),
    Stream(StreamSource<File>),
}

impl AutoSource {
    pub fn open(path: impl AsRef<Path>) -> YipResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        match MmapSource::from_file(&file) {
            Ok(mmap) => Ok(AutoSource::Mmap(mmap)),
            Err(_) => Ok(AutoSource::Stream(StreamSource::new(file))),
        }
    }
}

impl ByteSource for AutoSource {
    fn window(&self) -> &[u8] {
        match self {
            AutoSource::Mmap(s) => s.window(),
            AutoSource::Stream(s) => s.window(),
        }
    }

    fn more(&mut self) -> YipResult<usize> {
        match self {
            AutoSource::Mmap(s) => s.more(),
            AutoSource::Stream(s) => s.more(),
        }
    }

    fn less(&mut self, n: usize) -> YipResult<()> {
        match self {
            AutoSource::Mmap(s) => s.less(n),
            AutoSource::Stream(s) => s.less(n),
        }
    }

    fn close(&mut self) -> YipResult<()> {
        match self {
            AutoSource::Mmap(s) => s.close(),
            AutoSource::Stream(s) => s.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_exposes_whole_buffer_after_one_more() {
        let mut src = MemorySource::new(b"hello");
        assert_eq!(src.window(), b"");
        let n = src.more().unwrap();
        assert_eq!(n, 5);
        assert_eq!(src.window(), b"hello");
        assert_eq!(src.more().unwrap(), 0);
    }

    #[test]
    fn memory_source_less_shrinks_window_from_front() {
        let mut src = MemorySource::new(b"hello");
        src.more().unwrap();
        src.less(2).unwrap();
        assert_eq!(src.window(), b"llo");
    }

    #[test]
    fn stream_source_grows_and_compacts() {
        let data = vec![b'x'; DYNAMIC_GROWTH * 3];
        let mut src = StreamSource::new(io::Cursor::new(data.clone()));
        let mut total = 0;
        loop {
            let n = src.more().unwrap();
            if n == 0 {
                break;
            }
            total += n;
            src.less(n).unwrap();
        }
        assert_eq!(total, data.len());
    }

    #[test]
    fn string_source_round_trips() {
        let mut src = StringSource::new("key: value\n".to_string());
        let n = src.more().unwrap();
        assert_eq!(&src.window()[..n], b"key: value\n");
    }

    #[test]
    fn close_is_idempotent() {
        let mut src = MemorySource::new(b"hello");
        src.close().unwrap();
        src.close().unwrap();
    }

    #[test]
    fn operations_after_close_report_source_closed() {
        let mut src = MemorySource::new(b"hello");
        src.more().unwrap();
        src.close().unwrap();
        assert!(matches!(src.more(), Err(YipError::SourceClosed)));
        assert!(matches!(src.less(1), Err(YipError::SourceClosed)));
    }

    #[test]
    fn stream_source_operations_after_close_report_source_closed() {
        let mut src = StreamSource::new(io::Cursor::new(b"hello".to_vec()));
        src.more().unwrap();
        src.close().unwrap();
        assert!(matches!(src.more(), Err(YipError::SourceClosed)));
        assert!(matches!(src.less(1), Err(YipError::SourceClosed)));
    }
}
