//! Little-endian primitives shared by the map decoder and encoder.
//!
//! Every integer on the wire is an unsigned 64-bit little-endian word; byte
//! strings are raw and carry no framing of their own (their lengths are
//! written separately by the caller).

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::{ChdError, Result};

pub(crate) const WORD: usize = std::mem::size_of::<u64>();

/// Sequential, bounds-checked reader over an in-memory byte slice.
///
/// `base` is the absolute offset of `data[0]` in the original source, used
/// only to report meaningful offsets in errors.
#[derive(Debug)]
pub struct SliceDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> SliceDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub fn with_base(data: &'a [u8], base: u64) -> Self {
        Self { data, pos: 0, base }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(WORD as u64)?;
        Ok(LittleEndian::read_u64(bytes))
    }

    /// Reads `len` raw bytes, borrowing them from the underlying slice.
    pub fn read_bytes(&mut self, len: u64) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Checks that `count` items of `item_size` bytes each are still
    /// available, without consuming anything.
    pub fn ensure(&self, field: &'static str, count: u64, item_size: u64) -> Result<usize> {
        let needed = count
            .checked_mul(item_size)
            .ok_or(ChdError::LengthOverflow {
                field,
                value: count,
            })?;
        if needed > self.remaining() as u64 {
            return Err(self.eof(needed));
        }
        usize::try_from(count).map_err(|_| ChdError::LengthOverflow {
            field,
            value: count,
        })
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8]> {
        if len > self.remaining() as u64 {
            return Err(self.eof(len));
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok(&self.data[start..self.pos])
    }

    fn eof(&self, needed: u64) -> ChdError {
        ChdError::UnexpectedEof {
            offset: self.base + self.pos as u64,
            needed,
            available: self.remaining() as u64,
        }
    }
}

/// Sequential writer that counts emitted bytes and stops at the first error.
///
/// Once a write fails, every later call returns the same kind of
/// [`ChdError::Write`] without touching the sink again.
#[derive(Debug)]
pub struct CountingEncoder<W: Write> {
    inner: W,
    written: u64,
    failed: bool,
}

impl<W: Write> CountingEncoder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            failed: false,
        }
    }

    /// Total bytes of fields the sink accepted in full.
    ///
    /// A field that failed midway is not counted, and with a buffered sink
    /// this counts bytes buffered rather than bytes that reached storage.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.guard()?;
        match self.inner.write_u64::<LittleEndian>(value) {
            Ok(()) => {
                self.written += WORD as u64;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.guard()?;
        match self.inner.write_all(bytes) {
            Ok(()) => {
                self.written += bytes.len() as u64;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.guard()?;
        self.inner.flush().map_err(|e| self.fail(e))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn guard(&self) -> Result<()> {
        if self.failed {
            return Err(ChdError::Write {
                written: self.written,
                source: std::io::Error::other("encoder already failed"),
            });
        }
        Ok(())
    }

    fn fail(&mut self, source: std::io::Error) -> ChdError {
        self.failed = true;
        ChdError::Write {
            written: self.written,
            source,
        }
    }
}
