use std::io::{Error, ErrorKind, Result};

/// Trait abstracting positional read access to serialized CHD maps.
///
/// Implementations must support positional reads without mutating shared
/// state. It is implemented for `std::fs::File` and for in-memory byte
/// slices, and forwarded through shared references.
pub trait ChdReader {
    /// Total number of bytes available from this source.
    fn len(&self) -> Result<u64>;

    /// Returns `true` when the source holds no bytes.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads `length` bytes starting at `offset` and forwards them to `f`.
    ///
    /// Implementations must fail with `ErrorKind::UnexpectedEof` whenever the
    /// requested range cannot be satisfied in full.
    fn read_exact_at<F, R>(&self, offset: u64, length: u64, f: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> Result<R>;
}

impl<T: ChdReader + ?Sized> ChdReader for &T {
    fn len(&self) -> Result<u64> {
        (**self).len()
    }

    fn read_exact_at<F, R>(&self, offset: u64, length: u64, f: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> Result<R>,
    {
        (**self).read_exact_at(offset, length, f)
    }
}

impl ChdReader for [u8] {
    fn len(&self) -> Result<u64> {
        Ok(<[u8]>::len(self) as u64)
    }

    fn read_exact_at<F, R>(&self, offset: u64, length: u64, f: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> Result<R>,
    {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= <[u8]>::len(self) as u64)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::UnexpectedEof,
                    format!(
                        "range {}+{} exceeds {} bytes",
                        offset,
                        length,
                        <[u8]>::len(self)
                    ),
                )
            })?;
        f(&self[offset as usize..end as usize])
    }
}

fn file_range_buffer(file: &std::fs::File, offset: u64, length: u64) -> Result<Vec<u8>> {
    let size = file.metadata()?.len();
    if offset.checked_add(length).map_or(true, |end| end > size) {
        return Err(Error::new(
            ErrorKind::UnexpectedEof,
            format!("range {}+{} exceeds file length {}", offset, length, size),
        ));
    }
    Ok(vec![0u8; buffer_len(length)?])
}

/// Converts a requested range length to an in-memory buffer size.
fn buffer_len(length: u64) -> Result<usize> {
    usize::try_from(length).map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("range length {} does not fit in memory", length),
        )
    })
}

#[cfg(unix)]
impl ChdReader for std::fs::File {
    fn len(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn read_exact_at<F, R>(&self, offset: u64, length: u64, f: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> Result<R>,
    {
        use std::os::unix::fs::FileExt;

        let mut buffer = file_range_buffer(self, offset, length)?;
        FileExt::read_exact_at(self, &mut buffer, offset)?;
        f(&buffer)
    }
}

#[cfg(windows)]
impl ChdReader for std::fs::File {
    fn len(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn read_exact_at<F, R>(&self, offset: u64, length: u64, f: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> Result<R>,
    {
        use std::os::windows::fs::FileExt;

        let mut buffer = file_range_buffer(self, offset, length)?;
        let mut filled = 0;
        while filled < buffer.len() {
            let bytes = self.seek_read(&mut buffer[filled..], offset + filled as u64)?;
            if bytes == 0 {
                return Err(Error::new(
                    ErrorKind::UnexpectedEof,
                    "Failed to read enough bytes",
                ));
            }
            filled += bytes;
        }
        f(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slice_reader() {
        let data: &[u8] = b"0123456789";
        assert_eq!(ChdReader::len(data).unwrap(), 10);
        let middle = data.read_exact_at(2, 3, |d| Ok(d.to_vec())).unwrap();
        assert_eq!(middle, b"234");
        let empty = data.read_exact_at(10, 0, |d| Ok(d.len())).unwrap();
        assert_eq!(empty, 0);

        let err = data.read_exact_at(8, 3, |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        let err = data.read_exact_at(u64::MAX, 2, |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_file_reader() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"chd reader test").unwrap();
        assert_eq!(ChdReader::len(&file).unwrap(), 15);
        assert!(!ChdReader::is_empty(&file).unwrap());

        let word = ChdReader::read_exact_at(&file, 4, 6, |d| Ok(d.to_vec())).unwrap();
        assert_eq!(word, b"reader");

        let err = ChdReader::read_exact_at(&file, 10, 10, |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_buffer_len() {
        assert_eq!(buffer_len(0).unwrap(), 0);
        assert_eq!(buffer_len(4096).unwrap(), 4096);
        assert_eq!(buffer_len(usize::MAX as u64).unwrap(), usize::MAX);
        if usize::BITS < u64::BITS {
            let err = buffer_len(u64::MAX).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn test_file_range_longer_than_address_space() {
        let file = tempfile::tempfile().unwrap();
        file.set_len(1 << 33).unwrap();
        let err = file_range_buffer(&file, 0, 1 << 32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
