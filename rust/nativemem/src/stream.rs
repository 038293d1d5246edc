use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    marker::PhantomData,
};

/// A seekable byte stream over a fixed-size memory region.
///
/// The stream never grows the region: writes past the end are truncated, and a write
/// that starts at the end reports zero bytes written.
pub struct RegionStream<'a> {
    ptr: *mut u8,
    len: usize,
    position: u64,
    writable: bool,
    _marker: PhantomData<&'a std::cell::Cell<u8>>,
}

impl<'a> RegionStream<'a> {
    pub(crate) fn new(ptr: *mut u8, len: usize, writable: bool) -> RegionStream<'a> {
        RegionStream {
            ptr,
            len,
            position: 0,
            writable,
            _marker: PhantomData,
        }
    }

    /// Length of the underlying region in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn remaining(&self) -> usize {
        (self.len as u64).saturating_sub(self.position) as usize
    }
}

impl Read for RegionStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let amount = buf.len().min(self.remaining());
        if amount > 0 {
            unsafe {
                std::ptr::copy(
                    self.ptr.add(self.position as usize),
                    buf.as_mut_ptr(),
                    amount,
                )
            };
            self.position += amount as u64;
        }
        Ok(amount)
    }
}

impl Write for RegionStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream is read-only",
            ));
        }
        let amount = buf.len().min(self.remaining());
        if amount > 0 {
            unsafe {
                std::ptr::copy(buf.as_ptr(), self.ptr.add(self.position as usize), amount)
            };
            self.position += amount as u64;
        }
        Ok(amount)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for RegionStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.position = n;
                return Ok(n);
            }
            SeekFrom::End(n) => (self.len as u64, n),
            SeekFrom::Current(n) => (self.position, n),
        };
        match base.checked_add_signed(offset) {
            Some(n) => {
                self.position = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

impl std::fmt::Debug for RegionStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionStream")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("position", &self.position)
            .field("writable", &self.writable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom, Write};

    use crate::{ptr::Ptr, read_only::ReadOnlyPointer};

    #[test]
    fn test_read_write_seek() {
        let mut data = [0u8; 8];
        let ptr = Ptr::from_slice(&mut data).unwrap();
        let mut stream = ptr.to_stream(2, Some(4)).unwrap();
        assert_eq!(stream.len(), 4);

        assert_eq!(stream.write(&[1, 2, 3, 4, 5, 6]).unwrap(), 4);
        assert_eq!(stream.write(&[7]).unwrap(), 0);

        stream.seek(SeekFrom::Start(1)).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[2, 3, 4]);

        assert_eq!(stream.seek(SeekFrom::End(-1)).unwrap(), 3);
        assert_eq!(stream.seek(SeekFrom::Current(-3)).unwrap(), 0);
        assert!(stream.seek(SeekFrom::Current(-1)).is_err());

        assert_eq!(data, [0, 0, 1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn test_read_past_end() {
        let mut data = [9u8; 4];
        let ptr = Ptr::from_slice(&mut data).unwrap();
        let mut stream = ptr.to_stream(0, None).unwrap();
        stream.seek(SeekFrom::Start(100)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert_eq!(stream.write(&buf).unwrap(), 0);
    }

    #[test]
    fn test_read_only_stream() {
        let bytes: Vec<u8> = (0..10).collect();
        let ro = ReadOnlyPointer::from_bytes(&bytes).unwrap();
        let mut stream = ro.to_stream().unwrap();
        assert!(!stream.is_writable());
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, bytes);
        let err = stream.write(&[1]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
