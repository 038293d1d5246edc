use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use bytemuck::AnyBitPattern;
use nativemem_common::{Result, error::Error, result::verify_range};

use crate::{memops, stream::RegionStream};

/// An immutable, copyable view over a run of bytes owned elsewhere.
///
/// Values are only ever handed out by copy. There is no way to obtain a reference
/// into the memory, so a `ReadOnlyPointer` can be created over regions that other
/// views are allowed to write to.
#[derive(Clone, Copy)]
pub struct ReadOnlyPointer<'a> {
    ptr: *const u8,
    size: usize,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> ReadOnlyPointer<'a> {
    /// Returns the null view.
    pub const fn null() -> ReadOnlyPointer<'a> {
        ReadOnlyPointer {
            ptr: std::ptr::null(),
            size: 0,
            _marker: PhantomData,
        }
    }

    /// Creates a read-only view over `size` bytes starting at `ptr`.
    ///
    /// # Errors
    ///
    /// - `NullRegion` if `ptr` is null
    /// - `SizeTooSmall` if `size` is zero
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `size` bytes for the whole lifetime `'a`.
    pub unsafe fn new(ptr: *const u8, size: usize) -> Result<ReadOnlyPointer<'a>> {
        if ptr.is_null() {
            return Err(Error::null_region("pointer"));
        }
        if size < 1 {
            return Err(Error::size_too_small("size", size, 1));
        }
        Ok(Self::from_raw_parts(ptr, size))
    }

    /// Creates a read-only view over a byte slice.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<ReadOnlyPointer<'a>> {
        if bytes.is_empty() {
            return Err(Error::size_too_small("bytes", 0, 1));
        }
        Ok(Self::from_raw_parts(bytes.as_ptr(), bytes.len()))
    }

    #[inline]
    pub(crate) fn from_raw_parts(ptr: *const u8, size: usize) -> ReadOnlyPointer<'a> {
        ReadOnlyPointer {
            ptr,
            size,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.ptr as usize
    }

    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.size
    }

    /// Reads the `index`-th value of type `T`, i.e. the value at byte offset
    /// `index * size_of::<T>()`.
    ///
    /// # Errors
    ///
    /// - `NullRegion` for the null view
    /// - `OffsetOutOfRange` if the value does not fit in the view
    pub fn read<T: AnyBitPattern>(&self, index: usize) -> Result<T> {
        let type_size = std::mem::size_of::<T>();
        let offset = index
            .checked_mul(type_size)
            .ok_or_else(|| Error::offset_out_of_range("index", usize::MAX, type_size, self.size))?;
        self.read_at(offset)
    }

    /// Reads a value of type `T` at byte `offset`.
    pub fn read_at<T: AnyBitPattern>(&self, offset: usize) -> Result<T> {
        if self.is_null() {
            return Err(Error::null_region("read"));
        }
        verify_range("offset", offset, std::mem::size_of::<T>(), self.size)?;
        Ok(unsafe { (self.ptr.add(offset) as *const T).read_unaligned() })
    }

    /// Copies `destination.len()` bytes starting at `offset` into `destination`.
    pub fn copy_to_slice(&self, destination: &mut [u8], offset: usize) -> Result<()> {
        if self.is_null() {
            return Err(Error::null_region("copy_to_slice"));
        }
        verify_range("offset", offset, destination.len(), self.size)?;
        unsafe { memops::copy(destination.as_mut_ptr(), self.ptr.add(offset), destination.len()) };
        Ok(())
    }

    /// Copies the whole view into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut result = vec![0u8; self.size];
        if !self.is_null() {
            unsafe { memops::copy(result.as_mut_ptr(), self.ptr, self.size) };
        }
        result
    }

    /// Returns a read-only stream over the view.
    pub fn to_stream(&self) -> Result<RegionStream<'a>> {
        if self.is_null() {
            return Err(Error::null_region("to_stream"));
        }
        Ok(RegionStream::new(self.ptr as *mut u8, self.size, false))
    }
}

impl Default for ReadOnlyPointer<'_> {
    fn default() -> Self {
        ReadOnlyPointer::null()
    }
}

impl PartialEq for ReadOnlyPointer<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for ReadOnlyPointer<'_> {}

impl PartialOrd for ReadOnlyPointer<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadOnlyPointer<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

impl Hash for ReadOnlyPointer<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl std::fmt::Debug for ReadOnlyPointer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyPointer")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}
