//! Owning (or explicitly aliasing) typed buffers over native memory.

use std::{
    io::Write,
    ops::{Index, IndexMut, RangeBounds},
};

use bytemuck::Pod;
use nativemem_alloc::AlignedBlock;
use nativemem_common::{Result, error::Error};

use crate::{
    align::{is_aligned, whole_elements_size},
    options::{AllocationOptions, allocate_elements},
    pin::PinHandle,
    ptr::{Ptr, cast_count, check_destination},
    read_only::ReadOnlyPointer,
    stream::RegionStream,
};

enum BufferOwner {
    /// Memory allocated by the buffer itself.
    Allocated(AlignedBlock),
    /// Caller data kept at a fixed address until the buffer is released.
    Pinned(PinHandle),
    /// Memory owned elsewhere; releasing the buffer does nothing to it.
    Alias,
    Disposed,
}

impl BufferOwner {
    fn describe(&self) -> &'static str {
        match self {
            BufferOwner::Allocated(_) => "allocated",
            BufferOwner::Pinned(_) => "pinned",
            BufferOwner::Alias => "alias",
            BufferOwner::Disposed => "disposed",
        }
    }
}

/// A typed buffer over native memory, indexed by element.
///
/// A buffer either owns its memory (allocated with a requested alignment, or pinned
/// caller data) or aliases memory owned by someone else. Owned memory is released by
/// [`dispose`](Buffer::dispose) or when the buffer is dropped; an alias never frees
/// anything.
///
/// Element access is always bounds-checked. [`Index`] panics on a bad index, while
/// [`get`](Buffer::get) and friends return an error.
///
/// # Example
///
/// ```
/// use nativemem::{AllocationOptions, Buffer};
///
/// let mut buffer = Buffer::<i32>::allocate_with(10, AllocationOptions::default().alignment(16))?;
/// buffer[3] = 42;
/// assert_eq!(buffer.as_ptr() as usize % 16, 0);
/// assert_eq!(buffer.size_in_bytes(), 40);
/// assert_eq!(buffer.get(3)?, &42);
/// assert!(buffer.dispose());
/// # Ok::<(), nativemem::Error>(())
/// ```
pub struct Buffer<T> {
    ptr: *mut T,
    len: usize,
    owner: BufferOwner,
}

impl<T: Pod> Buffer<T> {
    /// Allocates a zeroed buffer of `count` elements with the default alignment.
    pub fn allocate(count: usize) -> Result<Buffer<T>> {
        Self::allocate_with(count, AllocationOptions::default())
    }

    /// Allocates a buffer of `count` elements.
    ///
    /// # Errors
    ///
    /// - `SizeTooSmall` if `count` is zero
    /// - `InvalidArgument` if the alignment is not a power of two
    /// - `OutOfMemory` if the allocation fails
    pub fn allocate_with(count: usize, options: AllocationOptions) -> Result<Buffer<T>> {
        let block = allocate_elements::<T>(count, options)?;
        log::trace!(
            "Buffer::allocate: {count} x {} bytes at {:p}",
            std::mem::size_of::<T>(),
            block.as_ptr()
        );
        Ok(Buffer {
            ptr: block.as_ptr() as *mut T,
            len: count,
            owner: BufferOwner::Allocated(block),
        })
    }

    /// Pins the whole of `data` and exposes it as a buffer.
    pub fn pin(data: impl Into<Box<[T]>>) -> Result<Buffer<T>>
    where
        T: Send,
    {
        Self::pin_range(data, 0, None)
    }

    /// Pins `data` and exposes `count` elements starting at `index` as a buffer.
    /// When `count` is `None`, the buffer extends to the end of `data`.
    ///
    /// # Errors
    ///
    /// - `OffsetOutOfRange` if the range does not lie inside `data`
    /// - `SizeTooSmall` if the range is empty
    pub fn pin_range(data: impl Into<Box<[T]>>, index: usize, count: Option<usize>) -> Result<Buffer<T>>
    where
        T: Send,
    {
        let data = data.into();
        let len = data.len();
        let count = match count {
            Some(count) => count,
            None => len
                .checked_sub(index)
                .ok_or_else(|| Error::offset_out_of_range("index", index, 0, len))?,
        };
        nativemem_common::result::verify_range("index", index, count, len)?;
        if count < 1 {
            return Err(Error::size_too_small("count", count, 1));
        }

        let handle = PinHandle::pin_slice(data)?;
        let ptr = unsafe { (handle.address() as *mut T).add(index) };
        log::trace!("Buffer::pin: {count} elements at {ptr:p}");
        Ok(Buffer {
            ptr,
            len: count,
            owner: BufferOwner::Pinned(handle),
        })
    }

    /// Creates a buffer that aliases the memory of a view.
    ///
    /// # Errors
    ///
    /// - `NullRegion` if the view is null
    /// - `InvalidArgument` if the view is not aligned for `T`
    ///
    /// # Safety
    ///
    /// The memory behind `view` must stay valid while the buffer is used, and must
    /// not be accessed through any other path during that time.
    pub unsafe fn from_view(view: Ptr<'_, T>) -> Result<Buffer<T>> {
        if view.is_null() {
            return Err(Error::null_region("view"));
        }
        unsafe { Self::from_raw_parts(view.as_ptr(), view.len()) }
    }

    /// Creates a buffer that aliases `count` elements at `ptr`.
    ///
    /// # Errors
    ///
    /// - `NullRegion` if `ptr` is null
    /// - `SizeTooSmall` if `count` is zero
    /// - `InvalidArgument` if `ptr` is not aligned for `T`
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `count` elements while the buffer
    /// is used, and must not be accessed through any other path during that time.
    pub unsafe fn from_raw_parts(ptr: *mut T, count: usize) -> Result<Buffer<T>> {
        if ptr.is_null() {
            return Err(Error::null_region("pointer"));
        }
        if count < 1 {
            return Err(Error::size_too_small("count", count, 1));
        }
        if !is_aligned(ptr, std::mem::align_of::<T>()) {
            return Err(Error::invalid_arg("ptr", "address is not aligned for the element type"));
        }
        Ok(Buffer {
            ptr,
            len: count,
            owner: BufferOwner::Alias,
        })
    }

    /// Creates a buffer that aliases the memory of a read-only view. Trailing bytes
    /// that do not make up a whole element are not part of the buffer.
    ///
    /// # Safety
    ///
    /// Same as [`from_raw_parts`](Buffer::from_raw_parts). In addition the buffer
    /// must not be written to unless the memory is actually writable.
    pub unsafe fn from_read_only(view: ReadOnlyPointer<'_>) -> Result<Buffer<T>> {
        if view.is_null() {
            return Err(Error::null_region("view"));
        }
        let size = whole_elements_size::<T>(view.size_in_bytes());
        if size == 0 {
            return Err(Error::size_too_small(
                "view",
                view.size_in_bytes(),
                std::mem::size_of::<T>(),
            ));
        }
        unsafe { Self::from_raw_parts(view.as_ptr() as *mut T, size / std::mem::size_of::<T>()) }
    }

    /// Number of elements, zero once the buffer has been disposed.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of a single element in bytes.
    #[inline]
    pub fn type_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.len * self.type_size()
    }

    /// Returns `true` if the buffer does not own its memory.
    pub fn is_alias(&self) -> bool {
        matches!(self.owner, BufferOwner::Alias)
    }

    /// Returns `true` if the buffer holds pinned caller data.
    pub fn is_pinned(&self) -> bool {
        matches!(self.owner, BufferOwner::Pinned(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.owner, BufferOwner::Disposed)
    }

    /// Returns the alignment the memory was allocated with, if the buffer allocated it.
    pub fn alignment(&self) -> Option<usize> {
        match &self.owner {
            BufferOwner::Allocated(block) => Some(block.alignment()),
            _ => None,
        }
    }

    /// Address of the first element, null once disposed.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    pub fn as_slice(&self) -> &[T] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.ptr.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    fn check_live(&self, context: &str) -> Result<()> {
        if self.is_disposed() {
            Err(Error::already_disposed(context))
        } else {
            Ok(())
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        self.check_live("index")?;
        if index >= self.len {
            return Err(Error::index_out_of_range(index, self.len));
        }
        Ok(())
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// - `AlreadyDisposed` once the buffer has been disposed
    /// - `IndexOutOfRange` if `index >= len()`
    pub fn get(&self, index: usize) -> Result<&T> {
        self.check_index(index)?;
        Ok(unsafe { &*self.ptr.add(index) })
    }

    /// Returns a mutable reference to the element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        self.check_index(index)?;
        Ok(unsafe { &mut *self.ptr.add(index) })
    }

    /// Reads a value of type `U` starting at the byte position of element `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if `index` is not a valid element index, or
    /// `OffsetOutOfRange` if the value would extend past the end of the buffer.
    pub fn read_as<U: Pod>(&self, index: usize) -> Result<U> {
        let ptr = self.element_bytes::<U>(index)?;
        Ok(unsafe { (ptr as *const U).read_unaligned() })
    }

    /// Writes a value of type `U` starting at the byte position of element `index`.
    ///
    /// # Errors
    ///
    /// Same as [`read_as`](Buffer::read_as).
    pub fn write_as<U: Pod>(&mut self, index: usize, value: U) -> Result<()> {
        let ptr = self.element_bytes::<U>(index)?;
        unsafe { (ptr as *mut U).write_unaligned(value) };
        Ok(())
    }

    /// Address of element `index`, after checking that a `U` fits from there.
    fn element_bytes<U>(&self, index: usize) -> Result<*mut u8> {
        self.check_index(index)?;
        let offset = index * self.type_size();
        nativemem_common::result::verify_range(
            "index",
            offset,
            std::mem::size_of::<U>(),
            self.size_in_bytes(),
        )?;
        Ok(unsafe { (self.ptr as *mut u8).add(offset) })
    }

    /// Returns a view over the whole buffer, or the null view once disposed.
    pub fn as_view(&mut self) -> Ptr<'_, T> {
        if self.ptr.is_null() {
            return Ptr::null();
        }
        Ptr::from_raw_parts(self.ptr, 0, self.len)
    }

    /// Returns a view over a range of elements.
    ///
    /// # Errors
    ///
    /// - `AlreadyDisposed` once the buffer has been disposed
    /// - `OffsetOutOfRange` if the range does not lie inside the buffer
    /// - `SizeTooSmall` if the range is empty
    pub fn view(&mut self, range: impl RangeBounds<usize>) -> Result<Ptr<'_, T>> {
        self.check_live("view")?;
        let (start, end) = resolve_range(&range, self.len)?;
        nativemem_common::result::verify_range("range", start, end - start, self.len)?;
        if start == end {
            return Err(Error::size_too_small("range", 0, 1));
        }
        Ok(Ptr::from_raw_parts(unsafe { self.ptr.add(start) }, 0, end - start))
    }

    /// Returns a view over a range of elements, or the null view if the range is
    /// empty or not inside the buffer.
    pub fn slice(&mut self, range: impl RangeBounds<usize>) -> Ptr<'_, T> {
        self.as_view().slice(range)
    }

    /// Returns a view of the buffer's bytes as elements of type `U`.
    ///
    /// # Errors
    ///
    /// - `AlreadyDisposed` once the buffer has been disposed
    /// - `WideningCast` if the byte size is not a whole, non-zero number of `U`
    pub fn cast<U: Pod>(&mut self) -> Result<Ptr<'_, U>> {
        self.check_live("cast")?;
        self.as_view().cast::<U>()
    }

    /// Converts the buffer into a buffer of `U` over the same memory, transferring
    /// ownership. The buffer is released if the conversion fails.
    ///
    /// # Errors
    ///
    /// - `AlreadyDisposed` if the buffer has been disposed
    /// - `WideningCast` if the byte size is not a whole, non-zero number of `U`
    /// - `InvalidArgument` if the memory is not aligned for `U`
    pub fn into_cast<U: Pod>(mut self) -> Result<Buffer<U>> {
        self.check_live("into_cast")?;
        let count = cast_count::<U>(self.size_in_bytes());
        let aligned = is_aligned(self.ptr, std::mem::align_of::<U>());
        let count = match (count, aligned) {
            (Ok(count), true) => count,
            (Err(e), _) => {
                self.dispose();
                return Err(e);
            }
            (Ok(_), false) => {
                self.dispose();
                return Err(Error::invalid_arg(
                    "U",
                    "buffer is not aligned for the target element type",
                ));
            }
        };
        let owner = std::mem::replace(&mut self.owner, BufferOwner::Disposed);
        Ok(Buffer {
            ptr: self.ptr as *mut U,
            len: count,
            owner,
        })
    }

    /// Copies `count` elements starting at `source_index` into `destination` at
    /// `dest_index`. When `count` is `None`, everything from `source_index` on is copied.
    ///
    /// # Errors
    ///
    /// - `AlreadyDisposed` if either buffer has been disposed
    /// - `OffsetOutOfRange` if the source range is not inside this buffer
    /// - `SizeTooSmall` if the destination range does not fit the destination
    pub fn copy_to(
        &self,
        destination: &mut Buffer<T>,
        source_index: usize,
        count: Option<usize>,
        dest_index: usize,
    ) -> Result<()> {
        destination.check_live("destination")?;
        let count = self.resolve_count(source_index, count)?;
        check_destination(dest_index, count, destination.len)?;
        unsafe {
            crate::memops::copy(
                destination.ptr.add(dest_index) as *mut u8,
                self.ptr.add(source_index) as *const u8,
                count * self.type_size(),
            )
        };
        Ok(())
    }

    /// Copies elements into a slice. See [`copy_to`](Buffer::copy_to).
    pub fn copy_to_slice(
        &self,
        destination: &mut [T],
        source_index: usize,
        count: Option<usize>,
        dest_index: usize,
    ) -> Result<()> {
        let count = self.resolve_count(source_index, count)?;
        check_destination(dest_index, count, destination.len())?;
        destination[dest_index..dest_index + count]
            .copy_from_slice(&self.as_slice()[source_index..source_index + count]);
        Ok(())
    }

    /// Copies `count` elements starting at `start` into a new vector.
    pub fn to_vec(&self, start: usize, count: Option<usize>) -> Result<Vec<T>> {
        let count = self.resolve_count(start, count)?;
        Ok(self.as_slice()[start..start + count].to_vec())
    }

    /// Writes `value` to every byte of the buffer.
    pub fn fill(&mut self, value: u8) -> Result<()> {
        self.check_live("fill")?;
        unsafe { crate::memops::fill(self.ptr as *mut u8, value, self.size_in_bytes()) };
        Ok(())
    }

    /// Writes the bytes of `count` elements starting at `start` to `writer`.
    pub fn copy_to_writer<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        start: usize,
        count: Option<usize>,
    ) -> Result<()> {
        let count = self.resolve_count(start, count)?;
        let bytes: &[u8] = bytemuck::cast_slice(&self.as_slice()[start..start + count]);
        writer
            .write_all(bytes)
            .map_err(|e| Error::io("copy_to_writer", e))
    }

    /// Returns a stream over `count` elements starting at `index`.
    pub fn to_stream(&mut self, index: usize, count: Option<usize>) -> Result<RegionStream<'_>> {
        self.check_live("to_stream")?;
        self.as_view().to_stream(index, count)
    }

    /// Returns a read-only view over the buffer's bytes.
    pub fn to_read_only(&self) -> ReadOnlyPointer<'_> {
        if self.ptr.is_null() {
            return ReadOnlyPointer::null();
        }
        ReadOnlyPointer::from_raw_parts(self.ptr as *const u8, self.size_in_bytes())
    }

    fn resolve_count(&self, start: usize, count: Option<usize>) -> Result<usize> {
        self.check_live("source")?;
        let count = match count {
            Some(count) => count,
            None => self
                .len
                .checked_sub(start)
                .ok_or_else(|| Error::offset_out_of_range("start", start, 0, self.len))?,
        };
        nativemem_common::result::verify_range("start", start, count, self.len)?;
        Ok(count)
    }

    /// Releases the buffer's memory (or pin). Returns `true` the first time only.
    ///
    /// Afterwards the buffer has no elements, its address is null and element
    /// access fails with `AlreadyDisposed`.
    pub fn dispose(&mut self) -> bool {
        let owner = std::mem::replace(&mut self.owner, BufferOwner::Disposed);
        if matches!(owner, BufferOwner::Disposed) {
            return false;
        }
        log::debug!(
            "Buffer::dispose: {} buffer at {:p}, {} bytes",
            owner.describe(),
            self.ptr,
            self.size_in_bytes()
        );
        self.ptr = std::ptr::null_mut();
        self.len = 0;
        drop(owner);
        true
    }

    /// Releases a pinned buffer and hands back the pinned data.
    ///
    /// Returns `None` if the buffer does not hold a pinned slice of `T`; the buffer
    /// is released either way.
    pub fn into_pinned_data(mut self) -> Option<Box<[T]>> {
        let owner = std::mem::replace(&mut self.owner, BufferOwner::Disposed);
        self.ptr = std::ptr::null_mut();
        self.len = 0;
        match owner {
            BufferOwner::Pinned(handle) => handle.into_inner::<Box<[T]>>(),
            _ => None,
        }
    }
}

impl Buffer<u8> {
    /// Pins a single value and exposes its bytes as a buffer.
    pub fn pin_value<V: Pod + Send>(value: Box<V>) -> Result<Buffer<u8>> {
        let handle = PinHandle::pin_value(value)?;
        Ok(Buffer {
            ptr: handle.address(),
            len: handle.size(),
            owner: BufferOwner::Pinned(handle),
        })
    }
}

fn resolve_range(range: &impl RangeBounds<usize>, len: usize) -> Result<(usize, usize)> {
    use std::ops::Bound;
    let start = match range.start_bound() {
        Bound::Included(&n) => Some(n),
        Bound::Excluded(&n) => n.checked_add(1),
        Bound::Unbounded => Some(0),
    };
    let end = match range.end_bound() {
        Bound::Included(&n) => n.checked_add(1),
        Bound::Excluded(&n) => Some(n),
        Bound::Unbounded => Some(len),
    };
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok((start, end)),
        (start, _) => Err(Error::offset_out_of_range(
            "range",
            start.unwrap_or(usize::MAX),
            0,
            len,
        )),
    }
}

impl<T: Pod> Index<usize> for Buffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: Pod> IndexMut<usize> for Buffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        match &self.owner {
            BufferOwner::Alias | BufferOwner::Disposed => {}
            owner => {
                if cfg!(debug_assertions) {
                    log::warn!(
                        "{} buffer at {:p} ({} elements) was dropped without being disposed",
                        owner.describe(),
                        self.ptr,
                        self.len
                    );
                }
            }
        }
    }
}

impl<T> PartialEq for Buffer<T> {
    /// Buffers are equal when they cover the same memory.
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.len == other.len
    }
}

impl<T> Eq for Buffer<T> {}

impl<T> std::fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("owner", &self.owner.describe())
            .finish()
    }
}

// SAFETY: the buffer owns (or exclusively aliases) its memory; moving it to another
// thread moves that access along with it.
unsafe impl<T: Send> Send for Buffer<T> {}

// SAFETY: shared access only hands out `&T` and copies.
unsafe impl<T: Sync> Sync for Buffer<T> {}

#[cfg(test)]
mod tests {
    use nativemem_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_allocate_aligned() {
        for alignment in [1, 4, 16, 64, 256] {
            let mut buffer =
                Buffer::<i32>::allocate_with(10, AllocationOptions::default().alignment(alignment))
                    .unwrap();
            assert_eq!(buffer.as_ptr() as usize % alignment, 0);
            assert_eq!(buffer.len(), 10);
            assert_eq!(buffer.size_in_bytes(), 40);
            assert!(buffer.as_slice().iter().all(|&v| v == 0));
            buffer[3] = 42;
            assert_eq!(buffer[3], 42);
            assert!(buffer.dispose());
        }
    }

    #[test]
    fn test_allocate_rejects_bad_arguments() {
        let err = Buffer::<u8>::allocate(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SizeTooSmall { .. }));
        let err = Buffer::<u8>::allocate_with(4, AllocationOptions::default().alignment(3))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_get_and_index_errors() {
        let mut buffer = Buffer::<u16>::allocate(4).unwrap();
        *buffer.get_mut(1).unwrap() = 7;
        assert_eq!(buffer.get(1).unwrap(), &7);
        let err = buffer.get(4).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange { index: 4, len: 4 }));
        buffer.dispose();
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_panics_out_of_range() {
        let buffer = Buffer::<u16>::allocate(4).unwrap();
        let _ = buffer[4];
    }

    #[test]
    fn test_dispose_twice() {
        let mut buffer = Buffer::<u64>::allocate(8).unwrap();
        assert!(buffer.dispose());
        assert!(!buffer.dispose());
        assert!(buffer.is_disposed());
        assert!(buffer.as_ptr().is_null());
        assert_eq!(buffer.len(), 0);
        let err = buffer.get(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyDisposed { .. }));
        assert!(buffer.as_view().is_null());
        assert!(buffer.fill(0).is_err());
        assert!(buffer.as_slice().is_empty());
    }

    #[test]
    fn test_cast_view() {
        let mut buffer = Buffer::<i32>::allocate(128).unwrap();
        let bytes = buffer.cast::<u8>().unwrap();
        assert_eq!(bytes.len(), 512);
        bytes.set(4, 1).unwrap();
        assert_eq!(buffer[1], i32::from_ne_bytes([1, 0, 0, 0]));
        buffer.dispose();
    }

    #[test]
    fn test_cast_widening_fails() {
        let mut buffer = Buffer::<u8>::allocate(6).unwrap();
        let err = buffer.cast::<u64>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WideningCast { .. }));
        buffer.dispose();
    }

    #[test]
    fn test_into_cast_transfers_ownership() {
        let mut buffer = Buffer::<u32>::allocate(4).unwrap();
        buffer.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);
        let bytes = buffer.into_cast::<u8>().unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes.alignment(), Some(16));
        let mut back = bytes.into_cast::<u32>().unwrap();
        assert_eq!(back.as_slice(), &[1, 2, 3, 4]);
        assert!(back.dispose());

        let buffer = Buffer::<u8>::allocate(6).unwrap();
        let err = buffer.into_cast::<u32>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WideningCast { .. }));

        let mut bytes = Buffer::<u8>::allocate(8).unwrap();
        bytes.dispose();
        let err = bytes.into_cast::<u32>().unwrap_err();
        assert!(err.is_disposed());
    }

    #[test]
    fn test_view_and_slice() {
        let mut buffer = Buffer::pin((0..10).collect::<Vec<i32>>()).unwrap();
        let view = buffer.view(2..5).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get(0).unwrap(), 2);

        assert!(buffer.view(5..11).is_err());
        assert!(buffer.view(3..3).is_err());
        assert!(buffer.slice(5..11).is_null());
        assert!(buffer.slice(10..).is_null());
        assert_eq!(buffer.slice(7..).len(), 3);
        buffer.dispose();
    }

    #[test]
    fn test_pin_and_get_data_back() {
        let data: Box<[u32]> = (0..16).collect();
        let expected = data.as_ptr();
        let mut buffer = Buffer::pin_range(data, 4, Some(8)).unwrap();
        assert!(buffer.is_pinned());
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer[0], 4);
        assert_eq!(buffer.as_ptr(), unsafe { expected.add(4) });

        buffer[0] = 100;
        let data = buffer.into_pinned_data().unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(data[4], 100);
        assert_eq!(data.as_ptr(), expected);
    }

    #[test]
    fn test_pin_range_errors() {
        let err = Buffer::pin_range(vec![1u8, 2, 3], 4, None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
        let err = Buffer::pin_range(vec![1u8, 2, 3], 1, Some(3)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
        let err = Buffer::pin_range(vec![1u8, 2, 3], 3, None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SizeTooSmall { .. }));
    }

    #[derive(Clone, Copy, Debug, PartialEq, bytemuck::Zeroable, bytemuck::Pod)]
    #[repr(C)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_pin_value_as_bytes() {
        let mut buffer = Buffer::pin_value(Box::new(Point { x: 1, y: 2 })).unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.read_as::<i32>(4).unwrap(), 2);
        assert!(buffer.read_as::<i32>(5).is_err());
        assert!(buffer.read_as::<Point>(0).is_ok());
        buffer.dispose();
    }

    #[test]
    fn test_write_as_at_element_position() {
        let mut buffer = Buffer::pin_value(Box::new(Point { x: 1, y: 2 })).unwrap();
        buffer.write_as::<i32>(4, -7).unwrap();
        assert_eq!(buffer.read_as::<Point>(0).unwrap(), Point { x: 1, y: -7 });

        buffer.write_as(0, Point { x: 10, y: 20 }).unwrap();
        assert_eq!(buffer.read_as::<i32>(0).unwrap(), 10);

        let err = buffer.write_as::<i32>(5, 0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));
        let err = buffer.write_as::<i32>(8, 0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexOutOfRange { .. }));
        assert_eq!(buffer.read_as::<Point>(0).unwrap(), Point { x: 10, y: 20 });

        assert!(buffer.dispose());
        assert!(buffer.write_as::<i32>(0, 1).unwrap_err().is_disposed());
    }

    #[test]
    fn test_alias_buffer() {
        let mut data = [1u32, 2, 3];
        let mut alias = unsafe { Buffer::from_raw_parts(data.as_mut_ptr(), 3) }.unwrap();
        assert!(alias.is_alias());
        alias[2] = 30;
        assert!(alias.dispose());
        assert_eq!(data, [1, 2, 30]);

        let err = unsafe { Buffer::<u32>::from_raw_parts(std::ptr::null_mut(), 3) }.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NullRegion { .. }));
    }

    #[test]
    fn test_alias_from_view() {
        let mut owner = Buffer::<u16>::allocate(6).unwrap();
        let view = owner.slice(2..4);
        let mut alias = unsafe { Buffer::from_view(view) }.unwrap();
        alias[1] = 9;
        assert!(alias.dispose());
        assert_eq!(owner[3], 9);
        assert!(owner.dispose());
    }

    #[test]
    fn test_from_read_only_trims_partial_elements() {
        let bytes = [0u64; 2];
        let ro = ReadOnlyPointer::from_bytes(&bytemuck::cast_slice::<u64, u8>(&bytes)[..15]).unwrap();
        let alias = unsafe { Buffer::<u32>::from_read_only(ro) }.unwrap();
        assert_eq!(alias.len(), 3);
        let err = unsafe {
            Buffer::<u64>::from_read_only(ReadOnlyPointer::from_bytes(&[0u8; 4]).unwrap())
        }
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SizeTooSmall { .. }));
    }

    #[test]
    fn test_copy_to() {
        let source = Buffer::pin(vec![1i32, 2, 3, 4, 5]).unwrap();
        let mut dest = Buffer::<i32>::allocate(5).unwrap();
        source.copy_to(&mut dest, 0, None, 0).unwrap();
        assert_eq!(dest.as_slice(), source.as_slice());

        source.copy_to(&mut dest, 3, Some(2), 0).unwrap();
        assert_eq!(dest.as_slice(), &[4, 5, 3, 4, 5]);

        let mut small = Buffer::<i32>::allocate(2).unwrap();
        let err = source.copy_to(&mut small, 0, None, 0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SizeTooSmall { .. }));
        let err = source.copy_to(&mut dest, 4, Some(2), 0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::OffsetOutOfRange { .. }));

        let mut out = [0i32; 3];
        source.copy_to_slice(&mut out, 1, Some(2), 1).unwrap();
        assert_eq!(out, [0, 2, 3]);
        assert_eq!(source.to_vec(2, None).unwrap(), vec![3, 4, 5]);

        for mut buffer in [source, dest, small] {
            buffer.dispose();
        }
    }

    #[test]
    fn test_fill_and_writer() {
        let mut buffer = Buffer::<u16>::allocate(3).unwrap();
        buffer.fill(0xAB).unwrap();
        assert!(buffer.as_slice().iter().all(|&v| v == 0xABAB));
        let mut out = Vec::new();
        buffer.copy_to_writer(&mut out, 1, None).unwrap();
        assert_eq!(out, vec![0xAB; 4]);
        buffer.dispose();
    }

    #[test]
    fn test_to_read_only() {
        let mut buffer = Buffer::pin(vec![7u32, 8]).unwrap();
        let ro = buffer.to_read_only();
        assert_eq!(ro.size_in_bytes(), 8);
        assert_eq!(ro.read::<u32>(1).unwrap(), 8);
        buffer.dispose();
        assert!(buffer.to_read_only().is_null());
    }

    #[test]
    fn test_equality() {
        let mut a = Buffer::<u8>::allocate(4).unwrap();
        let mut b = Buffer::<u8>::allocate(4).unwrap();
        assert_ne!(a, b);
        let mut alias = unsafe { Buffer::from_raw_parts(a.as_mut_ptr(), 4) }.unwrap();
        assert_eq!(alias, a);
        alias.dispose();
        a.dispose();
        b.dispose();
    }

    #[test]
    fn test_live_stats_follow_dispose() {
        let before = nativemem_alloc::observer::allocation_stats().total_allocations;
        let mut buffer = Buffer::<u8>::allocate(1024).unwrap();
        assert!(nativemem_alloc::observer::allocation_stats().total_allocations > before);
        buffer.dispose();
    }
}
