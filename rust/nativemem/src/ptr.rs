//! `Ptr`: a copyable, non-owning, bounds-checked view over a run of elements.

use std::{
    cell::Cell,
    cmp::Ordering,
    hash::{Hash, Hasher},
    io::Write,
    marker::PhantomData,
    ops::{Add, AddAssign, Bound, RangeBounds, Sub, SubAssign},
};

use bytemuck::Pod;
use nativemem_common::{Result, error::Error, result::verify_range};

use crate::{memops, read_only::ReadOnlyPointer, stream::RegionStream};

/// A small, copyable handle over a contiguous run of `T` values owned elsewhere.
///
/// A `Ptr` remembers the region it was created over and its current position inside
/// that region. [`len`](Ptr::len) is the number of elements from the current position
/// to the end of the region, so that a view that was advanced with `+` can be moved
/// back with `-` without losing track of the region bounds.
///
/// Pointer arithmetic and range slicing never fail: a result outside the region is
/// the null sentinel ([`Ptr::null`]), which callers are expected to probe for in
/// loops. All other accessors return an error instead.
///
/// # Validity
///
/// `Ptr` behaves like `&'a [Cell<T>]`: copies of the same view may read and write the
/// same memory from the current thread. Views derived through the safe API borrow
/// the owner for `'a`. Views created from raw addresses carry no such guarantee; the
/// caller of [`Ptr::new`] promises that the memory outlives every copy.
pub struct Ptr<'a, T> {
    /// First element of the region this view navigates.
    base: *mut T,
    /// Current position inside the region.
    index: usize,
    /// Element count of the whole region.
    len: usize,
    _marker: PhantomData<&'a Cell<T>>,
}

impl<'a, T> Ptr<'a, T> {
    /// Returns the null sentinel: zero address, zero length.
    #[inline]
    pub const fn null() -> Ptr<'a, T> {
        Ptr {
            base: std::ptr::null_mut(),
            index: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Creates a view over `count` elements starting at `ptr`.
    ///
    /// # Errors
    ///
    /// - `NullRegion` if `ptr` is null
    /// - `SizeTooSmall` if `count` is zero
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `count` elements of `T` for the
    /// whole lifetime `'a`, and no references to that memory may be held elsewhere
    /// while any copy of the view is used.
    pub unsafe fn new(ptr: *mut T, count: usize) -> Result<Ptr<'a, T>> {
        if ptr.is_null() {
            return Err(Error::null_region("pointer"));
        }
        if count < 1 {
            return Err(Error::size_too_small("count", count, 1));
        }
        Ok(Self::from_raw_parts(ptr, 0, count))
    }

    /// Creates a view over a mutable slice. The slice stays borrowed for `'a`.
    ///
    /// # Errors
    ///
    /// `SizeTooSmall` if the slice is empty.
    pub fn from_slice(slice: &'a mut [T]) -> Result<Ptr<'a, T>> {
        if slice.is_empty() {
            return Err(Error::size_too_small("slice", 0, 1));
        }
        Ok(Self::from_raw_parts(slice.as_mut_ptr(), 0, slice.len()))
    }

    #[inline]
    pub(crate) fn from_raw_parts(base: *mut T, index: usize, len: usize) -> Ptr<'a, T> {
        Ptr {
            base,
            index,
            len,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if this is the null sentinel.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.base.is_null()
    }

    /// Number of elements from the current position to the end of the region.
    #[inline]
    pub fn len(&self) -> usize {
        self.len - self.index
    }

    /// Returns `true` if the view has no elements (only the null sentinel).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of a single element in bytes.
    #[inline]
    pub fn type_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Size of the viewed elements in bytes.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.type_size()
    }

    /// Position of this view inside the region it navigates.
    #[inline]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Returns the address of the current element, or null for the null sentinel.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        if self.base.is_null() {
            return std::ptr::null_mut();
        }
        unsafe { self.base.add(self.index) }
    }

    /// Returns the address of the current element as an integer.
    #[inline]
    pub fn address(&self) -> usize {
        self.as_ptr() as usize
    }

    /// Moves the view by `count` elements within its region.
    ///
    /// Returns the null sentinel when the view is null or the resulting position
    /// leaves `[0, region length)`.
    pub fn offset(self, count: isize) -> Ptr<'a, T> {
        if self.is_null() {
            return Ptr::null();
        }
        match self.index.checked_add_signed(count) {
            Some(index) if index < self.len => Self::from_raw_parts(self.base, index, self.len),
            _ => Ptr::null(),
        }
    }

    /// Advances the view by one element, turning it into the null sentinel past the end.
    #[inline]
    pub fn increment(&mut self) {
        *self = self.offset(1);
    }

    /// Moves the view back by one element, turning it into the null sentinel before
    /// the start of the region.
    #[inline]
    pub fn decrement(&mut self) {
        *self = self.offset(-1);
    }

    /// Returns the distance in bytes between the addresses of two views.
    #[inline]
    pub fn byte_distance<U>(&self, other: &Ptr<'_, U>) -> isize {
        self.address().wrapping_sub(other.address()) as isize
    }

    /// Returns a view over a sub-range of this view's elements.
    ///
    /// The range is resolved against [`len`](Ptr::len). The null sentinel is returned
    /// if this view is null, if the start lies outside the view, if the end exceeds
    /// the view, or if the range is empty.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Ptr<'a, T> {
        let len = self.len();
        if self.is_null() {
            return Ptr::null();
        }

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
            (Some(start), Some(end)) if start < len && end <= len && start < end => {
                Self::from_raw_parts(unsafe { self.as_ptr().add(start) }, 0, end - start)
            }
            _ => Ptr::null(),
        }
    }

    #[inline]
    fn check_not_null(&self, context: &str) -> Result<()> {
        if self.is_null() {
            Err(Error::null_region(context))
        } else {
            Ok(())
        }
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<()> {
        self.check_not_null("index")?;
        if index >= self.len() {
            return Err(Error::index_out_of_range(index, self.len()));
        }
        Ok(())
    }

    /// Resolves an optional element count starting at `index` against the view.
    fn resolve_count(&self, name: &str, index: usize, count: Option<usize>) -> Result<usize> {
        let len = self.len();
        let count = match count {
            Some(count) => count,
            None => len
                .checked_sub(index)
                .ok_or_else(|| Error::offset_out_of_range(name, index, 0, len))?,
        };
        verify_range(name, index, count, len)?;
        Ok(count)
    }
}

impl<'a, T: Pod> Ptr<'a, T> {
    /// Reads the element at `index`.
    ///
    /// # Errors
    ///
    /// - `NullRegion` for the null sentinel
    /// - `IndexOutOfRange` if `index >= len()`
    #[inline]
    pub fn get(&self, index: usize) -> Result<T> {
        self.check_index(index)?;
        Ok(unsafe { self.get_unchecked(index) })
    }

    /// Writes the element at `index`.
    ///
    /// See [`get`](Ptr::get) for the error conditions.
    #[inline]
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        self.check_index(index)?;
        unsafe { self.set_unchecked(index, value) };
        Ok(())
    }

    /// Reads the element at `index` without any checks.
    ///
    /// # Safety
    ///
    /// The view must not be null and `index` must be less than `len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> T {
        unsafe { self.as_ptr().add(index).read_unaligned() }
    }

    /// Writes the element at `index` without any checks.
    ///
    /// # Safety
    ///
    /// The view must not be null and `index` must be less than `len()`.
    #[inline]
    pub unsafe fn set_unchecked(&self, index: usize, value: T) {
        unsafe { self.as_ptr().add(index).write_unaligned(value) }
    }

    /// Returns a mutable reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Ptr::get), plus `InvalidArgument` if the element is not
    /// aligned for `T` (possible after a [`cast`](Ptr::cast)).
    ///
    /// # Safety
    ///
    /// No other reference to the element, and no access through another copy of
    /// this view, may happen while the returned reference is alive.
    pub unsafe fn get_mut(&self, index: usize) -> Result<&'a mut T> {
        self.check_index(index)?;
        let ptr = unsafe { self.as_ptr().add(index) };
        if !crate::align::is_aligned(ptr, std::mem::align_of::<T>()) {
            return Err(Error::invalid_arg("index", "element is not aligned for its type"));
        }
        Ok(unsafe { &mut *ptr })
    }

    /// Reads a value of type `U` located `byte_offset` bytes past the current position.
    ///
    /// # Errors
    ///
    /// - `NullRegion` for the null sentinel
    /// - `OffsetOutOfRange` if `byte_offset + size_of::<U>()` exceeds the view
    pub fn read_as<U: Pod>(&self, byte_offset: usize) -> Result<U> {
        let ptr = self.byte_region("byte_offset", byte_offset, std::mem::size_of::<U>())?;
        Ok(unsafe { (ptr as *const U).read_unaligned() })
    }

    /// Writes a value of type `U` located `byte_offset` bytes past the current position.
    ///
    /// See [`read_as`](Ptr::read_as) for the error conditions.
    pub fn write_as<U: Pod>(&self, byte_offset: usize, value: U) -> Result<()> {
        let ptr = self.byte_region("byte_offset", byte_offset, std::mem::size_of::<U>())?;
        unsafe { (ptr as *mut U).write_unaligned(value) };
        Ok(())
    }

    fn byte_region(&self, name: &str, offset: usize, size: usize) -> Result<*mut u8> {
        self.check_not_null(name)?;
        verify_range(name, offset, size, self.size_in_bytes())?;
        Ok(unsafe { (self.as_ptr() as *mut u8).add(offset) })
    }

    /// Reinterprets the viewed bytes as elements of type `U`.
    ///
    /// The byte size of the view must be a whole, non-zero number of `U` elements.
    ///
    /// # Errors
    ///
    /// - `NullRegion` for the null sentinel
    /// - `WideningCast` if `size_in_bytes() / size_of::<U>()` is zero or leaves a
    ///   partial trailing element
    pub fn cast<U: Pod>(&self) -> Result<Ptr<'a, U>> {
        self.check_not_null("cast")?;
        let size = self.size_in_bytes();
        let count = cast_count::<U>(size)?;
        Ok(Ptr::from_raw_parts(self.as_ptr() as *mut U, 0, count))
    }

    /// Returns a byte view that starts `offset` bytes past the current position.
    ///
    /// # Errors
    ///
    /// - `NullRegion` for the null sentinel
    /// - `OffsetOutOfRange` if `offset` is not inside the view
    pub fn to_byte_ptr(&self, offset: usize) -> Result<Ptr<'a, u8>> {
        self.check_not_null("to_byte_ptr")?;
        let size = self.size_in_bytes();
        if offset >= size {
            return Err(Error::offset_out_of_range("offset", offset, 1, size));
        }
        let ptr = unsafe { (self.as_ptr() as *mut u8).add(offset) };
        Ok(Ptr::from_raw_parts(ptr, 0, size - offset))
    }

    /// Writes `value` to every byte of the view.
    pub fn fill(&self, value: u8) -> Result<()> {
        self.check_not_null("fill")?;
        unsafe { memops::fill(self.as_ptr() as *mut u8, value, self.size_in_bytes()) };
        Ok(())
    }

    /// Copies `count` elements starting at `source_index` into `destination` at
    /// `dest_index`. When `count` is `None`, everything from `source_index` to the end
    /// of this view is copied.
    ///
    /// # Errors
    ///
    /// - `NullRegion` if either view is null
    /// - `OffsetOutOfRange` if the source range is not inside this view
    /// - `SizeTooSmall` if the destination range does not fit the destination
    pub fn copy_to(
        &self,
        destination: Ptr<'_, T>,
        source_index: usize,
        count: Option<usize>,
        dest_index: usize,
    ) -> Result<()> {
        self.check_not_null("source")?;
        destination.check_not_null("destination")?;
        let count = self.resolve_count("source_index", source_index, count)?;
        check_destination(dest_index, count, destination.len())?;

        unsafe {
            memops::copy(
                destination.as_ptr().add(dest_index) as *mut u8,
                self.as_ptr().add(source_index) as *const u8,
                count * self.type_size(),
            );
        }
        Ok(())
    }

    /// Copies elements of this view into a slice.
    ///
    /// See [`copy_to`](Ptr::copy_to) for the meaning of the arguments and errors.
    pub fn copy_to_slice(
        &self,
        destination: &mut [T],
        source_index: usize,
        count: Option<usize>,
        dest_index: usize,
    ) -> Result<()> {
        self.check_not_null("source")?;
        let count = self.resolve_count("source_index", source_index, count)?;
        check_destination(dest_index, count, destination.len())?;

        unsafe {
            memops::copy(
                destination.as_mut_ptr().add(dest_index) as *mut u8,
                self.as_ptr().add(source_index) as *const u8,
                count * self.type_size(),
            );
        }
        Ok(())
    }

    /// Copies a slice into this view starting at `dest_index`.
    pub fn copy_from_slice(&self, source: &[T], dest_index: usize) -> Result<()> {
        self.check_not_null("destination")?;
        check_destination(dest_index, source.len(), self.len())?;
        unsafe {
            memops::copy(
                self.as_ptr().add(dest_index) as *mut u8,
                source.as_ptr() as *const u8,
                std::mem::size_of_val(source),
            );
        }
        Ok(())
    }

    /// Copies `count` elements starting at `index` into a new vector.
    pub fn to_vec(&self, index: usize, count: Option<usize>) -> Result<Vec<T>> {
        self.check_not_null("to_vec")?;
        let count = self.resolve_count("index", index, count)?;
        let mut result = vec![T::zeroed(); count];
        self.copy_to_slice(&mut result, index, Some(count), 0)?;
        Ok(result)
    }

    /// Returns an iterator over the values of the view.
    pub fn iter(self) -> impl Iterator<Item = T> + 'a {
        (0..self.len()).map(move |i| unsafe { self.get_unchecked(i) })
    }

    /// Compares the bytes of two views.
    ///
    /// Views at the same address with the same size are equal without reading
    /// memory; views of different byte sizes are never equal.
    pub fn compare_memory<U: Pod>(&self, other: &Ptr<'_, U>) -> bool {
        let size = self.size_in_bytes();
        if size != other.size_in_bytes() {
            return false;
        }
        if self.address() == other.address() {
            return true;
        }
        if self.is_null() || other.is_null() {
            return false;
        }
        unsafe { memops::compare(self.as_ptr() as *const u8, other.as_ptr() as *const u8, size) }
    }

    /// Writes the bytes of `count` elements starting at `start` to `writer`.
    pub fn copy_to_writer<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        start: usize,
        count: Option<usize>,
    ) -> Result<()> {
        self.check_not_null("copy_to_writer")?;
        let count = self.resolve_count("start", start, count)?;
        let bytes = unsafe {
            std::slice::from_raw_parts(
                self.as_ptr().add(start) as *const u8,
                count * self.type_size(),
            )
        };
        writer
            .write_all(bytes)
            .map_err(|e| Error::io("copy_to_writer", e))
    }

    /// Returns a readable, writable and seekable stream over `count` elements starting
    /// at `index`.
    pub fn to_stream(&self, index: usize, count: Option<usize>) -> Result<RegionStream<'a>> {
        self.check_not_null("to_stream")?;
        let count = self.resolve_count("index", index, count)?;
        let ptr = unsafe { self.as_ptr().add(index) as *mut u8 };
        Ok(RegionStream::new(ptr, count * self.type_size(), true))
    }

    /// Returns an immutable view over the same bytes.
    pub fn to_read_only(&self) -> ReadOnlyPointer<'a> {
        if self.is_null() {
            return ReadOnlyPointer::null();
        }
        ReadOnlyPointer::from_raw_parts(self.as_ptr() as *const u8, self.size_in_bytes())
    }
}

/// Number of `U` elements in `size` bytes, enforcing the whole-element rule.
pub(crate) fn cast_count<U>(size: usize) -> Result<usize> {
    let type_size = std::mem::size_of::<U>();
    if type_size == 0 {
        return Err(Error::widening_cast(size, type_size));
    }
    let count = size / type_size;
    if count == 0 || count * type_size != size {
        return Err(Error::widening_cast(size, type_size));
    }
    Ok(count)
}

pub(crate) fn check_destination(dest_index: usize, count: usize, dest_len: usize) -> Result<()> {
    match dest_index.checked_add(count) {
        Some(end) if end <= dest_len => Ok(()),
        _ => Err(Error::size_too_small(
            "destination",
            dest_len.saturating_sub(dest_index),
            count,
        )),
    }
}

impl<T> Clone for Ptr<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ptr<'_, T> {}

impl<T> Default for Ptr<'_, T> {
    fn default() -> Self {
        Ptr::null()
    }
}

impl<T> PartialEq for Ptr<'_, T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T> Eq for Ptr<'_, T> {}

impl<T> PartialOrd for Ptr<'_, T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ptr<'_, T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

impl<T> Hash for Ptr<'_, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl<'a, T> Add<isize> for Ptr<'a, T> {
    type Output = Ptr<'a, T>;

    #[inline]
    fn add(self, count: isize) -> Ptr<'a, T> {
        self.offset(count)
    }
}

impl<'a, T> Sub<isize> for Ptr<'a, T> {
    type Output = Ptr<'a, T>;

    #[inline]
    fn sub(self, count: isize) -> Ptr<'a, T> {
        match count.checked_neg() {
            Some(count) => self.offset(count),
            None => Ptr::null(),
        }
    }
}

impl<T> AddAssign<isize> for Ptr<'_, T> {
    #[inline]
    fn add_assign(&mut self, count: isize) {
        *self = *self + count;
    }
}

impl<T> SubAssign<isize> for Ptr<'_, T> {
    #[inline]
    fn sub_assign(&mut self, count: isize) {
        *self = *self - count;
    }
}

/// Distance in bytes between two views.
impl<T> Sub for Ptr<'_, T> {
    type Output = isize;

    #[inline]
    fn sub(self, other: Self) -> isize {
        self.byte_distance(&other)
    }
}

impl<T> std::fmt::Debug for Ptr<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ptr")
            .field("ptr", &self.as_ptr())
            .field("position", &self.index)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> std::fmt::Display for Ptr<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Ptr(NULL)")
        } else {
            write!(f, "Ptr({:#x})", self.address())
        }
    }
}
