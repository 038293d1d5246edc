//! Byte-addressed pointer objects with explicit, idempotent release.
//!
//! Every pointer kind shares a [`PointerBase`] that records the address, size and
//! ownership of the memory. Byte-level operations are provided once, as default
//! methods of [`NativePointer`], and typed element access once more by
//! [`ElementPointer`].
//!
//! Unlike [`Buffer`](crate::Buffer), a pointer can be released through a shared
//! reference: [`NativePointer::dispose`] may be called any number of times and
//! exactly one call performs the release. Pointers can be moved to another thread
//! but not shared between threads, since a release must never overlap a read or
//! write of the same memory.
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use nativemem::{NativePointer, TypedPointer};
//!
//! let pointer = Arc::new(TypedPointer::<u8>::allocate(16)?);
//! let reader = Arc::clone(&pointer);
//! std::thread::spawn(move || reader.read::<u8>(0));
//! pointer.dispose();
//! # Ok::<(), nativemem::Error>(())
//! ```

mod alias;
mod pinned;
mod typed;

use std::{
    cell::UnsafeCell,
    io::Write,
    sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering},
};

use bytemuck::{AnyBitPattern, NoUninit, Pod};
use nativemem_alloc::AlignedBlock;
use nativemem_common::{Result, error::Error, result::verify_range};

use crate::{memops, pin::PinHandle};

pub use alias::{AliasPointer, AliasTypedPointer};
pub use pinned::PinnedPointer;
pub use typed::TypedPointer;

/// Chunk size used when streaming a pointer's contents out.
pub const STREAM_CHUNK_SIZE: usize = 80_000;

pub(crate) enum Ownership {
    Aliased,
    Pinned(PinHandle),
    Allocated(AlignedBlock),
}

impl Ownership {
    fn describe(&self) -> &'static str {
        match self {
            Ownership::Aliased => "aliased",
            Ownership::Pinned(_) => "pinned",
            Ownership::Allocated(_) => "allocated",
        }
    }
}

/// State shared by all pointer kinds: address, size and what to do on release.
pub struct PointerBase {
    address: AtomicPtr<u8>,
    size: AtomicUsize,
    disposed: AtomicBool,
    /// Taken only by the call that wins the `disposed` flag.
    ownership: UnsafeCell<Option<Ownership>>,
}

impl PointerBase {
    pub(crate) fn new(address: *mut u8, size: usize, ownership: Ownership) -> PointerBase {
        PointerBase {
            address: AtomicPtr::new(address),
            size: AtomicUsize::new(size),
            disposed: AtomicBool::new(false),
            ownership: UnsafeCell::new(Some(ownership)),
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.address.load(Ordering::Acquire)
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.as_ptr() as usize
    }

    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Returns the address `offset` bytes into the region after checking that
    /// `size` bytes fit from there.
    fn region(&self, name: &str, offset: usize, size: usize) -> Result<*mut u8> {
        if self.is_disposed() {
            return Err(Error::already_disposed(name));
        }
        verify_range(name, offset, size, self.size_in_bytes())?;
        Ok(unsafe { self.as_ptr().add(offset) })
    }

    /// Releases the memory. Only the first call does anything.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let address = self.address.swap(std::ptr::null_mut(), Ordering::AcqRel);
        let size = self.size.swap(0, Ordering::AcqRel);
        // SAFETY: `PointerBase` is not `Sync`, so no other reference to the cell is live on
        // another thread, and only the call that flipped `disposed` gets here.
        let ownership = unsafe { (*self.ownership.get()).take() };
        if let Some(ownership) = ownership {
            log::debug!(
                "dispose: {} pointer at {address:p}, {size} bytes",
                ownership.describe()
            );
        }
        true
    }

    /// Marks the pointer as released and hands the ownership record to the caller.
    pub(crate) fn take_ownership(&mut self) -> Option<Ownership> {
        if std::mem::replace(self.disposed.get_mut(), true) {
            return None;
        }
        *self.address.get_mut() = std::ptr::null_mut();
        *self.size.get_mut() = 0;
        self.ownership.get_mut().take()
    }

    pub(crate) fn alignment(&self) -> Option<usize> {
        if self.is_disposed() {
            return None;
        }
        // SAFETY: the cell is only written on release, which has not happened, and the
        // base cannot be released concurrently since it is not `Sync`.
        match unsafe { &*self.ownership.get() } {
            Some(Ownership::Allocated(block)) => Some(block.alignment()),
            _ => None,
        }
    }
}

impl Drop for PointerBase {
    fn drop(&mut self) {
        if *self.disposed.get_mut() {
            return;
        }
        if cfg!(debug_assertions) {
            if let Some(ownership @ (Ownership::Pinned(_) | Ownership::Allocated(_))) =
                self.ownership.get_mut()
            {
                log::warn!(
                    "{} pointer at {:p} ({} bytes) was dropped without being disposed",
                    ownership.describe(),
                    *self.address.get_mut(),
                    *self.size.get_mut()
                );
            }
        }
        self.dispose();
    }
}

// SAFETY: the ownership record holds `Send` data only (`AlignedBlock`, `PinHandle`).
// `PointerBase` is not `Sync`: data access through `&self` is not
// synchronized with `dispose`.
unsafe impl Send for PointerBase {}

impl std::fmt::Debug for PointerBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerBase")
            .field("address", &self.as_ptr())
            .field("size", &self.size_in_bytes())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Byte-level access shared by every pointer kind.
///
/// All offsets are in bytes. Every operation fails with `AlreadyDisposed` once the
/// pointer has been released, and with `OffsetOutOfRange` when the accessed bytes do
/// not lie inside the region.
pub trait NativePointer {
    fn base(&self) -> &PointerBase;

    fn as_ptr(&self) -> *mut u8 {
        self.base().as_ptr()
    }

    fn address(&self) -> usize {
        self.base().address()
    }

    fn size_in_bytes(&self) -> usize {
        self.base().size_in_bytes()
    }

    fn is_disposed(&self) -> bool {
        self.base().is_disposed()
    }

    /// Reads a `T` at byte `offset`.
    fn read<T: AnyBitPattern>(&self, offset: usize) -> Result<T> {
        let ptr = self.base().region("offset", offset, std::mem::size_of::<T>())?;
        Ok(unsafe { (ptr as *const T).read_unaligned() })
    }

    /// Writes a `T` at byte `offset`.
    fn write<T: NoUninit>(&self, offset: usize, value: T) -> Result<()> {
        let ptr = self.base().region("offset", offset, std::mem::size_of::<T>())?;
        unsafe { (ptr as *mut T).write_unaligned(value) };
        Ok(())
    }

    /// Reads a `T` at byte `offset` without any checks.
    ///
    /// # Safety
    ///
    /// The pointer must not be disposed and `offset + size_of::<T>()` must not
    /// exceed its size.
    unsafe fn read_unchecked<T: AnyBitPattern>(&self, offset: usize) -> T {
        unsafe { (self.as_ptr().add(offset) as *const T).read_unaligned() }
    }

    /// Writes a `T` at byte `offset` without any checks.
    ///
    /// # Safety
    ///
    /// See [`read_unchecked`](NativePointer::read_unchecked).
    unsafe fn write_unchecked<T: NoUninit>(&self, offset: usize, value: T) {
        unsafe { (self.as_ptr().add(offset) as *mut T).write_unaligned(value) }
    }

    /// Fills `destination` with values read starting at byte `offset`.
    fn read_range<T: Pod>(&self, offset: usize, destination: &mut [T]) -> Result<()> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(destination);
        let ptr = self.base().region("offset", offset, bytes.len())?;
        unsafe { memops::copy(bytes.as_mut_ptr(), ptr, bytes.len()) };
        Ok(())
    }

    /// Writes `source` starting at byte `offset`.
    fn write_range<T: NoUninit>(&self, offset: usize, source: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(source);
        let ptr = self.base().region("offset", offset, bytes.len())?;
        unsafe { memops::copy(ptr, bytes.as_ptr(), bytes.len()) };
        Ok(())
    }

    /// Copies `size` bytes from `source` at `source_offset` to this pointer at
    /// `dest_offset`. Overlapping regions are handled.
    fn copy_from<P: NativePointer + ?Sized>(
        &self,
        source: &P,
        source_offset: usize,
        size: usize,
        dest_offset: usize,
    ) -> Result<()> {
        let src = source.base().region("source_offset", source_offset, size)?;
        let dst = self.base().region("dest_offset", dest_offset, size)?;
        unsafe { memops::copy(dst, src, size) };
        Ok(())
    }

    /// Copies `size` bytes from a raw address to this pointer at `dest_offset`.
    ///
    /// # Safety
    ///
    /// `source` must be valid for reads of `size` bytes.
    unsafe fn copy_memory(&self, source: *const u8, size: usize, dest_offset: usize) -> Result<()> {
        if source.is_null() {
            return Err(Error::null_region("source"));
        }
        let dst = self.base().region("dest_offset", dest_offset, size)?;
        unsafe { memops::copy(dst, source, size) };
        Ok(())
    }

    /// Writes `value` to every byte.
    fn fill(&self, value: u8) -> Result<()> {
        self.fill_range(value, self.size_in_bytes(), 0)
    }

    /// Writes `value` to `size` bytes starting at `offset`.
    fn fill_range(&self, value: u8, size: usize, offset: usize) -> Result<()> {
        let ptr = self.base().region("offset", offset, size)?;
        unsafe { memops::fill(ptr, value, size) };
        Ok(())
    }

    fn zero(&self) -> Result<()> {
        self.fill(0)
    }

    fn zero_range(&self, size: usize, offset: usize) -> Result<()> {
        self.fill_range(0, size, offset)
    }

    /// Copies the whole region into a new vector.
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut result = vec![0u8; self.size_in_bytes()];
        self.read_range(0, &mut result)?;
        Ok(result)
    }

    /// Writes the whole region to `writer` in chunks of [`STREAM_CHUNK_SIZE`] bytes.
    fn copy_to_writer<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let size = self.size_in_bytes();
        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE.min(size)];
        let mut offset = 0;
        while offset < size {
            let amount = chunk.len().min(size - offset);
            self.read_range(offset, &mut chunk[..amount])?;
            writer
                .write_all(&chunk[..amount])
                .map_err(|e| Error::io("copy_to_writer", e))?;
            offset += amount;
        }
        Ok(())
    }

    /// Releases the memory. Safe to call repeatedly; exactly one call returns `true`.
    fn dispose(&self) -> bool {
        self.base().dispose()
    }
}

impl NativePointer for PointerBase {
    fn base(&self) -> &PointerBase {
        self
    }
}

/// Element-indexed access for pointer kinds that carry an element type.
pub trait ElementPointer<T: Pod>: NativePointer {
    /// Number of elements in the region.
    fn count(&self) -> usize;

    /// Reads the element at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if `index >= count()`, `AlreadyDisposed` once released.
    fn get(&self, index: usize) -> Result<T> {
        let offset = element_offset::<T>(self.base(), index, self.count())?;
        self.read(offset)
    }

    /// Writes the element at `index`.
    fn set(&self, index: usize, value: T) -> Result<()> {
        let offset = element_offset::<T>(self.base(), index, self.count())?;
        self.write(offset, value)
    }

    /// Copies all elements into a new vector.
    fn to_element_vec(&self) -> Result<Vec<T>> {
        let mut result = vec![T::zeroed(); self.count()];
        self.read_range(0, &mut result)?;
        Ok(result)
    }
}

fn element_offset<T>(base: &PointerBase, index: usize, count: usize) -> Result<usize> {
    if base.is_disposed() {
        return Err(Error::already_disposed("index"));
    }
    if index >= count {
        return Err(Error::index_out_of_range(index, count));
    }
    Ok(index * std::mem::size_of::<T>())
}

/// Byte size of `count` elements of `T`, rejecting empty regions.
pub(crate) fn element_region_size<T>(count: usize) -> Result<usize> {
    if count < 1 {
        return Err(Error::size_too_small("count", count, 1));
    }
    count
        .checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| Error::out_of_memory(usize::MAX))
}

#[cfg(test)]
mod tests;
