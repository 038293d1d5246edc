//! Aligned allocations with an in-band allocation header.
//!
//! Layout of a block returned by [`allocate_aligned`]:
//!
//! ```text
//! raw                       aligned - HEADER_SIZE   aligned
//!  |<------- padding ------>|<----- header ------>|<----- payload (size bytes) ----->|
//!                            (holds `raw`)
//! ```
//!
//! The raw request is `size + (alignment - 1) + HEADER_SIZE` bytes. The aligned address
//! is the first address at or above `raw + HEADER_SIZE` that is a multiple of
//! `alignment`, so the header slot always lies inside the raw block and never overlaps
//! the payload.

use std::ptr::NonNull;

use nativemem_common::{Result, error::Error, verify_arg};

use crate::{observer, raw};

/// Alignment used by owning buffers unless the caller asks for another one.
pub const DEFAULT_ALIGNMENT: usize = 16;

/// Size of the allocation header that precedes every aligned address.
pub const HEADER_SIZE: usize = std::mem::size_of::<usize>();

/// Allocates `size` bytes aligned to `alignment` and records the raw allocation
/// address in the header slot immediately preceding the returned pointer.
///
/// # Arguments
///
/// * `size` - Payload size in bytes, must be at least 1.
/// * `alignment` - Required alignment of the payload, must be a power of two.
/// * `zeroed` - Whether the payload is cleared before returning.
///
/// # Errors
///
/// - `SizeTooSmall` if `size` is zero
/// - `InvalidArgument` if `alignment` is not a power of two
/// - `OutOfMemory` if the request overflows or the raw allocator fails
///
/// The returned pointer must be released with [`free_aligned`].
pub fn allocate_aligned(size: usize, alignment: usize, zeroed: bool) -> Result<NonNull<u8>> {
    if size < 1 {
        return Err(Error::size_too_small("size", size, 1));
    }
    verify_arg!(alignment, alignment.is_power_of_two());

    let total = size
        .checked_add(alignment - 1)
        .and_then(|n| n.checked_add(HEADER_SIZE))
        .ok_or_else(|| Error::out_of_memory(size))?;

    let raw_ptr = raw::allocate(total).map_err(|_| Error::out_of_memory(total))? as *mut u8;
    let raw_addr = raw_ptr as usize;
    let aligned_addr = align_up(raw_addr + HEADER_SIZE, alignment);

    let aligned = unsafe {
        let aligned = raw_ptr.add(aligned_addr - raw_addr);
        (aligned.sub(HEADER_SIZE) as *mut *mut u8).write_unaligned(raw_ptr);
        if zeroed {
            aligned.write_bytes(0, size);
        }
        aligned
    };

    log::trace!(
        "allocate_aligned: {size} bytes at {aligned:p} (alignment {alignment}, raw {raw_ptr:p})"
    );
    NonNull::new(aligned).ok_or_else(|| Error::out_of_memory(total))
}

/// Reads the raw allocation address stored in the header slot preceding `ptr`.
///
/// # Safety
///
/// `ptr` must have been returned by [`allocate_aligned`] and not released yet.
#[inline]
pub unsafe fn header_of(ptr: NonNull<u8>) -> *mut u8 {
    unsafe { (ptr.as_ptr().sub(HEADER_SIZE) as *const *mut u8).read_unaligned() }
}

/// Releases an allocation made by [`allocate_aligned`].
///
/// # Safety
///
/// - `ptr` must have been returned by [`allocate_aligned`]
/// - The allocation must not have been released already
/// - No references into the payload may outlive this call
pub unsafe fn free_aligned(ptr: NonNull<u8>) {
    unsafe {
        let raw_ptr = header_of(ptr);
        log::trace!("free_aligned: {:p} (raw {raw_ptr:p})", ptr.as_ptr());
        raw::free(raw_ptr as *mut std::ffi::c_void);
    }
}

/// An owned aligned allocation.
///
/// The block is released through its allocation header when dropped.
pub struct AlignedBlock {
    ptr: NonNull<u8>,
    size: usize,
    alignment: usize,
}

impl AlignedBlock {
    /// Allocates a block of `size` bytes aligned to `alignment`.
    ///
    /// See [`allocate_aligned`] for the error conditions.
    pub fn allocate(size: usize, alignment: usize, zeroed: bool) -> Result<AlignedBlock> {
        let ptr = allocate_aligned(size, alignment, zeroed)?;
        observer::notify_allocated(size);
        Ok(AlignedBlock {
            ptr,
            size,
            alignment,
        })
    }

    /// Returns a raw pointer to the beginning of the payload.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Returns the payload size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the alignment the block was allocated with.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns the raw allocation address recorded in the block's header.
    pub fn raw_address(&self) -> usize {
        unsafe { header_of(self.ptr) as usize }
    }
}

impl Drop for AlignedBlock {
    fn drop(&mut self) {
        unsafe { free_aligned(self.ptr) };
        observer::notify_released(self.size);
    }
}

// SAFETY: AlignedBlock exclusively owns its allocation and releases it on drop.
unsafe impl Send for AlignedBlock {}

// SAFETY: AlignedBlock exposes no interior access to the payload through `&self`
// other than the raw pointer; users must synchronize access to the memory.
unsafe impl Sync for AlignedBlock {}

impl std::fmt::Debug for AlignedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBlock")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .finish()
    }
}

#[inline]
fn align_up(n: usize, alignment: usize) -> usize {
    (n + alignment - 1) & !(alignment - 1)
}
