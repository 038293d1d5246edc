use std::alloc::{Layout, alloc, dealloc};

/// Alignment and size of the bookkeeping prefix that records the block size,
/// which `std::alloc::dealloc` needs and the C-style `free` signature does not carry.
const PREFIX: usize = 16;

/// Allocates `size` bytes (emulated on top of the global Rust allocator).
pub fn allocate(size: usize) -> std::io::Result<*mut std::ffi::c_void> {
    let total = size
        .max(1)
        .checked_add(PREFIX)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "size overflow"))?;
    let layout = Layout::from_size_align(total, PREFIX)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))?;

    let base = unsafe { alloc(layout) };
    if base.is_null() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            "Failed to allocate memory",
        ));
    }

    unsafe {
        (base as *mut usize).write(total);
        Ok(base.add(PREFIX) as *mut std::ffi::c_void)
    }
}

/// Frees memory that was allocated with [`allocate`].
pub unsafe fn free(ptr: *mut std::ffi::c_void) {
    unsafe {
        let base = (ptr as *mut u8).sub(PREFIX);
        let total = (base as *const usize).read();
        let layout = Layout::from_size_align_unchecked(total, PREFIX);
        dealloc(base, layout);
    }
}
