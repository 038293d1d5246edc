/// Allocates `size` bytes from the C runtime heap.
///
/// The returned block is aligned at least to the platform's fundamental alignment,
/// its contents are unspecified.
///
/// # Returns
///
/// Returns a `Result` containing:
/// - `Ok(ptr)` - A non-null pointer to the allocated memory
/// - `Err(io::Error)` - An `OutOfMemory` error if the runtime cannot satisfy the request
///
/// The returned pointer must be released with [`free`] exactly once.
pub fn allocate(size: usize) -> std::io::Result<*mut std::ffi::c_void> {
    let ptr = unsafe { libc::malloc(size.max(1)) };
    if ptr.is_null() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            format!("malloc failed for {size} bytes"),
        ));
    }
    Ok(ptr)
}

/// Frees memory that was allocated with [`allocate`].
///
/// # Safety
///
/// This function is safe to call as long as:
/// - `ptr` was returned by a previous call to [`allocate`]
/// - The memory has not already been freed
/// - No other references to the memory exist
pub unsafe fn free(ptr: *mut std::ffi::c_void) {
    unsafe { libc::free(ptr) }
}
