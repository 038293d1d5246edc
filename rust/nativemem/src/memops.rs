//! Block memory operations shared by the views, buffers and pointers.

/// Largest byte count handed to a single fill/zero transfer.
pub(crate) const MAX_TRANSFER: usize = i32::MAX as usize;

/// Writes `value` to `len` bytes starting at `dst`, split into transfers of at most
/// [`MAX_TRANSFER`] bytes.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub(crate) unsafe fn fill(dst: *mut u8, value: u8, len: usize) {
    unsafe { fill_chunked(dst, value, len, MAX_TRANSFER) }
}

/// Same as [`fill`], with an explicit chunk size.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes, `chunk` must be non-zero.
pub(crate) unsafe fn fill_chunked(dst: *mut u8, value: u8, len: usize, chunk: usize) {
    debug_assert_ne!(chunk, 0);
    let mut offset = 0;
    while offset < len {
        let amount = chunk.min(len - offset);
        unsafe { dst.add(offset).write_bytes(value, amount) };
        offset += amount;
    }
}

/// Copies `len` bytes from `src` to `dst`. The regions may overlap.
///
/// # Safety
///
/// `src` must be valid for reads and `dst` valid for writes of `len` bytes.
#[inline]
pub(crate) unsafe fn copy(dst: *mut u8, src: *const u8, len: usize) {
    if len == 0 || std::ptr::eq(dst, src) {
        return;
    }
    unsafe { std::ptr::copy(src, dst, len) }
}

/// Compares `len` bytes at `left` and `right` for equality.
///
/// The comparison runs from the front in 8-byte words, then 4, 2 and 1 byte for the
/// tail, and stops at the first mismatch.
///
/// # Safety
///
/// Both pointers must be valid for reads of `len` bytes.
pub(crate) unsafe fn compare(left: *const u8, right: *const u8, len: usize) -> bool {
    if std::ptr::eq(left, right) {
        return true;
    }

    let mut offset = 0;
    unsafe {
        while len - offset >= 8 {
            let l = (left.add(offset) as *const u64).read_unaligned();
            let r = (right.add(offset) as *const u64).read_unaligned();
            if l != r {
                return false;
            }
            offset += 8;
        }
        if len - offset >= 4 {
            let l = (left.add(offset) as *const u32).read_unaligned();
            let r = (right.add(offset) as *const u32).read_unaligned();
            if l != r {
                return false;
            }
            offset += 4;
        }
        if len - offset >= 2 {
            let l = (left.add(offset) as *const u16).read_unaligned();
            let r = (right.add(offset) as *const u16).read_unaligned();
            if l != r {
                return false;
            }
            offset += 2;
        }
        if len - offset == 1 {
            return *left.add(offset) == *right.add(offset);
        }
    }
    true
}
