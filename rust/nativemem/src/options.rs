use nativemem_alloc::{AlignedBlock, DEFAULT_ALIGNMENT};
use nativemem_common::{Result, error::Error};

/// Settings for owning allocations made by [`Buffer`](crate::Buffer) and
/// [`TypedPointer`](crate::pointer::TypedPointer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationOptions {
    /// Requested alignment of the first element. Must be a power of two.
    /// The element type's own alignment is used if it is stricter.
    pub alignment: usize,
    /// Whether the memory is cleared before use.
    pub zeroed: bool,
}

impl AllocationOptions {
    pub fn alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn zeroed(mut self, zeroed: bool) -> Self {
        self.zeroed = zeroed;
        self
    }
}

impl Default for AllocationOptions {
    fn default() -> Self {
        AllocationOptions {
            alignment: DEFAULT_ALIGNMENT,
            zeroed: true,
        }
    }
}

/// Allocates room for `count` elements of `T`.
pub(crate) fn allocate_elements<T>(count: usize, options: AllocationOptions) -> Result<AlignedBlock> {
    if count < 1 {
        return Err(Error::size_too_small("count", count, 1));
    }
    let size = count
        .checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| Error::out_of_memory(usize::MAX))?;
    let alignment = options.alignment.max(std::mem::align_of::<T>());
    AlignedBlock::allocate(size, alignment, options.zeroed)
}
