use std::marker::PhantomData;

use bytemuck::Pod;
use nativemem_common::Result;

use super::{ElementPointer, NativePointer, Ownership, PointerBase};
use crate::options::{AllocationOptions, allocate_elements};

/// A typed pointer that owns an aligned native allocation.
#[derive(Debug)]
pub struct TypedPointer<T> {
    base: PointerBase,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> TypedPointer<T> {
    /// Allocates `count` zeroed elements with the default alignment.
    pub fn allocate(count: usize) -> Result<TypedPointer<T>> {
        Self::allocate_with(count, AllocationOptions::default())
    }

    /// Allocates `count` elements.
    ///
    /// # Errors
    ///
    /// - `SizeTooSmall` if `count` is zero
    /// - `InvalidArgument` if the alignment is not a power of two
    /// - `OutOfMemory` if the allocation fails
    pub fn allocate_with(count: usize, options: AllocationOptions) -> Result<TypedPointer<T>> {
        let block = allocate_elements::<T>(count, options)?;
        Ok(TypedPointer {
            base: PointerBase::new(block.as_ptr(), block.size(), Ownership::Allocated(block)),
            count,
            _marker: PhantomData,
        })
    }

    /// Allocates a pointer holding a copy of `values`.
    pub fn from_slice(values: &[T]) -> Result<TypedPointer<T>> {
        let pointer = Self::allocate_with(values.len(), AllocationOptions::default().zeroed(false))?;
        pointer.write_range(0, values)?;
        Ok(pointer)
    }

    /// Alignment of the allocation, `None` once disposed.
    pub fn alignment(&self) -> Option<usize> {
        self.base.alignment()
    }
}

impl<T> NativePointer for TypedPointer<T> {
    fn base(&self) -> &PointerBase {
        &self.base
    }
}

impl<T: Pod> ElementPointer<T> for TypedPointer<T> {
    fn count(&self) -> usize {
        self.count
    }
}
