use std::marker::PhantomData;

use bytemuck::Pod;
use nativemem_common::{Result, error::Error};

use super::{ElementPointer, NativePointer, Ownership, PointerBase, element_region_size};

/// A byte pointer over memory owned elsewhere. Releasing it never frees anything.
#[derive(Debug)]
pub struct AliasPointer {
    base: PointerBase,
}

impl AliasPointer {
    /// # Errors
    ///
    /// - `NullRegion` if `address` is null
    /// - `SizeTooSmall` if `size` is zero
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads and writes of `size` bytes until the pointer
    /// is disposed or dropped.
    pub unsafe fn new(address: *mut u8, size: usize) -> Result<AliasPointer> {
        if address.is_null() {
            return Err(Error::null_region("address"));
        }
        if size < 1 {
            return Err(Error::size_too_small("size", size, 1));
        }
        Ok(AliasPointer {
            base: PointerBase::new(address, size, Ownership::Aliased),
        })
    }
}

impl NativePointer for AliasPointer {
    fn base(&self) -> &PointerBase {
        &self.base
    }
}

/// A typed pointer over `count` elements owned elsewhere.
#[derive(Debug)]
pub struct AliasTypedPointer<T> {
    base: PointerBase,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> AliasTypedPointer<T> {
    /// # Errors
    ///
    /// - `NullRegion` if `address` is null
    /// - `SizeTooSmall` if `count` is zero
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads and writes of `count` elements until the
    /// pointer is disposed or dropped.
    pub unsafe fn new(address: *mut T, count: usize) -> Result<AliasTypedPointer<T>> {
        if address.is_null() {
            return Err(Error::null_region("address"));
        }
        let size = element_region_size::<T>(count)?;
        Ok(AliasTypedPointer {
            base: PointerBase::new(address as *mut u8, size, Ownership::Aliased),
            count,
            _marker: PhantomData,
        })
    }
}

impl<T> NativePointer for AliasTypedPointer<T> {
    fn base(&self) -> &PointerBase {
        &self.base
    }
}

impl<T: Pod> ElementPointer<T> for AliasTypedPointer<T> {
    fn count(&self) -> usize {
        self.count
    }
}
