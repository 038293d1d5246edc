//! Keeping boxed data at a fixed address while native views point into it.
//!
//! The heap payload of a `Box` never moves, so pinning amounts to taking ownership
//! of the box and remembering where its payload lives. The box is handed back (or
//! dropped) when the pin is released.

use std::{any::Any, ptr::NonNull};

use bytemuck::Pod;
use nativemem_common::{Result, error::Error};

/// Owns boxed data and exposes the address of its payload.
pub struct PinHandle {
    address: NonNull<u8>,
    size: usize,
    count: usize,
    restore: unsafe fn(NonNull<u8>, usize) -> Box<dyn Any + Send>,
}

impl PinHandle {
    /// Pins a boxed slice.
    ///
    /// # Errors
    ///
    /// `SizeTooSmall` if the slice is empty or its elements are zero-sized.
    pub fn pin_slice<T: Pod + Send>(data: Box<[T]>) -> Result<PinHandle> {
        let count = data.len();
        let size = std::mem::size_of_val(&*data);
        if size == 0 {
            return Err(Error::size_too_small("data", size, 1));
        }
        let raw = Box::into_raw(data) as *mut T as *mut u8;
        Ok(PinHandle {
            // SAFETY: `Box::into_raw` never returns null.
            address: unsafe { NonNull::new_unchecked(raw) },
            size,
            count,
            restore: restore_slice::<T>,
        })
    }

    /// Pins a single boxed value.
    ///
    /// # Errors
    ///
    /// `SizeTooSmall` if `T` is zero-sized.
    pub fn pin_value<T: Pod + Send>(value: Box<T>) -> Result<PinHandle> {
        let size = std::mem::size_of::<T>();
        if size == 0 {
            return Err(Error::size_too_small("value", size, 1));
        }
        let raw = Box::into_raw(value) as *mut u8;
        Ok(PinHandle {
            // SAFETY: `Box::into_raw` never returns null.
            address: unsafe { NonNull::new_unchecked(raw) },
            size,
            count: 1,
            restore: restore_value::<T>,
        })
    }

    /// Address of the first byte of the pinned payload.
    #[inline]
    pub fn address(&self) -> *mut u8 {
        self.address.as_ptr()
    }

    /// Size of the pinned payload in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Unpins the data and returns the original box, type-erased.
    pub fn release(self) -> Box<dyn Any + Send> {
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: `restore` matches the type the handle was created from, and the
        // handle is not dropped afterwards.
        unsafe { (this.restore)(this.address, this.count) }
    }

    /// Unpins the data and returns it as `S` (`Box<[T]>` or `Box<T>`).
    ///
    /// Returns `None` if `S` is not the pinned type; the data is dropped in that case.
    pub fn into_inner<S: Any>(self) -> Option<S> {
        self.release().downcast::<S>().ok().map(|data| *data)
    }
}

unsafe fn restore_slice<T: Pod + Send>(address: NonNull<u8>, count: usize) -> Box<dyn Any + Send> {
    let slice = std::ptr::slice_from_raw_parts_mut(address.as_ptr() as *mut T, count);
    Box::new(unsafe { Box::from_raw(slice) })
}

unsafe fn restore_value<T: Pod + Send>(address: NonNull<u8>, _count: usize) -> Box<dyn Any + Send> {
    Box::new(unsafe { Box::from_raw(address.as_ptr() as *mut T) })
}

impl Drop for PinHandle {
    fn drop(&mut self) {
        log::trace!("unpin: {:p} ({} bytes)", self.address, self.size);
        drop(unsafe { (self.restore)(self.address, self.count) });
    }
}

// SAFETY: the handle owns a `Box` of a `Send` type; the raw address is only an alias
// of that box's payload.
unsafe impl Send for PinHandle {}

// SAFETY: `&PinHandle` exposes only the address and size, never the payload.
unsafe impl Sync for PinHandle {}

impl std::fmt::Debug for PinHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinHandle")
            .field("address", &self.address)
            .field("size", &self.size)
            .finish()
    }
}
