use std::marker::PhantomData;

use bytemuck::Pod;
use nativemem_common::{Result, error::Error, result::verify_range};

use super::{ElementPointer, NativePointer, Ownership, PointerBase};
use crate::pin::PinHandle;

/// A typed pointer over caller data that is kept at a fixed address until the
/// pointer is released.
#[derive(Debug)]
pub struct PinnedPointer<T> {
    base: PointerBase,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod + Send> PinnedPointer<T> {
    /// Pins the whole of `data`.
    pub fn pin(data: impl Into<Box<[T]>>) -> Result<PinnedPointer<T>> {
        Self::pin_range(data, 0, None)
    }

    /// Pins `data` and exposes `count` elements starting at `index`.
    /// When `count` is `None`, the pointer extends to the end of `data`.
    ///
    /// # Errors
    ///
    /// - `OffsetOutOfRange` if the range does not lie inside `data`
    /// - `SizeTooSmall` if the range is empty
    pub fn pin_range(
        data: impl Into<Box<[T]>>,
        index: usize,
        count: Option<usize>,
    ) -> Result<PinnedPointer<T>> {
        let data = data.into();
        let len = data.len();
        let count = match count {
            Some(count) => count,
            None => len
                .checked_sub(index)
                .ok_or_else(|| Error::offset_out_of_range("index", index, 0, len))?,
        };
        verify_range("index", index, count, len)?;
        if count < 1 {
            return Err(Error::size_too_small("count", count, 1));
        }

        let handle = PinHandle::pin_slice(data)?;
        let address = unsafe { handle.address().add(index * std::mem::size_of::<T>()) };
        let size = count * std::mem::size_of::<T>();
        Ok(PinnedPointer {
            base: PointerBase::new(address, size, Ownership::Pinned(handle)),
            count,
            _marker: PhantomData,
        })
    }

    /// Pins a single boxed value.
    pub fn pin_value(value: Box<T>) -> Result<PinnedPointer<T>> {
        let handle = PinHandle::pin_value(value)?;
        Ok(PinnedPointer {
            base: PointerBase::new(handle.address(), handle.size(), Ownership::Pinned(handle)),
            count: 1,
            _marker: PhantomData,
        })
    }

    /// Unpins the data and returns it. Returns `None` if the pointer was already
    /// disposed or was created by [`pin_value`](PinnedPointer::pin_value).
    pub fn into_data(mut self) -> Option<Box<[T]>> {
        match self.base.take_ownership() {
            Some(Ownership::Pinned(handle)) => handle.into_inner::<Box<[T]>>(),
            _ => None,
        }
    }

    /// Unpins the value pinned by [`pin_value`](PinnedPointer::pin_value).
    pub fn into_value(mut self) -> Option<Box<T>> {
        match self.base.take_ownership() {
            Some(Ownership::Pinned(handle)) => handle.into_inner::<Box<T>>(),
            _ => None,
        }
    }
}

impl<T> NativePointer for PinnedPointer<T> {
    fn base(&self) -> &PointerBase {
        &self.base
    }
}

impl<T: Pod> ElementPointer<T> for PinnedPointer<T> {
    fn count(&self) -> usize {
        self.count
    }
}
