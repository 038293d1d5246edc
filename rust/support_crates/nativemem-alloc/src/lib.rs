//! Aligned native allocations for the nativemem buffers.
//!
//! The raw allocator is selected per platform. On top of it, [`aligned`] implements
//! the allocation header scheme used by every owning buffer: the address returned
//! from the raw allocator is stored in the pointer-sized slot that immediately
//! precedes the aligned user address, so that the release path needs nothing but
//! the user address.

pub mod aligned;
pub mod observer;

#[cfg_attr(any(unix, windows), path = "raw_libc.rs")]
#[cfg_attr(not(any(unix, windows)), path = "raw_fallback.rs")]
pub mod raw;

pub use aligned::{AlignedBlock, DEFAULT_ALIGNMENT, HEADER_SIZE};
