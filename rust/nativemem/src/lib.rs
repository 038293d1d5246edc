//! Safe, bounds-checked access to native (unmanaged) memory.
//!
//! The crate offers three layers:
//!
//! - [`Ptr`]: a copyable, non-owning view over a run of elements with pointer-style
//!   navigation (`+`, `-`, increment, decrement) that falls back to a null sentinel
//!   instead of leaving its region.
//! - [`Buffer`]: an owning buffer over aligned native memory or pinned caller data,
//!   or an explicit alias of memory owned elsewhere.
//! - [`pointer`]: byte-addressed pointer objects with idempotent release that can be
//!   moved between threads.
//!
//! Every allocation goes through [`nativemem_alloc`] and is reported to the
//! process-wide [`AllocationObserver`], if one is installed.

pub mod align;
pub mod buffer;
mod memops;
pub mod options;
pub mod pin;
pub mod pointer;
pub mod ptr;
pub mod read_only;
pub mod stream;

pub use buffer::Buffer;
pub use nativemem_alloc::observer::{
    AllocationObserver, AllocationStats, allocation_stats, set_allocation_observer,
};
pub use nativemem_common::{
    Result,
    error::{Error, ErrorKind},
};
pub use options::AllocationOptions;
pub use pin::PinHandle;
pub use pointer::{
    AliasPointer, AliasTypedPointer, ElementPointer, NativePointer, PinnedPointer, PointerBase,
    TypedPointer,
};
pub use ptr::Ptr;
pub use read_only::ReadOnlyPointer;
pub use stream::RegionStream;
