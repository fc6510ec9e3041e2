//! Pool-backed, alignment-aware byte buffers: the memory layer beneath typed
//! columnar arrays, bitmaps and serialized pages.
//!
//! The crate exposes a small closed set of buffer kinds, each scoped to the
//! capabilities it actually has:
//!
//! - [`Buffer`]: a shared, read-only view. Cheap to clone and slice.
//! - [`MutableBuffer`]: an exclusive, fixed-length writable view that either owns
//!   a pool allocation or slices a mutable parent.
//! - [`PoolBuffer`]: an owned, resizable buffer (the only [`ResizableBuffer`])
//!   whose capacity is kept at a multiple of 64 bytes with zeroed padding.
//!
//! Storage comes from a [`MemoryPool`](colbuf_memory_pool::MemoryPool); see
//! [`default_memory_pool`].

pub mod align;
pub mod alloc;
pub mod bitmap;
pub mod buffer;
pub mod builder;
pub mod mutable;
pub mod owner;
pub mod pool_buffer;
pub mod resizable;

pub use alloc::{allocate_buffer, allocate_resizable_buffer};
pub use bitmap::{allocate_empty_bitmap, bytes_for_bits, get_empty_bitmap};
pub use buffer::Buffer;
pub use builder::BufferBuilder;
pub use mutable::MutableBuffer;
pub use owner::{MemoryAllocation, MemoryOwner};
pub use pool_buffer::PoolBuffer;
pub use resizable::ResizableBuffer;

pub use colbuf_common::{Error, ErrorKind, Result};
pub use colbuf_memory_pool::{default_memory_pool, MemoryPool, MemoryPoolRef, ALIGNMENT};
