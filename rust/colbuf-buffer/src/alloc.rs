//! Free functions that create pool-backed buffers.

use colbuf_common::Result;
use colbuf_memory_pool::MemoryPoolRef;

use crate::{resizable::ResizableBuffer, MutableBuffer, PoolBuffer};

/// Allocates a fixed-length, writable buffer of `size` bytes from `pool`.
///
/// The contents of the logical region are unspecified; the padding up to the
/// capacity is zeroed.
pub fn allocate_buffer(pool: &MemoryPoolRef, size: usize) -> Result<MutableBuffer> {
    Ok(allocate_resizable_buffer(pool, size)?.into_mutable())
}

/// Allocates a resizable buffer of `size` bytes from `pool`.
///
/// The padding up to the capacity is zeroed.
pub fn allocate_resizable_buffer(pool: &MemoryPoolRef, size: usize) -> Result<PoolBuffer> {
    let mut buf = PoolBuffer::new(pool.clone());
    buf.resize(size, true)?;
    buf.zero_padding();
    Ok(buf)
}
