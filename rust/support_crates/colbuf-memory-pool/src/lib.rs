//! Memory pools: the allocate/reallocate/free contract that every colbuf
//! buffer draws its storage from, together with the stock implementations.
//!
//! All pools hand out regions aligned to [`ALIGNMENT`] bytes. Pools are shared
//! across buffers (and threads) through [`MemoryPoolRef`], so every
//! implementation must be internally thread-safe.

use std::{ptr::NonNull, sync::Arc};

use colbuf_common::Result;

pub mod counter;
pub mod default_pool;
pub mod limited;
pub mod logging;
pub mod system;

pub use default_pool::{default_memory_pool, system_memory_pool, MEMORY_LIMIT_ENV};
pub use limited::LimitedMemoryPool;
pub use logging::LoggingMemoryPool;
pub use system::SystemMemoryPool;

/// Alignment, in bytes, of every region returned by a [`MemoryPool`].
pub const ALIGNMENT: usize = 64;

/// Shared handle to a pool. Buffers keep one for their whole lifetime.
pub type MemoryPoolRef = Arc<dyn MemoryPool>;

/// Raw allocator abstraction providing allocate/reallocate/free of byte regions.
///
/// # Zero-sized requests
///
/// `allocate(0)` succeeds and returns a shared, [`ALIGNMENT`]-aligned sentinel
/// address that must never be read or written. Freeing a zero-sized region is a
/// no-op, and reallocating from a zero-sized region behaves like `allocate`.
pub trait MemoryPool: Send + Sync {
    /// Allocates a region of `size` bytes aligned to [`ALIGNMENT`].
    ///
    /// The contents of the region are unspecified.
    fn allocate(&self, size: usize) -> Result<NonNull<u8>>;

    /// Resizes a region previously returned by this pool, possibly moving it.
    ///
    /// The first `min(old_size, new_size)` bytes are preserved. On failure the
    /// original region remains valid and unchanged.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this pool for a region of exactly
    /// `old_size` bytes and must not have been freed.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>>;

    /// Returns a region to the pool.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this pool for a region of exactly
    /// `size` bytes, and must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize);

    /// Number of bytes currently allocated through this pool.
    fn bytes_allocated(&self) -> usize;

    /// Peak value of [`bytes_allocated`](Self::bytes_allocated) observed so far.
    fn max_memory(&self) -> usize;

    /// Name of the backing allocator, for diagnostics.
    fn backend_name(&self) -> &str;
}

/// Sentinel returned for zero-sized allocations.
#[repr(C, align(64))]
struct ZeroSizeArea([u8; 0]);

static ZERO_SIZE_AREA: ZeroSizeArea = ZeroSizeArea([]);

/// Returns the aligned sentinel address handed out for zero-sized allocations.
#[inline]
pub fn zero_size_area() -> NonNull<u8> {
    NonNull::from(&ZERO_SIZE_AREA).cast()
}
