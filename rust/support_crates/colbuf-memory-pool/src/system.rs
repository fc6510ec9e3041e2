//! Pool backed by the global Rust allocator.

use std::{alloc::Layout, ptr::NonNull};

use colbuf_common::{Error, Result};

use crate::{counter::UsageStats, zero_size_area, MemoryPool, ALIGNMENT};

/// A [`MemoryPool`] that serves every request from the global allocator with
/// [`ALIGNMENT`]-byte alignment, keeping atomic usage statistics.
#[derive(Debug, Default)]
pub struct SystemMemoryPool {
    stats: UsageStats,
}

impl SystemMemoryPool {
    pub fn new() -> SystemMemoryPool {
        SystemMemoryPool::default()
    }

    fn layout(size: usize) -> Result<Layout> {
        Layout::from_size_align(size, ALIGNMENT)
            .map_err(|e| Error::allocation_failure(size, e.to_string()))
    }
}

impl MemoryPool for SystemMemoryPool {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Ok(zero_size_area());
        }
        let layout = Self::layout(size)?;
        let ptr = unsafe { std::alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            log::warn!("system pool: allocation of {size} bytes failed");
            Error::allocation_failure(size, "global allocator returned null")
        })?;
        self.stats.did_allocate(size);
        log::trace!("system pool: allocate {size} -> {ptr:p}");
        Ok(ptr)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        if old_size == 0 {
            return self.allocate(new_size);
        }
        if new_size == 0 {
            unsafe { self.free(ptr, old_size) };
            return Ok(zero_size_area());
        }
        // Validate the target layout up front: `realloc` requires it.
        Self::layout(new_size)?;
        let old_layout = Self::layout(old_size)?;
        let new_ptr = unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_size) };
        let new_ptr = NonNull::new(new_ptr).ok_or_else(|| {
            log::warn!("system pool: reallocation {old_size} -> {new_size} bytes failed");
            Error::allocation_failure(new_size, "global allocator returned null")
        })?;
        self.stats.did_reallocate(old_size, new_size);
        log::trace!("system pool: reallocate {ptr:p} ({old_size}) -> {new_ptr:p} ({new_size})");
        Ok(new_ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        if size == 0 {
            return;
        }
        // The layout was valid when the region was allocated.
        let Ok(layout) = Self::layout(size) else {
            return;
        };
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
        self.stats.did_free(size);
        log::trace!("system pool: free {ptr:p} ({size})");
    }

    fn bytes_allocated(&self) -> usize {
        self.stats.allocated()
    }

    fn max_memory(&self) -> usize {
        self.stats.peak()
    }

    fn backend_name(&self) -> &str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_pool_allocate_aligned() {
        let pool = SystemMemoryPool::new();
        for size in [1, 63, 64, 65, 1000, 4096] {
            let p = pool.allocate(size).unwrap();
            assert_eq!(p.as_ptr() as usize % ALIGNMENT, 0);
            assert_eq!(pool.bytes_allocated(), size);
            unsafe { pool.free(p, size) };
            assert_eq!(pool.bytes_allocated(), 0);
        }
        assert_eq!(pool.max_memory(), 4096);
    }

    #[test]
    fn test_system_pool_zero_size() {
        let pool = SystemMemoryPool::new();
        let p = pool.allocate(0).unwrap();
        assert_eq!(p, zero_size_area());
        assert_eq!(pool.bytes_allocated(), 0);
        unsafe { pool.free(p, 0) };
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_system_pool_reallocate_preserves_contents() {
        let pool = SystemMemoryPool::new();
        let p = pool.allocate(64).unwrap();
        unsafe {
            for i in 0..64 {
                p.as_ptr().add(i).write(i as u8);
            }
            let p = pool.reallocate(p, 64, 4096).unwrap();
            assert_eq!(p.as_ptr() as usize % ALIGNMENT, 0);
            assert_eq!(pool.bytes_allocated(), 4096);
            let bytes = std::slice::from_raw_parts(p.as_ptr(), 64);
            assert!(bytes.iter().enumerate().all(|(i, &b)| b == i as u8));

            let p = pool.reallocate(p, 4096, 128).unwrap();
            assert_eq!(pool.bytes_allocated(), 128);
            let bytes = std::slice::from_raw_parts(p.as_ptr(), 64);
            assert!(bytes.iter().enumerate().all(|(i, &b)| b == i as u8));

            let p = pool.reallocate(p, 128, 0).unwrap();
            assert_eq!(p, zero_size_area());
            assert_eq!(pool.bytes_allocated(), 0);
        }
    }

    #[test]
    fn test_system_pool_oversized_request_fails() {
        let pool = SystemMemoryPool::new();
        let err = pool.allocate(usize::MAX - 10).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(pool.bytes_allocated(), 0);
    }
}
