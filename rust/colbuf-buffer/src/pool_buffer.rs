//! `PoolBuffer`: a resizable byte buffer whose storage is obtained from, and
//! returned to, a [`MemoryPool`].

use std::ptr::NonNull;

use colbuf_common::Result;
use colbuf_memory_pool::{MemoryPool, MemoryPoolRef};

use crate::{align::aligned_capacity, resizable::ResizableBuffer, Buffer, MutableBuffer};

/// An owned, resizable byte buffer bound to a memory pool for its whole lifetime.
///
/// Capacity is always a multiple of 64 bytes, and the bytes between the logical
/// length and the capacity are kept zeroed, so word-at-a-time readers may safely
/// scan up to `capacity()` bytes.
///
/// A buffer with zero capacity holds no allocation and reports a null `data()`.
pub struct PoolBuffer {
    ptr: Option<NonNull<u8>>,
    len: usize,
    capacity: usize,
    pool: MemoryPoolRef,
}

// SAFETY: `PoolBuffer` exclusively owns its allocation, and the pool is
// `Send + Sync` by contract.
unsafe impl Send for PoolBuffer {}

unsafe impl Sync for PoolBuffer {}

impl PoolBuffer {
    /// Creates an empty buffer (no allocation) bound to `pool`.
    pub fn new(pool: MemoryPoolRef) -> PoolBuffer {
        PoolBuffer {
            ptr: None,
            len: 0,
            capacity: 0,
            pool,
        }
    }

    /// Creates a buffer bound to `pool` with room for at least `capacity` bytes.
    pub fn with_capacity(pool: MemoryPoolRef, capacity: usize) -> Result<PoolBuffer> {
        let mut buf = PoolBuffer::new(pool);
        buf.reserve(capacity)?;
        Ok(buf)
    }

    /// The pool this buffer allocates from.
    #[inline]
    pub fn pool(&self) -> &MemoryPoolRef {
        &self.pool
    }

    /// Read pointer to the start of the buffer; null when nothing is allocated.
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.ptr.map_or(std::ptr::null(), |p| p.as_ptr() as *const u8)
    }

    /// Write pointer to the start of the buffer; null when nothing is allocated.
    #[inline]
    pub fn mutable_data(&mut self) -> *mut u8 {
        self.ptr.map_or(std::ptr::null_mut(), |p| p.as_ptr())
    }

    /// Logical length in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Physical size of the allocation in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pool buffers are always writable.
    #[inline]
    pub fn is_mutable(&self) -> bool {
        true
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self.ptr {
            Some(p) => unsafe { std::slice::from_raw_parts(p.as_ptr(), self.len) },
            None => &[],
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.ptr {
            Some(p) => unsafe { std::slice::from_raw_parts_mut(p.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// The whole allocation, including the zeroed padding past the logical length.
    #[inline]
    pub fn as_padded_slice(&self) -> &[u8] {
        match self.ptr {
            Some(p) => unsafe { std::slice::from_raw_parts(p.as_ptr(), self.capacity) },
            None => &[],
        }
    }

    /// Converts this buffer into a fixed-length, writable buffer.
    pub fn into_mutable(self) -> MutableBuffer {
        MutableBuffer::from_pool_buffer(self)
    }

    /// Converts this buffer into a shared buffer.
    ///
    /// The result is flagged mutable, so it can parent mutable slices.
    pub fn into_buffer(self) -> Buffer {
        self.into_mutable().into_buffer()
    }

    /// Zeroes `[start, end)`, clamped to the allocation.
    fn zero_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.capacity);
        if start >= end {
            return;
        }
        if let Some(p) = self.ptr {
            unsafe { p.as_ptr().add(start).write_bytes(0, end - start) };
        }
    }

    /// Returns the allocation to the pool, leaving the buffer empty.
    fn release(&mut self) {
        if let Some(p) = self.ptr.take() {
            unsafe { self.pool.free(p, self.capacity) };
        }
        self.capacity = 0;
    }
}

impl ResizableBuffer for PoolBuffer {
    fn reserve(&mut self, capacity: usize) -> Result<()> {
        if self.ptr.is_some() && capacity <= self.capacity {
            return Ok(());
        }
        let new_capacity = aligned_capacity(capacity)?;
        if new_capacity == 0 {
            return Ok(());
        }
        let new_ptr = match self.ptr {
            Some(p) => unsafe { self.pool.reallocate(p, self.capacity, new_capacity) },
            None => self.pool.allocate(new_capacity),
        }
        .inspect_err(|e| {
            log::debug!(
                "PoolBuffer: failed to grow from {} to {new_capacity} bytes: {e}",
                self.capacity
            )
        })?;
        log::trace!(
            "PoolBuffer: capacity {} -> {new_capacity} ({})",
            self.capacity,
            self.pool.backend_name()
        );
        self.ptr = Some(new_ptr);
        self.capacity = new_capacity;
        self.zero_padding();
        Ok(())
    }

    fn resize(&mut self, new_size: usize, shrink_to_fit: bool) -> Result<()> {
        let old_size = self.len;
        if !shrink_to_fit || new_size > old_size {
            self.reserve(new_size)?;
        } else {
            let new_capacity = aligned_capacity(new_size)?;
            if new_capacity != self.capacity {
                if new_size == 0 {
                    self.release();
                } else if let Some(p) = self.ptr {
                    let new_ptr =
                        unsafe { self.pool.reallocate(p, self.capacity, new_capacity)? };
                    self.ptr = Some(new_ptr);
                    self.capacity = new_capacity;
                }
            }
        }
        self.len = new_size;
        if new_size < old_size {
            self.zero_range(new_size, old_size);
        }
        Ok(())
    }

    fn zero_padding(&mut self) {
        self.zero_range(self.len, self.capacity);
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("ptr", &self.data())
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("pool", &self.pool.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use colbuf_memory_pool::{LimitedMemoryPool, SystemMemoryPool};

    use super::*;

    fn pool() -> MemoryPoolRef {
        Arc::new(SystemMemoryPool::new())
    }

    fn assert_padding_zeroed(buf: &PoolBuffer) {
        assert!(
            buf.as_padded_slice()[buf.len()..].iter().all(|&b| b == 0),
            "padding not zeroed: {buf:?}"
        );
    }

    #[test]
    fn test_new_is_unallocated() {
        let buf = PoolBuffer::new(pool());
        assert!(buf.data().is_null());
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_mutable());
        assert_eq!(buf.as_slice(), &[] as &[u8]);
    }

    #[test]
    fn test_reserve_rounds_to_alignment() {
        let pool = pool();
        let mut buf = PoolBuffer::new(pool.clone());
        buf.reserve(10).unwrap();
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.size(), 0);
        assert!(!buf.data().is_null());
        assert_eq!(buf.data() as usize % 64, 0);
        assert_eq!(pool.bytes_allocated(), 64);
        assert_padding_zeroed(&buf);

        // Smaller requests are no-ops.
        buf.reserve(5).unwrap();
        assert_eq!(buf.capacity(), 64);

        buf.reserve(65).unwrap();
        assert_eq!(buf.capacity(), 128);
        assert_eq!(pool.bytes_allocated(), 128);
        drop(buf);
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_reserve_zero_keeps_buffer_unallocated() {
        let pool = pool();
        let mut buf = PoolBuffer::new(pool.clone());
        buf.reserve(0).unwrap();
        assert!(buf.data().is_null());
        assert_eq!(buf.capacity(), 0);
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_resize_grow_preserves_contents() {
        let mut buf = PoolBuffer::new(pool());
        buf.resize(5, true).unwrap();
        buf.as_mut_slice().copy_from_slice(b"hello");
        buf.resize(100, true).unwrap();
        assert_eq!(buf.capacity(), 128);
        assert_eq!(&buf.as_slice()[..5], b"hello");
        assert!(buf.as_slice()[5..].iter().all(|&b| b == 0));
        assert_padding_zeroed(&buf);
    }

    #[test]
    fn test_resize_shrink_to_fit() {
        let pool = pool();
        let mut buf = PoolBuffer::new(pool.clone());
        buf.resize(1000, true).unwrap();
        assert_eq!(buf.capacity(), 1024);
        buf.as_mut_slice().fill(7);

        buf.resize(100, true).unwrap();
        assert_eq!(buf.size(), 100);
        assert_eq!(buf.capacity(), 128);
        assert_eq!(pool.bytes_allocated(), 128);
        assert!(buf.as_slice().iter().all(|&b| b == 7));
        assert_padding_zeroed(&buf);

        buf.resize(0, true).unwrap();
        assert_eq!(buf.capacity(), 0);
        assert!(buf.data().is_null());
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_resize_without_shrink_keeps_capacity() {
        let mut buf = PoolBuffer::new(pool());
        buf.resize(1000, false).unwrap();
        buf.as_mut_slice().fill(9);
        buf.resize(10, false).unwrap();
        assert_eq!(buf.size(), 10);
        assert_eq!(buf.capacity(), 1024);
        assert_padding_zeroed(&buf);

        buf.resize(0, false).unwrap();
        assert_eq!(buf.capacity(), 1024);
        assert!(!buf.data().is_null());
        assert_padding_zeroed(&buf);
    }

    #[test]
    fn test_shrink_within_same_capacity_zeroes_tail() {
        let mut buf = PoolBuffer::new(pool());
        buf.resize(60, true).unwrap();
        buf.as_mut_slice().fill(0xFF);
        let data = buf.data();
        buf.resize(10, true).unwrap();
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.data(), data);
        assert_padding_zeroed(&buf);
        buf.resize(60, true).unwrap();
        assert!(buf.as_slice()[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_failed_reserve_leaves_state_unchanged() {
        let pool: MemoryPoolRef = Arc::new(LimitedMemoryPool::new(pool(), 256));
        let mut buf = PoolBuffer::new(pool.clone());
        buf.resize(100, true).unwrap();
        buf.as_mut_slice().fill(3);
        let (data, len, cap) = (buf.data(), buf.size(), buf.capacity());

        let err = buf.reserve(1000).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!((buf.data(), buf.size(), buf.capacity()), (data, len, cap));

        let err = buf.resize(1000, false).unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!((buf.data(), buf.size(), buf.capacity()), (data, len, cap));
        assert!(buf.as_slice().iter().all(|&b| b == 3));
        assert_eq!(pool.bytes_allocated(), 128);
    }

    #[test]
    fn test_failed_initial_allocation() {
        let pool: MemoryPoolRef = Arc::new(LimitedMemoryPool::new(pool(), 64));
        let mut buf = PoolBuffer::new(pool);
        assert!(buf.resize(65, true).unwrap_err().is_allocation_failure());
        assert!(buf.data().is_null());
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_oversized_request() {
        let mut buf = PoolBuffer::new(pool());
        assert!(buf.reserve(usize::MAX).unwrap_err().is_allocation_failure());
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let buf = PoolBuffer::with_capacity(pool(), 200).unwrap();
        assert_eq!(buf.capacity(), 256);
        assert!(buf.is_empty());
        assert_padding_zeroed(&buf);
    }

    #[test]
    fn test_pool_buffer_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PoolBuffer>();
    }
}
