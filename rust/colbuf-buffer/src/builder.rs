//! Incremental construction of pool-backed buffers.

use colbuf_common::Result;
use colbuf_memory_pool::MemoryPoolRef;

use crate::{resizable::ResizableBuffer, Buffer, PoolBuffer};

/// An append-oriented builder over a [`PoolBuffer`], conceptually similar to a
/// `Vec<u8>` whose storage comes from a memory pool.
///
/// Growth at least doubles the capacity, so a sequence of appends is amortized
/// linear. All allocation failures are reported and leave the builder unchanged.
#[derive(Debug)]
pub struct BufferBuilder(PoolBuffer);

impl BufferBuilder {
    /// Creates a new empty builder allocating from `pool`.
    pub fn new(pool: MemoryPoolRef) -> BufferBuilder {
        BufferBuilder(PoolBuffer::new(pool))
    }

    /// Creates a builder able to hold at least `capacity` bytes without reallocating.
    pub fn with_capacity(pool: MemoryPoolRef, capacity: usize) -> Result<BufferBuilder> {
        Ok(BufferBuilder(PoolBuffer::with_capacity(pool, capacity)?))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    /// Reserves capacity for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = self.len().checked_add(additional).ok_or_else(|| {
            colbuf_common::Error::allocation_failure(additional, "length overflow")
        })?;
        if required <= self.capacity() {
            return Ok(());
        }
        let target = required.max(self.capacity().saturating_mul(2));
        self.0.reserve(target)
    }

    /// Appends all bytes from a slice.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.reserve(data.len())?;
        let len = self.len();
        self.0.resize(len + data.len(), false)?;
        self.0.as_mut_slice()[len..].copy_from_slice(data);
        Ok(())
    }

    /// Appends `count` copies of `value`.
    pub fn append_repeated(&mut self, value: u8, count: usize) -> Result<()> {
        let len = self.len();
        self.resize(len.saturating_add(count), value)
    }

    /// Appends the raw bytes of a slice of plain values.
    #[inline]
    pub fn append_typed<T>(&mut self, values: &[T]) -> Result<()>
    where
        T: bytemuck::NoUninit,
    {
        self.append(bytemuck::cast_slice(values))
    }

    /// Resizes to `new_len`, filling any new space with `value`.
    pub fn resize(&mut self, new_len: usize, value: u8) -> Result<()> {
        let len = self.len();
        if new_len > len {
            self.reserve(new_len - len)?;
        }
        self.0.resize(new_len, false)?;
        if new_len > len && value != 0 {
            self.0.as_mut_slice()[len..].fill(value);
        }
        Ok(())
    }

    /// Truncates to `len` bytes. Has no effect if `len` is not below the
    /// current length. Capacity is retained.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            // Shrinking without shrink-to-fit never allocates.
            let _ = self.0.resize(len, false);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        self.0.as_mut_slice()
    }

    /// Consumes the builder and returns the accumulated bytes as a shared buffer.
    ///
    /// With `shrink_to_fit`, excess capacity is returned to the pool first.
    pub fn finish(mut self, shrink_to_fit: bool) -> Result<Buffer> {
        if shrink_to_fit {
            let len = self.len();
            self.0.resize(len, true)?;
        }
        Ok(self.0.into_buffer())
    }

    /// Consumes the builder and returns the underlying resizable buffer.
    pub fn into_inner(self) -> PoolBuffer {
        self.0
    }
}

impl std::ops::Deref for BufferBuilder {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl std::ops::DerefMut for BufferBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_slice_mut()
    }
}

impl std::io::Write for BufferBuilder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.append(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::OutOfMemory, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
