use colbuf_common::{verify_arg, Error, Result};
use colbuf_memory_pool::MemoryPoolRef;

use crate::{Buffer, PoolBuffer};

/// A fixed-length, writable byte buffer.
///
/// A `MutableBuffer` either owns a pool allocation (see
/// [`PoolBuffer::into_mutable`]) or is a zero-copy slice of a mutable parent
/// [`Buffer`] (see [`MutableBuffer::slice`]). A slice shares ownership of the
/// parent's memory: the memory lives as long as the longest-lived of the parent
/// and all of its slices, while the parent never learns about its slices.
///
/// Write access requires `&mut self`; there is no internal synchronization.
pub struct MutableBuffer {
    buf: Buffer,
}

impl MutableBuffer {
    pub(crate) fn from_pool_buffer(buf: PoolBuffer) -> MutableBuffer {
        MutableBuffer {
            buf: Buffer::from_pool_buffer(buf),
        }
    }

    /// Creates a writable view of `length` bytes of `parent`, starting at `offset`.
    ///
    /// No data is copied: writes through the slice land in the parent's memory
    /// and are visible through every other view of it. The slice keeps the
    /// memory alive even after all other handles are dropped.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if `parent` is not mutable.
    /// - `InvalidArgument` if the range falls outside `parent`.
    ///
    /// # Safety
    ///
    /// The slice aliases memory that other handles can read (or, through other
    /// mutable slices, write). While a reference obtained from the slice's
    /// `as_mut_slice()` (or any write through it) is live, no other view of the
    /// overlapping bytes may be read or written.
    pub unsafe fn slice(parent: &Buffer, offset: usize, length: usize) -> Result<MutableBuffer> {
        if !parent.is_mutable() {
            return Err(Error::invalid_operation(
                "slice: parent buffer is not mutable",
            ));
        }
        verify_arg!(offset, offset <= parent.len());
        verify_arg!(length, length <= parent.len() - offset);
        Ok(MutableBuffer {
            buf: parent.make_slice(offset, length, true),
        })
    }

    /// Read pointer to the start of the buffer. Null only for an empty buffer.
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.buf.data()
    }

    /// Write pointer to the start of the buffer. Null only for an empty buffer.
    #[inline]
    pub fn mutable_data(&mut self) -> *mut u8 {
        self.buf.data() as *mut u8
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Readable bytes from `data()`: the full allocation for an owning buffer,
    /// `len()` for a slice.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        true
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let ptr = self.mutable_data();
        if ptr.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(ptr, self.buf.len()) }
    }

    /// Sets every byte of the buffer to `value`.
    pub fn fill(&mut self, value: u8) {
        self.as_mut_slice().fill(value);
    }

    /// See [`Buffer::equals`].
    pub fn equals(&self, other: &Buffer) -> bool {
        self.buf.equals(other)
    }

    /// See [`Buffer::equals_prefix`].
    pub fn equals_prefix(&self, other: &Buffer, nbytes: usize) -> bool {
        self.buf.equals_prefix(other, nbytes)
    }

    /// See [`Buffer::copy`].
    pub fn copy(&self, start: usize, nbytes: usize, pool: &MemoryPoolRef) -> Result<Buffer> {
        self.buf.copy(start, nbytes, pool)
    }

    /// Releases write access and returns a shared buffer over the same memory.
    ///
    /// The returned buffer stays flagged mutable, so it can parent mutable slices.
    pub fn into_buffer(self) -> Buffer {
        self.buf
    }

    /// Releases write access and returns an immutable shared buffer.
    pub fn freeze(self) -> Buffer {
        self.buf.freeze()
    }
}

impl std::ops::Deref for MutableBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl std::ops::DerefMut for MutableBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl AsRef<[u8]> for MutableBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for MutableBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl PartialEq for MutableBuffer {
    fn eq(&self, other: &MutableBuffer) -> bool {
        self.buf.equals(&other.buf)
    }
}

impl PartialEq<Buffer> for MutableBuffer {
    fn eq(&self, other: &Buffer) -> bool {
        self.buf.equals(other)
    }
}

impl std::fmt::Debug for MutableBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableBuffer")
            .field("values", &self.as_slice())
            .field("len", &self.len())
            .field("cap", &self.capacity())
            .finish_non_exhaustive()
    }
}

impl From<PoolBuffer> for MutableBuffer {
    fn from(buf: PoolBuffer) -> MutableBuffer {
        buf.into_mutable()
    }
}

impl From<MutableBuffer> for Buffer {
    fn from(buf: MutableBuffer) -> Buffer {
        buf.into_buffer()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use colbuf_memory_pool::{MemoryPool, SystemMemoryPool};

    use super::*;
    use crate::allocate_buffer;

    fn pool() -> MemoryPoolRef {
        Arc::new(SystemMemoryPool::new())
    }

    #[test]
    fn test_owned_mutable_buffer() {
        let mut buf = allocate_buffer(&pool(), 10).unwrap();
        assert_eq!(buf.size(), 10);
        assert_eq!(buf.capacity(), 64);
        assert!(buf.is_mutable());
        buf.as_mut_slice().copy_from_slice(b"0123456789");
        buf[0] = b'x';
        assert_eq!(&buf[..], b"x123456789");
        buf.fill(1);
        assert!(buf.iter().all(|&b| b == 1));
    }

    #[test]
    fn test_slice_shares_memory() {
        let mut buf = allocate_buffer(&pool(), 16).unwrap();
        buf.fill(0);
        let parent = buf.into_buffer();
        assert!(parent.is_mutable());

        let mut slice = unsafe { MutableBuffer::slice(&parent, 4, 8) }.unwrap();
        assert_eq!(slice.len(), 8);
        assert_eq!(slice.capacity(), 8);
        assert_eq!(slice.data(), unsafe { parent.data().add(4) });
        slice.as_mut_slice().copy_from_slice(b"abcdefgh");
        assert_eq!(&parent[4..12], b"abcdefgh");
        assert_eq!(&parent[..4], &[0, 0, 0, 0]);

        // A slice can itself parent a slice once shared.
        let shared = slice.into_buffer();
        let mut inner = unsafe { MutableBuffer::slice(&shared, 2, 2) }.unwrap();
        inner.as_mut_slice().copy_from_slice(b"XY");
        assert_eq!(&parent[4..12], b"abXYefgh");
    }

    #[test]
    fn test_slice_keeps_parent_alive() {
        let pool = pool();
        let mut buf = allocate_buffer(&pool, 100).unwrap();
        buf.as_mut_slice()
            .iter_mut()
            .enumerate()
            .for_each(|(i, b)| *b = i as u8);
        let parent = buf.into_buffer();
        let slice = unsafe { MutableBuffer::slice(&parent, 50, 10) }.unwrap();
        assert_eq!(parent.owner_count(), 2);
        drop(parent);

        assert_eq!(pool.bytes_allocated(), 128);
        assert_eq!(slice.as_slice(), &[50, 51, 52, 53, 54, 55, 56, 57, 58, 59]);
        drop(slice);
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_slice_of_immutable_parent_fails() {
        let frozen = allocate_buffer(&pool(), 8).unwrap().freeze();
        let err = unsafe { MutableBuffer::slice(&frozen, 0, 4) }.unwrap_err();
        assert!(err.is_invalid_operation());

        let external = Buffer::from_static(b"static data");
        let err = unsafe { MutableBuffer::slice(&external, 0, 4) }.unwrap_err();
        assert!(err.is_invalid_operation());

        let immutable_view = allocate_buffer(&pool(), 8)
            .unwrap()
            .into_buffer()
            .slice(0, 4)
            .unwrap();
        let err = unsafe { MutableBuffer::slice(&immutable_view, 0, 4) }.unwrap_err();
        assert!(err.is_invalid_operation());
    }

    #[test]
    fn test_slice_out_of_range_fails() {
        let parent = allocate_buffer(&pool(), 8).unwrap().into_buffer();
        let err = unsafe { MutableBuffer::slice(&parent, 9, 0) }.unwrap_err();
        assert!(err.is_invalid_argument());
        let err = unsafe { MutableBuffer::slice(&parent, 4, 5) }.unwrap_err();
        assert!(err.is_invalid_argument());
        let empty = unsafe { MutableBuffer::slice(&parent, 8, 0) }.unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_mutable_equals_and_copy() {
        let pool = pool();
        let mut buf = allocate_buffer(&pool, 5).unwrap();
        buf.as_mut_slice().copy_from_slice(b"hello");
        let other = Buffer::from_static(b"hello");
        assert!(buf.equals(&other));
        assert_eq!(buf, other);
        assert!(buf.equals_prefix(&Buffer::from_static(b"help"), 3));

        let copy = buf.copy(1, 3, &pool).unwrap();
        buf.fill(b'z');
        assert_eq!(copy.as_slice(), b"ell");
    }

    #[test]
    fn test_freeze() {
        let buf = allocate_buffer(&pool(), 4).unwrap();
        let frozen = buf.freeze();
        assert!(!frozen.is_mutable());
        assert!(frozen.mutable_data().unwrap_err().is_invalid_operation());
    }
}
