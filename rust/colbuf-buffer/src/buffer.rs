use std::sync::Arc;

use colbuf_common::{verify_arg, Error, Result};
use colbuf_memory_pool::MemoryPoolRef;

use crate::{
    align::is_ptr_aligned,
    alloc::allocate_resizable_buffer,
    owner::{MemoryAllocation, MemoryOwner},
    PoolBuffer,
};

/// `Buffer` represents a contiguous, read-only view over a byte region with
/// shared ownership semantics.
///
/// Buffers can be sliced and cloned without copying the underlying data. The
/// memory stays valid for as long as any buffer (or slice) referring to it is
/// alive, through reference counting.
///
/// A buffer is *mutable* when its region was allocated writable by a pool.
/// Mutability is what allows [`mutable_data`](Buffer::mutable_data) and
/// [`MutableBuffer::slice`](crate::MutableBuffer::slice) to succeed; writing
/// itself always goes through a [`MutableBuffer`](crate::MutableBuffer).
#[derive(Clone)]
pub struct Buffer {
    ptr: *const u8,
    len: usize,
    capacity: usize,
    mutable: bool,
    owner: BufOwner,
}

// SAFETY: the region is kept alive by `owner`, which is `Send + Sync`; the
// buffer itself only hands out shared access.
unsafe impl Send for Buffer {}

unsafe impl Sync for Buffer {}

impl Buffer {
    /// Creates a new empty buffer that owns no memory.
    pub fn new() -> Buffer {
        Buffer {
            ptr: std::ptr::null(),
            len: 0,
            capacity: 0,
            mutable: false,
            owner: BufOwner::None,
        }
    }

    /// Creates a new buffer from any type implementing `MemoryOwner`.
    ///
    /// The resulting buffer is immutable.
    pub fn from_owner(owner: Arc<dyn MemoryOwner + Send + Sync + 'static>) -> Result<Buffer> {
        let MemoryAllocation { ptr, len, capacity } = owner.memory();
        verify_arg!(capacity, capacity >= len);
        verify_arg!(ptr, !ptr.is_null() || len == 0);
        Ok(Buffer {
            ptr,
            len,
            capacity,
            mutable: false,
            owner: BufOwner::External(owner),
        })
    }

    /// Wraps a vector without copying. The resulting buffer is immutable.
    pub fn from_vec(vec: Vec<u8>) -> Buffer {
        let len = vec.len();
        let owner = Arc::new(vec);
        Buffer {
            ptr: owner.as_ptr(),
            len,
            capacity: len,
            mutable: false,
            owner: BufOwner::External(owner),
        }
    }

    /// Wraps static data without copying. The resulting buffer is immutable.
    pub fn from_static(data: &'static [u8]) -> Buffer {
        Buffer {
            ptr: data.as_ptr(),
            len: data.len(),
            capacity: data.len(),
            mutable: false,
            owner: BufOwner::None,
        }
    }

    /// Allocates a buffer from `pool` holding an exact copy of `data`.
    pub fn from_bytes(data: impl AsRef<[u8]>, pool: &MemoryPoolRef) -> Result<Buffer> {
        let data = data.as_ref();
        let mut buf = allocate_resizable_buffer(pool, data.len())?;
        buf.as_mut_slice().copy_from_slice(data);
        Ok(buf.into_buffer())
    }

    pub(crate) fn from_pool_buffer(buf: PoolBuffer) -> Buffer {
        let ptr = buf.data();
        let len = buf.len();
        let capacity = buf.capacity();
        Buffer {
            ptr,
            len,
            capacity,
            mutable: true,
            owner: BufOwner::Pool(Arc::new(buf)),
        }
    }

    /// Read pointer to the start of the buffer. Null only for an empty buffer.
    ///
    /// The pointer is valid only while this buffer (or a clone) is alive.
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.ptr
    }

    /// Logical length of the buffer in bytes.
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

    /// Number of readable bytes starting at `data()`.
    ///
    /// For buffers covering a whole pool allocation this includes the zeroed
    /// padding; for slices and external memory it equals `len()`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Returns a reference to the buffer contents as a byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Returns a write pointer to the start of the buffer.
    ///
    /// Writing through the pointer is the caller's responsibility; the check
    /// only guarantees that the region was allocated writable.
    pub fn mutable_data(&self) -> Result<*mut u8> {
        if !self.mutable {
            return Err(Error::invalid_operation(
                "mutable_data: buffer is not mutable",
            ));
        }
        Ok(self.ptr as *mut u8)
    }

    /// Returns `true` if both buffers have the same length and contents.
    ///
    /// Buffers viewing the same address are equal without comparing bytes.
    pub fn equals(&self, other: &Buffer) -> bool {
        std::ptr::eq(self, other)
            || (self.len == other.len
                && (self.ptr == other.ptr || self.as_slice() == other.as_slice()))
    }

    /// Returns `true` if both buffers hold at least `nbytes` bytes and their
    /// first `nbytes` bytes are identical.
    pub fn equals_prefix(&self, other: &Buffer, nbytes: usize) -> bool {
        std::ptr::eq(self, other)
            || (self.len >= nbytes
                && other.len >= nbytes
                && (self.ptr == other.ptr
                    || self.as_slice()[..nbytes] == other.as_slice()[..nbytes]))
    }

    /// Copies `nbytes` bytes starting at `start` into a new buffer allocated
    /// from `pool`.
    ///
    /// Requires `start < len()` (or `start == len()` for an empty copy) and
    /// `nbytes <= len() - start`. The result shares no memory with `self`.
    pub fn copy(&self, start: usize, nbytes: usize, pool: &MemoryPoolRef) -> Result<Buffer> {
        verify_arg!(start, start < self.len || (start == self.len && nbytes == 0));
        verify_arg!(nbytes, nbytes <= self.len - start);
        let mut buf = allocate_resizable_buffer(pool, nbytes)?;
        buf.as_mut_slice()
            .copy_from_slice(&self.as_slice()[start..start + nbytes]);
        Ok(buf.into_buffer())
    }

    /// Creates a zero-copy, immutable view of `length` bytes starting at `offset`.
    ///
    /// The slice shares ownership of the underlying memory, which stays alive
    /// for as long as either buffer does.
    pub fn slice(&self, offset: usize, length: usize) -> Result<Buffer> {
        verify_arg!(offset, offset <= self.len);
        verify_arg!(length, length <= self.len - offset);
        Ok(self.make_slice(offset, length, false))
    }

    /// Drops the mutable flag, yielding a buffer that can no longer hand out
    /// write access.
    pub fn freeze(mut self) -> Buffer {
        self.mutable = false;
        self
    }

    /// Checks if the buffer start is aligned to the specified power of two.
    pub fn is_aligned(&self, alignment: usize) -> bool {
        is_ptr_aligned(self.ptr, alignment)
    }

    /// Returns a copy of the contents as a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Returns a slice of `T` values from the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the length is not a multiple of `size_of::<T>()` or the data is
    /// misaligned for `T`.
    #[inline]
    pub fn typed_data<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Number of handles (buffers and slices) sharing the backing memory.
    pub fn owner_count(&self) -> usize {
        self.owner.strong_count()
    }
}

impl Buffer {
    /// Builds a view of `[offset, offset + length)`. The range must already be
    /// verified against `self.len`.
    pub(crate) fn make_slice(&self, offset: usize, length: usize, mutable: bool) -> Buffer {
        let ptr = if offset == 0 {
            self.ptr
        } else {
            unsafe { self.ptr.add(offset) }
        };
        Buffer {
            ptr,
            len: length,
            capacity: length,
            mutable,
            owner: self.owner.clone(),
        }
    }
}

impl std::ops::Deref for Buffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl AsRef<[u8]> for Buffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Buffer) -> bool {
        self.equals(other)
    }
}

impl Eq for Buffer {}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("values", &self.as_slice())
            .field("len", &self.len)
            .field("cap", &self.capacity)
            .field("mutable", &self.mutable)
            .finish_non_exhaustive()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<PoolBuffer> for Buffer {
    fn from(buf: PoolBuffer) -> Buffer {
        buf.into_buffer()
    }
}

#[derive(Clone)]
enum BufOwner {
    None,
    Pool(Arc<PoolBuffer>),
    External(Arc<dyn MemoryOwner + Send + Sync + 'static>),
}

impl BufOwner {
    fn strong_count(&self) -> usize {
        match self {
            BufOwner::None => 0,
            BufOwner::Pool(buf) => Arc::strong_count(buf),
            BufOwner::External(owner) => Arc::strong_count(owner),
        }
    }
}
