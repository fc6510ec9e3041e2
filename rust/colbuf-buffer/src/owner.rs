//! `MemoryOwner`: memory held outside of a pool that a [`Buffer`](crate::Buffer)
//! can wrap without copying.

/// A trait for types that own a contiguous byte region.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - The memory returned by `memory()` remains valid and immutable
///   for the entire lifetime of the owner.
/// - `ptr` is non-null whenever `len` is non-zero.
/// - The reported length and capacity are accurate, with `len <= capacity`.
pub unsafe trait MemoryOwner {
    /// Returns information about the owned memory block.
    fn memory(&self) -> MemoryAllocation;
}

/// Describes a block of memory held by a [`MemoryOwner`].
#[derive(Debug, Clone)]
pub struct MemoryAllocation {
    /// Pointer to the start of the memory.
    pub ptr: *const u8,
    /// Logical length of the memory in bytes.
    pub len: usize,
    /// Total readable capacity of the memory in bytes.
    pub capacity: usize,
}

unsafe impl MemoryOwner for Vec<u8> {
    fn memory(&self) -> MemoryAllocation {
        MemoryAllocation {
            ptr: self.as_ptr(),
            len: self.len(),
            capacity: self.len(),
        }
    }
}

unsafe impl MemoryOwner for &'static [u8] {
    fn memory(&self) -> MemoryAllocation {
        MemoryAllocation {
            ptr: self.as_ptr(),
            len: self.len(),
            capacity: self.len(),
        }
    }
}
