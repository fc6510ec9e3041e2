use colbuf_common::Result;

/// Capacity management over an owned, mutable byte buffer.
///
/// Only buffers that exclusively own a pool allocation implement this trait;
/// views and slices have a fixed length.
pub trait ResizableBuffer {
    /// Ensures the allocation can hold at least `capacity` bytes.
    ///
    /// Never shrinks the allocation and never changes the logical length. On
    /// failure the buffer is left exactly as it was.
    fn reserve(&mut self, capacity: usize) -> Result<()>;

    /// Sets the logical length to `new_size`.
    ///
    /// When growing, or when `shrink_to_fit` is `false`, the capacity only ever
    /// grows. When shrinking with `shrink_to_fit`, the allocation is reduced to
    /// the minimal aligned capacity for `new_size` and released entirely for a
    /// size of zero. On failure the buffer is left exactly as it was.
    fn resize(&mut self, new_size: usize, shrink_to_fit: bool) -> Result<()>;

    /// Zeroes the bytes between the logical length and the capacity.
    fn zero_padding(&mut self);
}
