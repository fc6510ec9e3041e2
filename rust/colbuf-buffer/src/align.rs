use colbuf_common::{Error, Result};
use colbuf_memory_pool::ALIGNMENT;

/// Aligns a number up to the next multiple of the specified alignment.
///
/// Returns `None` if the result does not fit in `usize`.
///
/// # Examples
///
/// ```
/// use colbuf_buffer::align::align_up;
///
/// assert_eq!(align_up(0, 8), Some(0));
/// assert_eq!(align_up(1, 8), Some(8));
/// assert_eq!(align_up(8, 8), Some(8));
/// assert_eq!(align_up(9, 8), Some(16));
/// assert_eq!(align_up(usize::MAX, 8), None);
/// ```
///
/// # Panics
///
/// This function will panic in debug builds if `alignment` is not a power of 2.
#[inline]
pub fn align_up(n: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    n.checked_add(alignment - 1).map(|n| n & !(alignment - 1))
}

/// Checks if a number is aligned to the specified alignment boundary.
///
/// ```
/// use colbuf_buffer::align::is_aligned;
///
/// assert!(is_aligned(0, 64));
/// assert!(is_aligned(128, 64));
/// assert!(!is_aligned(65, 64));
/// ```
#[inline]
pub fn is_aligned(n: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    (n & (alignment - 1)) == 0
}

/// Physical capacity needed to hold `size` bytes: `size` rounded up to a
/// multiple of [`ALIGNMENT`].
///
/// A size too large to round is reported as an allocation failure, since no
/// pool could satisfy it.
#[inline]
pub fn aligned_capacity(size: usize) -> Result<usize> {
    align_up(size, ALIGNMENT)
        .ok_or_else(|| Error::allocation_failure(size, "size overflows aligned capacity"))
}

#[inline]
pub(crate) fn is_ptr_aligned(ptr: *const u8, alignment: usize) -> bool {
    alignment.is_power_of_two() && is_aligned(ptr as usize, alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_capacity() {
        assert_eq!(aligned_capacity(0).unwrap(), 0);
        assert_eq!(aligned_capacity(1).unwrap(), 64);
        assert_eq!(aligned_capacity(10).unwrap(), 64);
        assert_eq!(aligned_capacity(63).unwrap(), 64);
        assert_eq!(aligned_capacity(64).unwrap(), 64);
        assert_eq!(aligned_capacity(65).unwrap(), 128);
        assert_eq!(aligned_capacity(1000).unwrap(), 1024);
        assert!(aligned_capacity(usize::MAX).unwrap_err().is_allocation_failure());
    }

    #[test]
    fn test_ptr_alignment() {
        assert!(is_ptr_aligned(std::ptr::null(), 64));
        assert!(is_ptr_aligned(128 as *const u8, 64));
        assert!(!is_ptr_aligned(130 as *const u8, 64));
        assert!(!is_ptr_aligned(128 as *const u8, 3));
    }
}
