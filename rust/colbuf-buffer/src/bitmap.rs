//! Bitmaps: buffers interpreted as packed bits, eight per byte.
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8`, least significant bit
//! first.

use colbuf_common::Result;
use colbuf_memory_pool::MemoryPoolRef;

use crate::{alloc::allocate_buffer, MutableBuffer};

/// Number of bytes needed to hold `bits` bits.
#[inline]
pub fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Allocates a bitmap able to hold `length_in_bits` bits, all cleared.
pub fn allocate_empty_bitmap(pool: &MemoryPoolRef, length_in_bits: usize) -> Result<MutableBuffer> {
    let mut buf = allocate_buffer(pool, bytes_for_bits(length_in_bits))?;
    buf.fill(0);
    Ok(buf)
}

/// Same as [`allocate_empty_bitmap`].
#[inline]
pub fn get_empty_bitmap(pool: &MemoryPoolRef, length_in_bits: usize) -> Result<MutableBuffer> {
    allocate_empty_bitmap(pool, length_in_bits)
}

/// Returns the value of bit `i`.
///
/// # Panics
///
/// Panics if `i / 8` is out of bounds of `bits`.
#[inline]
pub fn get_bit(bits: &[u8], i: usize) -> bool {
    bits[i >> 3] & (1 << (i & 7)) != 0
}

/// Sets bit `i`.
#[inline]
pub fn set_bit(bits: &mut [u8], i: usize) {
    bits[i >> 3] |= 1 << (i & 7);
}

/// Clears bit `i`.
#[inline]
pub fn clear_bit(bits: &mut [u8], i: usize) {
    bits[i >> 3] &= !(1 << (i & 7));
}

#[inline]
pub fn set_bit_to(bits: &mut [u8], i: usize, value: bool) {
    if value {
        set_bit(bits, i)
    } else {
        clear_bit(bits, i)
    }
}

/// Number of set bits among the first `length_in_bits` bits.
pub fn count_set_bits(bits: &[u8], length_in_bits: usize) -> usize {
    let full_bytes = length_in_bits / 8;
    let mut count = bits[..full_bytes]
        .iter()
        .map(|b| b.count_ones() as usize)
        .sum::<usize>();
    let rem = length_in_bits % 8;
    if rem != 0 {
        count += (bits[full_bytes] & ((1u8 << rem) - 1)).count_ones() as usize;
    }
    count
}
