//! Budget-enforcing pool decorator.

use std::ptr::NonNull;

use colbuf_common::{Error, Result};

use crate::{counter::Counter, MemoryPool, MemoryPoolRef};

/// A [`MemoryPool`] that forwards to an inner pool while enforcing an upper
/// bound on the number of outstanding bytes.
///
/// Requests that would exceed the budget fail with `AllocationFailure` without
/// reaching the inner pool.
pub struct LimitedMemoryPool {
    inner: MemoryPoolRef,
    limit: usize,
    remaining: Counter,
}

impl LimitedMemoryPool {
    /// Creates a pool that allows at most `limit` bytes to be outstanding at once.
    pub fn new(inner: MemoryPoolRef, limit: usize) -> LimitedMemoryPool {
        LimitedMemoryPool {
            inner,
            limit,
            remaining: Counter::new(limit as u64),
        }
    }

    /// The configured byte budget.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes that can still be allocated before the budget is exhausted.
    ///
    /// **Note**: intended for diagnostics, the value may be outdated in a
    /// concurrent environment.
    pub fn remaining(&self) -> usize {
        self.remaining.value() as usize
    }

    fn withdraw(&self, amount: usize) -> Result<()> {
        if self.remaining.withdraw(amount as u64) {
            Ok(())
        } else {
            log::warn!(
                "limited pool: request for {amount} bytes exceeds budget \
                 (limit {}, remaining {})",
                self.limit,
                self.remaining()
            );
            Err(Error::allocation_failure(
                amount,
                format!("memory limit of {} bytes exceeded", self.limit),
            ))
        }
    }
}

impl MemoryPool for LimitedMemoryPool {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        self.withdraw(size)?;
        self.inner.allocate(size).inspect_err(|_| {
            self.remaining.deposit(size as u64);
        })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        if new_size > old_size {
            let extra = new_size - old_size;
            self.withdraw(extra)?;
            unsafe { self.inner.reallocate(ptr, old_size, new_size) }.inspect_err(|_| {
                self.remaining.deposit(extra as u64);
            })
        } else {
            let res = unsafe { self.inner.reallocate(ptr, old_size, new_size) }?;
            self.remaining.deposit((old_size - new_size) as u64);
            Ok(res)
        }
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { self.inner.free(ptr, size) };
        self.remaining.deposit(size as u64);
    }

    fn bytes_allocated(&self) -> usize {
        self.limit - self.remaining()
    }

    fn max_memory(&self) -> usize {
        self.inner.max_memory()
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }
}

impl std::fmt::Debug for LimitedMemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitedMemoryPool")
            .field("backend", &self.inner.backend_name())
            .field("limit", &self.limit)
            .field("remaining", &self.remaining())
            .finish()
    }
}
