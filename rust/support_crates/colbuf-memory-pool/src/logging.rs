use std::ptr::NonNull;

use colbuf_common::Result;

use crate::{MemoryPool, MemoryPoolRef};

/// A [`MemoryPool`] decorator that emits a `log` record for every call made
/// through it, at the configured level.
pub struct LoggingMemoryPool {
    inner: MemoryPoolRef,
    level: log::Level,
}

impl LoggingMemoryPool {
    pub fn new(inner: MemoryPoolRef) -> LoggingMemoryPool {
        Self::with_level(inner, log::Level::Debug)
    }

    pub fn with_level(inner: MemoryPoolRef, level: log::Level) -> LoggingMemoryPool {
        LoggingMemoryPool { inner, level }
    }

    pub fn inner(&self) -> &MemoryPoolRef {
        &self.inner
    }
}

impl MemoryPool for LoggingMemoryPool {
    fn allocate(&self, size: usize) -> Result<NonNull<u8>> {
        let res = self.inner.allocate(size);
        match &res {
            Ok(ptr) => log::log!(self.level, "allocate({size}) -> {ptr:p}"),
            Err(e) => log::log!(self.level, "allocate({size}) failed: {e}"),
        }
        res
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        let res = unsafe { self.inner.reallocate(ptr, old_size, new_size) };
        match &res {
            Ok(new_ptr) => log::log!(
                self.level,
                "reallocate({ptr:p}, {old_size}, {new_size}) -> {new_ptr:p}"
            ),
            Err(e) => log::log!(
                self.level,
                "reallocate({ptr:p}, {old_size}, {new_size}) failed: {e}"
            ),
        }
        res
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        unsafe { self.inner.free(ptr, size) };
        log::log!(self.level, "free({ptr:p}, {size})");
    }

    fn bytes_allocated(&self) -> usize {
        self.inner.bytes_allocated()
    }

    fn max_memory(&self) -> usize {
        self.inner.max_memory()
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }
}
