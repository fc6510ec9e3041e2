//! Process-wide pool singletons.

use std::sync::{Arc, OnceLock};

use crate::{LimitedMemoryPool, MemoryPoolRef, SystemMemoryPool};

/// Environment variable holding an optional byte limit for the default pool.
///
/// Read once, when the default pool is first requested.
pub const MEMORY_LIMIT_ENV: &str = "COLBUF_MEMORY_LIMIT";

/// Returns the process-wide system pool.
pub fn system_memory_pool() -> MemoryPoolRef {
    static SYSTEM: OnceLock<Arc<SystemMemoryPool>> = OnceLock::new();
    SYSTEM.get_or_init(|| Arc::new(SystemMemoryPool::new())).clone()
}

/// Returns the process-wide default pool, initializing it on first use.
///
/// The default pool is the system pool, capped by [`MEMORY_LIMIT_ENV`] when
/// that variable holds a byte count. It lives for the rest of the process.
pub fn default_memory_pool() -> MemoryPoolRef {
    static DEFAULT: OnceLock<MemoryPoolRef> = OnceLock::new();
    DEFAULT.get_or_init(init_default_pool).clone()
}

fn init_default_pool() -> MemoryPoolRef {
    let system = system_memory_pool();
    match configured_limit(std::env::var(MEMORY_LIMIT_ENV).ok().as_deref()) {
        Some(limit) => {
            log::debug!("default memory pool: system allocator limited to {limit} bytes");
            Arc::new(LimitedMemoryPool::new(system, limit))
        }
        None => {
            log::debug!("default memory pool: system allocator");
            system
        }
    }
}

fn configured_limit(value: Option<&str>) -> Option<usize> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<usize>() {
        Ok(limit) => Some(limit),
        Err(e) => {
            log::warn!("ignoring {MEMORY_LIMIT_ENV}={value:?}: {e}");
            None
        }
    }
}
