use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe counter that enables multiple consumers to withdraw (if possible)
/// and deposit specific amounts, ensuring that the counter value remains
/// non-negative.
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new(amount: u64) -> Counter {
        Counter(AtomicU64::new(amount))
    }

    /// Attempts to withdraw the specified `amount` from the counter.
    ///
    /// If the current value is greater than or equal to `amount`, it is subtracted
    /// and `true` is returned. Otherwise the counter remains unchanged and `false`
    /// is returned.
    pub fn withdraw(&self, amount: u64) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current >= amount {
            match self.0.compare_exchange_weak(
                current,
                current - amount,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    /// Deposits the specified `amount` back into the counter.
    pub fn deposit(&self, amount: u64) {
        self.0.fetch_add(amount, Ordering::AcqRel);
    }

    /// Returns the current value of the counter.
    ///
    /// The returned value may be outdated in a concurrent environment.
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Counter").field(&self.value()).finish()
    }
}

/// Tracks outstanding bytes and the high-water mark of a pool.
#[derive(Debug, Default)]
pub struct UsageStats {
    allocated: AtomicU64,
    peak: AtomicU64,
}

impl UsageStats {
    pub fn new() -> UsageStats {
        UsageStats::default()
    }

    pub fn did_allocate(&self, size: usize) {
        let now = self.allocated.fetch_add(size as u64, Ordering::AcqRel) + size as u64;
        self.peak.fetch_max(now, Ordering::AcqRel);
    }

    pub fn did_free(&self, size: usize) {
        self.allocated.fetch_sub(size as u64, Ordering::AcqRel);
    }

    pub fn did_reallocate(&self, old_size: usize, new_size: usize) {
        if new_size >= old_size {
            self.did_allocate(new_size - old_size);
        } else {
            self.did_free(old_size - new_size);
        }
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed) as usize
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed) as usize
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_counter_withdraw_deposit() {
        let c = Counter::new(100);
        assert!(c.withdraw(60));
        assert!(!c.withdraw(41));
        assert_eq!(c.value(), 40);
        c.deposit(60);
        assert_eq!(c.value(), 100);
        assert!(c.withdraw(100));
        assert_eq!(c.value(), 0);
        assert!(c.withdraw(0));
    }

    #[test]
    fn test_counter_concurrent_withdraw() {
        let c = Arc::new(Counter::new(1000));
        let threads = (0..8)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || (0..200).filter(|_| c.withdraw(1)).count())
            })
            .collect::<Vec<_>>();
        let total: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();
        assert_eq!(total, 1000);
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn test_usage_stats() {
        let stats = UsageStats::new();
        stats.did_allocate(128);
        stats.did_allocate(64);
        assert_eq!(stats.allocated(), 192);
        stats.did_reallocate(128, 64);
        assert_eq!(stats.allocated(), 128);
        stats.did_free(128);
        assert_eq!(stats.allocated(), 0);
        assert_eq!(stats.peak(), 192);
    }
}
