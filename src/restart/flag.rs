//! The shared "engine config is stale" flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Marks that the running engine configuration lags behind the store.
///
/// Any number of mutation paths may call [`RestartFlag::mark_dirty`]; only
/// the restart scheduler calls [`RestartFlag::consume_if_dirty`].
#[derive(Debug, Default)]
pub struct RestartFlag {
    dirty: AtomicBool,
}

impl RestartFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a restart is owed. Idempotent.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    ///
    /// Read and reset happen in one atomic swap, so a concurrent
    /// `mark_dirty` is either observed now or left set for the next call.
    pub fn consume_if_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_clean() {
        let flag = RestartFlag::new();
        assert!(!flag.consume_if_dirty());
    }

    #[test]
    fn test_mark_is_idempotent() {
        let flag = RestartFlag::new();
        flag.mark_dirty();
        flag.mark_dirty();
        assert!(flag.consume_if_dirty());
        assert!(!flag.consume_if_dirty());
    }

    #[test]
    fn test_concurrent_marks_consume_once() {
        let flag = Arc::new(RestartFlag::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let flag = flag.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        flag.mark_dirty();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(flag.consume_if_dirty());
        assert!(!flag.consume_if_dirty());
    }

    #[test]
    fn test_mark_racing_consume_is_never_lost() {
        // Whatever interleaving happens, the final mark must be observed by
        // some consume: either the racing one or the one after the join.
        for _ in 0..200 {
            let flag = Arc::new(RestartFlag::new());
            let marker = {
                let flag = flag.clone();
                thread::spawn(move || flag.mark_dirty())
            };
            let seen_racing = flag.consume_if_dirty();
            marker.join().unwrap();
            let seen_after = flag.consume_if_dirty();
            assert!(seen_racing ^ seen_after);
        }
    }
}
