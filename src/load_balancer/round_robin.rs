//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector that skips dead backends.
///
/// Every call advances a shared cursor and scans the ring once from
/// `cursor % len`. When the scan lands past the immediate candidate, the
/// cursor jumps to the chosen slot so the next call resumes from there
/// instead of walking the same dead entries again.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the ring at a given cursor value.
    pub fn starting_at(cursor: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(cursor),
        }
    }

    /// Current raw cursor value.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let len = backends.len();
        let next = self.cursor.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        let start = next % len;

        for offset in 0..len {
            let index = (start + offset) % len;
            let backend = &backends[index];
            if !backend.is_live() {
                continue;
            }
            if index != next {
                // Lose gracefully to a concurrent caller that already moved on.
                let _ = self.cursor.compare_exchange(
                    next,
                    index,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                );
            }
            return Some(backend.clone());
        }
        None
    }
}
