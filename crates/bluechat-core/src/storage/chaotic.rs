//! Chaotic storage wrapper for fault injection testing.
//!
//! Delegates to an underlying storage but fails operations at a configured
//! rate. Used to check that a failed write never leaves the engine's memory
//! ahead of what is persisted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bluechat_proto::Identity;

use super::{Storage, StorageError};
use crate::session::ChatSession;

/// Storage wrapper that randomly injects I/O failures.
///
/// The RNG and failure rate are shared between clones, so a test can keep a
/// handle and change the rate while the service owns another clone.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    chaos: Arc<Mutex<Chaos>>,
}

struct Chaos {
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: ChaoticRng,
    operation_count: usize,
    injected_failures: usize,
}

/// Linear congruential generator; chaos runs are reproducible per seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Wrap `inner` with the default seed.
    ///
    /// `failure_rate` is clamped to [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            chaos: Arc::new(Mutex::new(Chaos {
                failure_rate: failure_rate.clamp(0.0, 1.0),
                rng: ChaoticRng { state: seed },
                operation_count: 0,
                injected_failures: 0,
            })),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Change the failure rate for all clones.
    pub fn set_failure_rate(&self, failure_rate: f64) {
        self.lock().failure_rate = failure_rate.clamp(0.0, 1.0);
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.lock().operation_count
    }

    /// Number of operations that were failed on purpose.
    pub fn injected_failures(&self) -> usize {
        self.lock().injected_failures
    }

    fn lock(&self) -> MutexGuard<'_, Chaos> {
        self.chaos.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn roll(&self) -> Result<(), StorageError> {
        let mut chaos = self.lock();
        chaos.operation_count += 1;
        let failure_rate = chaos.failure_rate;
        if chaos.rng.next() < failure_rate {
            chaos.injected_failures += 1;
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn load_identity(&self) -> Result<Option<Identity>, StorageError> {
        self.roll()?;
        self.inner.load_identity()
    }

    fn store_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.store_identity(identity)
    }

    fn load_sessions(&self) -> Result<Vec<ChatSession>, StorageError> {
        self.roll()?;
        self.inner.load_sessions()
    }

    fn store_sessions(&self, sessions: &[ChatSession]) -> Result<(), StorageError> {
        self.roll()?;
        self.inner.store_sessions(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn zero_rate_never_fails() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        for _ in 0..100 {
            storage.store_sessions(&[]).unwrap();
        }
        assert_eq!(storage.operation_count(), 100);
        assert_eq!(storage.injected_failures(), 0);
    }

    #[test]
    fn full_rate_always_fails_without_touching_inner() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 1.0);
        assert!(matches!(storage.store_sessions(&[]), Err(StorageError::Io(_))));
        assert_eq!(storage.inner().session_writes(), 0);
    }

    #[test]
    fn rate_change_is_shared_between_clones() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 1.0);
        let handle = storage.clone();
        handle.set_failure_rate(0.0);
        assert!(storage.store_sessions(&[]).is_ok());
    }

    #[test]
    fn same_seed_same_failures() {
        let run = |seed| {
            let storage = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, seed);
            (0..64).map(|_| storage.store_sessions(&[]).is_err()).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}
