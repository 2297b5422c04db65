//! Generator pool: lock-free checkout of entropy-seeded generators

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, RngCore, SeedableRng, TryRngCore};
use serde::{Deserialize, Serialize};

use crate::{RandomSource, RngError, RngResult};

/// Pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Generators seeded up front
    pub initial_size: usize,
    /// Interval between idle-generator exercise passes (0 = no exerciser)
    pub exercise_interval_ms: u64,
    /// Upper bound of draws burned per idle generator per pass
    pub exercise_draws: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 8,
            exercise_interval_ms: 250,
            exercise_draws: 16,
        }
    }
}

impl PoolConfig {
    /// Config without the background exerciser (tests, tools)
    pub fn without_exerciser() -> Self {
        Self {
            exercise_interval_ms: 0,
            ..Self::default()
        }
    }
}

/// Seed a fast generator from four 64-bit words of OS entropy.
fn seeded_small_rng() -> RngResult<SmallRng> {
    let mut seed = [0u8; 32];
    for chunk in seed.chunks_exact_mut(8) {
        let word = OsRng
            .try_next_u64()
            .map_err(|e| RngError::Entropy(e.to_string()))?;
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    Ok(SmallRng::from_seed(seed))
}

/// One generator and its ownership flag.
///
/// Whoever wins the `in_use` compare-and-swap owns the cell until it stores
/// `false` again; nothing touches the cell without holding the flag.
struct Slot {
    in_use: AtomicBool,
    rng: UnsafeCell<Option<SmallRng>>,
}

// Access to `rng` is serialized by the `in_use` flag
unsafe impl Sync for Slot {}

impl Slot {
    fn idle(rng: SmallRng) -> Self {
        Self {
            in_use: AtomicBool::new(false),
            rng: UnsafeCell::new(Some(rng)),
        }
    }

    fn checked_out() -> Self {
        Self {
            in_use: AtomicBool::new(true),
            rng: UnsafeCell::new(None),
        }
    }

    fn try_acquire(&self) -> Option<SmallRng> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        // SAFETY: the successful CAS above makes this thread the only owner
        let rng = unsafe { (*self.rng.get()).take() };
        if rng.is_none() {
            self.in_use.store(false, Ordering::Release);
        }
        rng
    }

    fn release(&self, rng: SmallRng) {
        // SAFETY: only the holder of a generator taken from this slot calls
        // release, and `in_use` is still set until the store below
        unsafe {
            *self.rng.get() = Some(rng);
        }
        self.in_use.store(false, Ordering::Release);
    }
}

/// A generator checked out of the pool.
///
/// Dropping the handle returns the generator to the pool.
pub struct PooledRng {
    slot: Arc<Slot>,
    rng: SmallRng,
}

impl RandomSource for PooledRng {
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        Ok(self.rng.random_range(0..n))
    }
}

impl Drop for PooledRng {
    fn drop(&mut self) {
        let rng = std::mem::replace(&mut self.rng, SmallRng::seed_from_u64(0));
        self.slot.release(rng);
    }
}

impl std::fmt::Debug for PooledRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledRng").finish_non_exhaustive()
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub size: usize,
    pub in_use: usize,
    pub created: u64,
    pub exercised: u64,
}

struct Exerciser {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

/// Concurrent pool of independently seeded generators.
///
/// `get()` scans the slots and claims the first idle one with a
/// compare-and-swap on its `in_use` flag. When every slot is checked out a
/// new generator is seeded and appended; that is the only path taking the
/// write lock, so a round never waits for another round's generator.
pub struct RngPool {
    slots: RwLock<Vec<Arc<Slot>>>,
    created: AtomicU64,
    exercised: AtomicU64,
    exerciser: Mutex<Option<Exerciser>>,
}

impl RngPool {
    /// Create a pool and start its exerciser (if configured)
    pub fn new(config: PoolConfig) -> RngResult<Arc<Self>> {
        let mut slots = Vec::with_capacity(config.initial_size);
        for _ in 0..config.initial_size {
            slots.push(Arc::new(Slot::idle(seeded_small_rng()?)));
        }

        let pool = Arc::new(Self {
            slots: RwLock::new(slots),
            created: AtomicU64::new(config.initial_size as u64),
            exercised: AtomicU64::new(0),
            exerciser: Mutex::new(None),
        });

        if config.exercise_interval_ms > 0 {
            let exerciser = Self::spawn_exerciser(
                Arc::downgrade(&pool),
                Duration::from_millis(config.exercise_interval_ms),
                config.exercise_draws.max(1),
            )?;
            *pool.exerciser.lock() = Some(exerciser);
        }

        log::info!("RNG pool ready with {} generators", config.initial_size);
        Ok(pool)
    }

    /// Check out a generator, seeding a new one if all are in use
    pub fn get(&self) -> RngResult<PooledRng> {
        {
            let slots = self.slots.read();
            for slot in slots.iter() {
                if let Some(rng) = slot.try_acquire() {
                    return Ok(PooledRng {
                        slot: Arc::clone(slot),
                        rng,
                    });
                }
            }
        }

        let rng = seeded_small_rng()?;
        let slot = Arc::new(Slot::checked_out());
        let size = {
            let mut slots = self.slots.write();
            slots.push(Arc::clone(&slot));
            slots.len()
        };
        self.created.fetch_add(1, Ordering::Relaxed);
        log::debug!("RNG pool grew to {} generators", size);

        Ok(PooledRng { slot, rng })
    }

    /// Return a generator to the pool
    pub fn put(&self, rng: PooledRng) {
        drop(rng);
    }

    /// Current pool statistics
    pub fn stats(&self) -> PoolStats {
        let slots = self.slots.read();
        PoolStats {
            size: slots.len(),
            in_use: slots
                .iter()
                .filter(|s| s.in_use.load(Ordering::Relaxed))
                .count(),
            created: self.created.load(Ordering::Relaxed),
            exercised: self.exercised.load(Ordering::Relaxed),
        }
    }

    /// Burn a random number of draws on every idle generator.
    ///
    /// Returns how many generators were exercised.
    pub fn exercise(&self, max_draws: u32) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.read().iter().cloned().collect();
        let mut count = 0;

        for slot in slots {
            if let Some(mut rng) = slot.try_acquire() {
                let draws = rng.random_range(1..=max_draws.max(1));
                for _ in 0..draws {
                    rng.next_u64();
                }
                slot.release(rng);
                count += 1;
            }
        }

        self.exercised.fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Stop the exerciser thread and wait for it to exit
    pub fn shutdown(&self) {
        if let Some(exerciser) = self.exerciser.lock().take() {
            let _ = exerciser.shutdown.send(());
            if exerciser.handle.thread().id() != thread::current().id() {
                let _ = exerciser.handle.join();
            }
        }
    }

    fn spawn_exerciser(
        pool: Weak<RngPool>,
        interval: Duration,
        max_draws: u32,
    ) -> RngResult<Exerciser> {
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("rgs-rng-exerciser".into())
            .spawn(move || {
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => match pool.upgrade() {
                            Some(pool) => {
                                pool.exercise(max_draws);
                            }
                            None => break,
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::info!("RNG exerciser exiting");
            })?;

        Ok(Exerciser { shutdown, handle })
    }
}

impl Drop for RngPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
