//! Random sources: the contract every draw goes through

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{RngError, RngResult};

/// A source of uniform integer draws.
///
/// Implemented by pooled production generators ([`crate::PooledRng`]), by
/// [`SeededRng`] for reproducible debug rounds and by [`ScriptedRandom`]
/// when a recorded draw sequence must be replayed exactly.
pub trait RandomSource {
    /// Uniform draw in `[0, n)`
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64>;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64> {
        (**self).rand_from_range(n)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64> {
        (**self).rand_from_range(n)
    }
}

/// Deterministic ChaCha8 generator seeded from a single `u64`.
///
/// Only used when a developer-mode round asks for a fixed seed; production
/// rounds always draw from the pool.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SeededRng {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRng {
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        Ok(self.rng.random_range(0..n))
    }
}

/// Replays a fixed sequence of draws.
///
/// Each call consumes the next recorded value and fails if the sequence is
/// exhausted or the value does not fit the requested range, so a replay
/// against a diverging configuration can never silently produce an outcome.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    draws: Vec<u64>,
    position: usize,
}

impl ScriptedRandom {
    /// Create from recorded draws
    pub fn new(draws: impl Into<Vec<u64>>) -> Self {
        Self {
            draws: draws.into(),
            position: 0,
        }
    }

    /// Number of draws consumed so far
    pub fn consumed(&self) -> usize {
        self.position
    }

    /// Draws not yet consumed
    pub fn remaining(&self) -> usize {
        self.draws.len() - self.position
    }
}

impl RandomSource for ScriptedRandom {
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        let value = *self
            .draws
            .get(self.position)
            .ok_or(RngError::ScriptExhausted(self.position))?;
        if value >= n {
            return Err(RngError::ScriptMismatch { value, range: n });
        }
        self.position += 1;
        Ok(value)
    }
}

/// Wraps another source and records every draw it hands out.
#[derive(Debug)]
pub struct RecordingRandom<R> {
    inner: R,
    draws: Vec<u64>,
}

impl<R: RandomSource> RecordingRandom<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            draws: Vec::new(),
        }
    }

    /// Draws recorded so far, in order
    pub fn draws(&self) -> &[u64] {
        &self.draws
    }

    /// Turn the recording into a script that replays it
    pub fn into_script(self) -> ScriptedRandom {
        ScriptedRandom::new(self.draws)
    }

    /// Release the wrapped source
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: RandomSource> RandomSource for RecordingRandom<R> {
    fn rand_from_range(&mut self, n: u64) -> RngResult<u64> {
        let value = self.inner.rand_from_range(n)?;
        self.draws.push(value);
        Ok(value)
    }
}
