//! # rgs-rng: Random number subsystem for the RGS outcome core
//!
//! Every weighted or random decision taken while computing a round routes
//! through this crate.
//!
//! ## Architecture
//!
//! ```text
//! RngPool (shared, Arc)
//!     │
//!     ├── Slot[0..n]  ── AtomicBool in_use + SmallRng (seeded from OsRng)
//!     ├── grow on demand (write lock, only when every slot is checked out)
//!     └── exerciser thread (burns draws on idle slots)
//!           │
//!           v
//!     PooledRng ──> RandomSource ──> rand_from_range / weighted_random_index
//!                                     / random_permutation
//! ```
//!
//! `SeededRng`, `ScriptedRandom` and `RecordingRandom` implement the same
//! [`RandomSource`] contract for forced/debug rounds, audit replays and tests.

mod error;
mod pool;
mod primitives;
mod source;

pub use error::*;
pub use pool::*;
pub use primitives::*;
pub use source::*;
