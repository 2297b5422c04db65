//! # rgs-feature: Feature activation engine for the RGS outcome core
//!
//! A game is a tree of feature definitions loaded from YAML/JSON. Playing a
//! round walks the tree: every node names a registered effect type, receives
//! its parameters merged over the caller's, mutates the round state and
//! records what it did in the ledger.
//!
//! ## Architecture
//!
//! ```text
//!   FeatureDef tree (YAML/JSON)          FeatureRegistry (tag → create/decode)
//!            │                                    │
//!            ▼                                    ▼
//!   Engine::play ──► Activation ──► FeatureLogic::trigger(act, def, state, params)
//!       │   rgs-rng pool / seed         │
//!       │                               ├── grid edits      (tiles, reels)
//!       │                               ├── wins            (wins)
//!       │                               ├── children        (activators, triggers)
//!       │                               └── memory          (StatefulMap, StatelessMap)
//!       ▼
//!   FeatureState ──► ledger: Vec<Feature>  ──► outcome() bytes
//!       ├── stateful link   previous round (same stake namespace)
//!       ├── stateless link  previous step of this round
//!       └── next chain      precomputed replay steps
//! ```
//!
//! Randomness only enters through [`rgs_rng::RandomSource`]; replaying the
//! recorded draws reproduces the outcome byte for byte.

pub mod config;
pub mod definition;
pub mod effects;
pub mod engine;
pub mod error;
pub mod feature;
pub mod grid;
pub mod memory;
pub mod params;
pub mod registry;
pub mod replay;
pub mod state;

pub use config::{EngineConfig, DEVELOPER_MODE_ENV};
pub use definition::FeatureDef;
pub use engine::{Activation, Engine};
pub use error::{ConfigError, DataError, ErrorKind, FeatureError, FeatureResult, ParamError};
pub use feature::{Feature, FeatureKind, FeatureLogic, NoData};
pub use grid::{Grid, Symbol, EMPTY};
pub use memory::Channel;
pub use params::Params;
pub use registry::{global, install, FeatureRegistry, Registration, RegistryError};
pub use state::{
    CascadeInfo, FeatureState, Outcome, Phase, ReplayInfo, ReplayPhase, Win, WinEvaluator,
};

pub use rgs_rng;
