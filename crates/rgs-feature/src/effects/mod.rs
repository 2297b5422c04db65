//! Built-in effect library
//!
//! ```text
//! activators   Activator · FilterActivator · OrderedActivator · WeightedActivator
//!              ConditionalActivator · ProbabilityActivator · PhaseActivator
//!              RepeatActivator · SetParams
//! reels        ReelStops · WeightedReelset
//! tiles        TileExpansion · ExpandingWild · ExpandingSymbols · ReplaceTile
//!              RandomWilds · MysterySymbol · ApplyPattern · Cascade
//! triggers     CountTrigger · SymbolTrigger · AwardFreespins
//! wins         EvaluateWins · Multiplier · ApplyMultiplier · InstantPrize · ScatterPay
//! progress     Counter · StickySymbols
//! memory       StatefulMap · StatelessMap
//! replay       Play · Replay · ReplayContinue · ReplayAbort
//! ```
//!
//! Effects record a ledger entry only when they change something.

pub mod activators;
pub mod progress;
pub mod reels;
pub mod tiles;
pub mod triggers;
pub mod wins;

use crate::memory::{StatefulMap, StatelessMap};
use crate::registry::FeatureRegistry;
use crate::replay::{Play, Replay, ReplayAbort, ReplayContinue};

/// Register every built-in effect type
pub fn register_builtins(registry: &mut FeatureRegistry) {
    activators::register(registry);
    reels::register(registry);
    tiles::register(registry);
    triggers::register(registry);
    wins::register(registry);
    progress::register(registry);

    registry.register_kind::<StatefulMap>();
    registry.register_kind::<StatelessMap>();

    registry.register_kind::<Play>();
    registry.register_kind::<Replay>();
    registry.register_kind::<ReplayContinue>();
    registry.register_kind::<ReplayAbort>();
}
