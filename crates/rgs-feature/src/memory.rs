//! Cross-invocation memory
//!
//! Two sidecar channels ride in the ledger as ordinary features:
//!
//! ```text
//!   StatefulMap   { "1.000": {..}, "2.000": {..} }   previous round, same stake
//!   StatelessMap  {..}                               previous step, same round
//! ```
//!
//! Effects read a bag, change it and stash it in their parameters under a
//! reserved key. Triggering the map type itself writes the stash (or the
//! unchanged previous map) to the ledger, where the next invocation finds it.

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{FeatureError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic};
use crate::params::{Params, STATEFUL_STASH, STATELESS_STASH};
use crate::state::FeatureState;

pub const STATEFUL_MAP: &str = "StatefulMap";
pub const STATELESS_MAP: &str = "StatelessMap";

/// Which memory channel an effect uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stateful,
    Stateless,
}

impl Channel {
    /// Parse a `CounterMemory` or `StickyMemory` parameter value
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "stateful" => Some(Self::Stateful),
            "stateless" => Some(Self::Stateless),
            _ => None,
        }
    }

    pub fn read(self, state: &FeatureState, params: &Params) -> FeatureResult<Params> {
        match self {
            Self::Stateful => stateful_map(state, params),
            Self::Stateless => stateless_map(state, params),
        }
    }

    pub fn stash(self, params: &mut Params, map: Params) {
        let key = match self {
            Self::Stateful => STATEFUL_STASH,
            Self::Stateless => STATELESS_STASH,
        };
        params.set(key, map);
    }
}

fn unwired() -> FeatureError {
    FeatureError::Logic("stateful memory used on a state without a stateful link".to_string())
}

/// Every stake namespace in the previous round's stateful map
fn stateful_namespaces(previous: &FeatureState) -> FeatureResult<Params> {
    match previous.last_feature(STATEFUL_MAP) {
        Some(feature) => feature.data(),
        None => Ok(Params::new()),
    }
}

/// Stateful memory of the current stake.
///
/// A pending stash wins over the previous round. No prior memory gives an
/// empty bag; a state without a stateful link is a logic error.
pub fn stateful_map(state: &FeatureState, params: &Params) -> FeatureResult<Params> {
    if let Some(stash) = params.opt_bag(STATEFUL_STASH)? {
        return Ok(stash);
    }
    let previous = state.stateful().ok_or_else(unwired)?;
    Ok(stateful_namespaces(previous)?
        .opt_bag(&state.stake_key())?
        .unwrap_or_default())
}

/// Stateless memory of the current round; empty when there is no previous step
pub fn stateless_map(state: &FeatureState, params: &Params) -> FeatureResult<Params> {
    if let Some(stash) = params.opt_bag(STATELESS_STASH)? {
        return Ok(stash);
    }
    match state.stateless().and_then(|prev| prev.last_feature(STATELESS_MAP)) {
        Some(feature) => feature.data(),
        None => Ok(Params::new()),
    }
}

/// Write-back of the stateful channel
#[derive(Default)]
pub struct StatefulMap;

impl FeatureLogic for StatefulMap {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let previous = state.stateful().ok_or_else(unwired)?;
        let mut namespaces = stateful_namespaces(previous)?;
        let key = state.stake_key();

        let current = match params.opt_bag(STATEFUL_STASH)? {
            Some(stash) => stash,
            None => namespaces.opt_bag(&key)?.unwrap_or_default(),
        };
        if current.is_empty() && namespaces.is_empty() {
            return Ok(());
        }

        log::debug!("Stateful memory at stake {}: {} keys", key, current.len());
        namespaces.set(key, current);
        state.record(def, &namespaces)
    }
}

impl FeatureKind for StatefulMap {
    const TAG: &'static str = STATEFUL_MAP;
    type Data = Params;
}

/// Write-back of the stateless channel
#[derive(Default)]
pub struct StatelessMap;

impl FeatureLogic for StatelessMap {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let current = stateless_map(state, params)?;
        if current.is_empty() {
            return Ok(());
        }
        log::debug!("Stateless memory: {} keys", current.len());
        state.record(def, &current)
    }
}

impl FeatureKind for StatelessMap {
    const TAG: &'static str = STATELESS_MAP;
    type Data = Params;
}
