//! Progress carried through memory: counters and sticky symbols
//!
//! Both effects read their channel, change the bag and stash it in their
//! parameters. A `StatefulMap`/`StatelessMap` sibling reached under `Collate`
//! writes it to the ledger.

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{ConfigError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic};
use crate::memory::Channel;
use crate::params::Params;
use crate::registry::FeatureRegistry;
use crate::state::FeatureState;

pub(crate) fn register(registry: &mut FeatureRegistry) {
    registry.register_kind::<Counter>();
    registry.register_kind::<StickySymbols>();
}

fn channel(params: &Params, key: &str, default: Channel) -> FeatureResult<Channel> {
    match params.opt_string(key)? {
        Some(name) => Channel::parse(&name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown memory channel `{}`", name)).into()),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Count {
    pub key: String,
    pub value: i64,
    pub reached: bool,
}

/// Accumulates `Increment` (or the number of `CountId` cells) under
/// `CounterKey` in the `CounterMemory` channel.
///
/// Reaching `Target` sets the `ReachedFlag` parameter; `Reset` starts the
/// counter over once it has been reached.
#[derive(Default)]
pub struct Counter;

impl FeatureLogic for Counter {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let channel = channel(params, "CounterMemory", Channel::Stateful)?;
        let key = params.string("CounterKey")?;
        let increment = match params.opt_symbol("CountId")? {
            Some(id) => state.grid.count(id) as i64,
            None => params.opt_int("Increment")?.unwrap_or(1),
        };

        let mut map = channel.read(state, params)?;
        let value = map.opt_int(&key)?.unwrap_or(0).saturating_add(increment);
        let reached = params.opt_int("Target")?.is_some_and(|target| value >= target);

        let reset = reached && params.opt_bool("Reset")?.unwrap_or(false);
        map.set(key.clone(), if reset { 0 } else { value });
        channel.stash(params, map);

        if reached {
            if let Some(flag) = params.opt_string("ReachedFlag")? {
                params.set(flag, true);
            }
        }
        if increment == 0 && !reached {
            return Ok(());
        }
        state.record(
            def,
            &Count {
                key,
                value,
                reached,
            },
        )
    }
}

impl FeatureKind for Counter {
    const TAG: &'static str = "Counter";
    type Data = Count;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Sticky {
    pub applied: Vec<usize>,
    pub positions: Vec<usize>,
    pub tile_id: i32,
}

/// Keeps `StickyId` cells in place: restores the remembered positions, then
/// remembers every `StickyId` cell of the grid under `StickyKey`
#[derive(Default)]
pub struct StickySymbols;

impl FeatureLogic for StickySymbols {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let tile_id = params.symbol("StickyId")?;
        let channel = channel(params, "StickyMemory", Channel::Stateless)?;
        let key = params.opt_string("StickyKey")?.unwrap_or_else(|| "Sticky".to_string());

        let mut map = channel.read(state, params)?;
        let applied = map.opt_positions(&key)?.unwrap_or_default();
        state.grid.set_all(&applied, tile_id)?;

        let positions = state.grid.positions_of(tile_id);
        map.set(key, positions.clone());
        channel.stash(params, map);

        if applied.is_empty() && positions.is_empty() {
            return Ok(());
        }
        state.record(
            def,
            &Sticky {
                applied,
                positions,
                tile_id,
            },
        )
    }
}

impl FeatureKind for StickySymbols {
    const TAG: &'static str = "StickySymbols";
    type Data = Sticky;
}
