//! Triggers: look at the grid and fire children with trigger context

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{ConfigError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic};
use crate::grid::Symbol;
use crate::params::{Params, POSITION, POSITIONS};
use crate::registry::FeatureRegistry;
use crate::state::{FeatureState, Phase};

pub(crate) fn register(registry: &mut FeatureRegistry) {
    registry.register_kind::<CountTrigger>();
    registry.register_kind::<SymbolTrigger>();
    registry.register_kind::<AwardFreespins>();
}

/// `TriggerIds` list, or the single `TriggerId`
fn trigger_symbols(params: &Params) -> FeatureResult<Vec<Symbol>> {
    Ok(match params.opt_symbols("TriggerIds")? {
        Some(ids) => ids,
        None => vec![params.symbol("TriggerId")?],
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Triggered {
    pub positions: Vec<usize>,
    pub count: usize,
}

/// Fires the children when at least `MinCount` trigger symbols landed.
///
/// Children see the trigger cells as `Positions` and their number as
/// `TriggerCount`.
#[derive(Default)]
pub struct CountTrigger;

impl FeatureLogic for CountTrigger {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let symbols = trigger_symbols(params)?;
        let min = params.uint("MinCount")?;

        let positions: Vec<usize> = state
            .grid
            .cells()
            .iter()
            .enumerate()
            .filter(|&(_, s)| symbols.contains(s))
            .map(|(p, _)| p)
            .collect();
        let count = positions.len();
        if count < min || count == 0 {
            return Ok(());
        }

        log::trace!("count trigger #{} fired with {}", def.id, count);
        params.set(POSITIONS, positions.clone());
        params.set("TriggerCount", count);
        state.record(def, &Triggered { positions, count })?;
        act.activate_all(def, state, params)
    }
}

impl FeatureKind for CountTrigger {
    const TAG: &'static str = "CountTrigger";
    type Data = Triggered;
}

/// Fires the children once per `TriggerId` cell, with `Position` set to the
/// cell and `Positions` to its whole reel
#[derive(Default)]
pub struct SymbolTrigger;

impl FeatureLogic for SymbolTrigger {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let symbols = trigger_symbols(params)?;
        let positions: Vec<usize> = state
            .grid
            .cells()
            .iter()
            .enumerate()
            .filter(|&(_, s)| symbols.contains(s))
            .map(|(p, _)| p)
            .collect();
        if positions.is_empty() {
            return Ok(());
        }

        state.record(
            def,
            &Triggered {
                count: positions.len(),
                positions: positions.clone(),
            },
        )?;

        for position in positions {
            let (reel, _) = state.grid.cell(position)?;
            let mut context = params.clone();
            context.set(POSITION, position);
            context.set(POSITIONS, state.grid.reel_positions(reel)?);
            act.activate_all(def, state, &mut context)?;
        }
        Ok(())
    }
}

impl FeatureKind for SymbolTrigger {
    const TAG: &'static str = "SymbolTrigger";
    type Data = Triggered;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Award {
    pub spins: usize,
    pub total: u32,
}

/// Grants `Spins` free spins (or a count drawn from `SpinCounts` by
/// `SpinWeights`) and schedules the free-spin phase
#[derive(Default)]
pub struct AwardFreespins;

impl FeatureLogic for AwardFreespins {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let spins = match params.opt_positions("SpinCounts")? {
            Some(counts) => {
                let weights = params.opt_weights("SpinWeights")?;
                counts[act.pick(weights.as_deref(), counts.len())?]
            }
            None => params.uint("Spins")?,
        };
        if spins == 0 {
            return Ok(());
        }

        let award = u32::try_from(spins)
            .map_err(|_| ConfigError::Invalid(format!("{} free spins do not fit a counter", spins)))?;
        state.freespins = state.freespins.saturating_add(award);
        state.next_phase = Some(Phase::Freespin);
        let total = state.freespins;
        state.record(def, &Award { spins, total })
    }
}

impl FeatureKind for AwardFreespins {
    const TAG: &'static str = "AwardFreespins";
    type Data = Award;
}
