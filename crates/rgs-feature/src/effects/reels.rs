//! Grid setup: reel stops and reelset selection

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{ConfigError, FeatureError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic};
use crate::grid::{Grid, Symbol};
use crate::params::Params;
use crate::registry::FeatureRegistry;
use crate::state::FeatureState;

pub(crate) fn register(registry: &mut FeatureRegistry) {
    registry.register_kind::<ReelStops>();
    registry.register_kind::<WeightedReelset>();
}

fn invalid(message: String) -> FeatureError {
    FeatureError::Config(ConfigError::Invalid(message))
}

/// Reel strips from configuration, checked for empty strips and symbol range
pub(crate) fn strips(raw: Vec<Vec<i64>>) -> FeatureResult<Vec<Vec<Symbol>>> {
    raw.into_iter()
        .enumerate()
        .map(|(reel, strip)| {
            if strip.is_empty() {
                return Err(invalid(format!("reel {} has an empty strip", reel)));
            }
            strip
                .into_iter()
                .map(|s| {
                    Symbol::try_from(s)
                        .map_err(|_| invalid(format!("symbol {} on reel {} out of range", s, reel)))
                })
                .collect::<FeatureResult<Vec<Symbol>>>()
        })
        .collect()
}

/// Symbol at `offset` rows below `stop`, wrapping around the strip
pub(crate) fn strip_symbol(strip: &[Symbol], stop: usize, offset: usize) -> Symbol {
    strip[(stop + offset) % strip.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Stops {
    pub stops: Vec<usize>,
}

/// Spins the reels: one uniform stop per strip in `Reels`, `Rows` visible
#[derive(Default)]
pub struct ReelStops;

impl FeatureLogic for ReelStops {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let reels = strips(params.int_lists("Reels")?)?;
        let rows = params.uint("Rows")?;
        if rows == 0 {
            return Err(invalid("Rows must be positive".to_string()));
        }

        let stops = match params.opt_positions("ForceStops")? {
            Some(forced) => {
                if forced.len() != reels.len() {
                    return Err(invalid(format!(
                        "{} forced stops for {} reels",
                        forced.len(),
                        reels.len()
                    )));
                }
                if let Some((reel, &stop)) = forced
                    .iter()
                    .enumerate()
                    .find(|&(reel, &stop)| stop >= reels[reel].len())
                {
                    return Err(invalid(format!("forced stop {} past reel {}", stop, reel)));
                }
                forced
            }
            None => {
                let mut drawn = Vec::with_capacity(reels.len());
                for strip in &reels {
                    drawn.push(act.rand_from_range(strip.len() as u64)? as usize);
                }
                drawn
            }
        };

        let columns: Vec<Vec<Symbol>> = reels
            .iter()
            .zip(&stops)
            .map(|(strip, &stop)| (0..rows).map(|row| strip_symbol(strip, stop, row)).collect())
            .collect();
        let grid = Grid::from_reels(columns)?;

        state.source_grid = grid.clone();
        state.grid = grid;
        state.reels = reels;
        state.stops = stops.clone();
        state.record(def, &Stops { stops })
    }
}

impl FeatureKind for ReelStops {
    const TAG: &'static str = "ReelStops";
    type Data = Stops;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ReelsetChoice {
    pub name: String,
    pub index: usize,
}

/// Draws one of `Reelsets` (`{Name, Weight, Reels}`) and hands its `Reels`
/// to the children
#[derive(Default)]
pub struct WeightedReelset;

impl FeatureLogic for WeightedReelset {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let reelsets = params.bags("Reelsets")?;
        let mut weights = Vec::with_capacity(reelsets.len());
        for set in &reelsets {
            weights.push(set.uint("Weight")? as u64);
        }

        let index = act.pick(Some(weights.as_slice()), reelsets.len())?;
        let chosen = &reelsets[index];
        let name = chosen.string("Name")?;
        let reels = chosen.int_lists("Reels")?;

        log::trace!("reelset {} ({})", name, index);
        state.reelset = Some(name.clone());
        params.set("Reels", reels);
        state.record(def, &ReelsetChoice { name, index })?;
        act.activate_all(def, state, params)
    }
}

impl FeatureKind for WeightedReelset {
    const TAG: &'static str = "WeightedReelset";
    type Data = ReelsetChoice;
}
