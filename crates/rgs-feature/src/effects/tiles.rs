//! Grid mutators

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{ConfigError, DataError, FeatureError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic};
use crate::grid::Symbol;
use crate::params::{Params, POSITION, POSITIONS, TILE_ID};
use crate::registry::FeatureRegistry;
use crate::state::{FeatureState, Phase};

use super::reels::strip_symbol;

pub(crate) fn register(registry: &mut FeatureRegistry) {
    registry.register_kind::<TileExpansion>();
    registry.register_kind::<ExpandingWild>();
    registry.register_kind::<ExpandingSymbols>();
    registry.register_kind::<ReplaceTile>();
    registry.register_kind::<RandomWilds>();
    registry.register_kind::<MysterySymbol>();
    registry.register_kind::<ApplyPattern>();
    registry.register_kind::<Cascade>();
}

/// Cells painted with one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Painted {
    pub positions: Vec<usize>,
    pub tile_id: Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
    pub tile_id: Symbol,
}

/// Covers the `W x H` block at reel `X`, row `Y` with `TileId`
#[derive(Default)]
pub struct TileExpansion;

impl FeatureLogic for TileExpansion {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let tile = Tile {
            x: params.uint("X")?,
            y: params.uint("Y")?,
            w: params.uint("W")?,
            h: params.uint("H")?,
            tile_id: params.symbol(TILE_ID)?,
        };
        if tile.w == 0 || tile.h == 0 {
            return Err(FeatureError::Config(ConfigError::Invalid(format!(
                "empty tile {}x{}",
                tile.w, tile.h
            ))));
        }

        let mut positions = Vec::with_capacity(tile.w * tile.h);
        for reel in tile.x..tile.x + tile.w {
            for row in tile.y..tile.y + tile.h {
                positions.push(state.grid.position(reel, row)?);
            }
        }
        state.grid.set_all(&positions, tile.tile_id)?;
        state.record(def, &tile)
    }
}

impl FeatureKind for TileExpansion {
    const TAG: &'static str = "TileExpansion";
    type Data = Tile;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Expansion {
    pub position: usize,
    pub positions: Vec<usize>,
    pub tile_id: Symbol,
}

/// Paints `Positions` with `WildId`, recording the triggering `Position`
#[derive(Default)]
pub struct ExpandingWild;

impl FeatureLogic for ExpandingWild {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let expansion = Expansion {
            position: params.uint(POSITION)?,
            positions: params.positions(POSITIONS)?,
            tile_id: params.symbol("WildId")?,
        };
        state.grid.cell(expansion.position)?;
        state.grid.set_all(&expansion.positions, expansion.tile_id)?;
        state.record(def, &expansion)
    }
}

impl FeatureKind for ExpandingWild {
    const TAG: &'static str = "ExpandingWild";
    type Data = Expansion;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ExpandedReels {
    pub reels: Vec<usize>,
    pub tile_id: Symbol,
}

/// Fills every reel showing `ExpandId` with it
#[derive(Default)]
pub struct ExpandingSymbols;

impl FeatureLogic for ExpandingSymbols {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let tile_id = params.symbol("ExpandId")?;
        let mut reels = Vec::new();

        for reel in 0..state.grid.reels() {
            let column = state.grid.reel(reel)?;
            if column.contains(&tile_id) && column.iter().any(|&s| s != tile_id) {
                let positions = state.grid.reel_positions(reel)?;
                state.grid.set_all(&positions, tile_id)?;
                reels.push(reel);
            }
        }

        if reels.is_empty() {
            return Ok(());
        }
        state.record(def, &ExpandedReels { reels, tile_id })
    }
}

impl FeatureKind for ExpandingSymbols {
    const TAG: &'static str = "ExpandingSymbols";
    type Data = ExpandedReels;
}

/// Turns every `ReplaceFrom` symbol into `ReplaceTo`
#[derive(Default)]
pub struct ReplaceTile;

impl FeatureLogic for ReplaceTile {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let from = params.symbol("ReplaceFrom")?;
        let to = params.symbol("ReplaceTo")?;
        let positions = state.grid.positions_of(from);
        if positions.is_empty() || from == to {
            return Ok(());
        }
        state.grid.set_all(&positions, to)?;
        state.record(
            def,
            &Painted {
                positions,
                tile_id: to,
            },
        )
    }
}

impl FeatureKind for ReplaceTile {
    const TAG: &'static str = "ReplaceTile";
    type Data = Painted;
}

/// Drops `WildCount` (or a count drawn from `WildCounts` by `WildWeights`)
/// `RandomWildId` symbols on random cells not holding an `Exclude` symbol
#[derive(Default)]
pub struct RandomWilds;

impl FeatureLogic for RandomWilds {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let tile_id = params.symbol("RandomWildId")?;
        let exclude = params.opt_symbols("Exclude")?.unwrap_or_default();
        let count = match params.opt_positions("WildCounts")? {
            Some(counts) => {
                let weights = params.opt_weights("WildWeights")?;
                counts[act.pick(weights.as_deref(), counts.len())?]
            }
            None => params.uint("WildCount")?,
        };

        let eligible: Vec<usize> = state
            .grid
            .cells()
            .iter()
            .enumerate()
            .filter(|&(_, s)| *s != tile_id && !exclude.contains(s))
            .map(|(p, _)| p)
            .collect();
        if count == 0 || eligible.is_empty() {
            return Ok(());
        }

        let mut positions = act.sample(&eligible, count)?;
        positions.sort_unstable();
        state.grid.set_all(&positions, tile_id)?;
        state.record(def, &Painted { positions, tile_id })
    }
}

impl FeatureKind for RandomWilds {
    const TAG: &'static str = "RandomWilds";
    type Data = Painted;
}

/// Reveals every `MysteryId` cell as one symbol drawn from `Symbols`
/// (weighted by `SymbolWeights`)
#[derive(Default)]
pub struct MysterySymbol;

impl FeatureLogic for MysterySymbol {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let mystery = params.symbol("MysteryId")?;
        let symbols = params.symbols("Symbols")?;
        let weights = params.opt_weights("SymbolWeights")?;

        let positions = state.grid.positions_of(mystery);
        if positions.is_empty() {
            return Ok(());
        }

        let tile_id = symbols[act.pick(weights.as_deref(), symbols.len())?];
        state.grid.set_all(&positions, tile_id)?;
        state.record(def, &Painted { positions, tile_id })
    }
}

impl FeatureKind for MysterySymbol {
    const TAG: &'static str = "MysterySymbol";
    type Data = Painted;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AppliedPattern {
    pub index: usize,
    pub positions: Vec<usize>,
    pub tile_id: Symbol,
}

/// Paints one of `Patterns` (drawn by `PatternWeights`) with `PatternTileId`
#[derive(Default)]
pub struct ApplyPattern;

impl FeatureLogic for ApplyPattern {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let patterns = params.int_lists("Patterns")?;
        let weights = params.opt_weights("PatternWeights")?;
        let tile_id = params.symbol("PatternTileId")?;

        let index = act.pick(weights.as_deref(), patterns.len())?;
        let positions = patterns[index]
            .iter()
            .map(|&p| {
                usize::try_from(p).map_err(|_| {
                    DataError::Malformed(format!("pattern {} has negative position {}", index, p))
                })
            })
            .collect::<Result<Vec<usize>, DataError>>()?;

        state.grid.set_all(&positions, tile_id)?;
        state.record(
            def,
            &AppliedPattern {
                index,
                positions,
                tile_id,
            },
        )
    }
}

impl FeatureKind for ApplyPattern {
    const TAG: &'static str = "ApplyPattern";
    type Data = AppliedPattern;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct CascadeStep {
    pub step: u32,
    pub removed: Vec<usize>,
}

/// Removes winning cells, drops the survivors and refills each reel from
/// the strip above its stop. Schedules a cascade step.
#[derive(Default)]
pub struct Cascade;

impl FeatureLogic for Cascade {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        _params: &mut Params,
    ) -> FeatureResult<()> {
        let removed: BTreeSet<usize> = state
            .wins
            .iter()
            .flat_map(|w| w.positions.iter().copied())
            .collect();
        if removed.is_empty() {
            return Ok(());
        }
        if state.reels.len() != state.grid.reels() || state.stops.len() != state.grid.reels() {
            return Err(FeatureError::Logic(
                "cascade needs the reel strips and stops of the grid".to_string(),
            ));
        }
        for &p in &removed {
            state.grid.cell(p)?;
        }

        // refilled reels need a strip to draw from; check them all before any edit
        let mut refills = Vec::new();
        for reel in 0..state.grid.reels() {
            let positions = state.grid.reel_positions(reel)?;
            let gone = positions.iter().filter(|p| removed.contains(p)).count();
            if gone == 0 {
                continue;
            }
            let len = state.reels[reel].len();
            if len == 0 {
                return Err(DataError::Malformed(format!("reel {} has an empty strip", reel)).into());
            }
            if state.stops[reel] >= len {
                return Err(DataError::Malformed(format!(
                    "reel {} stop {} outside strip of {}",
                    reel, state.stops[reel], len
                ))
                .into());
            }
            refills.push((reel, positions, gone));
        }

        for (reel, positions, gone) in refills {
            let strip = &state.reels[reel];
            let len = strip.len();
            let stop = (state.stops[reel] + len - gone % len) % len;
            let mut column: Vec<Symbol> = (0..gone).map(|i| strip_symbol(strip, stop, i)).collect();
            for &p in &positions {
                if !removed.contains(&p) {
                    column.push(state.grid.get(p)?);
                }
            }

            for (&p, &symbol) in positions.iter().zip(&column) {
                state.grid.set(p, symbol)?;
            }
            state.stops[reel] = stop;
        }

        let removed: Vec<usize> = removed.into_iter().collect();
        state.cascade.step += 1;
        state.cascade.removed = removed.clone();
        state.next_phase = Some(Phase::Cascade);
        log::trace!("cascade step {} removed {}", state.cascade.step, removed.len());

        let step = state.cascade.step;
        state.record(def, &CascadeStep { step, removed })
    }
}

impl FeatureKind for Cascade {
    const TAG: &'static str = "Cascade";
    type Data = CascadeStep;
}
