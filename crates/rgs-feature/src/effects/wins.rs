//! Win producers and multipliers

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{FeatureError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic};
use crate::params::Params;
use crate::registry::FeatureRegistry;
use crate::state::{FeatureState, Win};

pub(crate) fn register(registry: &mut FeatureRegistry) {
    registry.register_kind::<EvaluateWins>();
    registry.register_kind::<Multiplier>();
    registry.register_kind::<ApplyMultiplier>();
    registry.register_kind::<InstantPrize>();
    registry.register_kind::<ScatterPay>();
}

/// `single` as a float, or one of `choices` drawn by `weights`
fn float_choice(
    act: &mut Activation<'_>,
    params: &Params,
    single: &str,
    choices: &str,
    weights: &str,
) -> FeatureResult<f64> {
    match params.opt_floats(choices)? {
        Some(values) => {
            let weights = params.opt_weights(weights)?;
            Ok(values[act.pick(weights.as_deref(), values.len())?])
        }
        None => Ok(params.float(single)?),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Evaluated {
    pub count: usize,
    pub total: f64,
}

/// Runs the injected evaluator on the working grid (`Paytable` overrides the
/// state's paytable)
#[derive(Default)]
pub struct EvaluateWins;

impl FeatureLogic for EvaluateWins {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let evaluator = state
            .evaluator()
            .cloned()
            .ok_or_else(|| FeatureError::Logic("no win evaluator on the state".to_string()))?;
        let paytable = match params.opt_string("Paytable")? {
            Some(name) => Some(name),
            None => state.paytable.clone(),
        };

        let wins = evaluator.evaluate(&state.grid, paytable.as_deref());
        if wins.is_empty() {
            return Ok(());
        }

        let evaluated = Evaluated {
            count: wins.len(),
            total: wins.iter().map(|w| w.multiplier).sum(),
        };
        state.wins.extend(wins);
        state.record(def, &evaluated)
    }
}

impl FeatureKind for EvaluateWins {
    const TAG: &'static str = "EvaluateWins";
    type Data = Evaluated;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Multiplied {
    pub multiplier: f64,
    pub total: f64,
}

/// Multiplies the round multiplier by `Multiplier` (or one of
/// `Multipliers` drawn by `MultiplierWeights`)
#[derive(Default)]
pub struct Multiplier;

impl FeatureLogic for Multiplier {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let multiplier = float_choice(act, params, "Multiplier", "Multipliers", "MultiplierWeights")?;
        state.multiplier *= multiplier;
        let total = state.multiplier;
        state.record(def, &Multiplied { multiplier, total })
    }
}

impl FeatureKind for Multiplier {
    const TAG: &'static str = "Multiplier";
    type Data = Multiplied;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AppliedMultiplier {
    pub multiplier: f64,
    pub wins: usize,
}

/// Applies the round multiplier to the wins, or only to wins touching a
/// `MultiplierWildId` cell
#[derive(Default)]
pub struct ApplyMultiplier;

impl FeatureLogic for ApplyMultiplier {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let multiplier = state.multiplier;
        if multiplier == 1.0 || state.wins.is_empty() {
            return Ok(());
        }

        let wilds = match params.opt_symbol("MultiplierWildId")? {
            Some(id) => Some(state.grid.positions_of(id)),
            None => None,
        };
        let mut affected = 0;
        for win in &mut state.wins {
            let applies = wilds
                .as_ref()
                .is_none_or(|w| win.positions.iter().any(|p| w.contains(p)));
            if applies {
                win.multiplier *= multiplier;
                affected += 1;
            }
        }

        if affected == 0 {
            return Ok(());
        }
        state.record(
            def,
            &AppliedMultiplier {
                multiplier,
                wins: affected,
            },
        )
    }
}

impl FeatureKind for ApplyMultiplier {
    const TAG: &'static str = "ApplyMultiplier";
    type Data = AppliedMultiplier;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Prize {
    pub label: String,
    pub multiplier: f64,
}

/// Awards `Prize` (or one of `Prizes` drawn by `PrizeWeights`) as a win
/// labelled `PrizeLabel`
#[derive(Default)]
pub struct InstantPrize;

impl FeatureLogic for InstantPrize {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let multiplier = float_choice(act, params, "Prize", "Prizes", "PrizeWeights")?;
        let label = params.opt_string("PrizeLabel")?.unwrap_or_else(|| "Prize".to_string());
        if multiplier <= 0.0 {
            return Ok(());
        }

        state.wins.push(Win::new(label.clone(), multiplier));
        state.record(def, &Prize { label, multiplier })
    }
}

impl FeatureKind for InstantPrize {
    const TAG: &'static str = "InstantPrize";
    type Data = Prize;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ScatterWin {
    pub count: usize,
    pub multiplier: f64,
}

/// Pays `Pays[n - PayFrom]` for `n` `ScatterId` symbols anywhere (the last
/// entry covers every larger count)
#[derive(Default)]
pub struct ScatterPay;

impl FeatureLogic for ScatterPay {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let scatter = params.symbol("ScatterId")?;
        let pays = params.floats("Pays")?;
        let from = params.uint("PayFrom")?;

        let positions = state.grid.positions_of(scatter);
        let count = positions.len();
        if count < from || pays.is_empty() {
            return Ok(());
        }
        let multiplier = pays[(count - from).min(pays.len() - 1)];
        if multiplier <= 0.0 {
            return Ok(());
        }

        state.wins.push(Win {
            label: "Scatter".to_string(),
            multiplier,
            symbols: vec![scatter],
            positions,
        });
        state.record(def, &ScatterWin { count, multiplier })
    }
}

impl FeatureKind for ScatterPay {
    const TAG: &'static str = "ScatterPay";
    type Data = ScatterWin;
}
