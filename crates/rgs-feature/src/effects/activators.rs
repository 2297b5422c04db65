//! Structural effects: decide which children fire

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::{ConfigError, FeatureError, FeatureResult};
use crate::feature::{FeatureKind, FeatureLogic, NoData};
use crate::params::Params;
use crate::registry::FeatureRegistry;
use crate::state::{FeatureState, Phase};

pub(crate) fn register(registry: &mut FeatureRegistry) {
    registry.register_kind::<Activator>();
    registry.register_kind::<FilterActivator>();
    registry.register_kind::<OrderedActivator>();
    registry.register_kind::<WeightedActivator>();
    registry.register_kind::<ConditionalActivator>();
    registry.register_kind::<ProbabilityActivator>();
    registry.register_kind::<PhaseActivator>();
    registry.register_kind::<RepeatActivator>();
    registry.register_kind::<SetParams>();
}

/// Fires every child in order
#[derive(Default)]
pub struct Activator;

impl FeatureLogic for Activator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        act.activate_all(def, state, params)
    }
}

impl FeatureKind for Activator {
    const TAG: &'static str = "Activator";
    type Data = NoData;
}

/// Fires the children listed in `Indices`, in definition order
#[derive(Default)]
pub struct FilterActivator;

impl FeatureLogic for FilterActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let indices = params.positions("Indices")?;
        act.activate_filtered(def, state, params, |i, _, _, _| indices.contains(&i))
    }
}

impl FeatureKind for FilterActivator {
    const TAG: &'static str = "FilterActivator";
    type Data = NoData;
}

/// Fires children in the order given by `Order`, resolved against `Names`
#[derive(Default)]
pub struct OrderedActivator;

impl FeatureLogic for OrderedActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let names = params.strings("Names")?;
        let order = params.strings("Order")?;
        if names.len() != def.features.len() {
            return Err(FeatureError::Config(ConfigError::Invalid(format!(
                "{} names for {} children",
                names.len(),
                def.features.len()
            ))));
        }
        act.activate_ordered(def, state, params, &order, &names)
    }
}

impl FeatureKind for OrderedActivator {
    const TAG: &'static str = "OrderedActivator";
    type Data = NoData;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Choice {
    pub index: usize,
}

/// Fires one child drawn by `Weights` (uniform when absent)
#[derive(Default)]
pub struct WeightedActivator;

impl FeatureLogic for WeightedActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let index = match params.opt_uint("ForceIndex")? {
            Some(forced) => {
                act.activate_index(def, state, params, forced)?;
                forced
            }
            None => {
                let weights = params.opt_weights("Weights")?;
                act.activate_weighted(def, state, params, weights.as_deref())?
            }
        };
        state.record(def, &Choice { index })
    }
}

impl FeatureKind for WeightedActivator {
    const TAG: &'static str = "WeightedActivator";
    type Data = Choice;
}

/// Fires all children when `ConditionFlag` is present in the bag (absent,
/// with `ConditionPresent: false`)
#[derive(Default)]
pub struct ConditionalActivator;

impl FeatureLogic for ConditionalActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let flag = params.string("ConditionFlag")?;
        let present = params.opt_bool("ConditionPresent")?.unwrap_or(true);
        act.activate_conditional(def, state, params, &flag, present)?;
        Ok(())
    }
}

impl FeatureKind for ConditionalActivator {
    const TAG: &'static str = "ConditionalActivator";
    type Data = NoData;
}

/// Fires all children with a per-ten-thousand `Probability`
#[derive(Default)]
pub struct ProbabilityActivator;

impl FeatureLogic for ProbabilityActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let probability = params.int("Probability")?;
        act.activate_probability(def, state, params, probability)?;
        Ok(())
    }
}

impl FeatureKind for ProbabilityActivator {
    const TAG: &'static str = "ProbabilityActivator";
    type Data = NoData;
}

/// Fires all children when the state's phase is one of `Phases`
#[derive(Default)]
pub struct PhaseActivator;

impl FeatureLogic for PhaseActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let phases = params
            .strings("Phases")?
            .iter()
            .map(|name| {
                Phase::parse(name).ok_or_else(|| {
                    FeatureError::Config(ConfigError::Invalid(format!("unknown phase `{}`", name)))
                })
            })
            .collect::<FeatureResult<Vec<Phase>>>()?;

        if phases.contains(&state.phase) {
            act.activate_all(def, state, params)?;
        }
        Ok(())
    }
}

impl FeatureKind for PhaseActivator {
    const TAG: &'static str = "PhaseActivator";
    type Data = NoData;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Repeats {
    pub count: usize,
}

/// Fires all children `Count` times, or a count drawn from `Counts`
/// weighted by `CountWeights`
#[derive(Default)]
pub struct RepeatActivator;

impl FeatureLogic for RepeatActivator {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let count = match params.opt_positions("Counts")? {
            Some(counts) => {
                let weights = params.opt_weights("CountWeights")?;
                let count = counts[act.pick(weights.as_deref(), counts.len())?];
                state.record(def, &Repeats { count })?;
                count
            }
            None => params.uint("Count")?,
        };

        for _ in 0..count {
            act.activate_all(def, state, params)?;
        }
        Ok(())
    }
}

impl FeatureKind for RepeatActivator {
    const TAG: &'static str = "RepeatActivator";
    type Data = Repeats;
}

/// Writes `Values` into the bag (visible to later siblings under collate)
#[derive(Default)]
pub struct SetParams;

impl FeatureLogic for SetParams {
    fn trigger(
        &mut self,
        _act: &mut Activation<'_>,
        _def: &FeatureDef,
        _state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let values = params.bag("Values")?;
        params.extend_from(&values);
        Ok(())
    }
}

impl FeatureKind for SetParams {
    const TAG: &'static str = "SetParams";
    type Data = NoData;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tiles::Painted;
    use rgs_rng::ScriptedRandom;
    use serde_json::json;

    /// Parent of `n` children; child `i` turns empty cells into `i`
    fn parent(tag: &str, n: usize, params: serde_json::Value) -> FeatureDef {
        let mut def = FeatureDef::new(1, tag)
            .with_params(Params::from_value(params).unwrap());
        for i in 0..n {
            def = def.with_child(
                FeatureDef::new(10 + i as u32, "ReplaceTile")
                    .with_param("ReplaceFrom", -1)
                    .with_param("ReplaceTo", i as i64),
            );
        }
        def
    }

    fn run(def: &FeatureDef, draws: Vec<u64>, state: &mut FeatureState, params: &mut Params) {
        let registry = FeatureRegistry::builtin();
        let mut rng = ScriptedRandom::new(draws);
        let mut act = Activation::new(&registry, &mut rng);
        act.trigger(def, state, params).unwrap();
    }

    fn fired(state: &FeatureState) -> Vec<u32> {
        state
            .ledger
            .iter()
            .filter(|f| f.is("ReplaceTile"))
            .map(|f| f.id)
            .collect()
    }

    #[test]
    fn test_filter_activator() {
        let def = parent("FilterActivator", 3, json!({"Indices": [2, 0]}));
        let mut state = FeatureState::new(1, 1);
        run(&def, vec![], &mut state, &mut Params::new());
        // definition order, not list order; the second one finds nothing left to replace
        assert_eq!(fired(&state), vec![10]);
        assert_eq!(state.grid.get(0).unwrap(), 0);
    }

    #[test]
    fn test_ordered_activator() {
        let def = parent(
            "OrderedActivator",
            3,
            json!({"Names": ["a", "b", "c"], "Order": ["c", "a"]}),
        );
        let mut state = FeatureState::new(1, 1);
        run(&def, vec![], &mut state, &mut Params::new());
        assert_eq!(fired(&state), vec![12]);
        assert_eq!(state.grid.get(0).unwrap(), 2);
    }

    #[test]
    fn test_weighted_activator_records_choice() {
        let def = parent("WeightedActivator", 3, json!({"Weights": [1, 0, 1]}));
        let mut state = FeatureState::new(1, 1);
        run(&def, vec![1], &mut state, &mut Params::new());

        assert_eq!(fired(&state), vec![12]);
        let choice: Choice = state.last_feature("WeightedActivator").unwrap().data().unwrap();
        assert_eq!(choice, Choice { index: 2 });
    }

    #[test]
    fn test_weighted_activator_forced_index() {
        let def = parent("WeightedActivator", 3, json!({"ForceIndex": 1}));
        let mut state = FeatureState::new(1, 1);
        // no draws available: forcing must not consume any
        run(&def, vec![], &mut state, &mut Params::new());
        assert_eq!(fired(&state), vec![11]);
    }

    #[test]
    fn test_conditional_and_phase() {
        let def = parent("ConditionalActivator", 1, json!({
            "ConditionFlag": "Bonus",
            "ConditionPresent": false
        }));
        let mut state = FeatureState::new(1, 1);
        run(&def, vec![], &mut state, &mut Params::new().with("Bonus", true));
        assert!(fired(&state).is_empty());
        run(&def, vec![], &mut state, &mut Params::new());
        assert_eq!(fired(&state), vec![10]);

        let def = parent("PhaseActivator", 1, json!({"Phases": ["freespin", "respin"]}));
        let mut state = FeatureState::new(1, 1);
        run(&def, vec![], &mut state, &mut Params::new());
        assert!(fired(&state).is_empty());
        let mut state = FeatureState::new(1, 1).with_phase(Phase::Freespin);
        run(&def, vec![], &mut state, &mut Params::new());
        assert_eq!(fired(&state), vec![10]);
    }

    #[test]
    fn test_unknown_phase_is_config_error() {
        let def = parent("PhaseActivator", 1, json!({"Phases": ["bogus"]}));
        let registry = FeatureRegistry::builtin();
        let mut rng = ScriptedRandom::default();
        let mut act = Activation::new(&registry, &mut rng);
        let err = act
            .trigger(&def, &mut FeatureState::new(1, 1), &mut Params::new())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_repeat_activator_draws_count() {
        let def = parent("RepeatActivator", 1, json!({"Counts": [1, 3], "CountWeights": [1, 1]}));
        let mut state = FeatureState::new(3, 1);
        run(&def, vec![1], &mut state, &mut Params::new());

        let repeats: Repeats = state.last_feature("RepeatActivator").unwrap().data().unwrap();
        assert_eq!(repeats.count, 3);
        // only the first pass finds empty cells
        assert_eq!(fired(&state), vec![10]);
        assert_eq!(state.grid.count(0), 3);
    }

    #[test]
    fn test_set_params_needs_collate_to_reach_siblings() {
        let def = FeatureDef::new(1, "Activator")
            .with_child(FeatureDef::new(2, "SetParams").with_param("Values", json!({"Triggered": true})))
            .with_child(
                FeatureDef::new(3, "ConditionalActivator")
                    .with_param("ConditionFlag", "Triggered")
                    .with_child(
                        FeatureDef::new(4, "ReplaceTile")
                            .with_param("ReplaceFrom", -1)
                            .with_param("ReplaceTo", 5),
                    ),
            );

        let mut state = FeatureState::new(1, 1);
        run(&def, vec![], &mut state, &mut Params::new());
        assert!(state.ledger.is_empty());

        let mut state = FeatureState::new(1, 1);
        run(&def, vec![], &mut state, &mut Params::new().with("Collate", true));
        let painted: Painted = state.last_feature("ReplaceTile").unwrap().data().unwrap();
        assert_eq!(painted.tile_id, 5);
    }
}
