//! Activation engine
//!
//! ```text
//!   Engine::play(root, state, params)
//!        │  strip Force* (production)      pooled / seeded generator
//!        ▼
//!   Activation::trigger(def) ──► registry.create(tag)
//!        │                        merged = overlay(def.params, caller)
//!        │                        effect.trigger(act, def, state, merged)
//!        │                        Collate? caller ← merged
//!        ▼
//!   activate_all / filtered / ordered / weighted / conditional / probability
//! ```
//!
//! A round pass is single-threaded and synchronous. The first error aborts
//! the pass and carries the tag and id of the innermost failing feature.

use std::sync::Arc;

use rgs_rng::{RandomSource, RngError, RngPool, SeededRng};

use crate::config::EngineConfig;
use crate::definition::FeatureDef;
use crate::error::{ConfigError, FeatureError, FeatureResult};
use crate::params::{Params, FORCE_PREFIX, FORCE_SEED};
use crate::registry::{self, FeatureRegistry};
use crate::state::FeatureState;

/// Per-pass activation context handed to every effect
pub struct Activation<'a> {
    registry: &'a FeatureRegistry,
    rng: &'a mut dyn RandomSource,
    triggered: usize,
}

fn weight_error(e: RngError) -> FeatureError {
    match e {
        RngError::ZeroWeight | RngError::WeightOverflow => {
            FeatureError::Config(ConfigError::Invalid(format!("bad weights: {}", e)))
        }
        other => FeatureError::Rng(other),
    }
}

impl<'a> Activation<'a> {
    pub fn new(registry: &'a FeatureRegistry, rng: &'a mut dyn RandomSource) -> Self {
        Self {
            registry,
            rng,
            triggered: 0,
        }
    }

    pub fn registry(&self) -> &FeatureRegistry {
        self.registry
    }

    /// Number of features triggered so far in this pass
    pub fn triggered(&self) -> usize {
        self.triggered
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DRAWS
    // ═══════════════════════════════════════════════════════════════════════

    /// Uniform draw in `[0, n)`
    pub fn rand_from_range(&mut self, n: u64) -> FeatureResult<u64> {
        Ok(self.rng.rand_from_range(n)?)
    }

    /// Weighted index; zero or overflowing weights are a configuration error
    pub fn weighted_index(&mut self, weights: &[u64]) -> FeatureResult<usize> {
        rgs_rng::weighted_random_index(&mut *self.rng, weights).map_err(weight_error)
    }

    /// Index under optional weights; uniform over `len` when absent
    pub fn pick(&mut self, weights: Option<&[u64]>, len: usize) -> FeatureResult<usize> {
        match weights {
            Some(w) if w.len() != len => Err(FeatureError::Config(ConfigError::Invalid(format!(
                "{} weights for {} choices",
                w.len(),
                len
            )))),
            Some(w) => self.weighted_index(w),
            None => {
                if len == 0 {
                    return Err(FeatureError::Config(ConfigError::Invalid(
                        "nothing to choose from".to_string(),
                    )));
                }
                Ok(self.rand_from_range(len as u64)? as usize)
            }
        }
    }

    pub fn permutation<T: Clone>(&mut self, items: &[T]) -> FeatureResult<Vec<T>> {
        Ok(rgs_rng::random_permutation(&mut *self.rng, items)?)
    }

    pub fn sample<T: Clone>(&mut self, items: &[T], count: usize) -> FeatureResult<Vec<T>> {
        Ok(rgs_rng::random_sample(&mut *self.rng, items, count)?)
    }

    /// Per-ten-thousand chance: a draw under 10000 below `probability`
    pub fn chance(&mut self, probability: i64) -> FeatureResult<bool> {
        let draw = self.rand_from_range(10_000)?;
        Ok((draw as i64) < probability)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACTIVATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Trigger a single definition against the caller's bag
    pub fn trigger(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let context = |e: FeatureError| e.in_feature(&def.type_tag, def.id);

        let mut feature = self
            .registry
            .create(&def.type_tag)
            .map_err(|e| context(e.into()))?;
        let collate = params.is_collate().map_err(|e| context(e.into()))?;
        let mut merged = Params::overlay(&def.params, params);

        log::trace!("trigger {} #{} (collate: {})", def.type_tag, def.id, collate);
        self.triggered += 1;
        feature
            .trigger(self, def, state, &mut merged)
            .map_err(context)?;

        if collate {
            *params = merged;
        }
        Ok(())
    }

    /// Trigger every child of `def`, in definition order
    pub fn activate_all(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        for child in &def.features {
            self.trigger(child, state, params)?;
        }
        Ok(())
    }

    /// Trigger the children selected by `predicate(index, child, state, params)`
    pub fn activate_filtered<P>(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
        mut predicate: P,
    ) -> FeatureResult<()>
    where
        P: FnMut(usize, &FeatureDef, &FeatureState, &Params) -> bool,
    {
        for (index, child) in def.features.iter().enumerate() {
            if predicate(index, child, state, params) {
                self.trigger(child, state, params)?;
            }
        }
        Ok(())
    }

    /// Trigger the child at `index` only
    pub fn activate_index(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
        index: usize,
    ) -> FeatureResult<()> {
        if index >= def.features.len() {
            return Err(FeatureError::Config(ConfigError::Invalid(format!(
                "child index {} out of {} children",
                index,
                def.features.len()
            ))));
        }
        self.activate_filtered(def, state, params, |i, _, _, _| i == index)
    }

    /// Trigger children in a caller-supplied order.
    ///
    /// `catalog[i]` names child `i`; each entry of `order` is resolved
    /// against it and that child fires. Unknown names fail the round.
    pub fn activate_ordered(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
        order: &[String],
        catalog: &[String],
    ) -> FeatureResult<()> {
        for name in order {
            let index = catalog
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| FeatureError::Config(ConfigError::UnresolvedName(name.clone())))?;
            self.activate_index(def, state, params, index)?;
        }
        Ok(())
    }

    /// Trigger one child drawn by weight (uniform when `weights` is `None`).
    ///
    /// Returns the drawn index.
    pub fn activate_weighted(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
        weights: Option<&[u64]>,
    ) -> FeatureResult<usize> {
        let index = self.pick(weights, def.features.len())?;
        self.activate_index(def, state, params, index)?;
        Ok(index)
    }

    /// Trigger all children if `flag` is present (or absent, when
    /// `present` is false) in the caller's bag
    pub fn activate_conditional(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
        flag: &str,
        present: bool,
    ) -> FeatureResult<bool> {
        let fire = params.contains(flag) == present;
        if fire {
            self.activate_all(def, state, params)?;
        }
        Ok(fire)
    }

    /// Trigger all children with a per-ten-thousand probability
    pub fn activate_probability(
        &mut self,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
        probability: i64,
    ) -> FeatureResult<bool> {
        let fire = self.chance(probability)?;
        if fire {
            self.activate_all(def, state, params)?;
        }
        Ok(fire)
    }
}

/// Round driver: owns the generator pool and the engine configuration
pub struct Engine<'r> {
    registry: &'r FeatureRegistry,
    pool: Arc<RngPool>,
    config: EngineConfig,
}

impl Engine<'static> {
    /// Engine over the process-wide registry with its own pool
    pub fn new(config: EngineConfig) -> FeatureResult<Self> {
        let pool = RngPool::new(config.pool.clone())?;
        Ok(Engine::with_registry(registry::global(), pool, config))
    }
}

impl<'r> Engine<'r> {
    pub fn with_registry(
        registry: &'r FeatureRegistry,
        pool: Arc<RngPool>,
        config: EngineConfig,
    ) -> Self {
        log::info!(
            "Feature engine ready ({} feature types, developer mode: {})",
            registry.len(),
            config.developer_mode
        );
        Self {
            registry,
            pool,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FeatureRegistry {
        self.registry
    }

    pub fn pool(&self) -> &Arc<RngPool> {
        &self.pool
    }

    /// Play one round with a pooled generator.
    ///
    /// In developer mode a `ForceSeed` parameter switches to a seeded
    /// generator so the round can be reproduced.
    pub fn play(
        &self,
        root: &FeatureDef,
        state: FeatureState,
        params: Params,
    ) -> FeatureResult<FeatureState> {
        let params = self.prepare(params);

        if self.config.developer_mode {
            if let Some(seed) = params.opt_int(FORCE_SEED)? {
                log::debug!("Playing with forced seed {}", seed);
                let mut rng = SeededRng::new(seed as u64);
                return self.run(root, state, params, &mut rng);
            }
        }

        let mut rng = self.pool.get()?;
        self.run(root, state, params, &mut rng)
    }

    /// Play one round with a caller-supplied random source
    pub fn play_with(
        &self,
        root: &FeatureDef,
        state: FeatureState,
        params: Params,
        rng: &mut dyn RandomSource,
    ) -> FeatureResult<FeatureState> {
        let params = self.prepare(params);
        self.run(root, state, params, rng)
    }

    fn run(
        &self,
        root: &FeatureDef,
        mut state: FeatureState,
        mut params: Params,
        rng: &mut dyn RandomSource,
    ) -> FeatureResult<FeatureState> {
        let mut act = Activation::new(self.registry, rng);
        match act.trigger(root, &mut state, &mut params) {
            Ok(()) => {
                log::debug!(
                    "Round complete: {} features triggered, {} recorded, {} wins",
                    act.triggered(),
                    state.ledger.len(),
                    state.wins.len()
                );
                Ok(state)
            }
            Err(e) => {
                log::error!("Round failed: {}", e);
                Err(e)
            }
        }
    }

    /// Strip operator overrides outside developer mode
    fn prepare(&self, mut params: Params) -> Params {
        if !self.config.developer_mode {
            for key in params.remove_where(|k| k.starts_with(FORCE_PREFIX)) {
                log::warn!("Ignoring `{}` outside developer mode", key);
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureKind, FeatureLogic};
    use rgs_rng::{PoolConfig, ScriptedRandom};
    use serde::{Deserialize, Serialize};

    /// Writes `Mark` into its bag and records what it saw
    #[derive(Default)]
    struct Marker;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Seen {
        label: String,
        saw_mark: bool,
    }

    impl FeatureLogic for Marker {
        fn trigger(
            &mut self,
            _act: &mut Activation<'_>,
            def: &FeatureDef,
            state: &mut FeatureState,
            params: &mut Params,
        ) -> FeatureResult<()> {
            let seen = Seen {
                label: params.string("Label")?,
                saw_mark: params.contains("Mark"),
            };
            params.set("Mark", true);
            state.record(def, &seen)
        }
    }

    impl FeatureKind for Marker {
        const TAG: &'static str = "Marker";
        type Data = Seen;
    }

    #[derive(Default)]
    struct Fail;

    impl FeatureLogic for Fail {
        fn trigger(
            &mut self,
            _act: &mut Activation<'_>,
            _def: &FeatureDef,
            _state: &mut FeatureState,
            params: &mut Params,
        ) -> FeatureResult<()> {
            params.int("Missing")?;
            Ok(())
        }
    }

    impl FeatureKind for Fail {
        const TAG: &'static str = "Fail";
        type Data = crate::feature::NoData;
    }

    fn registry() -> FeatureRegistry {
        let mut registry = FeatureRegistry::new();
        registry.register_kind::<Marker>();
        registry.register_kind::<Fail>();
        registry
    }

    fn marker(id: u32, label: &str) -> FeatureDef {
        FeatureDef::new(id, "Marker").with_param("Label", label)
    }

    fn parent() -> FeatureDef {
        FeatureDef::new(1, "Parent")
            .with_child(marker(2, "a"))
            .with_child(marker(3, "b"))
            .with_child(marker(4, "c"))
    }

    fn labels(state: &FeatureState) -> Vec<String> {
        state
            .ledger
            .iter()
            .map(|f| f.data::<Seen>().unwrap().label)
            .collect()
    }

    fn saw_mark(state: &FeatureState) -> Vec<bool> {
        state
            .ledger
            .iter()
            .map(|f| f.data::<Seen>().unwrap().saw_mark)
            .collect()
    }

    #[test]
    fn test_merge_keeps_sibling_writes_private() {
        let registry = registry();
        let mut rng = ScriptedRandom::default();
        let mut act = Activation::new(&registry, &mut rng);
        let mut state = FeatureState::new(1, 1);
        let mut params = Params::new();

        act.activate_all(&parent(), &mut state, &mut params).unwrap();
        assert_eq!(saw_mark(&state), vec![false, false, false]);
        assert!(!params.contains("Mark"));
    }

    #[test]
    fn test_collate_exposes_sibling_writes() {
        let registry = registry();
        let mut rng = ScriptedRandom::default();
        let mut act = Activation::new(&registry, &mut rng);
        let mut state = FeatureState::new(1, 1);
        let mut params = Params::new().with("Collate", true);

        act.activate_all(&parent(), &mut state, &mut params).unwrap();
        assert_eq!(saw_mark(&state), vec![false, true, true]);
        assert!(params.bool("Mark").unwrap());
    }

    #[test]
    fn test_caller_overrides_child_defaults() {
        let registry = registry();
        let mut rng = ScriptedRandom::default();
        let mut act = Activation::new(&registry, &mut rng);
        let mut state = FeatureState::new(1, 1);
        let mut params = Params::new().with("Label", "caller");

        act.activate_all(&parent(), &mut state, &mut params).unwrap();
        assert_eq!(labels(&state), vec!["caller", "caller", "caller"]);
    }

    #[test]
    fn test_filtered_and_ordered() {
        let registry = registry();
        let mut rng = ScriptedRandom::default();
        let mut act = Activation::new(&registry, &mut rng);
        let mut state = FeatureState::new(1, 1);
        let mut params = Params::new();
        let def = parent();

        act.activate_filtered(&def, &mut state, &mut params, |i, _, _, _| i != 1)
            .unwrap();
        assert_eq!(labels(&state), vec!["a", "c"]);

        state.ledger.clear();
        let catalog: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let order: Vec<String> = ["C", "A", "C"].iter().map(|s| s.to_string()).collect();
        act.activate_ordered(&def, &mut state, &mut params, &order, &catalog)
            .unwrap();
        assert_eq!(labels(&state), vec!["c", "a", "c"]);

        let bad = vec!["Z".to_string()];
        assert!(matches!(
            act.activate_ordered(&def, &mut state, &mut params, &bad, &catalog),
            Err(FeatureError::Config(ConfigError::UnresolvedName(n))) if n == "Z"
        ));
    }

    #[test]
    fn test_weighted_conditional_probability() {
        let registry = registry();
        // weighted [0, 0, 5] draws in [0, 5); uniform draws in [0, 3);
        // two probability draws
        let mut rng = ScriptedRandom::new(vec![4, 0, 2499, 2500]);
        let mut act = Activation::new(&registry, &mut rng);
        let mut state = FeatureState::new(1, 1);
        let mut params = Params::new().with("Flag", true);
        let def = parent();

        assert_eq!(
            act.activate_weighted(&def, &mut state, &mut params, Some(&[0, 0, 5]))
                .unwrap(),
            2
        );
        assert_eq!(
            act.activate_weighted(&def, &mut state, &mut params, None)
                .unwrap(),
            0
        );
        assert_eq!(labels(&state), vec!["c", "a"]);

        state.ledger.clear();
        assert!(act.activate_conditional(&def, &mut state, &mut params, "Flag", true).unwrap());
        assert!(!act.activate_conditional(&def, &mut state, &mut params, "Flag", false).unwrap());
        assert_eq!(state.ledger.len(), 3);

        assert!(act.activate_probability(&def, &mut state, &mut params, 2500).unwrap());
        assert!(!act.activate_probability(&def, &mut state, &mut params, 2500).unwrap());
        assert_eq!(state.ledger.len(), 6);
    }

    #[test]
    fn test_weight_count_mismatch_is_config_error() {
        let registry = registry();
        let mut rng = ScriptedRandom::new(vec![0]);
        let mut act = Activation::new(&registry, &mut rng);
        let mut state = FeatureState::new(1, 1);
        let err = act
            .activate_weighted(&parent(), &mut state, &mut Params::new(), Some(&[1, 1]))
            .unwrap_err();
        assert!(matches!(err, FeatureError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_tag_names_feature() {
        let registry = registry();
        let mut rng = ScriptedRandom::default();
        let mut act = Activation::new(&registry, &mut rng);
        let def = FeatureDef::new(1, "Parent").with_child(FeatureDef::new(9, "Ghost"));
        let err = act
            .activate_all(&def, &mut FeatureState::new(1, 1), &mut Params::new())
            .unwrap_err();
        assert_eq!(err.feature_tag(), Some("Ghost"));
        assert!(matches!(
            err.root(),
            FeatureError::Config(ConfigError::UnknownType(t)) if t == "Ghost"
        ));
    }

    fn engine(registry: &FeatureRegistry, developer_mode: bool) -> Engine<'_> {
        let config = EngineConfig {
            developer_mode,
            pool: PoolConfig::without_exerciser(),
        };
        let pool = RngPool::new(config.pool.clone()).unwrap();
        Engine::with_registry(registry, pool, config)
    }

    #[test]
    fn test_failed_round_yields_error() {
        let registry = registry();
        let engine = engine(&registry, false);

        let err = engine
            .play(&FeatureDef::new(5, "Fail"), FeatureState::new(1, 1), Params::new())
            .unwrap_err();
        assert_eq!(err.feature_tag(), Some("Fail"));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);

        let ok = engine
            .play(&marker(1, "root"), FeatureState::new(1, 1), Params::new())
            .unwrap();
        assert_eq!(labels(&ok), vec!["root"]);
    }

    #[test]
    fn test_force_params_stripped_outside_developer_mode() {
        let registry = registry();
        let params = Params::new().with("ForceStops", vec![1, 2]).with("Label", "x");

        let production = engine(&registry, false);
        assert!(!production.prepare(params.clone()).contains("ForceStops"));

        let developer = engine(&registry, true);
        assert!(developer.prepare(params).contains("ForceStops"));
    }
}
