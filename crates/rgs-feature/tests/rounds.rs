//! Memory across rounds and operator overrides, through the engine

mod common;

use rgs_feature::effects::progress::Count;
use rgs_feature::memory::STATEFUL_MAP;
use rgs_feature::{FeatureDef, FeatureState, Params};

fn collector_round(engine: &rgs_feature::Engine<'_>, state: FeatureState) -> FeatureState {
    engine
        .play(&common::fixture("collector.yaml"), state, Params::new())
        .unwrap()
}

#[test]
fn test_counter_pays_every_third_round_per_stake() {
    let engine = common::engine(false);
    let genesis = FeatureState::new(1, 1);

    let mut state = collector_round(&engine, FeatureState::new(1, 1).with_stateful(&genesis));
    state = collector_round(&engine, state.next_round());
    assert_eq!(state.total_win(), 0.0);

    // a different stake keeps its own count
    let other = collector_round(&engine, state.next_round().with_stake(2.0));
    assert_eq!(other.last_feature("Counter").unwrap().data::<Count>().unwrap().value, 1);
    assert_eq!(other.total_win(), 0.0);

    let third = collector_round(&engine, other.next_round().with_stake(1.0));
    let count: Count = third.last_feature("Counter").unwrap().data().unwrap();
    assert_eq!(count.value, 3);
    assert!(count.reached);
    assert_eq!(third.total_win(), 50.0);
    assert_eq!(third.wins[0].label, "Bonus");

    let memory: Params = third.last_feature(STATEFUL_MAP).unwrap().data().unwrap();
    assert_eq!(memory.bag("1.000").unwrap().int("Coins").unwrap(), 0);
    assert_eq!(memory.bag("2.000").unwrap().int("Coins").unwrap(), 1);

    let fourth = collector_round(&engine, third.next_round());
    assert_eq!(fourth.last_feature("Counter").unwrap().data::<Count>().unwrap().value, 1);
    assert_eq!(fourth.total_win(), 0.0);
}

#[test]
fn test_round_without_stateful_link_fails() {
    let engine = common::engine(false);
    let err = engine
        .play(&common::fixture("collector.yaml"), FeatureState::new(1, 1), Params::new())
        .unwrap_err();
    assert_eq!(err.kind(), rgs_feature::ErrorKind::Logic);
    assert_eq!(err.feature_tag(), Some("Counter"));
}

fn fill(id: u32, symbol: i64) -> FeatureDef {
    FeatureDef::new(id, "ReplaceTile")
        .with_param("ReplaceFrom", -1)
        .with_param("ReplaceTo", symbol)
}

fn forced_choice() -> FeatureDef {
    FeatureDef::new(1, "WeightedActivator")
        .with_param("Weights", vec![0, 1])
        .with_child(fill(2, 1))
        .with_child(fill(3, 2))
}

#[test]
fn test_force_params_ignored_in_production() {
    let engine = common::engine(false);
    let params = Params::new().with("ForceIndex", 0);
    let state = engine
        .play(&forced_choice(), FeatureState::new(1, 1), params)
        .unwrap();
    assert_eq!(state.grid.cells(), &[2]);
}

#[test]
fn test_force_params_honored_in_developer_mode() {
    let engine = common::engine(true);
    let params = Params::new().with("ForceIndex", 0);
    let state = engine
        .play(&forced_choice(), FeatureState::new(1, 1), params)
        .unwrap();
    assert_eq!(state.grid.cells(), &[1]);
}

#[test]
fn test_force_seed_reproduces_round() {
    let engine = common::engine(true);
    let def = common::fixture("base_game.yaml");
    let play = || {
        let state = FeatureState::new(5, 3).with_evaluator(common::evaluator());
        engine
            .play(&def, state, Params::new().with("ForceSeed", 77))
            .unwrap()
            .outcome()
            .to_bytes()
            .unwrap()
    };
    assert_eq!(play(), play());
}
