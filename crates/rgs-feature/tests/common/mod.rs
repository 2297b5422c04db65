#![allow(dead_code)]

use std::sync::Arc;

use rgs_feature::rgs_rng::PoolConfig;
use rgs_feature::{Engine, EngineConfig, FeatureDef, Grid, Win, WinEvaluator};

pub const WILD: i32 = 9;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixture(name: &str) -> FeatureDef {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let source = std::fs::read_to_string(&path).unwrap();
    FeatureDef::from_yaml(&source).unwrap()
}

pub fn engine(developer_mode: bool) -> Engine<'static> {
    init_logging();
    Engine::new(EngineConfig {
        developer_mode,
        pool: PoolConfig::without_exerciser(),
    })
    .unwrap()
}

/// Left-to-right runs of three or more on the top row, wilds substituting
fn top_line(grid: &Grid, _paytable: Option<&str>) -> Vec<Win> {
    let row: Vec<i32> = (0..grid.reels()).map(|r| grid.at(r, 0).unwrap()).collect();
    let Some(&symbol) = row.iter().find(|&&s| s != WILD) else {
        return Vec::new();
    };
    let run = row.iter().take_while(|&&s| s == symbol || s == WILD).count();
    if run < 3 {
        return Vec::new();
    }
    vec![Win {
        label: format!("line {}x{}", symbol, run),
        multiplier: run as f64,
        symbols: vec![symbol],
        positions: (0..run).map(|r| grid.position(r, 0).unwrap()).collect(),
    }]
}

pub fn evaluator() -> Arc<dyn WinEvaluator> {
    Arc::new(top_line)
}
