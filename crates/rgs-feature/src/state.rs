//! Per-round mutable state
//!
//! ```text
//!   previous round ──stateful──┐            ┌── next: step 1 ── step 2 …
//!   previous step ──stateless──┤            │   (precomputed reveals)
//!                              ▼            │
//!                    ┌───────────────────────┐
//!                    │     FeatureState      │
//!                    │ grids · reels · stops │
//!                    │ ledger · wins · phase │
//!                    └───────────────────────┘
//! ```
//!
//! Backward links are single-hop read-only snapshots behind `Arc`; a linked
//! snapshot never carries links of its own, so history cannot pile up.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::definition::FeatureDef;
use crate::error::FeatureResult;
use crate::feature::Feature;
use crate::grid::{Grid, Symbol};

/// Game phase of a round or step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Init,
    #[default]
    Base,
    Freespin,
    Cascade,
    Respin,
    Bonus,
}

impl Phase {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "init" => Some(Self::Init),
            "base" => Some(Self::Base),
            "freespin" => Some(Self::Freespin),
            "cascade" => Some(Self::Cascade),
            "respin" => Some(Self::Respin),
            "bonus" => Some(Self::Bonus),
            _ => None,
        }
    }
}

/// One win as reported by the evaluator (or produced by a prize effect)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Win {
    pub label: String,
    pub multiplier: f64,
    pub symbols: Vec<Symbol>,
    pub positions: Vec<usize>,
}

impl Win {
    pub fn new(label: impl Into<String>, multiplier: f64) -> Self {
        Self {
            label: label.into(),
            multiplier,
            symbols: Vec::new(),
            positions: Vec::new(),
        }
    }
}

/// Injected payout evaluator
pub trait WinEvaluator: Send + Sync {
    fn evaluate(&self, grid: &Grid, paytable: Option<&str>) -> Vec<Win>;
}

impl<F> WinEvaluator for F
where
    F: Fn(&Grid, Option<&str>) -> Vec<Win> + Send + Sync,
{
    fn evaluate(&self, grid: &Grid, paytable: Option<&str>) -> Vec<Win> {
        self(grid, paytable)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CascadeInfo {
    pub step: u32,
    pub removed: Vec<usize>,
}

/// Where a state sits in a replay sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPhase {
    #[default]
    Play,
    Replay,
    Continue,
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplayInfo {
    pub phase: ReplayPhase,
    pub continue_flag: bool,
    pub tries: u32,
}

/// Mutable working data of one round (or one step of a round)
#[derive(Clone)]
pub struct FeatureState {
    /// Symbols as landed
    pub source_grid: Grid,
    /// Symbols after effects
    pub grid: Grid,
    pub reels: Vec<Vec<Symbol>>,
    pub stops: Vec<usize>,
    pub reelset: Option<String>,
    pub ledger: Vec<Feature>,
    pub wins: Vec<Win>,
    pub stake: f64,
    pub phase: Phase,
    pub next_phase: Option<Phase>,
    pub freespins: u32,
    pub multiplier: f64,
    pub cascade: CascadeInfo,
    pub replay: ReplayInfo,
    pub paytable: Option<String>,
    evaluator: Option<Arc<dyn WinEvaluator>>,
    stateful: Option<Arc<FeatureState>>,
    stateless: Option<Arc<FeatureState>>,
    next: Option<Box<FeatureState>>,
}

impl fmt::Debug for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureState")
            .field("grid", &self.grid)
            .field("phase", &self.phase)
            .field("stake", &self.stake)
            .field("ledger", &self.ledger.len())
            .field("wins", &self.wins.len())
            .field("replay", &self.replay)
            .field("chain", &self.chain_len())
            .finish_non_exhaustive()
    }
}

impl Default for FeatureState {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl FeatureState {
    /// Fresh state with an empty `reels x rows` grid
    pub fn new(reels: usize, rows: usize) -> Self {
        Self {
            source_grid: Grid::new(reels, rows),
            grid: Grid::new(reels, rows),
            reels: Vec::new(),
            stops: Vec::new(),
            reelset: None,
            ledger: Vec::new(),
            wins: Vec::new(),
            stake: 1.0,
            phase: Phase::Base,
            next_phase: None,
            freespins: 0,
            multiplier: 1.0,
            cascade: CascadeInfo::default(),
            replay: ReplayInfo::default(),
            paytable: None,
            evaluator: None,
            stateful: None,
            stateless: None,
            next: None,
        }
    }

    /// Builder: start from a landed grid
    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.source_grid = grid.clone();
        self.grid = grid;
        self
    }

    /// Builder: set stake
    pub fn with_stake(mut self, stake: f64) -> Self {
        self.stake = stake;
        self
    }

    /// Builder: set phase
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Builder: inject the win evaluator
    pub fn with_evaluator(mut self, evaluator: Arc<dyn WinEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Builder: set the default paytable name
    pub fn with_paytable(mut self, paytable: impl Into<String>) -> Self {
        self.paytable = Some(paytable.into());
        self
    }

    /// Builder: link the previous round at this stake
    pub fn with_stateful(mut self, previous: &FeatureState) -> Self {
        self.link_stateful(previous);
        self
    }

    /// Builder: link the previous step of this round
    pub fn with_stateless(mut self, previous: &FeatureState) -> Self {
        self.link_stateless(previous);
        self
    }

    /// Memory namespace of the current stake
    pub fn stake_key(&self) -> String {
        format!("{:.3}", self.stake)
    }

    pub fn evaluator(&self) -> Option<&Arc<dyn WinEvaluator>> {
        self.evaluator.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LINKS
    // ═══════════════════════════════════════════════════════════════════════

    /// Copy without backward links (the forward chain is kept)
    pub fn snapshot(&self) -> FeatureState {
        let mut copy = self.clone();
        copy.stateful = None;
        copy.stateless = None;
        copy
    }

    pub fn link_stateful(&mut self, previous: &FeatureState) {
        self.stateful = Some(Arc::new(previous.snapshot()));
    }

    pub fn link_stateless(&mut self, previous: &FeatureState) {
        self.stateless = Some(Arc::new(previous.snapshot()));
    }

    /// Previous round at the same stake, if wired
    pub fn stateful(&self) -> Option<&FeatureState> {
        self.stateful.as_deref()
    }

    /// Previous step of the same round, if any
    pub fn stateless(&self) -> Option<&FeatureState> {
        self.stateless.as_deref()
    }

    /// Next precomputed reveal step
    pub fn next_link(&self) -> Option<&FeatureState> {
        self.next.as_deref()
    }

    pub fn chain_len(&self) -> usize {
        let mut len = 0;
        let mut cursor = self.next.as_deref();
        while let Some(link) = cursor {
            len += 1;
            cursor = link.next.as_deref();
        }
        len
    }

    /// Replace the forward chain with `links`, in reveal order
    pub fn set_chain(&mut self, links: Vec<FeatureState>) {
        let mut next: Option<Box<FeatureState>> = None;
        for mut link in links.into_iter().rev() {
            link.stateful = None;
            link.stateless = None;
            link.next = next;
            next = Some(Box::new(link));
        }
        self.next = next;
    }

    /// Detach the forward chain
    pub fn take_next(&mut self) -> Option<Box<FeatureState>> {
        self.next.take()
    }

    pub fn clear_chain(&mut self) {
        self.next = None;
    }

    pub(crate) fn set_next(&mut self, next: Option<Box<FeatureState>>) {
        self.next = next;
    }

    /// State for the next round at the same stake, linked back to this one
    pub fn next_round(&self) -> FeatureState {
        let mut state = FeatureState::new(self.grid.reels(), self.grid.rows());
        state.stake = self.stake;
        state.phase = self.next_phase.unwrap_or(Phase::Base);
        state.freespins = self.freespins;
        state.evaluator = self.evaluator.clone();
        state.paytable = self.paytable.clone();
        state.link_stateful(self);
        state
    }

    /// Follow-on step of the same round (cascade, respin), starting from
    /// this step's working grid
    pub fn next_step(&self) -> FeatureState {
        let mut state = self.next_round();
        state.phase = self.next_phase.unwrap_or(self.phase);
        state.source_grid = self.grid.clone();
        state.grid = self.grid.clone();
        state.reels = self.reels.clone();
        state.stops = self.stops.clone();
        state.reelset = self.reelset.clone();
        state.multiplier = self.multiplier;
        state.cascade = self.cascade.clone();
        state.stateful = self.stateful.clone();
        state.link_stateless(self);
        state
    }

    /// Take over the outcome of a precomputed step
    pub fn adopt_outcome(&mut self, step: FeatureState) {
        self.source_grid = step.source_grid;
        self.grid = step.grid;
        self.reels = step.reels;
        self.stops = step.stops;
        self.reelset = step.reelset;
        self.ledger = step.ledger;
        self.wins = step.wins;
        self.phase = step.phase;
        self.next_phase = step.next_phase;
        self.freespins = step.freespins;
        self.multiplier = step.multiplier;
        self.cascade = step.cascade;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LEDGER
    // ═══════════════════════════════════════════════════════════════════════

    /// Append a realized feature for `def`
    pub fn record<T: Serialize>(&mut self, def: &FeatureDef, data: &T) -> FeatureResult<()> {
        self.ledger.push(Feature::new(def, data)?);
        Ok(())
    }

    pub fn features_of<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Feature> + 'a {
        self.ledger.iter().filter(move |f| f.is(tag))
    }

    /// Most recent ledger entry of a type
    pub fn last_feature(&self, tag: &str) -> Option<&Feature> {
        self.ledger.iter().rev().find(|f| f.is(tag))
    }

    /// Sum of win multipliers
    pub fn total_win(&self) -> f64 {
        self.wins.iter().map(|w| w.multiplier).sum()
    }

    /// Serializable view of the outcome (no links, no evaluator)
    pub fn outcome(&self) -> Outcome<'_> {
        Outcome {
            source_grid: &self.source_grid,
            grid: &self.grid,
            stops: &self.stops,
            reelset: self.reelset.as_deref(),
            ledger: &self.ledger,
            wins: &self.wins,
            phase: self.phase,
            next_phase: self.next_phase,
            freespins: self.freespins,
            multiplier: self.multiplier,
            cascade: &self.cascade,
            replay: self.replay,
            chain: self.chain_len(),
        }
    }
}

/// Audit view of a round's outcome
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Outcome<'a> {
    pub source_grid: &'a Grid,
    pub grid: &'a Grid,
    pub stops: &'a [usize],
    pub reelset: Option<&'a str>,
    pub ledger: &'a [Feature],
    pub wins: &'a [Win],
    pub phase: Phase,
    pub next_phase: Option<Phase>,
    pub freespins: u32,
    pub multiplier: f64,
    pub cascade: &'a CascadeInfo,
    pub replay: ReplayInfo,
    pub chain: usize,
}

impl Outcome<'_> {
    pub fn to_bytes(&self) -> FeatureResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_key_format() {
        assert_eq!(FeatureState::new(5, 3).with_stake(1.0).stake_key(), "1.000");
        assert_eq!(FeatureState::new(5, 3).with_stake(0.25).stake_key(), "0.250");
    }

    #[test]
    fn test_links_are_single_hop() {
        let first = FeatureState::new(5, 3);
        let second = first.next_round();
        let third = second.next_round();

        assert!(third.stateful().is_some());
        assert!(third.stateful().and_then(FeatureState::stateful).is_none());
    }

    #[test]
    fn test_chain_order() {
        let mut state = FeatureState::new(1, 1);
        let links: Vec<FeatureState> = (0..3)
            .map(|i| {
                let mut s = FeatureState::new(1, 1);
                s.freespins = i;
                s
            })
            .collect();
        state.set_chain(links);

        assert_eq!(state.chain_len(), 3);
        let mut seen = Vec::new();
        let mut cursor = state.next_link();
        while let Some(link) = cursor {
            seen.push(link.freespins);
            cursor = link.next_link();
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_next_step_carries_grid() {
        let mut state = FeatureState::new(2, 2).with_stake(2.0);
        state.grid.set(0, 4).unwrap();
        state.next_phase = Some(Phase::Cascade);

        let step = state.next_step();
        assert_eq!(step.source_grid.get(0).unwrap(), 4);
        assert_eq!(step.phase, Phase::Cascade);
        assert_eq!(step.stake_key(), "2.000");
        assert!(step.stateless().is_some());
        assert!(step.ledger.is_empty());
    }

    #[test]
    fn test_closure_evaluator() {
        let state = FeatureState::new(1, 1).with_evaluator(Arc::new(|_: &Grid, _: Option<&str>| {
            vec![Win::new("line", 2.0)]
        }));
        let wins = state.evaluator().unwrap().evaluate(&state.grid, None);
        assert_eq!(wins.len(), 1);
    }
}
