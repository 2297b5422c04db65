//! Replay sequencer gates
//!
//! One presentation call computes the whole sequence; later calls reveal it
//! one link at a time. The engine has no replay logic of its own; these four
//! gates drive the transitions from configuration.
//!
//! ```text
//!            no pending chain                    pending chain
//!   Play ───────────────────► compute steps    (skipped)
//!   Replay                    (skipped)        reveal head, tries += 1
//!   ReplayContinue            flag = chain remains && tries < Tries
//!                             flag false → chain dropped
//!   ReplayAbort               flag false, chain dropped, phase Abort
//! ```

use crate::definition::FeatureDef;
use crate::engine::Activation;
use crate::error::FeatureResult;
use crate::feature::{FeatureKind, FeatureLogic, NoData};
use crate::params::Params;
use crate::state::{FeatureState, ReplayInfo, ReplayPhase};

/// Whether the previous presentation call left steps to reveal
fn pending(state: &FeatureState) -> bool {
    state
        .stateful()
        .is_some_and(|previous| previous.next_link().is_some())
}

fn aborted(state: &FeatureState) -> bool {
    state.replay.phase == ReplayPhase::Abort
}

/// Compute a fresh sequence of `Steps` outcomes
#[derive(Default)]
pub struct Play;

impl FeatureLogic for Play {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        if pending(state) {
            log::debug!("Play #{} skipped: replay chain pending", def.id);
            return Ok(());
        }

        let steps = params.opt_uint("Steps")?.unwrap_or(1).max(1);
        let base = params.clone();
        state.replay = ReplayInfo::default();
        state.clear_chain();

        act.activate_all(def, state, params)?;
        if aborted(state) {
            return Ok(());
        }

        let mut links: Vec<FeatureState> = Vec::with_capacity(steps - 1);
        for _ in 1..steps {
            let mut step = links.last().unwrap_or(&*state).next_step();
            step.replay = ReplayInfo::default();
            act.activate_all(def, &mut step, &mut base.clone())?;
            let stop = aborted(&step);
            links.push(step);
            if stop {
                break;
            }
        }

        log::debug!("Play #{} computed {} follow-on steps", def.id, links.len());
        state.set_chain(links);
        Ok(())
    }
}

impl FeatureKind for Play {
    const TAG: &'static str = "Play";
    type Data = NoData;
}

/// Reveal the next precomputed step
#[derive(Default)]
pub struct Replay;

impl FeatureLogic for Replay {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let Some(previous) = state.stateful() else {
            return Ok(());
        };
        let Some(head) = previous.next_link() else {
            return Ok(());
        };

        let tries = previous.replay.tries + 1;
        let mut link = head.clone();
        let rest = link.take_next();

        state.adopt_outcome(link);
        state.set_next(rest);
        state.replay = ReplayInfo {
            phase: ReplayPhase::Replay,
            continue_flag: false,
            tries,
        };
        log::debug!(
            "Replay #{} revealed step {} ({} left)",
            def.id,
            tries,
            state.chain_len()
        );

        act.activate_all(def, state, params)
    }
}

impl FeatureKind for Replay {
    const TAG: &'static str = "Replay";
    type Data = NoData;
}

/// Keep revealing while steps remain and the try ceiling is not reached
#[derive(Default)]
pub struct ReplayContinue;

impl FeatureLogic for ReplayContinue {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        let ceiling = params.uint("Tries")?;
        let flag = state.next_link().is_some() && (state.replay.tries as usize) < ceiling;
        state.replay.continue_flag = flag;

        if !flag {
            if state.next_link().is_some() {
                log::debug!("ReplayContinue #{}: ceiling {} reached", def.id, ceiling);
            }
            state.clear_chain();
            return Ok(());
        }

        state.replay.phase = ReplayPhase::Continue;
        act.activate_all(def, state, params)
    }
}

impl FeatureKind for ReplayContinue {
    const TAG: &'static str = "ReplayContinue";
    type Data = NoData;
}

/// End the sequence early
#[derive(Default)]
pub struct ReplayAbort;

impl FeatureLogic for ReplayAbort {
    fn trigger(
        &mut self,
        act: &mut Activation<'_>,
        def: &FeatureDef,
        state: &mut FeatureState,
        params: &mut Params,
    ) -> FeatureResult<()> {
        state.replay.continue_flag = false;
        state.replay.phase = ReplayPhase::Abort;
        state.clear_chain();
        log::debug!("ReplayAbort #{}", def.id);
        act.activate_all(def, state, params)
    }
}

impl FeatureKind for ReplayAbort {
    const TAG: &'static str = "ReplayAbort";
    type Data = NoData;
}
