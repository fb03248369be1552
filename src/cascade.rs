//! Cascade engine: clear → compact → refill → rescan until the board settles.
//!
//! Resolution is synchronous. Each step is recorded as a [`Frame`] so a host can
//! replay the phases with whatever pacing it likes; the final board does not
//! depend on that pacing.

use crate::detect::{self, Run};
use crate::error::{Error, Result};
use crate::grid::{Grid, Pos, Symbol};
use crate::rules::RuleSet;
use crate::trigger::{self, Mode};
use rand::Rng;
use tracing::debug;

/// Re-rolls before giving up on a run-free starting layout.
pub const MAX_LAYOUT_ATTEMPTS: usize = 50_000;

/// Presentation phase of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cleared,
    Compacted,
    Refilled,
    Settled,
}

/// Board snapshot after one phase. Pass 0 holds holes left by a special-mode clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pass: usize,
    pub phase: Phase,
    pub grid: Grid,
}

/// State carried into a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeContext {
    pub combo: u32,
    pub charge: u32,
    /// Mode already requested before this call, if any.
    pub forced: Option<Mode>,
    pub target: Symbol,
    /// Set when the action that started this cascade already cleared the target.
    pub target_cleared: bool,
}

/// What one matching pass found and scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// 1-based pass number within the resolve call.
    pub pass: usize,
    /// Combo value this pass scored at.
    pub combo: u32,
    pub runs: Vec<Run>,
    /// Distinct cells removed (overlapping runs counted once).
    pub cleared: Vec<Pos>,
    pub score: i64,
    pub charge: u32,
    pub target_matched: bool,
    /// Mode requested after folding this pass's run sizes in.
    pub requested: Option<Mode>,
}

/// Outcome of a full resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub grid: Grid,
    pub score_delta: i64,
    /// Charge gathered by the passes of this call, before settling.
    pub chain_charge: u32,
    /// Combo after the closing no-run pass (always 0).
    pub combo: u32,
    pub peak_combo: u32,
    /// Charge after settling, in 0..=cap.
    pub charge: u32,
    /// Mode entered once the board settled.
    pub mode: Mode,
    pub target_cleared: bool,
    pub passes: Vec<PassReport>,
    pub frames: Vec<Frame>,
}

/// Roll layouts until one has no runs.
pub fn generate_layout<R: Rng>(rules: &RuleSet, rng: &mut R) -> Result<Grid> {
    for attempt in 1..=MAX_LAYOUT_ATTEMPTS {
        let grid = Grid::random(rules.rows, rules.cols, &rules.palette, rng);
        if !detect::has_runs(&grid) {
            debug!(attempt, "run-free layout generated");
            return Ok(grid);
        }
    }
    Err(Error::NoSettledLayout {
        attempts: MAX_LAYOUT_ATTEMPTS,
    })
}

/// Score, charge and clear one set of runs found on `grid`.
pub fn clear_pass(
    grid: &mut Grid,
    runs: Vec<Run>,
    pass: usize,
    ctx: &CascadeContext,
    rules: &RuleSet,
) -> PassReport {
    let combo = ctx.combo + 1;
    let mut score = 0;
    let mut charge = 0;
    let mut target_matched = false;
    for run in &runs {
        score += rules.score.run_score(run.tier(), combo);
        if run.symbol == ctx.target {
            target_matched = true;
            charge += rules.charge.per_target_run;
        } else {
            charge += rules.charge.per_run;
        }
    }
    let requested = trigger::requested_mode(&runs, ctx.forced);
    let cleared: Vec<Pos> = detect::clear_set(&runs).into_iter().collect();
    grid.clear_cells(cleared.iter().copied());
    debug!(
        pass,
        combo,
        runs = runs.len(),
        cleared = cleared.len(),
        score,
        charge,
        ?requested,
        "cascade pass"
    );
    PassReport {
        pass,
        combo,
        runs,
        cleared,
        score,
        charge,
        target_matched,
        requested,
    }
}

/// Detect and clear a single pass without gravity. None if the board has no runs.
pub fn resolve_pass(
    grid: &mut Grid,
    pass: usize,
    ctx: &CascadeContext,
    rules: &RuleSet,
) -> Option<PassReport> {
    let runs = detect::find_runs(grid);
    if runs.is_empty() {
        return None;
    }
    Some(clear_pass(grid, runs, pass, ctx, rules))
}

fn fall_and_refill<R: Rng>(
    grid: &mut Grid,
    pass: usize,
    rules: &RuleSet,
    rng: &mut R,
    frames: &mut Vec<Frame>,
) {
    grid.compact();
    frames.push(Frame {
        pass,
        phase: Phase::Compacted,
        grid: grid.clone(),
    });
    grid.refill(&rules.palette, rng);
    frames.push(Frame {
        pass,
        phase: Phase::Refilled,
        grid: grid.clone(),
    });
}

/// Resolve every chained match on `grid` until a pass finds no runs.
///
/// Holes already present (from a special-mode clear) are compacted and refilled
/// before the first scan. Fails with [`Error::CascadeDepth`] if the board still
/// has runs after `rules.max_cascade_passes` passes.
pub fn resolve<R: Rng>(
    grid: Grid,
    ctx: CascadeContext,
    rules: &RuleSet,
    rng: &mut R,
) -> Result<Resolution> {
    let mut grid = grid;
    let mut frames = Vec::new();
    let mut passes: Vec<PassReport> = Vec::new();
    let mut state = ctx;

    if !grid.is_full() {
        frames.push(Frame {
            pass: 0,
            phase: Phase::Cleared,
            grid: grid.clone(),
        });
        fall_and_refill(&mut grid, 0, rules, rng, &mut frames);
    }

    loop {
        let runs = detect::find_runs(&grid);
        if runs.is_empty() {
            break;
        }
        if passes.len() >= rules.max_cascade_passes {
            return Err(Error::CascadeDepth {
                passes: passes.len(),
            });
        }
        let pass = passes.len() + 1;
        let report = clear_pass(&mut grid, runs, pass, &state, rules);
        state.combo = report.combo;
        state.forced = report.requested;
        state.target_cleared |= report.target_matched;
        frames.push(Frame {
            pass,
            phase: Phase::Cleared,
            grid: grid.clone(),
        });
        fall_and_refill(&mut grid, pass, rules, rng, &mut frames);
        passes.push(report);
    }

    let score_delta = passes.iter().map(|p| p.score).sum();
    let chain_charge = passes.iter().map(|p| p.charge).sum();
    let peak_combo = passes.last().map_or(0, |p| p.combo);
    let settled = trigger::settle(ctx.charge, chain_charge, state.forced, rules.charge.cap);
    frames.push(Frame {
        pass: passes.len(),
        phase: Phase::Settled,
        grid: grid.clone(),
    });
    debug!(
        passes = passes.len(),
        score_delta,
        chain_charge,
        mode = ?settled.mode,
        charge = settled.charge,
        "cascade settled"
    );

    Ok(Resolution {
        grid,
        score_delta,
        chain_charge,
        combo: 0,
        peak_combo,
        charge: settled.charge,
        mode: settled.mode,
        target_cleared: state.target_cleared,
        passes,
        frames,
    })
}
