//! Session: the host-facing state machine around the cascade engine.
//!
//! The host owns the only mutable copy and drives it with taps and swaps. Every
//! input returns an [`Outcome`]; game-rule refusals (blocker taps, swaps that make
//! no run, taps with no mode active) are outcomes, not errors.

use crate::cascade::{self, CascadeContext, Resolution};
use crate::detect;
use crate::error::{Error, Result};
use crate::grid::{Cell, Grid, Pos, Symbol};
use crate::hint::{self, Move};
use crate::rules::RuleSet;
use crate::settlement::{Settlement, Venue};
use crate::trigger::Mode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Playing,
    /// Blocker limit reached; all further input is refused.
    Overrun,
}

/// Why an input was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Blocker,
    EmptyCell,
    SameCell,
    NotAdjacent,
    NoMatch,
    /// A special mode is waiting for its tap; swaps are locked out.
    ModeActive,
    NoModeActive,
    GameOver,
    Unaffordable,
    RecruitDisabled,
    NoEligibleCell,
}

/// One accepted action and the cascade it set off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub resolution: Resolution,
    /// Cells removed by the special-mode tap that started this turn.
    pub mode_cleared: Vec<Pos>,
    pub action_cost: i64,
    /// Flat mode bonus plus blocker exit bonuses.
    pub bonus: i64,
    /// Blockers placed as penalties during this turn.
    pub penalties: Vec<Pos>,
    /// New target rolled because the old one was cleared.
    pub target_changed: Option<Symbol>,
    /// Running score after the turn.
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Selected(Pos),
    Resolved(Box<Turn>),
    Recruited { pos: Pos, cost: i64 },
    Rejected { reason: Rejection, penalties: Vec<Pos> },
}

impl Outcome {
    fn rejected(reason: Rejection) -> Self {
        Self::Rejected {
            reason,
            penalties: Vec::new(),
        }
    }

    pub fn turn(&self) -> Option<&Turn> {
        match self {
            Self::Resolved(turn) => Some(turn),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn penalties(&self) -> &[Pos] {
        match self {
            Self::Rejected { penalties, .. } => penalties,
            Self::Resolved(turn) => &turn.penalties,
            _ => &[],
        }
    }
}

/// Everything needed to put a session back exactly where it was (minus the RNG).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub grid: Grid,
    pub target: Symbol,
    pub mode: Mode,
    pub charge: u32,
    pub combo: u32,
    pub score: i64,
    pub selected: Option<Pos>,
    pub status: Status,
}

impl Snapshot {
    /// Fresh-game state around an existing board.
    pub fn new(grid: Grid, target: Symbol) -> Self {
        Self {
            grid,
            target,
            mode: Mode::Idle,
            charge: 0,
            combo: 0,
            score: 0,
            selected: None,
            status: Status::Playing,
        }
    }
}

/// How the action that starts a cascade left things.
struct TurnStart {
    action_cost: i64,
    bonus: i64,
    target_cleared: bool,
    mode_cleared: Vec<Pos>,
    penalties: Vec<Pos>,
    from_swap: bool,
}

impl TurnStart {
    fn new(action_cost: i64) -> Self {
        Self {
            action_cost,
            bonus: 0,
            target_cleared: false,
            mode_cleared: Vec::new(),
            penalties: Vec::new(),
            from_swap: false,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    rules: RuleSet,
    grid: Grid,
    target: Symbol,
    mode: Mode,
    charge: u32,
    combo: u32,
    peak_combo: u32,
    score: i64,
    selected: Option<Pos>,
    status: Status,
    moves: u32,
    rng: StdRng,
}

impl Session {
    /// Start a game on a freshly rolled, run-free board. `seed` makes play reproducible.
    pub fn new(rules: RuleSet, seed: Option<u64>) -> Result<Self> {
        rules.validate()?;
        let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let grid = cascade::generate_layout(&rules, &mut rng)?;
        let target = roll_target(&rules, &mut rng);
        info!(variant = ?rules.variant, ?target, "new game");
        Ok(Self::from_parts(rules, Snapshot::new(grid, target), rng))
    }

    /// Resume from a snapshot. The board must match the rule set's size and be full.
    pub fn restore(rules: RuleSet, snapshot: Snapshot, seed: Option<u64>) -> Result<Self> {
        rules.validate()?;
        let grid = &snapshot.grid;
        if grid.rows() != rules.rows || grid.cols() != rules.cols {
            return Err(Error::Layout(format!(
                "board is {}x{}, rules expect {}x{}",
                grid.rows(),
                grid.cols(),
                rules.rows,
                rules.cols
            )));
        }
        if !grid.is_full() {
            return Err(Error::Layout("board has empty cells".to_string()));
        }
        if let Some(pos) = snapshot.selected {
            grid.check(pos)?;
        }
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Ok(Self::from_parts(rules, snapshot, rng))
    }

    fn from_parts(rules: RuleSet, snap: Snapshot, rng: StdRng) -> Self {
        Self {
            rules,
            grid: snap.grid,
            target: snap.target,
            mode: snap.mode,
            charge: snap.charge,
            combo: snap.combo,
            peak_combo: snap.combo,
            score: snap.score,
            selected: snap.selected,
            status: snap.status,
            moves: 0,
            rng,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.grid.clone(),
            target: self.target,
            mode: self.mode,
            charge: self.charge,
            combo: self.combo,
            score: self.score,
            selected: self.selected,
            status: self.status,
        }
    }

    /// Throw the current game away and deal a new board.
    pub fn reset(&mut self) -> Result<()> {
        let grid = cascade::generate_layout(&self.rules, &mut self.rng)?;
        let target = roll_target(&self.rules, &mut self.rng);
        let rng = self.rng.clone();
        *self = Self::from_parts(self.rules.clone(), Snapshot::new(grid, target), rng);
        info!(?target, "game reset");
        Ok(())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn target(&self) -> Symbol {
        self.target
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn charge(&self) -> u32 {
        self.charge
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn peak_combo(&self) -> u32 {
        self.peak_combo
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn selected(&self) -> Option<Pos> {
        self.selected
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Accepted actions so far.
    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn blocker_count(&self) -> usize {
        self.grid.blocker_count()
    }

    /// No special mode pending and the game is still running.
    pub fn is_settled(&self) -> bool {
        self.mode == Mode::Idle && self.status == Status::Playing
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        hint::legal_moves(&self.grid, self.target)
    }

    pub fn best_move(&self) -> Option<Move> {
        hint::best_move(&self.grid, self.target)
    }

    /// False once no swap on the board makes a run.
    pub fn has_moves(&self) -> bool {
        hint::has_moves(&self.grid)
    }

    pub fn settlement(&self, venue: Venue) -> Settlement {
        Settlement::compute(
            self.score,
            self.grid.blocker_count(),
            venue,
            &self.rules.settlement,
        )
    }

    /// Tap a cell. Routes to [`Session::apply_mode`] while a special mode is active;
    /// otherwise the first tap selects and an adjacent second tap swaps. A
    /// non-adjacent second tap moves the selection.
    pub fn click(&mut self, pos: Pos) -> Result<Outcome> {
        self.grid.check(pos)?;
        if self.status == Status::Overrun {
            return Ok(Outcome::rejected(Rejection::GameOver));
        }
        if self.mode.is_special() {
            return self.apply_mode(pos);
        }
        match self.grid.get(pos) {
            Some(Cell::Blocker) => return Ok(Outcome::rejected(Rejection::Blocker)),
            Some(Cell::Empty) | None => return Ok(Outcome::rejected(Rejection::EmptyCell)),
            Some(Cell::Symbol(_)) => {}
        }
        match self.selected {
            Some(prev) if prev.is_adjacent(pos) => self.attempt_swap(prev, pos),
            _ => {
                self.selected = Some(pos);
                Ok(Outcome::Selected(pos))
            }
        }
    }

    /// Swap two adjacent symbols and resolve the cascade. A swap that makes no run
    /// (or pairs non-adjacent cells) leaves the board as it was, apart from any
    /// penalty blockers the rules ask for. If the cascade fails the session is
    /// left exactly as it was before the swap.
    pub fn attempt_swap(&mut self, a: Pos, b: Pos) -> Result<Outcome> {
        self.grid.check(a)?;
        self.grid.check(b)?;
        if self.status == Status::Overrun {
            return Ok(Outcome::rejected(Rejection::GameOver));
        }
        if self.mode.is_special() {
            return Ok(Outcome::rejected(Rejection::ModeActive));
        }
        let before = self.snapshot();
        self.selected = None;
        if a == b {
            return Ok(Outcome::rejected(Rejection::SameCell));
        }
        for pos in [a, b] {
            match self.grid.get(pos) {
                Some(Cell::Blocker) => return Ok(Outcome::rejected(Rejection::Blocker)),
                Some(Cell::Empty) | None => return Ok(Outcome::rejected(Rejection::EmptyCell)),
                Some(Cell::Symbol(_)) => {}
            }
        }
        if !a.is_adjacent(b) {
            let penalties = self.place_blockers(self.rules.penalty.illegal_swap);
            return Ok(Outcome::Rejected {
                reason: Rejection::NotAdjacent,
                penalties,
            });
        }

        let mut swapped = self.grid.clone();
        swapped.swap(a, b);
        let runs = detect::find_runs(&swapped);
        if runs.is_empty() {
            debug!(%a, %b, "swap makes no run; reverted");
            let penalties = self.place_blockers(self.rules.penalty.illegal_swap);
            return Ok(Outcome::Rejected {
                reason: Rejection::NoMatch,
                penalties,
            });
        }

        let mut start = TurnStart::new(self.action_cost());
        start.from_swap = true;
        self.grid = swapped;
        if !runs.iter().any(|r| r.symbol == self.target) {
            start.penalties = self.place_blockers(self.rules.penalty.untargeted_swap);
        }
        let result = self.finish_turn(start);
        self.committed(before, result)
    }

    /// Spend the pending special mode on `tap`. The mode stays pending if the
    /// cascade it sets off fails.
    pub fn apply_mode(&mut self, tap: Pos) -> Result<Outcome> {
        self.grid.check(tap)?;
        if self.status == Status::Overrun {
            return Ok(Outcome::rejected(Rejection::GameOver));
        }
        let cell = self.grid.get(tap).unwrap_or_default();
        if self.mode == Mode::Idle {
            return Ok(Outcome::rejected(Rejection::NoModeActive));
        }
        if cell.is_empty() {
            return Ok(Outcome::rejected(Rejection::EmptyCell));
        }
        let before = self.snapshot();
        let result = match self.mode {
            Mode::Idle => return Ok(Outcome::rejected(Rejection::NoModeActive)),
            Mode::AreaClear => {
                let area = self.rules.area;
                let cleared = self.cells_where(|p, c| !c.is_empty() && area.covers(tap, p));
                self.clear_for_mode(cleared, area.bonus)
            }
            Mode::ColorSweep => {
                // The tapped symbol goes, and every blocker with it.
                let cleared = self.cells_where(|_, c| c.is_blocker() || c == cell);
                self.clear_for_mode(cleared, self.rules.economy.sweep_bonus)
            }
            Mode::Recolor => {
                if cell.is_blocker() {
                    return Ok(Outcome::rejected(Rejection::Blocker));
                }
                let mut start = TurnStart::new(self.action_cost());
                start.target_cleared = true;
                self.grid.set(tap, Cell::Symbol(self.target));
                self.mode = Mode::Idle;
                self.selected = None;
                info!(%tap, target = ?self.target, "cell recolored");
                self.finish_turn(start)
            }
        };
        self.committed(before, result)
    }

    /// Buy one more blocker onto a random symbol cell.
    pub fn recruit_blocker(&mut self) -> Result<Outcome> {
        if self.status == Status::Overrun {
            return Ok(Outcome::rejected(Rejection::GameOver));
        }
        if self.mode.is_special() {
            return Ok(Outcome::rejected(Rejection::ModeActive));
        }
        let Some(cost) = self.rules.recruit_cost(self.grid.blocker_count()) else {
            return Ok(Outcome::rejected(Rejection::RecruitDisabled));
        };
        if self.score < cost {
            return Ok(Outcome::rejected(Rejection::Unaffordable));
        }
        let Some(&pos) = self.place_blockers(1).first() else {
            return Ok(Outcome::rejected(Rejection::NoEligibleCell));
        };
        self.score -= cost;
        Ok(Outcome::Recruited { pos, cost })
    }

    fn cells_where(&self, pred: impl Fn(Pos, Cell) -> bool) -> Vec<Pos> {
        self.grid
            .iter()
            .filter(|&(p, c)| pred(p, c))
            .map(|(p, _)| p)
            .collect()
    }

    fn clear_for_mode(&mut self, cleared: Vec<Pos>, flat_bonus: i64) -> Result<Outcome> {
        let mut start = TurnStart::new(self.action_cost());
        let target = Cell::Symbol(self.target);
        let blockers = cleared
            .iter()
            .filter(|p| self.grid.get(**p) == Some(Cell::Blocker))
            .count();
        start.target_cleared = cleared.iter().any(|p| self.grid.get(*p) == Some(target));
        start.bonus = flat_bonus + blockers as i64 * self.rules.economy.blocker_exit_bonus;
        self.grid.clear_cells(cleared.iter().copied());
        info!(mode = ?self.mode, cleared = cleared.len(), blockers, "special mode used");
        start.mode_cleared = cleared;
        self.mode = Mode::Idle;
        self.selected = None;
        self.finish_turn(start)
    }

    fn finish_turn(&mut self, start: TurnStart) -> Result<Outcome> {
        let ctx = CascadeContext {
            combo: self.combo,
            charge: self.charge,
            forced: None,
            target: self.target,
            target_cleared: start.target_cleared,
        };
        let resolution = cascade::resolve(self.grid.clone(), ctx, &self.rules, &mut self.rng)?;
        self.grid = resolution.grid.clone();
        self.combo = resolution.combo;
        self.peak_combo = self.peak_combo.max(resolution.peak_combo);
        self.charge = resolution.charge;
        self.mode = resolution.mode;
        self.score += resolution.score_delta + start.bonus - start.action_cost;
        self.moves += 1;

        let mut penalties = start.penalties;
        if start.from_swap && !resolution.target_cleared {
            penalties.extend(self.place_blockers(self.rules.penalty.missed_target));
        }
        let target_changed = if resolution.target_cleared {
            self.target = roll_target(&self.rules, &mut self.rng);
            info!(target = ?self.target, "target changed");
            Some(self.target)
        } else {
            None
        };
        if self.mode.is_special() {
            info!(mode = ?self.mode, charge = self.charge, "special mode entered");
        }

        Ok(Outcome::Resolved(Box::new(Turn {
            resolution,
            mode_cleared: start.mode_cleared,
            action_cost: start.action_cost,
            bonus: start.bonus,
            penalties,
            target_changed,
            score: self.score,
        })))
    }

    /// Put the session back to `before` if the turn failed.
    fn committed(&mut self, before: Snapshot, result: Result<Outcome>) -> Result<Outcome> {
        if let Err(e) = &result {
            warn!(error = %e, "turn abandoned; session rolled back");
            self.rewind(before);
        }
        result
    }

    fn rewind(&mut self, snap: Snapshot) {
        self.grid = snap.grid;
        self.target = snap.target;
        self.mode = snap.mode;
        self.charge = snap.charge;
        self.combo = snap.combo;
        self.score = snap.score;
        self.selected = snap.selected;
        self.status = snap.status;
    }

    fn action_cost(&self) -> i64 {
        self.grid.blocker_count() as i64 * self.rules.economy.action_cost_per_blocker
    }

    /// Turn `count` random symbol cells into blockers, then check for overrun.
    fn place_blockers(&mut self, count: usize) -> Vec<Pos> {
        let mut placed = Vec::with_capacity(count);
        for _ in 0..count {
            let eligible = self.cells_where(|_, c| c.symbol().is_some());
            if eligible.is_empty() {
                break;
            }
            let pos = eligible[self.rng.random_range(0..eligible.len())];
            self.grid.set(pos, Cell::Blocker);
            placed.push(pos);
        }
        if !placed.is_empty() {
            info!(placed = placed.len(), blockers = self.grid.blocker_count(), "blockers placed");
            self.check_overrun();
        }
        placed
    }

    fn check_overrun(&mut self) {
        if let Some(limit) = self.rules.blocker_limit {
            let blockers = self.grid.blocker_count();
            if blockers >= limit && self.status == Status::Playing {
                warn!(blockers, limit, "board overrun; game over");
                self.status = Status::Overrun;
            }
        }
    }
}

fn roll_target<R: Rng>(rules: &RuleSet, rng: &mut R) -> Symbol {
    rules.palette[rng.random_range(0..rules.palette.len())]
}
