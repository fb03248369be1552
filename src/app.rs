//! App: terminal init, main loop, cascade replay, autoplay and key handling.

use crate::DriverConfig;
use crate::input::{Action, key_to_action};
use crate::ui::{self, ClearFade, View};
use anyhow::Result;
use carnival_cascade::cascade::Frame;
use carnival_cascade::hint::Move;
use carnival_cascade::{Cell, Mode, Outcome, Pos, Rejection, RuleSet, Session, Status, Turn, detect};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Messages kept in the sidebar log.
const LOG_LINES: usize = 5;
/// Slowest autoplay can go even with a zero pace, so the board stays readable.
const AUTOPLAY_MIN_MS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Settlement,
}

pub struct App {
    session: Session,
    config: DriverConfig,
    screen: Screen,
    cursor: Pos,
    hint: Option<Move>,
    log: Vec<String>,
    /// Cascade frames still to show, oldest first.
    replay: VecDeque<Frame>,
    showing: Option<Frame>,
    frame_started: Instant,
    autoplay_left: Option<u32>,
    last_auto: Instant,
    fade: ClearFade,
}

impl App {
    pub fn new(rules: RuleSet, config: DriverConfig) -> Result<Self> {
        let session = Session::new(rules, config.seed)?;
        let now = Instant::now();
        let mut app = Self {
            session,
            screen: Screen::Playing,
            cursor: Pos::new(0, 0),
            hint: None,
            log: Vec::new(),
            replay: VecDeque::new(),
            showing: None,
            frame_started: now,
            autoplay_left: config.autoplay,
            last_auto: now,
            fade: ClearFade::default(),
            config,
        };
        app.push_log(format!(
            "{:?} rules. Target {:?}.",
            app.session.rules().variant,
            app.session.target()
        ));
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.tick(now);

            let view = View {
                session: &self.session,
                screen: self.screen,
                grid: self
                    .showing
                    .as_ref()
                    .map_or(self.session.grid(), |f| &f.grid),
                phase: self.showing.as_ref().map(|f| (f.pass, f.phase)),
                cursor: self.cursor,
                hint: self.hint.as_ref(),
                log: &self.log,
                venue: self.config.venue,
                autoplay: self.autoplay_left,
                animate: self.config.animate,
            };
            let fade = &mut self.fade;
            terminal.draw(|f| ui::draw(f, &view, fade, now))?;

            // ~60 FPS
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle(key_to_action(key))? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Advance the cascade replay, end the game on overrun, and play one autoplay move when due.
    fn tick(&mut self, now: Instant) {
        if self.showing.is_some() {
            if now.saturating_duration_since(self.frame_started) >= self.config.pace {
                self.next_frame(now);
            }
            return;
        }
        if self.screen == Screen::Playing && self.session.status() == Status::Overrun {
            self.autoplay_left = None;
            self.screen = Screen::Settlement;
            return;
        }
        if self.screen != Screen::Playing {
            return;
        }
        let Some(left) = self.autoplay_left else {
            return;
        };
        let every = self.config.pace.max(Duration::from_millis(AUTOPLAY_MIN_MS));
        if now.saturating_duration_since(self.last_auto) >= every {
            self.last_auto = now;
            self.autoplay_step(left);
        }
    }

    fn next_frame(&mut self, now: Instant) {
        self.showing = self.replay.pop_front();
        self.frame_started = now;
        self.fade.reset();
        if let Some(frame) = &self.showing {
            debug!(pass = frame.pass, phase = ?frame.phase, "frame");
        }
    }

    fn skip_replay(&mut self) {
        self.replay.clear();
        self.showing = None;
        self.fade.reset();
    }

    /// Returns false when the app should exit.
    fn handle(&mut self, action: Action) -> Result<bool> {
        if action == Action::Quit {
            return Ok(false);
        }
        match self.screen {
            Screen::Settlement => match action {
                Action::Reset => self.new_game()?,
                Action::Settle if self.session.status() == Status::Playing => {
                    self.screen = Screen::Playing;
                }
                _ => {}
            },
            Screen::Playing => {
                if self.showing.is_some() {
                    if action != Action::None {
                        self.skip_replay();
                    }
                    return Ok(true);
                }
                match action {
                    Action::Up => self.move_cursor(-1, 0),
                    Action::Down => self.move_cursor(1, 0),
                    Action::Left => self.move_cursor(0, -1),
                    Action::Right => self.move_cursor(0, 1),
                    Action::Tap => {
                        let result = self.session.click(self.cursor);
                        self.handle_outcome(result);
                    }
                    Action::Hint => self.show_hint(),
                    Action::Recruit => {
                        let result = self.session.recruit_blocker();
                        self.handle_outcome(result);
                    }
                    Action::Autoplay => {
                        self.autoplay_left = match self.autoplay_left {
                            Some(_) => None,
                            None => Some(self.config.autoplay.unwrap_or(u32::MAX)),
                        };
                    }
                    Action::Settle => self.screen = Screen::Settlement,
                    Action::Reset => self.new_game()?,
                    Action::Quit | Action::None => {}
                }
            }
        }
        Ok(true)
    }

    fn move_cursor(&mut self, dr: isize, dc: isize) {
        let grid = self.session.grid();
        self.cursor = Pos::new(
            self.cursor
                .row
                .saturating_add_signed(dr)
                .min(grid.rows() - 1),
            self.cursor
                .col
                .saturating_add_signed(dc)
                .min(grid.cols() - 1),
        );
    }

    fn show_hint(&mut self) {
        self.hint = self.session.best_move();
        match self.hint {
            Some(m) => self.push_log(format!(
                "Try {} <-> {} (run of {}{}).",
                m.from,
                m.to,
                m.longest,
                if m.hits_target { ", hits target" } else { "" }
            )),
            None => self.push_log("No swap makes a run."),
        }
    }

    fn new_game(&mut self) -> Result<()> {
        self.session.reset()?;
        self.skip_replay();
        self.screen = Screen::Playing;
        self.hint = None;
        self.cursor = Pos::new(0, 0);
        self.push_log(format!("New board. Target {:?}.", self.session.target()));
        Ok(())
    }

    fn autoplay_step(&mut self, left: u32) {
        if left == 0 {
            self.autoplay_left = None;
            self.push_log("Autoplay finished.");
            return;
        }
        let result = if self.session.mode().is_special() {
            let tap = self.pick_tap();
            self.cursor = tap;
            self.session.apply_mode(tap)
        } else {
            let Some(m) = self.session.best_move() else {
                self.autoplay_left = None;
                self.push_log("Autoplay stopped: no swap makes a run.");
                return;
            };
            self.cursor = m.to;
            self.session.attempt_swap(m.from, m.to)
        };
        self.autoplay_left = Some(left - 1);
        self.handle_outcome(result);
    }

    /// Where to spend the pending special mode.
    fn pick_tap(&self) -> Pos {
        let grid = self.session.grid();
        let target = self.session.target();
        let first_symbol = grid
            .iter()
            .find(|(_, c)| c.symbol().is_some())
            .map_or(Pos::new(0, 0), |(p, _)| p);
        match self.session.mode() {
            Mode::Idle => first_symbol,
            Mode::AreaClear => {
                let area = self.session.rules().area;
                grid.positions()
                    .max_by_key(|&centre| {
                        grid.iter()
                            .filter(|&(p, _)| area.covers(centre, p))
                            .map(|(_, c)| match c {
                                Cell::Blocker => 3,
                                Cell::Symbol(s) if s == target => 2,
                                Cell::Symbol(_) => 1,
                                Cell::Empty => 0,
                            })
                            .sum::<u32>()
                    })
                    .unwrap_or(first_symbol)
            }
            Mode::ColorSweep => {
                let mut counts = BTreeMap::new();
                for (_, c) in grid.iter() {
                    if let Some(s) = c.symbol() {
                        *counts.entry(s).or_insert(0usize) += 1;
                    }
                }
                let Some((symbol, _)) = counts.into_iter().max_by_key(|&(_, n)| n) else {
                    return first_symbol;
                };
                grid.iter()
                    .find(|&(_, c)| c == Cell::Symbol(symbol))
                    .map_or(first_symbol, |(p, _)| p)
            }
            Mode::Recolor => grid
                .iter()
                .filter(|(_, c)| c.symbol().is_some_and(|s| s != target))
                .map(|(p, _)| p)
                .find(|&p| {
                    let mut painted = grid.clone();
                    painted.set(p, Cell::Symbol(target));
                    detect::has_runs(&painted)
                })
                .unwrap_or(first_symbol),
        }
    }

    fn handle_outcome(&mut self, result: carnival_cascade::Result<Outcome>) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "input failed");
                self.push_log(e.to_string());
                return;
            }
        };
        match outcome {
            Outcome::Selected(pos) => self.push_log(format!("Selected {pos}.")),
            Outcome::Recruited { pos, cost } => {
                self.push_log(format!("Recruited a blocker at {pos} for {cost}."));
            }
            Outcome::Rejected { reason, penalties } => {
                let text = rejection_text(reason);
                if penalties.is_empty() {
                    self.push_log(text);
                } else {
                    self.push_log(format!("{text} +{} blocker(s).", penalties.len()));
                }
            }
            Outcome::Resolved(turn) => self.report_turn(*turn),
        }
        self.hint = None;
        if self.session.status() == Status::Overrun {
            self.push_log("The board is overrun. Game over.");
        } else if self.session.is_settled() && !self.session.has_moves() {
            info!("board stuck");
            self.push_log("No swap makes a run: r for a new board, s to settle.");
        }
    }

    fn report_turn(&mut self, turn: Turn) {
        let res = &turn.resolution;
        let net = res.score_delta + turn.bonus - turn.action_cost;
        let mut parts = vec![format!("{net:+}")];
        if !turn.mode_cleared.is_empty() {
            parts.push(format!("{} cleared", turn.mode_cleared.len()));
        }
        if res.peak_combo > 1 {
            parts.push(format!("combo x{}", res.peak_combo));
        }
        if !turn.penalties.is_empty() {
            parts.push(format!("+{} blocker(s)", turn.penalties.len()));
        }
        if let Some(target) = turn.target_changed {
            parts.push(format!("target {target:?}"));
        }
        if self.session.mode().is_special() {
            parts.push(self.session.mode().label().to_string());
        }
        self.push_log(parts.join(" · "));

        if self.config.animate && !self.config.pace.is_zero() {
            self.replay = VecDeque::from(turn.resolution.frames);
            self.next_frame(Instant::now());
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        if self.log.len() > LOG_LINES {
            self.log.remove(0);
        }
    }
}

fn rejection_text(reason: Rejection) -> &'static str {
    match reason {
        Rejection::Blocker => "Blockers cannot be moved or recolored.",
        Rejection::EmptyCell => "That cell is empty.",
        Rejection::SameCell => "Pick two different cells.",
        Rejection::NotAdjacent => "Cells must be adjacent (diagonals count).",
        Rejection::NoMatch => "That swap makes no run.",
        Rejection::ModeActive => "A special mode is waiting: tap a cell first.",
        Rejection::NoModeActive => "No special mode is active.",
        Rejection::GameOver => "The game is over.",
        Rejection::Unaffordable => "Not enough score to recruit.",
        Rejection::RecruitDisabled => "These rules have no recruiting.",
        Rejection::NoEligibleCell => "No cell left for a blocker.",
    }
}
