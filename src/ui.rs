//! Layout and drawing: board, sidebar, settlement popup and the clear fade.

use crate::app::Screen;
use carnival_cascade::cascade::Phase;
use carnival_cascade::hint::Move;
use carnival_cascade::{Cell, Grid, Mode, Pos, Session, Status, Symbol, Venue};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is three terminal columns: pad, glyph, pad.
const CELL_WIDTH: u16 = 3;
pub const SIDEBAR_WIDTH: u16 = 28;
const SIDEBAR_HEIGHT: u16 = 28;
const CLEAR_FADE_MS: u32 = 140;
const BG: Color = Color::Black;
const TITLE: Color = Color::Cyan;
const FG: Color = Color::Gray;
const DIV_LINE: Color = Color::DarkGray;

/// Everything the draw pass reads. `grid` is either a replayed cascade frame or the live board.
pub struct View<'a> {
    pub session: &'a Session,
    pub screen: Screen,
    pub grid: &'a Grid,
    pub phase: Option<(usize, Phase)>,
    pub cursor: Pos,
    pub hint: Option<&'a Move>,
    pub log: &'a [String],
    pub venue: Venue,
    pub autoplay: Option<u32>,
    pub animate: bool,
}

/// Fade over the holes of a Cleared frame. Reset whenever a new frame is shown.
#[derive(Default)]
pub struct ClearFade {
    effect: Option<Effect>,
    last: Option<Instant>,
}

impl ClearFade {
    pub fn reset(&mut self) {
        self.effect = None;
        self.last = None;
    }
}

pub fn symbol_color(symbol: Symbol) -> Color {
    match symbol {
        Symbol::Red => Color::Red,
        Symbol::Yellow => Color::Yellow,
        Symbol::Blue => Color::Blue,
        Symbol::Green => Color::Green,
        Symbol::White => Color::White,
        Symbol::Purple => Color::Magenta,
        Symbol::Orange => Color::Rgb(255, 140, 0),
    }
}

/// The board as a widget: one `●` per symbol, `X` for blockers, `·` for holes.
pub struct BoardWidget<'a> {
    grid: &'a Grid,
    target: Symbol,
    cursor: Option<Pos>,
    selected: Option<Pos>,
    hint: Option<(Pos, Pos)>,
    burst: bool,
}

impl<'a> BoardWidget<'a> {
    pub fn new(grid: &'a Grid, target: Symbol) -> Self {
        Self {
            grid,
            target,
            cursor: None,
            selected: None,
            hint: None,
            burst: false,
        }
    }

    pub fn cursor(mut self, pos: Option<Pos>) -> Self {
        self.cursor = pos;
        self
    }

    pub fn selected(mut self, pos: Option<Pos>) -> Self {
        self.selected = pos;
        self
    }

    pub fn hint(mut self, hint: Option<&Move>) -> Self {
        self.hint = hint.map(|m| (m.from, m.to));
        self
    }

    /// Draw holes as bursts (the Cleared phase of a cascade).
    pub fn burst(mut self, burst: bool) -> Self {
        self.burst = burst;
        self
    }
}

impl Widget for BoardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (pos, cell) in self.grid.iter() {
            let Some((x, y)) = cell_origin(area, pos) else {
                continue;
            };
            let (text, mut style) = match cell {
                Cell::Symbol(s) => {
                    let style = Style::default().fg(symbol_color(s));
                    if s == self.target {
                        (" ● ", style.add_modifier(Modifier::BOLD))
                    } else {
                        (" ● ", style)
                    }
                }
                Cell::Blocker => (
                    " X ",
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Cell::Empty if self.burst => (" ✸ ", Style::default().fg(Color::LightYellow)),
                Cell::Empty => (" · ", Style::default().fg(DIV_LINE)),
            };
            if self.hint.is_some_and(|(a, b)| pos == a || pos == b) {
                style = style.bg(Color::DarkGray);
            }
            if Some(pos) == self.selected {
                style = style.bg(Color::Gray);
            }
            if Some(pos) == self.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            buf.set_string(x, y, text, style);
        }
    }
}

/// Top-left buffer position of a board cell, if it fits in `area`.
fn cell_origin(area: Rect, pos: Pos) -> Option<(u16, u16)> {
    let x = area.x + (pos.col as u16) * CELL_WIDTH;
    let y = area.y + pos.row as u16;
    (x + CELL_WIDTH <= area.right() && y < area.bottom()).then_some((x, y))
}

/// Board size in terminal cells, border included.
fn board_size(grid: &Grid) -> (u16, u16) {
    (grid.cols() as u16 * CELL_WIDTH + 2, grid.rows() as u16 + 2)
}

/// Draw the current screen; the settlement popup goes over the game.
pub fn draw(frame: &mut Frame, view: &View, fade: &mut ClearFade, now: Instant) {
    let area = frame.area();
    let board_rect = draw_game(frame, view, area);
    if view.animate && matches!(view.phase, Some((_, Phase::Cleared))) {
        apply_clear_effect(frame, view.grid, board_rect, fade, now);
    }
    if view.screen == Screen::Settlement {
        draw_settlement(frame, view, area);
    }
}

/// Returns the inner board rect.
fn draw_game(frame: &mut Frame, view: &View, area: Rect) -> Rect {
    let (bw, bh) = board_size(view.grid);
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);

    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh.max(SIDEBAR_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);
    let board_area = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };

    let board_rect = draw_board(frame, view, board_area);
    draw_sidebar(frame, view, inner[1]);
    board_rect
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) -> Rect {
    let session = view.session;
    let mode = session.mode();
    let (title, border) = match (view.phase, mode) {
        (Some((pass, phase)), _) => (
            format!(" pass {pass} · {} ", phase_label(phase)),
            Style::default().fg(Color::LightYellow).bg(BG),
        ),
        (None, Mode::Idle) => (
            " Carnival Cascade ".to_string(),
            Style::default().fg(DIV_LINE).bg(BG),
        ),
        (None, mode) => (
            format!(" {}: tap a cell ", mode.label()),
            Style::default().fg(Color::Yellow).bg(BG),
        ),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(title, Style::default().fg(TITLE)));
    let board_rect = block.inner(area);
    block.render(area, frame.buffer_mut());

    let live = view.phase.is_none();
    BoardWidget::new(view.grid, session.target())
        .cursor(live.then_some(view.cursor))
        .selected(session.selected().filter(|_| live))
        .hint(view.hint.filter(|_| live))
        .burst(matches!(view.phase, Some((_, Phase::Cleared))))
        .render(board_rect, frame.buffer_mut());
    board_rect
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Cleared => "cleared",
        Phase::Compacted => "falling",
        Phase::Refilled => "refilled",
        Phase::Settled => "settled",
    }
}

fn bordered() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIV_LINE).bg(BG))
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let title_style = Style::default().fg(TITLE);
    let fg_style = Style::default().fg(FG);
    let session = view.session;
    let rules = session.rules();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(3), // Charge
            Constraint::Length(1), // gap
            Constraint::Length(7), // Log
            Constraint::Length(1), // gap
            Constraint::Length(7), // Keys
        ])
        .split(area);

    // --- Stats ---
    let stats_block = bordered().title(Span::styled("Stats", title_style));
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let target = session.target();
    let blockers = match rules.blocker_limit {
        Some(limit) => format!("{}/{limit}", session.blocker_count()),
        None => session.blocker_count().to_string(),
    };
    let mode = match (session.mode(), view.autoplay) {
        (m, Some(left)) => format!("{} · auto {left}", m.label()),
        (m, None) => m.label().to_string(),
    };
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats_lines = vec![
        stat("Score: ", session.score().to_string()),
        Line::from(vec![
            Span::styled("Target: ", title_style),
            Span::styled("● ", Style::default().fg(symbol_color(target))),
            Span::styled(format!("{target:?}"), fg_style),
        ]),
        stat("Mode: ", mode),
        stat("Moves: ", session.moves().to_string()),
        stat("Blockers: ", blockers),
        stat("Peak combo: ", format!("x{}", session.peak_combo())),
    ];
    Paragraph::new(stats_lines).render(stats_inner, frame.buffer_mut());

    // --- Charge ---
    let cap = rules.charge.cap.max(1);
    let charge = session.charge().min(cap);
    let charge_block = bordered().title(Span::styled("Charge", title_style));
    let charge_inner = charge_block.inner(chunks[2]);
    charge_block.render(chunks[2], frame.buffer_mut());
    let color = if charge == cap {
        Color::LightMagenta
    } else {
        Color::Magenta
    };
    Gauge::default()
        .ratio(f64::from(charge) / f64::from(cap))
        .label(format!("{charge}/{cap}"))
        .gauge_style(Style::default().fg(color).bg(BG))
        .render(charge_inner, frame.buffer_mut());

    // --- Log ---
    let log_block = bordered().title(Span::styled("Log", title_style));
    let log_inner = log_block.inner(chunks[4]);
    log_block.render(chunks[4], frame.buffer_mut());
    let log_lines: Vec<Line> = view
        .log
        .iter()
        .map(|l| Line::from(Span::styled(l.as_str(), fg_style)))
        .collect();
    Paragraph::new(log_lines)
        .wrap(Wrap { trim: true })
        .render(log_inner, frame.buffer_mut());

    // --- Keys ---
    let keys_block = bordered().title(Span::styled("Keys", title_style));
    let keys_inner = keys_block.inner(chunks[6]);
    keys_block.render(chunks[6], frame.buffer_mut());
    let keys = [
        ("←↑↓→/hjkl ", "move"),
        ("⏎/space   ", "tap"),
        ("?/i hint  ", "b recruit"),
        ("a auto    ", "s settle"),
        ("r new     ", "q quit"),
    ];
    let key_lines: Vec<Line> = keys
        .iter()
        .map(|&(k, v)| {
            Line::from(vec![
                Span::styled(k, title_style),
                Span::styled(v, fg_style),
            ])
        })
        .collect();
    Paragraph::new(key_lines).render(keys_inner, frame.buffer_mut());
}

fn draw_settlement(frame: &mut Frame, view: &View, area: Rect) {
    let popup_w = 38u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let st = view.session.settlement(view.venue);
    let fg_style = Style::default().fg(FG);
    let row = |label: &str, value: String| {
        Line::from(Span::styled(format!("{label:<20}{value:>10}"), fg_style))
    };
    let headline = if view.session.status() == Status::Overrun {
        Span::styled(
            " The board is overrun ",
            Style::default().fg(Color::Black).bg(Color::Red),
        )
    } else {
        Span::styled(
            format!(" {} show ", view.venue.name()),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )
    };
    let verdict = if st.success {
        Span::styled("The show goes on!", Style::default().fg(Color::Green))
    } else {
        Span::styled("The circus is broke.", Style::default().fg(Color::Red))
    };
    let lines = vec![
        Line::from(headline),
        Line::from(""),
        row("Blockers", format!("{}/{}", st.blockers, st.required)),
        row("Troupe cost", st.base_cost.to_string()),
        row("Shortfall penalty", st.shortfall_penalty.to_string()),
        row("Surplus bonus", format!("-{}", st.surplus_bonus)),
        row("Total debt", st.total_debt.to_string()),
        row("Score", st.score.to_string()),
        row("Net", st.net.to_string()),
        Line::from(""),
        Line::from(verdict),
        Line::from(""),
        Line::from(Span::styled(
            " R — New game    Q — Quit ",
            Style::default().fg(TITLE),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(DIV_LINE).bg(BG))
                .title(Span::styled(" Settlement ", Style::default().fg(TITLE))),
        )
        .render(popup, frame.buffer_mut());
}

/// Buffer positions covered by the holes of `grid`.
fn hole_positions(board_rect: Rect, grid: &Grid) -> HashSet<(u16, u16)> {
    grid.iter()
        .filter(|(_, c)| c.is_empty())
        .filter_map(|(pos, _)| cell_origin(board_rect, pos))
        .flat_map(|(x, y)| (x..x + CELL_WIDTH).map(move |x| (x, y)))
        .collect()
}

/// Fade the bursts of a Cleared frame to the background.
fn apply_clear_effect(
    frame: &mut Frame,
    grid: &Grid,
    board_rect: Rect,
    fade: &mut ClearFade,
    now: Instant,
) {
    let delta = fade
        .last
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    fade.last = Some(now);

    if fade.effect.is_none() {
        let holes = hole_positions(board_rect, grid);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            holes.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(BG, BG, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        fade.effect = Some(effect);
    }

    if let Some(effect) = &mut fade.effect {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
}
