//! Board model: symbols, cells, positions, gravity and refill.

use crate::error::{Error, Result};
use rand::Rng;
use std::fmt;

/// Matchable ball symbols. Rule sets pick a palette out of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Red,
    Yellow,
    Blue,
    Green,
    White,
    Purple,
    Orange,
}

impl Symbol {
    pub const ALL: [Self; 7] = [
        Self::Red,
        Self::Yellow,
        Self::Blue,
        Self::Green,
        Self::White,
        Self::Purple,
        Self::Orange,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Red => "🔴",
            Self::Yellow => "🟡",
            Self::Blue => "🔵",
            Self::Green => "🟢",
            Self::White => "⚪",
            Self::Purple => "🟣",
            Self::Orange => "🟠",
        }
    }

    /// Single-letter code used by text layouts and rules files.
    pub fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Yellow => 'Y',
            Self::Blue => 'B',
            Self::Green => 'G',
            Self::White => 'W',
            Self::Purple => 'P',
            Self::Orange => 'O',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.letter() == c.to_ascii_uppercase())
    }

    /// Accepts a letter, a glyph or a lowercase name ("red", "yellow", ...).
    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(sym) = Self::from_letter(c) {
                return Some(sym);
            }
        }
        Self::ALL.into_iter().find(|sym| {
            sym.glyph() == s || format!("{:?}", sym).eq_ignore_ascii_case(s)
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Single board cell: empty, a matchable symbol, or a blocker (the joker piece).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Symbol(Symbol),
    Blocker,
}

impl Cell {
    #[inline]
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_blocker(self) -> bool {
        self == Self::Blocker
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Empty => "··",
            Self::Symbol(s) => s.glyph(),
            Self::Blocker => "🤡",
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Symbol(s) => s.letter(),
            Self::Blocker => 'X',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Empty),
            'X' | 'x' => Some(Self::Blocker),
            c => Symbol::from_letter(c).map(Self::Symbol),
        }
    }
}

/// Board coordinate. Row 0 is the top row; gravity pulls toward the last row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Chebyshev distance (king moves).
    pub fn distance(self, other: Self) -> usize {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    /// Distinct and touching, diagonals included.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Fixed-size board. cells[row * cols + col].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Every cell rolled uniformly from `palette`. Blockers are never rolled.
    pub fn random<R: Rng>(rows: usize, cols: usize, palette: &[Symbol], rng: &mut R) -> Self {
        let mut grid = Self::new(rows, cols);
        grid.refill(palette, rng);
        grid
    }

    /// Parse a text layout: one line per row, one letter per cell (R Y B G W P O,
    /// X for a blocker, `.` for empty). Whitespace inside a line is ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for (i, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| {
                    Cell::from_letter(c)
                        .ok_or_else(|| Error::Layout(format!("unknown cell '{}' on line {}", c, i + 1)))
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
        }
        let cols = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || cols == 0 {
            return Err(Error::Layout("empty layout".to_string()));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(Error::Layout(format!(
                "row {} has {} cells, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    pub fn check(&self, pos: Pos) -> Result<()> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                pos,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Cell> {
        self.contains(pos)
            .then(|| self.cells[pos.row * self.cols + pos.col])
    }

    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        if self.contains(pos) {
            self.cells[pos.row * self.cols + pos.col] = cell;
        }
    }

    pub fn swap(&mut self, a: Pos, b: Pos) {
        if self.contains(a) && self.contains(b) {
            self.cells
                .swap(a.row * self.cols + a.col, b.row * self.cols + b.col);
        }
    }

    /// Neighbour one step along (dr, dc), if it is on the board.
    #[inline]
    pub fn step(&self, pos: Pos, dr: isize, dc: isize) -> Option<Pos> {
        let row = pos.row.checked_add_signed(dr)?;
        let col = pos.col.checked_add_signed(dc)?;
        let next = Pos::new(row, col);
        self.contains(next).then_some(next)
    }

    /// Row-major positions.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let cols = self.cols;
        (0..self.rows * self.cols).map(move |i| Pos::new(i / cols, i % cols))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, Cell)> + '_ {
        self.positions().zip(self.cells.iter().copied())
    }

    pub fn count(&self, pred: impl Fn(Cell) -> bool) -> usize {
        self.cells.iter().filter(|c| pred(**c)).count()
    }

    pub fn blocker_count(&self) -> usize {
        self.count(Cell::is_blocker)
    }

    pub fn filled_count(&self) -> usize {
        self.count(|c| !c.is_empty())
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    /// Non-empty cells in one column.
    pub fn column_height(&self, col: usize) -> usize {
        (0..self.rows)
            .filter(|&row| self.get(Pos::new(row, col)).is_some_and(|c| !c.is_empty()))
            .count()
    }

    /// Empty every listed cell. Returns how many were occupied.
    pub fn clear_cells(&mut self, cells: impl IntoIterator<Item = Pos>) -> usize {
        let mut cleared = 0;
        for pos in cells {
            if self.get(pos).is_some_and(|c| !c.is_empty()) {
                self.set(pos, Cell::Empty);
                cleared += 1;
            }
        }
        cleared
    }

    /// Gravity: occupied cells drop to the bottom of each column keeping their
    /// relative order. Returns the number of empty cells left at the top.
    pub fn compact(&mut self) -> usize {
        let mut vacated = 0;
        for col in 0..self.cols {
            let mut write = self.rows;
            for row in (0..self.rows).rev() {
                let cell = self.cells[row * self.cols + col];
                if cell.is_empty() {
                    continue;
                }
                write -= 1;
                if write != row {
                    self.cells[write * self.cols + col] = cell;
                    self.cells[row * self.cols + col] = Cell::Empty;
                }
            }
            vacated += write;
        }
        vacated
    }

    /// Roll a fresh symbol into every empty cell. Returns the refilled positions.
    pub fn refill<R: Rng>(&mut self, palette: &[Symbol], rng: &mut R) -> Vec<Pos> {
        debug_assert!(!palette.is_empty(), "refill needs a non-empty palette");
        if palette.is_empty() {
            return Vec::new();
        }
        let mut filled = Vec::new();
        for pos in self.positions() {
            if self.get(pos) == Some(Cell::Empty) {
                let symbol = palette[rng.random_range(0..palette.len())];
                self.set(pos, Cell::Symbol(symbol));
                filled.push(pos);
            }
        }
        filled
    }

    /// Letter layout accepted by [`Grid::parse`].
    pub fn layout(&self) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for row in self.cells.chunks(self.cols.max(1)) {
            out.extend(row.iter().map(|c| c.letter()));
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..self.cols {
            write!(f, "{:>2} ", col)?;
        }
        writeln!(f)?;
        for (row, cells) in self.cells.chunks(self.cols.max(1)).enumerate() {
            write!(f, "{:>2} ", row)?;
            for cell in cells {
                write!(f, "{} ", cell.glyph())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
