//! Line detection: maximal runs of three or more identical symbols along four axes.

use crate::grid::{Cell, Grid, Pos, Symbol};
use std::collections::BTreeSet;

/// Shortest line that counts as a match.
pub const MIN_RUN: usize = 3;

/// Scan directions: →, ↓, ↘, ↙.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
}

impl Axis {
    pub const ALL: [Self; 4] = [
        Self::Horizontal,
        Self::Vertical,
        Self::Diagonal,
        Self::AntiDiagonal,
    ];

    /// (row step, col step).
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
            Self::Diagonal => (1, 1),
            Self::AntiDiagonal => (1, -1),
        }
    }
}

/// Length class used for scoring and mode requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Three,
    Four,
    FivePlus,
}

impl Tier {
    pub fn of_len(len: usize) -> Option<Self> {
        match len {
            0..MIN_RUN => None,
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            _ => Some(Self::FivePlus),
        }
    }
}

/// One maximal line of a single symbol, cells ordered from its head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub symbol: Symbol,
    pub axis: Axis,
    pub cells: Vec<Pos>,
}

impl Run {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn tier(&self) -> Tier {
        Tier::of_len(self.len()).unwrap_or(Tier::Three)
    }

    pub fn head(&self) -> Option<Pos> {
        self.cells.first().copied()
    }
}

/// All maximal runs on the board, ordered by head position (row-major) then axis.
///
/// A run is only emitted from its head cell, so a run of five is reported once
/// rather than again from its interior. Crossing runs (L, T and X shapes) are
/// reported independently; callers deduplicate at the cell level.
pub fn find_runs(grid: &Grid) -> Vec<Run> {
    let mut runs = Vec::new();
    for pos in grid.positions() {
        let Some(symbol) = grid.get(pos).and_then(Cell::symbol) else {
            continue;
        };
        let same = |p: Pos| grid.get(p) == Some(Cell::Symbol(symbol));
        for axis in Axis::ALL {
            let (dr, dc) = axis.delta();
            if grid.step(pos, -dr, -dc).is_some_and(same) {
                continue;
            }
            let mut cells = vec![pos];
            let mut cur = pos;
            while let Some(next) = grid.step(cur, dr, dc).filter(|p| same(*p)) {
                cells.push(next);
                cur = next;
            }
            if cells.len() >= MIN_RUN {
                runs.push(Run { symbol, axis, cells });
            }
        }
    }
    runs
}

/// True if the board holds at least one run.
pub fn has_runs(grid: &Grid) -> bool {
    !find_runs(grid).is_empty()
}

/// Union of every run's cells; overlapping runs contribute each cell once.
pub fn clear_set(runs: &[Run]) -> BTreeSet<Pos> {
    runs.iter().flat_map(|r| r.cells.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // (c + 2r) mod 7: no two neighbours share a symbol in any direction.
    const BASE: &str = "\
        RYBGWP\n\
        BGWPOR\n\
        WPORYB\n\
        ORYBGW\n\
        YBGWPO\n\
        GWPORY\n\
        PORYBG\n";

    fn grid(text: &str) -> Grid {
        Grid::parse(text).unwrap()
    }

    #[test]
    fn test_base_pattern_is_run_free() {
        assert!(find_runs(&grid(BASE)).is_empty());
    }

    #[test]
    fn test_single_horizontal_three() {
        let g = grid(
            "RYBGWP\n\
             BGWPOR\n\
             WPORYB\n\
             ORYBGW\n\
             YBGWPO\n\
             GWPORY\n\
             RRRYBG\n",
        );
        let runs = find_runs(&g);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].symbol, Symbol::Red);
        assert_eq!(runs[0].axis, Axis::Horizontal);
        assert_eq!(runs[0].tier(), Tier::Three);
        assert_eq!(
            runs[0].cells,
            vec![Pos::new(6, 0), Pos::new(6, 1), Pos::new(6, 2)]
        );
    }

    #[test]
    fn test_long_run_reported_once() {
        let g = grid(
            "YYYYYP\n\
             BGWPOR\n\
             WPORYB\n",
        );
        let runs = find_runs(&g);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 5);
        assert_eq!(runs[0].tier(), Tier::FivePlus);
    }

    #[test]
    fn test_crossing_runs_reported_independently() {
        // L shape sharing the corner at (2,0).
        let g = grid(
            "GYBW\n\
             GPOR\n\
             GGGB\n",
        );
        let runs = find_runs(&g);
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().any(|r| r.axis == Axis::Vertical));
        assert!(runs.iter().any(|r| r.axis == Axis::Horizontal));
        assert_eq!(clear_set(&runs).len(), 5);
    }

    #[test]
    fn test_diagonals() {
        let g = grid(
            "RYB\n\
             GRB\n\
             BYR\n",
        );
        let runs = find_runs(&g);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].axis, Axis::Diagonal);

        let g = grid(
            "YWO\n\
             GOB\n\
             OYR\n",
        );
        let runs = find_runs(&g);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].axis, Axis::AntiDiagonal);
        assert_eq!(runs[0].head(), Some(Pos::new(0, 2)));
    }

    #[test]
    fn test_blockers_and_empties_break_runs() {
        let g = grid(
            "RRXRR\n\
             GG.GG\n\
             XXXBW\n",
        );
        assert!(find_runs(&g).is_empty());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let g = grid(
            "RRRGWP\n\
             BGWPOR\n\
             WPORYB\n\
             ORYBGW\n\
             YBGWPO\n\
             GWPORY\n\
             PORYBG\n",
        );
        assert_eq!(find_runs(&g), find_runs(&g));
    }
}
