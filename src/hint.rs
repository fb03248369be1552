//! Legal-move search: which adjacent swaps would produce at least one run.

use crate::detect;
use crate::grid::{Cell, Grid, Pos, Symbol};

/// Forward neighbours only, so each unordered pair is visited once: →, ↓, ↘, ↙.
const FORWARD: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A swap that produces runs, with enough detail to rank it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Pos,
    pub to: Pos,
    pub runs: usize,
    pub longest: usize,
    pub hits_target: bool,
}

fn swappable(cell: Option<Cell>) -> Option<Symbol> {
    cell.and_then(Cell::symbol)
}

/// Every swap of two adjacent symbols that creates at least one run.
pub fn legal_moves(grid: &Grid, target: Symbol) -> Vec<Move> {
    let mut moves = Vec::new();
    let mut trial = grid.clone();
    for from in grid.positions() {
        let Some(a) = swappable(grid.get(from)) else {
            continue;
        };
        for (dr, dc) in FORWARD {
            let Some(to) = grid.step(from, dr, dc) else {
                continue;
            };
            let Some(b) = swappable(grid.get(to)) else {
                continue;
            };
            if a == b {
                continue;
            }
            trial.swap(from, to);
            let runs = detect::find_runs(&trial);
            trial.swap(from, to);
            if runs.is_empty() {
                continue;
            }
            moves.push(Move {
                from,
                to,
                runs: runs.len(),
                longest: runs.iter().map(detect::Run::len).max().unwrap_or(0),
                hits_target: runs.iter().any(|r| r.symbol == target),
            });
        }
    }
    moves
}

/// Highest-ranked legal move: longest run first, then target hits, then run count.
pub fn best_move(grid: &Grid, target: Symbol) -> Option<Move> {
    legal_moves(grid, target)
        .into_iter()
        .max_by_key(|m| (m.longest, m.hits_target, m.runs))
}

/// True if the board still has a legal swap.
pub fn has_moves(grid: &Grid) -> bool {
    // The target only affects ranking.
    !legal_moves(grid, Symbol::Red).is_empty()
}
