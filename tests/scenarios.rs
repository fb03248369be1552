// Scenario tests driving the public session API on hand-built boards.
// Every board below starts from a run-free 7x6 pattern (value (col + 2*row) mod 7).

use carnival_cascade::cascade::{self, CascadeContext};
use carnival_cascade::detect::{self, Axis, Tier};
use carnival_cascade::trigger;
use carnival_cascade::{
    Cell, Error, Grid, Mode, Outcome, Phase, Pos, Rejection, RuleSet, Session, Snapshot, Status,
    Symbol, Variant,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const BASE: &str = "RYBGWP\nBGWPOR\nWPORYB\nORYBGW\nYBGWPO\nGWPORY\nPORYBG\n";

/// BASE with the last rows replaced.
fn board(tail: &[&str]) -> Grid {
    let mut rows: Vec<&str> = BASE.lines().collect();
    let start = rows.len() - tail.len();
    rows[start..].copy_from_slice(tail);
    Grid::parse(&rows.join("\n")).unwrap()
}

fn with_blockers(mut grid: Grid, at: &[Pos]) -> Grid {
    for &pos in at {
        grid.set(pos, Cell::Blocker);
    }
    grid
}

fn session(rules: RuleSet, snapshot: Snapshot) -> Session {
    Session::restore(rules, snapshot, Some(7)).unwrap()
}

/// Default rules on a smaller board.
fn small(rows: usize, cols: usize) -> RuleSet {
    RuleSet {
        rows,
        cols,
        ..RuleSet::default()
    }
}

fn turn(outcome: &Outcome) -> &carnival_cascade::Turn {
    outcome
        .turn()
        .unwrap_or_else(|| panic!("expected a resolved turn, got {outcome:?}"))
}

#[test]
fn single_horizontal_run_scores_base_value() {
    let grid = board(&["RRRYBG"]);
    let runs = detect::find_runs(&grid);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].symbol, Symbol::Red);
    assert_eq!(runs[0].axis, Axis::Horizontal);
    assert_eq!(runs[0].tier(), Tier::Three);

    let rules = RuleSet::default();
    let ctx = CascadeContext {
        combo: 0,
        charge: 0,
        forced: None,
        target: Symbol::Blue,
        target_cleared: false,
    };
    let mut rng = StdRng::seed_from_u64(1);
    let res = cascade::resolve(grid, ctx, &rules, &mut rng).unwrap();
    let first = &res.passes[0];
    assert_eq!(first.combo, 1);
    assert_eq!(first.score, 100);
    assert_eq!(
        first.cleared,
        vec![Pos::new(6, 0), Pos::new(6, 1), Pos::new(6, 2)]
    );
    assert!(!detect::has_runs(&res.grid));
}

#[test]
fn four_run_swap_requests_area_clear() {
    // On a 4x4 board no refill can line up five, so the mode cannot escalate.
    let grid = Grid::parse("YBGW\nPOYB\nGWRP\nRROR\n").unwrap();
    assert!(!detect::has_runs(&grid));
    let mut s = session(small(4, 4), Snapshot::new(grid, Symbol::Blue));

    let out = s.attempt_swap(Pos::new(2, 2), Pos::new(3, 2)).unwrap();
    let t = turn(&out);
    let first = &t.resolution.passes[0];
    assert_eq!(first.runs.len(), 1);
    assert_eq!(first.runs[0].len(), 4);
    assert_eq!(first.requested, Some(Mode::AreaClear));
    assert_eq!(first.score, 400);
    assert_eq!(s.mode(), Mode::AreaClear);
    assert!(!s.is_settled());
    assert!(!detect::has_runs(s.grid()));
}

#[test]
fn swap_making_five_and_four_enters_color_sweep() {
    // Row 5 becomes WWWW and row 6 RRRRR with one swap.
    let grid = board(&["WWRWOY", "RRWRRG"]);
    assert!(!detect::has_runs(&grid));
    let mut s = session(RuleSet::default(), Snapshot::new(grid, Symbol::Red));

    let out = s.attempt_swap(Pos::new(5, 2), Pos::new(6, 2)).unwrap();
    let first = &turn(&out).resolution.passes[0];
    let mut lens: Vec<usize> = first.runs.iter().map(|r| r.len()).collect();
    lens.sort();
    assert_eq!(lens, vec![4, 5]);
    assert_eq!(first.requested, Some(Mode::ColorSweep));
    assert_eq!(first.score, 1200 + 400);
    assert_eq!(s.mode(), Mode::ColorSweep);
}

#[test]
fn five_run_outranks_four_run_in_same_pass() {
    let mut grid = board(&["GWOORY", "RRRRBG"]);
    for (col, letter) in "YYYYYP".chars().enumerate() {
        grid.set(Pos::new(0, col), Cell::from_letter(letter).unwrap());
    }
    let runs = detect::find_runs(&grid);
    assert_eq!(
        trigger::requested_mode(&runs, None),
        Some(Mode::ColorSweep)
    );
}

#[test]
fn target_runs_charge_double() {
    // Swapping (5,2) and (6,2) makes exactly one red three-run on the bottom row.
    let grid = board(&["GWRORY", "RROYBG"]);
    assert!(!detect::has_runs(&grid));

    let mut plain = session(RuleSet::default(), Snapshot::new(grid.clone(), Symbol::Blue));
    let out = plain.attempt_swap(Pos::new(5, 2), Pos::new(6, 2)).unwrap();
    let first = &turn(&out).resolution.passes[0];
    assert_eq!(first.charge, 1);
    assert!(!first.target_matched);

    let mut targeted = session(RuleSet::default(), Snapshot::new(grid, Symbol::Red));
    let out = targeted.attempt_swap(Pos::new(5, 2), Pos::new(6, 2)).unwrap();
    let t = turn(&out);
    assert_eq!(t.resolution.passes[0].charge, 2);
    assert!(t.resolution.passes[0].target_matched);
    assert!(t.target_changed.is_some());
}

#[test]
fn full_charge_without_forced_mode_enters_recolor() {
    // A 3x3 board only ever holds three-runs, so no pass can force a mode.
    let grid = Grid::parse("YBG\nWPR\nRRO\n").unwrap();
    assert!(!detect::has_runs(&grid));
    let snap = Snapshot {
        charge: 4,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(small(3, 3), snap);
    let out = s.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
    let res = &turn(&out).resolution;
    assert_eq!(res.passes[0].charge, 2);
    assert!(res.passes.iter().all(|p| p.requested.is_none()));
    assert_eq!(s.mode(), Mode::Recolor);
    assert_eq!(s.charge(), 0);

    let settled = trigger::settle(4, 2, None, 5);
    assert_eq!((settled.mode, settled.charge), (Mode::Recolor, 0));
}

#[test]
fn color_sweep_clears_symbol_and_blockers() {
    let grid = with_blockers(board(&[]), &[Pos::new(0, 0), Pos::new(3, 3)]);
    let mut expected: Vec<Pos> = grid
        .iter()
        .filter(|&(_, c)| c == Cell::Symbol(Symbol::Yellow) || c.is_blocker())
        .map(|(p, _)| p)
        .collect();
    expected.sort();
    assert_eq!(expected.len(), 8);

    let snap = Snapshot {
        mode: Mode::ColorSweep,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(RuleSet::default(), snap);
    let out = s.apply_mode(Pos::new(0, 1)).unwrap();
    let t = turn(&out);

    let mut cleared = t.mode_cleared.clone();
    cleared.sort();
    assert_eq!(cleared, expected);
    assert_eq!(t.bonus, 2000);

    let holes = &t.resolution.frames[0];
    assert_eq!((holes.pass, holes.phase), (0, Phase::Cleared));
    assert!(expected.iter().all(|&p| holes.grid.get(p) == Some(Cell::Empty)));
    assert_eq!(holes.grid.blocker_count(), 0);
    assert!(s.grid().is_full());
}

#[test]
fn color_sweep_on_blocker_clears_only_blockers() {
    let grid = with_blockers(board(&[]), &[Pos::new(0, 0), Pos::new(3, 3)]);
    let snap = Snapshot {
        mode: Mode::ColorSweep,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(RuleSet::default(), snap);
    let out = s.click(Pos::new(3, 3)).unwrap();
    let mut cleared = turn(&out).mode_cleared.clone();
    cleared.sort();
    assert_eq!(cleared, vec![Pos::new(0, 0), Pos::new(3, 3)]);
}

#[test]
fn swap_without_run_reverts_and_places_one_blocker() {
    let grid = board(&[]);
    let mut s = session(RuleSet::default(), Snapshot::new(grid.clone(), Symbol::Red));

    let out = s.attempt_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::NoMatch));
    let penalties = out.penalties();
    assert_eq!(penalties.len(), 1);
    let hit = penalties[0];
    assert!(!grid.get(hit).unwrap().is_blocker());

    for pos in grid.positions() {
        if pos == hit {
            assert_eq!(s.grid().get(pos), Some(Cell::Blocker));
        } else {
            assert_eq!(s.grid().get(pos), grid.get(pos));
        }
    }
    assert_eq!(s.score(), 0);
    assert!(s.is_settled());
}

#[test]
fn area_clear_removes_square_neighbourhood() {
    let snap = Snapshot {
        mode: Mode::AreaClear,
        ..Snapshot::new(board(&[]), Symbol::Red)
    };
    let mut s = session(RuleSet::default(), snap);
    let out = s.apply_mode(Pos::new(3, 3)).unwrap();
    let t = turn(&out);
    assert_eq!(t.mode_cleared.len(), 25);
    assert!(t.mode_cleared.iter().all(|p| p.distance(Pos::new(3, 3)) <= 2));
    assert_eq!(t.bonus, 800);
    assert_eq!(t.resolution.frames[0].grid.filled_count(), 42 - 25);
}

#[test]
fn free_joker_bomb_clears_five_by_five_with_blockers() {
    let grid = with_blockers(board(&[]), &[Pos::new(1, 1), Pos::new(0, 0)]);
    let snap = Snapshot {
        mode: Mode::AreaClear,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(RuleSet::preset(Variant::FreeJoker), snap);
    let out = s.apply_mode(Pos::new(2, 2)).unwrap();
    let t = turn(&out);
    assert_eq!(t.mode_cleared.len(), 25);
    assert!(t.mode_cleared.contains(&Pos::new(0, 0)));
    assert!(t.mode_cleared.contains(&Pos::new(1, 1)));
    assert_eq!(t.bonus, 800);
    assert_eq!(t.action_cost, 0);
    assert_eq!(t.resolution.frames[0].grid.blocker_count(), 0);
}

#[test]
fn removed_blockers_pay_exit_bonus() {
    let grid = with_blockers(board(&[]), &[Pos::new(3, 3)]);
    let snap = Snapshot {
        mode: Mode::AreaClear,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(RuleSet::preset(Variant::Finale), snap);
    let out = s.apply_mode(Pos::new(3, 3)).unwrap();
    let t = turn(&out);
    assert_eq!(t.mode_cleared, vec![Pos::new(3, 3)]);
    assert_eq!(t.action_cost, 50);
    assert_eq!(t.bonus, 500);
    assert_eq!(t.score, t.resolution.score_delta + 500 - 50);
}

#[test]
fn recolor_paints_target_and_rolls_new_one() {
    let grid = with_blockers(board(&[]), &[Pos::new(3, 3)]);
    let snap = Snapshot {
        mode: Mode::Recolor,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(RuleSet::default(), snap);

    let out = s.apply_mode(Pos::new(3, 3)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::Blocker));
    assert_eq!(s.mode(), Mode::Recolor);

    let out = s.apply_mode(Pos::new(0, 1)).unwrap();
    let t = turn(&out);
    assert!(t.resolution.passes.is_empty());
    assert!(t.target_changed.is_some());
    assert_eq!(s.grid().get(Pos::new(0, 1)), Some(Cell::Symbol(Symbol::Red)));
    assert!(s.is_settled());
}

#[test]
fn blocker_taps_are_refused() {
    let grid = with_blockers(board(&[]), &[Pos::new(2, 2)]);
    let mut s = session(RuleSet::default(), Snapshot::new(grid.clone(), Symbol::Red));

    assert_eq!(s.click(Pos::new(1, 1)).unwrap(), Outcome::Selected(Pos::new(1, 1)));
    let out = s.click(Pos::new(2, 2)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::Blocker));
    assert_eq!(s.selected(), Some(Pos::new(1, 1)));
    assert_eq!(s.grid(), &grid);

    let out = s.attempt_swap(Pos::new(2, 2), Pos::new(2, 3)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::Blocker));
    assert!(out.penalties().is_empty());
}

#[test]
fn non_adjacent_second_tap_moves_selection() {
    let mut s = session(RuleSet::default(), Snapshot::new(board(&[]), Symbol::Red));
    s.click(Pos::new(0, 0)).unwrap();
    assert_eq!(s.click(Pos::new(4, 4)).unwrap(), Outcome::Selected(Pos::new(4, 4)));
    assert_eq!(s.grid().blocker_count(), 0);

    let out = s.attempt_swap(Pos::new(0, 0), Pos::new(2, 2)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::NotAdjacent));
    assert_eq!(out.penalties().len(), 1);
}

#[test]
fn swaps_locked_while_mode_pending() {
    let snap = Snapshot {
        mode: Mode::AreaClear,
        ..Snapshot::new(board(&["GWRORY", "RRORBG"]), Symbol::Red)
    };
    let mut s = session(RuleSet::default(), snap);
    let out = s.attempt_swap(Pos::new(5, 2), Pos::new(6, 2)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::ModeActive));

    let mut idle = session(RuleSet::default(), Snapshot::new(board(&[]), Symbol::Red));
    let out = idle.apply_mode(Pos::new(0, 0)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::NoModeActive));
}

#[test]
fn overrun_ends_the_game() {
    let mut rules = RuleSet::preset(Variant::Classic);
    rules.blocker_limit = Some(2);
    let mut s = session(rules, Snapshot::new(board(&[]), Symbol::Red));

    let out = s.attempt_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
    assert_eq!(out.penalties().len(), 2);
    assert_eq!(s.status(), Status::Overrun);
    assert!(!s.is_settled());

    let out = s.click(Pos::new(1, 1)).unwrap();
    assert_eq!(out.rejection(), Some(Rejection::GameOver));
}

#[test]
fn recruiting_costs_score() {
    let snap = Snapshot {
        score: 1500,
        ..Snapshot::new(board(&[]), Symbol::Red)
    };
    let mut s = session(RuleSet::preset(Variant::Joker), snap);

    let out = s.recruit_blocker().unwrap();
    assert!(matches!(out, Outcome::Recruited { cost: 1000, .. }));
    assert_eq!(s.score(), 500);
    assert_eq!(s.blocker_count(), 1);

    let out = s.recruit_blocker().unwrap();
    assert_eq!(out.rejection(), Some(Rejection::Unaffordable));
    assert_eq!(s.blocker_count(), 1);
}

#[test]
fn accepted_actions_pay_per_blocker() {
    let grid = with_blockers(
        board(&["GWRORY", "RRORBG"]),
        &[Pos::new(0, 0), Pos::new(0, 5)],
    );
    let mut s = session(RuleSet::preset(Variant::Joker), Snapshot::new(grid, Symbol::Red));
    let out = s.attempt_swap(Pos::new(5, 2), Pos::new(6, 2)).unwrap();
    assert_eq!(turn(&out).action_cost, 100);
}

#[test]
fn failed_swap_cascade_leaves_session_untouched() {
    // The swap makes RRR on row 6; after it drops, row 6 reads GWWW, which needs
    // a second pass.
    let grid = board(&["GWRORY", "RRWWBG"]);
    assert!(!detect::has_runs(&grid));
    let rules = RuleSet {
        max_cascade_passes: 1,
        ..RuleSet::default()
    };
    let snap = Snapshot {
        charge: 3,
        score: 250,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(rules, snap.clone());
    s.click(Pos::new(5, 2)).unwrap();

    let err = s.click(Pos::new(6, 2)).unwrap_err();
    assert!(matches!(err, Error::CascadeDepth { passes: 1 }));
    assert_eq!(s.grid(), &snap.grid);
    assert_eq!(s.mode(), Mode::Idle);
    assert_eq!(s.score(), 250);
    assert_eq!(s.charge(), 3);
    assert_eq!(s.target(), Symbol::Red);
    assert_eq!(s.moves(), 0);
    assert_eq!(s.snapshot(), Snapshot { selected: Some(Pos::new(5, 2)), ..snap });
    assert!(s.is_settled());
}

#[test]
fn failed_mode_cascade_keeps_mode_pending() {
    // Recoloring (6,2) red makes RRR; the drop then lines up WWW.
    let grid = board(&["GWWORY", "RRPWBG"]);
    assert!(!detect::has_runs(&grid));
    let rules = RuleSet {
        max_cascade_passes: 1,
        ..RuleSet::default()
    };
    let snap = Snapshot {
        mode: Mode::Recolor,
        ..Snapshot::new(grid, Symbol::Red)
    };
    let mut s = session(rules, snap.clone());

    let err = s.apply_mode(Pos::new(6, 2)).unwrap_err();
    assert!(matches!(err, Error::CascadeDepth { passes: 1 }));
    assert_eq!(s.mode(), Mode::Recolor);
    assert_eq!(s.grid().get(Pos::new(6, 2)), Some(Cell::Symbol(Symbol::Purple)));
    assert_eq!(s.snapshot(), snap);
}
