// Invariants checked over many seeded games: settled boards, full columns,
// combo counting and detection idempotence.

use carnival_cascade::detect;
use carnival_cascade::{Grid, Outcome, Phase, RuleSet, Session, Status, Variant};

const VARIANTS: [Variant; 5] = [
    Variant::Carnival,
    Variant::Classic,
    Variant::FreeJoker,
    Variant::Joker,
    Variant::Finale,
];

/// Occupied cells of every column sit in one block at the bottom.
fn columns_compacted(grid: &Grid) -> bool {
    (0..grid.cols()).all(|col| {
        let height = grid.column_height(col);
        (grid.rows() - height..grid.rows())
            .all(|row| grid.get(carnival_cascade::Pos::new(row, col)).is_some_and(|c| !c.is_empty()))
    })
}

/// Play up to `moves` turns: best swap when idle, first symbol cell when a mode is pending.
fn play(session: &mut Session, moves: usize, mut check: impl FnMut(&Session, &Outcome)) {
    for _ in 0..moves {
        if session.status() == Status::Overrun {
            break;
        }
        let outcome = if session.mode().is_special() {
            let tap = session
                .grid()
                .iter()
                .find(|(_, c)| c.symbol().is_some())
                .map(|(p, _)| p)
                .unwrap();
            session.apply_mode(tap).unwrap()
        } else {
            let Some(m) = session.best_move() else {
                break;
            };
            session.attempt_swap(m.from, m.to).unwrap()
        };
        check(session, &outcome);
    }
}

#[test]
fn new_boards_have_no_runs() {
    for variant in VARIANTS {
        for seed in 0..25 {
            let s = Session::new(RuleSet::preset(variant), Some(seed)).unwrap();
            assert!(
                !detect::has_runs(s.grid()),
                "{variant:?} seed {seed} starts with a run:\n{}",
                s.grid()
            );
            assert!(s.grid().is_full());
            assert_eq!(s.grid().blocker_count(), 0);
        }
    }
}

#[test]
fn every_resolution_reaches_a_fixed_point() {
    for variant in VARIANTS {
        for seed in 0..8 {
            let mut s = Session::new(RuleSet::preset(variant), Some(seed)).unwrap();
            play(&mut s, 25, |s, outcome| {
                if let Some(turn) = outcome.turn() {
                    assert!(!detect::has_runs(&turn.resolution.grid));
                    assert_eq!(&turn.resolution.grid, s.grid());
                    assert!(s.grid().is_full());
                    assert!(s.charge() <= s.rules().charge.cap);
                    assert_eq!(s.combo(), 0);
                }
            });
        }
    }
}

#[test]
fn combo_counts_passes_within_a_resolution() {
    for seed in 0..12 {
        let mut s = Session::new(RuleSet::default(), Some(seed)).unwrap();
        play(&mut s, 30, |_, outcome| {
            if let Some(turn) = outcome.turn() {
                for (i, pass) in turn.resolution.passes.iter().enumerate() {
                    assert_eq!(pass.combo as usize, i + 1);
                    assert!(!pass.runs.is_empty());
                    assert!(pass.cleared.len() >= 3);
                }
                assert_eq!(turn.resolution.combo, 0);
                assert_eq!(
                    turn.resolution.peak_combo as usize,
                    turn.resolution.passes.len()
                );
            }
        });
    }
}

#[test]
fn frames_keep_columns_full() {
    for seed in 0..10 {
        let mut s = Session::new(RuleSet::default(), Some(seed)).unwrap();
        play(&mut s, 20, |_, outcome| {
            let Some(turn) = outcome.turn() else {
                return;
            };
            let frames = &turn.resolution.frames;
            assert_eq!(frames.last().map(|f| f.phase), Some(Phase::Settled));
            for pair in frames.windows(2) {
                let (before, after) = (&pair[0], &pair[1]);
                match after.phase {
                    Phase::Compacted => {
                        assert_eq!(before.phase, Phase::Cleared);
                        assert_eq!(before.grid.filled_count(), after.grid.filled_count());
                        assert!(columns_compacted(&after.grid));
                    }
                    Phase::Refilled => {
                        assert_eq!(before.phase, Phase::Compacted);
                        assert!(after.grid.is_full());
                        assert_eq!(before.grid.blocker_count(), after.grid.blocker_count());
                    }
                    Phase::Cleared | Phase::Settled => {
                        assert!(before.grid.is_full());
                    }
                }
            }
        });
    }
}

#[test]
fn detection_is_idempotent() {
    for seed in 0..10 {
        let mut s = Session::new(RuleSet::default(), Some(seed)).unwrap();
        play(&mut s, 5, |_, outcome| {
            if let Some(turn) = outcome.turn() {
                for frame in &turn.resolution.frames {
                    assert_eq!(detect::find_runs(&frame.grid), detect::find_runs(&frame.grid));
                }
            }
        });
    }
}

#[test]
fn snapshot_round_trip_preserves_state() {
    let mut s = Session::new(RuleSet::preset(Variant::Joker), Some(3)).unwrap();
    play(&mut s, 6, |_, _| {});
    let snap = s.snapshot();
    let restored = Session::restore(RuleSet::preset(Variant::Joker), snap.clone(), Some(3)).unwrap();
    assert_eq!(restored.snapshot(), snap);
}
