//! Mode trigger: which special input mode a pass requests, and how chain
//! charge settles into the next mode once the cascade stops.

use crate::detect::{Run, Tier};

/// Input mode. Special modes consume exactly one tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Idle,
    AreaClear,
    ColorSweep,
    Recolor,
}

impl Mode {
    pub fn is_special(self) -> bool {
        self != Self::Idle
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AreaClear => "💣 area clear",
            Self::ColorSweep => "✨ color sweep",
            Self::Recolor => "🎨 recolor",
        }
    }
}

/// Fold this pass's run sizes into the mode already requested by earlier passes.
/// A five-run asks for ColorSweep; a four-run asks for AreaClear unless ColorSweep
/// is already requested.
pub fn requested_mode(runs: &[Run], forced: Option<Mode>) -> Option<Mode> {
    runs.iter().fold(forced, |mode, run| match run.tier() {
        Tier::FivePlus => Some(Mode::ColorSweep),
        Tier::Four if mode != Some(Mode::ColorSweep) => Some(Mode::AreaClear),
        _ => mode,
    })
}

/// Mode and charge after a cascade settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    pub mode: Mode,
    pub charge: u32,
}

/// Charge converts into Recolor only at the cap and only when no run size forced
/// a mode; otherwise it is clamped to the cap and kept for a later cascade.
pub fn settle(charge: u32, chain_charge: u32, forced: Option<Mode>, cap: u32) -> Settled {
    let next = charge.saturating_add(chain_charge);
    match forced {
        None if next >= cap => Settled {
            mode: Mode::Recolor,
            charge: 0,
        },
        forced => Settled {
            mode: forced.unwrap_or(Mode::Idle),
            charge: next.min(cap),
        },
    }
}
