//! End-of-game ledger: what the troupe on the board costs against the score earned.

use crate::rules::{SettlementRules, Shortfall};

/// Venue booked for the show; sets how many blockers (clowns) the contract requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Venue {
    #[default]
    Family,
    Community,
    Festival,
}

impl Venue {
    pub fn required(self) -> usize {
        match self {
            Self::Family => 3,
            Self::Community => 7,
            Self::Festival => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Family => "family party",
            Self::Community => "community tour",
            Self::Festival => "festival gala",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub blockers: usize,
    pub required: usize,
    pub base_cost: i64,
    pub shortfall_penalty: i64,
    pub surplus_bonus: i64,
    pub total_debt: i64,
    pub score: i64,
    pub net: i64,
    pub success: bool,
}

impl Settlement {
    pub fn compute(score: i64, blockers: usize, venue: Venue, rules: &SettlementRules) -> Self {
        let required = venue.required();
        let missing = required.saturating_sub(blockers) as i64;
        let extra = blockers.saturating_sub(required) as i64;
        let base_cost = blockers as i64 * rules.cost_per_blocker;
        let shortfall_penalty = match rules.shortfall {
            Shortfall::PerBlocker(amount) => missing * amount,
            Shortfall::ScaledByRequirement(amount) => missing * amount * required as i64,
        };
        let surplus_bonus = extra * rules.surplus_bonus;
        let total_debt = base_cost + shortfall_penalty - surplus_bonus;
        Self {
            blockers,
            required,
            base_cost,
            shortfall_penalty,
            surplus_bonus,
            total_debt,
            score,
            net: score - total_debt,
            success: score >= total_debt,
        }
    }
}
