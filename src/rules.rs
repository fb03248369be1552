//! Rule sets: scoring, charge, penalties and economy for each game variant, plus
//! `rules[key]="value"` override files.

use crate::detect::Tier;
use crate::grid::{Pos, Symbol};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Variant presets, one per shipped game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Unified rules: seven balls, combo-scaled scores, one blocker per illegal swap.
    #[default]
    Carnival,
    /// Classic board: flat scores, blockers for missing the target.
    Classic,
    /// Classic scoring on five balls with a 5x5 bomb and a +2000 sweep.
    FreeJoker,
    /// Clown-troupe economy: five balls, action costs, recruiting, settlement.
    Joker,
    /// Joker economy with exit bonuses and escalating recruit cost.
    Finale,
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown rules key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("invalid rules: {0}")]
    Invalid(String),
}

/// Base score per run tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreTable {
    pub three: i64,
    pub four: i64,
    pub five_plus: i64,
    /// Multiply every run's score by the pass's combo value.
    pub combo_scaling: bool,
}

impl ScoreTable {
    pub fn base(&self, tier: Tier) -> i64 {
        match tier {
            Tier::Three => self.three,
            Tier::Four => self.four,
            Tier::FivePlus => self.five_plus,
        }
    }

    pub fn run_score(&self, tier: Tier, combo: u32) -> i64 {
        if self.combo_scaling {
            self.base(tier) * i64::from(combo.max(1))
        } else {
            self.base(tier)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeRules {
    pub cap: u32,
    pub per_run: u32,
    /// Charge for a run of the current target symbol.
    pub per_target_run: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaShape {
    /// Chebyshev radius: a (2r+1)² block.
    #[default]
    Square,
    /// Same row or column within the radius.
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaRules {
    pub radius: usize,
    pub shape: AreaShape,
    /// Flat score for using an area clear.
    pub bonus: i64,
}

impl AreaRules {
    pub fn covers(&self, centre: Pos, pos: Pos) -> bool {
        let dr = centre.row.abs_diff(pos.row);
        let dc = centre.col.abs_diff(pos.col);
        match self.shape {
            AreaShape::Square => dr.max(dc) <= self.radius,
            AreaShape::Cross => (dr == 0 && dc <= self.radius) || (dc == 0 && dr <= self.radius),
        }
    }
}

/// Blockers dropped on the board as penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenaltyRules {
    /// Swap rejected (no run, or not adjacent).
    pub illegal_swap: usize,
    /// Accepted swap whose runs do not include the target symbol.
    pub untargeted_swap: usize,
    /// Swap cascade settled without clearing the target.
    pub missed_target: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecruitRules {
    pub base_cost: i64,
    /// Added per blocker already on the board.
    pub increment: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EconomyRules {
    /// Deducted per blocker on the board for every accepted action.
    pub action_cost_per_blocker: i64,
    /// Paid per blocker removed by an area clear or color sweep.
    pub blocker_exit_bonus: i64,
    /// Flat score for using a color sweep.
    pub sweep_bonus: i64,
    pub recruit: Option<RecruitRules>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortfall {
    /// Flat amount per missing blocker.
    PerBlocker(i64),
    /// Amount × venue requirement per missing blocker.
    ScaledByRequirement(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementRules {
    pub cost_per_blocker: i64,
    pub shortfall: Shortfall,
    pub surplus_bonus: i64,
}

/// Everything that distinguishes one game variant from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub variant: Variant,
    pub rows: usize,
    pub cols: usize,
    /// Symbols rolled by layout generation, refill and target selection.
    pub palette: Vec<Symbol>,
    pub score: ScoreTable,
    pub charge: ChargeRules,
    pub area: AreaRules,
    pub penalty: PenaltyRules,
    pub economy: EconomyRules,
    pub settlement: SettlementRules,
    /// Board overrun: the game ends when this many blockers are on the board.
    pub blocker_limit: Option<usize>,
    /// Passes allowed in one resolve call before it is treated as a fault.
    pub max_cascade_passes: usize,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::preset(Variant::Carnival)
    }
}

impl RuleSet {
    pub fn preset(variant: Variant) -> Self {
        let carnival = Self {
            variant,
            rows: 7,
            cols: 6,
            palette: Symbol::ALL.to_vec(),
            score: ScoreTable {
                three: 100,
                four: 400,
                five_plus: 1200,
                combo_scaling: true,
            },
            charge: ChargeRules {
                cap: 5,
                per_run: 1,
                per_target_run: 2,
            },
            area: AreaRules {
                radius: 2,
                shape: AreaShape::Square,
                bonus: 800,
            },
            penalty: PenaltyRules {
                illegal_swap: 1,
                ..PenaltyRules::default()
            },
            economy: EconomyRules {
                sweep_bonus: 2000,
                ..EconomyRules::default()
            },
            settlement: SettlementRules {
                cost_per_blocker: 500,
                shortfall: Shortfall::PerBlocker(1000),
                surplus_bonus: 500,
            },
            blocker_limit: None,
            max_cascade_passes: 100,
        };
        let five_balls = Symbol::ALL[..5].to_vec();
        match variant {
            Variant::Carnival => carnival,
            Variant::Classic => Self {
                score: ScoreTable {
                    three: 100,
                    four: 300,
                    five_plus: 1000,
                    combo_scaling: false,
                },
                charge: ChargeRules {
                    cap: 5,
                    per_run: 1,
                    per_target_run: 1,
                },
                area: AreaRules {
                    radius: 0,
                    shape: AreaShape::Square,
                    bonus: 0,
                },
                penalty: PenaltyRules {
                    illegal_swap: 2,
                    untargeted_swap: 1,
                    missed_target: 0,
                },
                economy: EconomyRules::default(),
                blocker_limit: Some(21),
                ..carnival
            },
            Variant::FreeJoker => Self {
                palette: five_balls,
                score: ScoreTable {
                    three: 100,
                    four: 300,
                    five_plus: 1000,
                    combo_scaling: false,
                },
                charge: ChargeRules {
                    cap: 5,
                    per_run: 1,
                    per_target_run: 1,
                },
                penalty: PenaltyRules {
                    illegal_swap: 2,
                    untargeted_swap: 1,
                    missed_target: 0,
                },
                blocker_limit: Some(21),
                ..carnival
            },
            Variant::Joker => Self {
                palette: five_balls,
                area: AreaRules {
                    radius: 0,
                    shape: AreaShape::Square,
                    bonus: 0,
                },
                penalty: PenaltyRules {
                    missed_target: 1,
                    ..PenaltyRules::default()
                },
                economy: EconomyRules {
                    action_cost_per_blocker: 50,
                    blocker_exit_bonus: 0,
                    sweep_bonus: 0,
                    recruit: Some(RecruitRules {
                        base_cost: 1000,
                        increment: 0,
                    }),
                },
                ..carnival
            },
            Variant::Finale => Self {
                palette: five_balls,
                area: AreaRules {
                    radius: 0,
                    shape: AreaShape::Cross,
                    bonus: 0,
                },
                penalty: PenaltyRules {
                    missed_target: 1,
                    ..PenaltyRules::default()
                },
                economy: EconomyRules {
                    action_cost_per_blocker: 50,
                    blocker_exit_bonus: 500,
                    sweep_bonus: 0,
                    recruit: Some(RecruitRules {
                        base_cost: 1000,
                        increment: 500,
                    }),
                },
                settlement: SettlementRules {
                    cost_per_blocker: 500,
                    shortfall: Shortfall::ScaledByRequirement(1000),
                    surplus_bonus: 500,
                },
                ..carnival
            },
        }
    }

    /// Load a preset and apply overrides from a btop-style `rules[key]="value"` file.
    /// Falls back to the bare preset if path is None or the file does not exist.
    pub fn load(path: Option<&Path>, variant: Variant) -> Result<Self, RulesError> {
        let mut rules = Self::preset(variant);
        let path = match path {
            Some(p) if p.exists() => p,
            Some(p) => {
                warn!(path = %p.display(), "rules file not found; using preset");
                return Ok(rules);
            }
            None => return Ok(rules),
        };
        let s = std::fs::read_to_string(path)?;
        rules.apply_overrides(&parse_rules_file(&s))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn apply_overrides(&mut self, map: &HashMap<String, String>) -> Result<(), RulesError> {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            self.apply(key, &map[key])?;
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), RulesError> {
        match key {
            "rows" => self.rows = parse_value(key, value)?,
            "cols" => self.cols = parse_value(key, value)?,
            "palette" => self.palette = parse_palette(key, value)?,
            "score.three" => self.score.three = parse_value(key, value)?,
            "score.four" => self.score.four = parse_value(key, value)?,
            "score.five" => self.score.five_plus = parse_value(key, value)?,
            "score.combo_scaling" => self.score.combo_scaling = parse_value(key, value)?,
            "charge.cap" => self.charge.cap = parse_value(key, value)?,
            "charge.per_run" => self.charge.per_run = parse_value(key, value)?,
            "charge.per_target_run" => self.charge.per_target_run = parse_value(key, value)?,
            "area.radius" => self.area.radius = parse_value(key, value)?,
            "area.shape" => {
                self.area.shape = match value {
                    "square" => AreaShape::Square,
                    "cross" => AreaShape::Cross,
                    _ => return Err(invalid(key, value)),
                }
            }
            "area.bonus" => self.area.bonus = parse_value(key, value)?,
            "penalty.illegal_swap" => self.penalty.illegal_swap = parse_value(key, value)?,
            "penalty.untargeted_swap" => self.penalty.untargeted_swap = parse_value(key, value)?,
            "penalty.missed_target" => self.penalty.missed_target = parse_value(key, value)?,
            "economy.action_cost" => self.economy.action_cost_per_blocker = parse_value(key, value)?,
            "economy.exit_bonus" => self.economy.blocker_exit_bonus = parse_value(key, value)?,
            "economy.sweep_bonus" => self.economy.sweep_bonus = parse_value(key, value)?,
            "economy.recruit" => {
                self.economy.recruit = if value == "none" {
                    None
                } else {
                    let (base, inc) = value.split_once('+').unwrap_or((value, "0"));
                    Some(RecruitRules {
                        base_cost: parse_value(key, base.trim())?,
                        increment: parse_value(key, inc.trim())?,
                    })
                }
            }
            "settlement.cost_per_blocker" => {
                self.settlement.cost_per_blocker = parse_value(key, value)?;
            }
            "settlement.shortfall" => {
                self.settlement.shortfall = match value.split_once(':') {
                    Some(("flat", n)) => Shortfall::PerBlocker(parse_value(key, n.trim())?),
                    Some(("scaled", n)) => {
                        Shortfall::ScaledByRequirement(parse_value(key, n.trim())?)
                    }
                    _ => return Err(invalid(key, value)),
                }
            }
            "settlement.surplus_bonus" => self.settlement.surplus_bonus = parse_value(key, value)?,
            "blocker_limit" => {
                self.blocker_limit = if value == "none" {
                    None
                } else {
                    Some(parse_value(key, value)?)
                }
            }
            "max_passes" => self.max_cascade_passes = parse_value(key, value)?,
            _ => return Err(RulesError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), RulesError> {
        if self.rows < 3 || self.cols < 3 {
            return Err(RulesError::Invalid(format!(
                "board must be at least 3x3, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.palette.len() < 4 {
            return Err(RulesError::Invalid(format!(
                "palette needs at least 4 symbols, got {}",
                self.palette.len()
            )));
        }
        let mut seen = self.palette.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.palette.len() {
            return Err(RulesError::Invalid("palette repeats a symbol".to_string()));
        }
        if self.charge.cap == 0 {
            return Err(RulesError::Invalid("charge cap must be positive".to_string()));
        }
        if self.max_cascade_passes == 0 {
            return Err(RulesError::Invalid("max_passes must be positive".to_string()));
        }
        Ok(())
    }

    /// Cost to recruit one more blocker, if recruiting is enabled.
    pub fn recruit_cost(&self, blockers: usize) -> Option<i64> {
        self.economy
            .recruit
            .map(|r| r.base_cost + r.increment * blockers as i64)
    }
}

fn invalid(key: &str, value: &str) -> RulesError {
    RulesError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, RulesError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

/// Palette as letters ("RYBGW") or comma-separated names ("red, yellow").
fn parse_palette(key: &str, value: &str) -> Result<Vec<Symbol>, RulesError> {
    if value.contains(',') {
        value
            .split(',')
            .map(|name| Symbol::from_name(name).ok_or_else(|| invalid(key, value)))
            .collect()
    } else {
        value
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Symbol::from_letter(c).ok_or_else(|| invalid(key, value)))
            .collect()
    }
}

/// Parse btop-style rules file into key -> value map.
fn parse_rules_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("rules[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(value) = rest.strip_prefix('=') {
                    let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}
