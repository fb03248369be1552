//! carnival-cascade — match-3 cascade resolver in the terminal.

mod app;
mod input;
mod ui;

use anyhow::{Context, Result, anyhow};
use app::App;
use carnival_cascade::{RuleSet, Variant, Venue};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that affect how the driver plays (not the rules themselves).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub seed: Option<u64>,
    /// Moves left for the hint search to play; also the budget the `a` key starts with.
    pub autoplay: Option<u32>,
    pub venue: Venue,
    /// Time each cascade frame stays on screen.
    pub pace: Duration,
    pub animate: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;
    let rules = RuleSet::load(args.rules.as_deref(), args.variant.into())
        .with_context(|| format!("loading rules for variant {:?}", args.variant))?;
    let config = DriverConfig {
        seed: args.seed,
        autoplay: args.autoplay,
        venue: args.venue.into(),
        pace: Duration::from_millis(args.pace_ms),
        animate: !args.no_animation,
    };
    let mut app = App::new(rules, config)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the TUI, so logs go to a file when one is given and are
/// otherwise filtered to `level` on stderr (default `off`).
fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {level:?}"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| anyhow!("{e}"))
}

/// Match-3 cascade resolver for the clown-carnival board games.
#[derive(Debug, Parser)]
#[command(
    name = "carnival-cascade",
    version,
    about = "Match-3 cascade resolver: swap symbols, clear runs of three, chain cascades into special modes.",
    long_about = "carnival-cascade plays the clown-carnival match-3 game in the terminal.\n\n\
        Swap two adjacent symbols (diagonals count) to make a run of three or more in any \
        direction. Cleared cells fall and refill; new runs chain into combos. Long runs and \
        a full charge meter unlock special modes spent with a single tap.\n\n\
        KEYS:\n  ←↑↓→ / hjkl   Move cursor   Enter / Space  Tap (select, swap, spend mode)\n  \
        ? / i         Hint          b              Recruit a blocker\n  \
        a             Autoplay      s              Settlement\n  \
        r             New board     q / Esc        Quit\n\n\
        Use --autoplay N to let the hint search play N moves, and --rules to load a \
        rules[key]=\"value\" override file."
)]
pub struct Args {
    /// Rule preset: carnival (unified default), classic, freejoker, joker or finale.
    #[arg(short, long, default_value = "carnival")]
    pub variant: VariantArg,

    /// Path to a rules file (rules[key]="value" lines) applied on top of the preset.
    #[arg(short, long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// RNG seed for a reproducible game.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Start with the hint search playing N moves (toggle later with `a`).
    #[arg(short, long, value_name = "N")]
    pub autoplay: Option<u32>,

    /// Venue booked for the end-of-game settlement.
    #[arg(long, default_value = "family")]
    pub venue: VenueArg,

    /// Time each cascade phase stays on screen, in ms.
    #[arg(long, default_value = "180", value_name = "MS")]
    pub pace_ms: u64,

    /// Show only the settled board after each move, without replaying the cascade.
    #[arg(long)]
    pub no_animation: bool,

    /// Log filter when RUST_LOG is unset (e.g. warn, info, carnival_cascade=debug).
    #[arg(long, default_value = "off", value_name = "FILTER")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum VariantArg {
    #[default]
    Carnival,
    Classic,
    #[value(name = "freejoker", alias = "free-joker")]
    FreeJoker,
    #[value(alias = "jokers")]
    Joker,
    Finale,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Carnival => Self::Carnival,
            VariantArg::Classic => Self::Classic,
            VariantArg::FreeJoker => Self::FreeJoker,
            VariantArg::Joker => Self::Joker,
            VariantArg::Finale => Self::Finale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum VenueArg {
    #[default]
    Family,
    #[value(alias = "tour")]
    Community,
    #[value(alias = "gala")]
    Festival,
}

impl From<VenueArg> for Venue {
    fn from(v: VenueArg) -> Self {
        match v {
            VenueArg::Family => Self::Family,
            VenueArg::Community => Self::Community,
            VenueArg::Festival => Self::Festival,
        }
    }
}
