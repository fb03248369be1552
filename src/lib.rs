//! Carnival Cascade — match-3 cascade resolver.
//!
//! Swapping two adjacent symbols clears every run of three or more along the four
//! board axes, lets the survivors fall, refills from the top, and repeats until the
//! board settles. Long runs and accumulated charge unlock one-shot special modes
//! (area clear, color sweep, recolor) that the host spends with a single tap.
//!
//! [`session::Session`] is the entry point for a host; the lower modules are usable
//! on their own for analysis and tests.

pub mod cascade;
pub mod detect;
pub mod error;
pub mod grid;
pub mod hint;
pub mod rules;
pub mod session;
pub mod settlement;
pub mod trigger;

pub use cascade::{Frame, Phase, Resolution};
pub use error::{Error, Result};
pub use grid::{Cell, Grid, Pos, Symbol};
pub use rules::{RuleSet, Variant};
pub use session::{Outcome, Rejection, Session, Snapshot, Status, Turn};
pub use settlement::{Settlement, Venue};
pub use trigger::Mode;
