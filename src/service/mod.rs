//! HTTP handlers for Lumen.

pub mod dice;

pub use dice::{handle_roll, DiceState, RollResponse};
