//! Alert decision logic.
//!
//! Submodules:
//! - `judgment` — the fixed decision table that turns totals and advisory
//!   signals into an `AlertLevel`.

pub mod judgment;

pub use judgment::{judge, judge_level};
