//! Rational musical time: bar/position/division coordinates.

mod position;

pub use position::{Duration, Position, MAX_DENOMINATOR};
