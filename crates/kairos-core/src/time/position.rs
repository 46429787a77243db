//! `Position` and `Duration` as exact `(bar, position, division)` rationals.
//!
//! A coordinate means `bar + position / division` bars. After every
//! operation `0 <= position < division` holds; overflowing positions carry
//! into `bar`. Coordinates with different divisions compare by value, so
//! `(0, 1, 2) == (0, 2, 4)`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Sub};

use crate::transport::TransportPosition;
use crate::{Error, Result};

/// Largest division a coordinate may use, including the common division
/// produced by arithmetic on two coordinates.
pub const MAX_DENOMINATOR: u32 = 384_000;

#[derive(Debug, Clone, Copy)]
struct Coordinate {
    bar: u32,
    position: u32,
    division: u32,
}

impl Coordinate {
    fn new(bar: u32, position: u32, division: u32) -> Result<Self> {
        if division == 0 {
            return Err(Error::InvalidPosition("division must be > 0".into()));
        }
        if division > MAX_DENOMINATOR {
            return Err(Error::InvalidPosition(format!(
                "division {division} exceeds {MAX_DENOMINATOR}"
            )));
        }
        let mut coordinate = Self {
            bar,
            position,
            division,
        };
        coordinate.normalize()?;
        Ok(coordinate)
    }

    fn normalize(&mut self) -> Result<()> {
        if self.position >= self.division {
            let carry = self.position / self.division;
            self.bar = self
                .bar
                .checked_add(carry)
                .ok_or_else(|| Error::InvalidPosition("bar overflow".into()))?;
            self.position %= self.division;
        }
        Ok(())
    }

    #[inline]
    fn numerator(&self) -> u128 {
        self.bar as u128 * self.division as u128 + self.position as u128
    }

    fn from_numerator(numerator: u128, division: u32) -> Result<Self> {
        let bar = u32::try_from(numerator / division as u128)
            .map_err(|_| Error::InvalidPosition("bar overflow".into()))?;
        Ok(Self {
            bar,
            position: (numerator % division as u128) as u32,
            division,
        })
    }

    /// Least common division of two coordinates, bounded by [`MAX_DENOMINATOR`].
    fn common_division(&self, other: &Self) -> Result<u32> {
        let lcm = self.division as u64 / gcd(self.division as u64, other.division as u64)
            * other.division as u64;
        if lcm > MAX_DENOMINATOR as u64 {
            return Err(Error::InvalidPosition(format!(
                "common division of {} and {} exceeds {MAX_DENOMINATOR}",
                self.division, other.division
            )));
        }
        Ok(lcm as u32)
    }

    fn rescaled(&self, division: u32) -> u128 {
        self.numerator() * (division / self.division) as u128
    }

    fn checked_add(&self, other: &Self) -> Result<Self> {
        let division = self.common_division(other)?;
        Self::from_numerator(self.rescaled(division) + other.rescaled(division), division)
    }

    fn checked_sub(&self, other: &Self) -> Result<Self> {
        let division = self.common_division(other)?;
        let (lhs, rhs) = (self.rescaled(division), other.rescaled(division));
        if lhs < rhs {
            return Err(Error::InvalidPosition(format!(
                "{other} is later than {self}"
            )));
        }
        Self::from_numerator(lhs - rhs, division)
    }

    /// Value in bars.
    fn as_bars(&self) -> f64 {
        self.bar as f64 + self.position as f64 / self.division as f64
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coordinate {}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiplied numerators are exact for any two divisions.
        (self.numerator() * other.division as u128)
            .cmp(&(other.numerator() * self.division as u128))
    }
}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let numerator = self.numerator();
        let divisor = gcd_u128(numerator, self.division as u128);
        (numerator / divisor).hash(state);
        (self.division as u128 / divisor).hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.bar, self.position, self.division)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn gcd_u128(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

macro_rules! coordinate_accessors {
    ($ty:ident) => {
        impl $ty {
            /// Create a normalized coordinate.
            ///
            /// Fails when `division` is zero or above [`MAX_DENOMINATOR`].
            pub fn new(bar: u32, position: u32, division: u32) -> Result<Self> {
                Coordinate::new(bar, position, division).map(Self)
            }

            #[inline]
            pub fn bar(&self) -> u32 {
                self.0.bar
            }

            #[inline]
            pub fn position(&self) -> u32 {
                self.0.position
            }

            #[inline]
            pub fn division(&self) -> u32 {
                self.0.division
            }

            /// Value in (fractional) bars.
            pub fn as_bars(&self) -> f64 {
                self.0.as_bars()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

/// A span of musical time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(Coordinate);

/// A point in musical time, measured from bar zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(Coordinate);

coordinate_accessors!(Duration);
coordinate_accessors!(Position);

impl Duration {
    pub fn checked_add(&self, other: &Duration) -> Result<Duration> {
        self.0.checked_add(&other.0).map(Duration)
    }

    /// Fails if `other` is longer than `self`.
    pub fn checked_sub(&self, other: &Duration) -> Result<Duration> {
        self.0.checked_sub(&other.0).map(Duration)
    }
}

impl Position {
    pub fn checked_add(&self, duration: &Duration) -> Result<Position> {
        self.0.checked_add(&duration.0).map(Position)
    }

    /// Distance from `earlier` to `self`. Fails if `earlier` is later.
    pub fn checked_since(&self, earlier: &Position) -> Result<Duration> {
        self.0.checked_sub(&earlier.0).map(Duration)
    }

    /// Frames from the start of bar zero to this position under the given
    /// transport tempo and meter.
    ///
    /// The fractional part is read in beats: `(0, 1, 4)` is a quarter of a
    /// beat into the first bar, which is 6000 frames at 120 bpm and 48 kHz.
    ///
    /// Arithmetic carries `position / division` into whole bars, so the
    /// mapping is not linear across a bar line: `(0, 3, 4)` lands at 18000
    /// frames but adding a quarter gives `(1, 0, 4)` at 96000. Within a bar
    /// the fraction never reaches a full beat.
    pub fn frame_offset(&self, transport: &TransportPosition) -> u64 {
        let frames_per_beat = transport.frames_per_beat();
        if !frames_per_beat.is_finite() || frames_per_beat <= 0.0 {
            return 0;
        }
        let beats = self.bar() as f64 * transport.beats_per_bar as f64
            + self.position() as f64 / self.division() as f64;
        (beats * frames_per_beat).round() as u64
    }
}

impl Default for Position {
    fn default() -> Self {
        Position(Coordinate {
            bar: 0,
            position: 0,
            division: 1,
        })
    }
}

/// # Panics
///
/// Panics if `rhs` is later than `self`; use [`Position::checked_since`]
/// where that can happen.
impl Sub for Position {
    type Output = Duration;

    fn sub(self, rhs: Position) -> Duration {
        match self.checked_since(&rhs) {
            Ok(duration) => duration,
            Err(e) => panic!("position subtraction: {e}"),
        }
    }
}

/// # Panics
///
/// Panics on bar overflow or when the common division exceeds
/// [`MAX_DENOMINATOR`].
impl Add<Duration> for Position {
    type Output = Position;

    fn add(self, rhs: Duration) -> Position {
        match self.checked_add(&rhs) {
            Ok(position) => position,
            Err(e) => panic!("position addition: {e}"),
        }
    }
}

impl AddAssign<Duration> for Position {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}
