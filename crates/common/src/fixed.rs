use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of fractional decimal digits carried by [`FixedPoint2`].
pub const DECIMALS: u32 = 2;

const SCALE: i64 = 10_i64.pow(DECIMALS);

/// A decimal quantity with exactly two fractional digits.
///
/// Stored as a scaled integer (`raw = value * 100`) so that long chains of
/// additions and removals never accumulate floating-point drift. Signed so that
/// differences can be represented; reagent quantities themselves are kept
/// non-negative by the solution that owns them.
///
/// Rounding is always explicit: [`FixedPoint2::new`] and [`FixedPoint2::scale`]
/// round to the nearest hundredth, [`FixedPoint2::mul_div`] truncates.
///
/// Values built from floats or decoded from storage are limited to
/// `±FixedPoint2::MAX`, so adding or subtracting two of them cannot overflow.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FixedPoint2(i64);

/// Error returned when a string is not a valid decimal quantity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fixed-point quantity: {input:?}")]
pub struct ParseFixedPointError {
    pub input: String,
}

/// Error returned when a float has no in-range fixed-point value.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("quantity {0} is outside the range of FixedPoint2 (max {max})", max = FixedPoint2::MAX)]
pub struct QuantityRangeError(pub f64);

impl FixedPoint2 {
    pub const ZERO: Self = Self(0);
    /// Smallest representable positive quantity (0.01).
    pub const EPSILON: Self = Self(1);
    /// Largest quantity (10^13 units). Also the capacity of a solution.
    pub const MAX: Self = Self(10_000_000_000_000 * SCALE);

    /// Round a float to the nearest hundredth (ties away from zero).
    ///
    /// NaN, infinities and magnitudes above [`FixedPoint2::MAX`] are rejected.
    pub fn try_new(value: f64) -> Result<Self, QuantityRangeError> {
        let scaled = (value * SCALE as f64).round();
        if !scaled.is_finite() || scaled.abs() > Self::MAX.0 as f64 {
            return Err(QuantityRangeError(value));
        }
        Ok(Self(scaled as i64))
    }

    /// Like [`FixedPoint2::try_new`], for literals known to be in range.
    ///
    /// # Panics
    /// If `value` is out of range.
    pub fn new(value: f64) -> Self {
        match Self::try_new(value) {
            Ok(q) => q,
            Err(e) => panic!("{e}"),
        }
    }

    /// Build from an integer number of whole units.
    pub const fn from_int(units: i64) -> Self {
        Self(units * SCALE)
    }

    /// Build directly from the scaled representation (hundredths).
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The scaled representation (hundredths).
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Exact rational scaling `self * num / den`, truncated toward zero.
    ///
    /// Computed in 128-bit integer arithmetic, so the only rounding is the
    /// final truncation. Panics if `den` is zero.
    pub fn mul_div(self, num: Self, den: Self) -> Self {
        assert!(den.0 != 0, "FixedPoint2::mul_div with zero denominator");
        let scaled = i128::from(self.0) * i128::from(num.0) / i128::from(den.0);
        Self(scaled as i64)
    }

    /// Multiply by a float factor, rounding to the nearest hundredth.
    ///
    /// Saturates at `±MAX`; a NaN product gives zero.
    pub fn scale(self, factor: f64) -> Self {
        let scaled = (self.0 as f64 * factor).round();
        if scaled.is_nan() {
            return Self::ZERO;
        }
        let max = Self::MAX.0 as f64;
        Self(scaled.clamp(-max, max) as i64)
    }

    /// Sum, or `None` if it leaves `±MAX`.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_add(rhs.0)
            .filter(|raw| raw.abs() <= Self::MAX.0)
            .map(Self)
    }
}

impl TryFrom<f64> for FixedPoint2 {
    type Error = QuantityRangeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<FixedPoint2> for f64 {
    fn from(value: FixedPoint2) -> Self {
        value.to_f64()
    }
}

impl From<i32> for FixedPoint2 {
    fn from(units: i32) -> Self {
        Self::from_int(i64::from(units))
    }
}

impl Add for FixedPoint2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FixedPoint2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for FixedPoint2 {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for FixedPoint2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for FixedPoint2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for FixedPoint2 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a FixedPoint2> for FixedPoint2 {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for FixedPoint2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        let text = if frac == 0 {
            format!("{sign}{whole}")
        } else if frac % 10 == 0 {
            format!("{sign}{whole}.{}", frac / 10)
        } else {
            format!("{sign}{whole}.{frac:02}")
        };
        f.pad(&text)
    }
}

impl fmt::Debug for FixedPoint2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint2({self})")
    }
}

impl FromStr for FixedPoint2 {
    type Err = ParseFixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFixedPointError {
            input: s.to_string(),
        };
        let value: f64 = s.trim().parse().map_err(|_| err())?;
        Self::try_new(value).map_err(|_| err())
    }
}
