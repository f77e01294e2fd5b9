//! Fixed-point GAS amounts.
//!
//! Amounts carry eight decimal places and are stored as an `i64` count of
//! the smallest unit, so `1 GAS == 100_000_000` units.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places carried by [`Fixed8`].
pub const FIXED8_DECIMALS: u32 = 8;

const FACTOR: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fixed8Error {
    Empty,
    Invalid(String),
    TooManyDecimals(String),
    Overflow(String),
}

impl fmt::Display for Fixed8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fixed8Error::Empty => write!(f, "empty amount"),
            Fixed8Error::Invalid(s) => write!(f, "invalid amount '{}'", s),
            Fixed8Error::TooManyDecimals(s) => write!(
                f,
                "amount '{}' has more than {} decimal places",
                s, FIXED8_DECIMALS
            ),
            Fixed8Error::Overflow(s) => write!(f, "amount '{}' is out of range", s),
        }
    }
}

impl std::error::Error for Fixed8Error {}

/// A GAS amount with eight decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed8(i64);

impl Fixed8 {
    pub const ZERO: Fixed8 = Fixed8(0);
    pub const ONE: Fixed8 = Fixed8(FACTOR);

    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Whole GAS amount, `None` on overflow.
    pub fn from_whole(gas: i64) -> Option<Self> {
        gas.checked_mul(FACTOR).map(Self)
    }

    pub const fn units(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Fixed8) -> Option<Fixed8> {
        self.0.checked_add(other.0).map(Fixed8)
    }

    pub fn checked_sub(self, other: Fixed8) -> Option<Fixed8> {
        self.0.checked_sub(other.0).map(Fixed8)
    }

    pub fn saturating_sub(self, other: Fixed8) -> Fixed8 {
        Fixed8(self.0.saturating_sub(other.0))
    }

    /// Multiply by another fixed-point value (`self * rate`), `None` on overflow.
    pub fn checked_mul(self, rate: Fixed8) -> Option<Fixed8> {
        let product = (self.0 as i128) * (rate.0 as i128) / (FACTOR as i128);
        i64::try_from(product).ok().map(Fixed8)
    }
}

impl FromStr for Fixed8 {
    type Err = Fixed8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Fixed8Error::Empty);
        }

        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
            return Err(Fixed8Error::Invalid(raw.to_string()));
        }
        if frac.len() > FIXED8_DECIMALS as usize {
            return Err(Fixed8Error::TooManyDecimals(raw.to_string()));
        }

        let overflow = || Fixed8Error::Overflow(raw.to_string());
        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_value: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = FIXED8_DECIMALS as usize);
            padded.parse().map_err(|_| overflow())?
        };

        let units = whole_value
            .checked_mul(FACTOR)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(overflow)?;

        Ok(Fixed8(if negative { -units } else { units }))
    }
}

impl fmt::Display for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / FACTOR as u64;
        let frac = abs % FACTOR as u64;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let frac_str = format!("{:08}", frac);
            write!(f, "{}{}.{}", sign, whole, frac_str.trim_end_matches('0'))
        }
    }
}

impl Serialize for Fixed8 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
