use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const RUB_CURRENCY_CODE: &str = "RUB";

//--------------------------------------      Rubles       -----------------------------------------------------------
/// An amount of money in whole rubles. The storefront never deals in kopeks; every boundary rounds to the nearest
/// whole currency unit, so an integer representation is exact.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rubles(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in rubles: {0}")]
pub struct RublesConversionError(String);

impl From<i64> for Rubles {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Rubles {
    type Error = RublesConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RublesConversionError(format!("Value {value} is too large to convert to Rubles")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Add for Rubles {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Rubles {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Rubles {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for Rubles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}₽", self.0)
    }
}

impl Rubles {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Clamps a possibly negative amount to zero. Money flowing out of the pricing rules must never be negative.
    pub fn floor_at_zero(self) -> Self {
        Self(self.0.max(0))
    }

    /// Rounds an amount reported by the provider as a float to whole rubles.
    pub fn from_rounded(value: f64) -> Self {
        Self(value.round() as i64)
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}
