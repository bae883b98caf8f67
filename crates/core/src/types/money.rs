//! Non-negative monetary amounts using decimal arithmetic.
//!
//! The shop trades in a single currency, so `Money` carries only an amount.
//! Amounts have at most two decimal places and are stored as `NUMERIC(12, 2)`.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("amount must be a number")]
    Invalid,
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("amount can have at most 2 decimal places")]
    TooPrecise,
    /// The amount does not fit the storage column.
    #[error("amount must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A non-negative amount of money with at most two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Decimal places kept by every amount.
    pub const SCALE: u32 = 2;

    /// Exclusive upper bound, matching `NUMERIC(12, 2)`.
    #[must_use]
    pub fn max() -> Decimal {
        Decimal::new(10_000_000_000, 0)
    }

    /// Create a `Money` from a decimal, validating sign, precision, and range.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] when the amount is negative, has more than two
    /// decimal places once trailing zeros are dropped, or is too large.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(MoneyError::TooPrecise);
        }
        if amount >= Self::max() {
            return Err(MoneyError::TooLarge { max: Self::max() });
        }
        Ok(Self(amount.round_dp(Self::SCALE)))
    }

    /// Parse a user-supplied amount such as `"12.5"` or `"$12.50"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] if the text is not a decimal number,
    /// otherwise the errors of [`Money::new`].
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let s = s.trim();
        let s = s.strip_prefix('$').unwrap_or(s).trim();
        let amount = Decimal::from_str(s).map_err(|_| MoneyError::Invalid)?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity (e.g. a line subtotal).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if the product does not fit the
    /// storage column.
    pub fn checked_times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::TooLarge { max: Self::max() })
            .and_then(Self::new)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if the sum does not fit the storage
    /// column.
    pub fn checked_add(self, rhs: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(rhs.0)
            .ok_or(MoneyError::TooLarge { max: Self::max() })
            .and_then(Self::new)
    }

    /// Sum amounts, failing as soon as the running total is too large.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] on overflow.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }

    /// Plain two-decimal representation without a currency symbol, for form values.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // CHECK constraints keep stored amounts non-negative
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
