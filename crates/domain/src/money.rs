//! Money amounts.

use serde::{Deserialize, Serialize};

/// An amount of money in integer cents.
///
/// All prices, costs and profits in the system are `Money`, so sums such as
/// `total_cost + total_profit == revenue` hold exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a quantity, saturating at the bounds.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// `None` when the sum does not fit in an `i64` of cents.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(&self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// `None` when the product does not fit in an `i64` of cents.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// `self` as a percentage of `whole`, or 0 when `whole` is zero.
    pub fn percent_of(&self, whole: Money) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        self.0 as f64 / whole.0 as f64 * 100.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

// Operators saturate. Amounts written to the store go through the
// `checked_*` methods first, so only report aggregates can ever reach a bound.
impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_dollars_and_cents() {
        assert_eq!(Money::from_cents(6800).to_string(), "$68.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn arithmetic() {
        let price = Money::from_dollars(25);
        let cost = Money::from_dollars(10);

        assert_eq!((price - cost).multiply(2), Money::from_dollars(30));
        let mut total = Money::ZERO;
        total += price;
        total -= cost;
        assert_eq!(total, Money::from_dollars(15));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(
            Money::from_cents(250).checked_mul(4),
            Some(Money::from_dollars(10))
        );
        assert_eq!(
            Money::from_cents(100).checked_add(Money::from_cents(1)),
            Some(Money::from_cents(101))
        );
    }

    #[test]
    fn operators_saturate_instead_of_wrapping() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(max.multiply(3), max);
        let mut total = max;
        total += max;
        assert_eq!(total, max);
    }

    #[test]
    fn sums_iterators() {
        let amounts = [Money::from_cents(150), Money::from_cents(250)];
        assert_eq!(amounts.iter().sum::<Money>(), Money::from_cents(400));
        assert_eq!(Vec::<Money>::new().into_iter().sum::<Money>(), Money::ZERO);
    }

    #[test]
    fn percent_of_zero_whole_is_zero() {
        assert_eq!(Money::from_dollars(40).percent_of(Money::ZERO), 0.0);
        assert_eq!(Money::from_dollars(40).percent_of(Money::from_dollars(80)), 50.0);
    }

    #[test]
    fn serializes_as_integer_cents() {
        assert_eq!(serde_json::to_string(&Money::from_cents(2500)).unwrap(), "2500");
        let back: Money = serde_json::from_str("1999").unwrap();
        assert_eq!(back, Money::from_cents(1999));
    }
}
