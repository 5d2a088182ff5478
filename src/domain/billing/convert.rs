use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entities::CurrencyGroup;
use super::value_objects::{Currency, ExchangeRateMap};

/// Monetary display/persistence rounding: 2 decimal places, half-up.
/// Intermediate sums keep full precision; only apply this at the point a
/// total is presented or persisted.
pub fn round_money(value: Decimal) -> Decimal {
  value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Result of applying user-supplied exchange rates to a reconciled
/// breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
  /// Running total in the invoice currency, full precision. Only final
  /// when `missing_rates` is empty.
  pub total: Decimal,
  /// Converted contribution per breakdown currency.
  pub per_group_converted: BTreeMap<Currency, Decimal>,
  /// Currencies with no positive rate; excluded from the running total.
  pub missing_rates: Vec<Currency>,
}

impl Conversion {
  pub fn empty() -> Self {
    Self {
      total: Decimal::ZERO,
      per_group_converted: BTreeMap::new(),
      missing_rates: Vec::new(),
    }
  }

  pub fn is_complete(&self) -> bool {
    self.missing_rates.is_empty()
  }

  /// The invoice total, rounded for presentation/persistence. `None`
  /// while any rate is still missing.
  pub fn final_total(&self) -> Option<Decimal> {
    self.is_complete().then(|| round_money(self.total))
  }
}

/// Applies the rate map to the breakdown, producing a single total in the
/// invoice currency.
///
/// Groups in the invoice currency contribute unchanged; every other group
/// needs a positive rate or lands in `missing_rates`. Callers must check
/// `is_complete()` before treating the total as final.
pub fn convert(
  breakdown: &[CurrencyGroup],
  invoice_currency: Currency,
  rates: &ExchangeRateMap,
) -> Conversion {
  let mut conversion = Conversion::empty();

  for group in breakdown {
    if group.currency == invoice_currency {
      conversion
        .per_group_converted
        .insert(group.currency, group.amount);
      conversion.total += group.amount;
      continue;
    }
    match rates.get(group.currency) {
      Some(rate) => {
        let converted = group.amount * rate.value();
        conversion
          .per_group_converted
          .insert(group.currency, converted);
        conversion.total += converted;
      }
      None => conversion.missing_rates.push(group.currency),
    }
  }

  conversion
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::value_objects::ExchangeRate;
  use rust_decimal_macros::dec;
  use std::collections::BTreeSet;
  use uuid::Uuid;

  fn group(currency: Currency, amount: Decimal) -> CurrencyGroup {
    CurrencyGroup {
      currency,
      matter_ids: BTreeSet::from([Uuid::new_v4()]),
      amount,
    }
  }

  #[test]
  fn test_single_currency_passes_through() {
    let breakdown = [group(Currency::USD, dec!(800))];
    let conversion = convert(&breakdown, Currency::USD, &ExchangeRateMap::new());

    assert!(conversion.is_complete());
    assert_eq!(conversion.final_total(), Some(dec!(800.00)));
    assert_eq!(
      conversion.per_group_converted[&Currency::USD],
      dec!(800)
    );
  }

  #[test]
  fn test_cross_currency_applies_rate() {
    let breakdown = [group(Currency::USD, dec!(800)), group(Currency::EUR, dec!(200))];
    let mut rates = ExchangeRateMap::new();
    rates.set(Currency::EUR, ExchangeRate::new(dec!(1.08)).unwrap());

    let conversion = convert(&breakdown, Currency::USD, &rates);
    assert!(conversion.is_complete());
    assert_eq!(conversion.per_group_converted[&Currency::USD], dec!(800));
    assert_eq!(conversion.per_group_converted[&Currency::EUR], dec!(216.00));
    assert_eq!(conversion.final_total(), Some(dec!(1016.00)));
  }

  #[test]
  fn test_missing_rate_excluded_from_total() {
    let breakdown = [group(Currency::USD, dec!(800)), group(Currency::EUR, dec!(200))];
    let conversion = convert(&breakdown, Currency::USD, &ExchangeRateMap::new());

    assert!(!conversion.is_complete());
    assert_eq!(conversion.missing_rates, vec![Currency::EUR]);
    assert_eq!(conversion.final_total(), None);
    // The running total only carries the convertible groups.
    assert_eq!(conversion.total, dec!(800));
  }

  #[test]
  fn test_per_group_identity() {
    // perGroupConverted[c] = amount × (c == invoice ? 1 : rate[c])
    let breakdown = [
      group(Currency::USD, dec!(100)),
      group(Currency::EUR, dec!(50)),
      group(Currency::INR, dec!(1000)),
    ];
    let mut rates = ExchangeRateMap::new();
    rates.set(Currency::EUR, ExchangeRate::new(dec!(1.1)).unwrap());
    rates.set(Currency::INR, ExchangeRate::new(dec!(0.012)).unwrap());

    let conversion = convert(&breakdown, Currency::USD, &rates);
    assert_eq!(conversion.per_group_converted[&Currency::USD], dec!(100));
    assert_eq!(conversion.per_group_converted[&Currency::EUR], dec!(55.0));
    assert_eq!(conversion.per_group_converted[&Currency::INR], dec!(12.000));
    assert_eq!(conversion.final_total(), Some(dec!(167.00)));
  }

  #[test]
  fn test_rounding_half_up_at_presentation() {
    assert_eq!(round_money(dec!(10.005)), dec!(10.01));
    assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    assert_eq!(round_money(dec!(1016)), dec!(1016.00));

    // Intermediate precision is preserved until final_total.
    let breakdown = [group(Currency::EUR, dec!(33.335))];
    let mut rates = ExchangeRateMap::new();
    rates.set(Currency::EUR, ExchangeRate::new(dec!(1.5)).unwrap());
    let conversion = convert(&breakdown, Currency::USD, &rates);
    assert_eq!(conversion.total, dec!(50.0025));
    assert_eq!(conversion.final_total(), Some(dec!(50.00)));
  }

  #[test]
  fn test_empty_breakdown() {
    let conversion = convert(&[], Currency::USD, &ExchangeRateMap::new());
    assert!(conversion.is_complete());
    assert_eq!(conversion.final_total(), Some(dec!(0.00)));
  }
}
