use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entities::{CurrencyGroup, ExpenseEntry, Matter, TimesheetEntry};
use super::value_objects::Currency;

/// Outcome of grouping the current selection by native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
  /// One group per currency, ordered by currency code.
  pub breakdown: Vec<CurrencyGroup>,
  /// True iff the breakdown spans more than one currency.
  pub requires_conversion: bool,
  /// Pre-fill for the invoice-currency selector. Never overrides an
  /// explicit user choice; `None` when nothing is selected.
  pub suggested_currency: Option<Currency>,
}

impl Reconciliation {
  pub fn empty() -> Self {
    Self {
      breakdown: Vec::new(),
      requires_conversion: false,
      suggested_currency: None,
    }
  }

  pub fn group(&self, currency: Currency) -> Option<&CurrencyGroup> {
    self.breakdown.iter().find(|g| g.currency == currency)
  }
}

/// Groups the selected billable items by their native currency.
///
/// Pure function of the selection: timesheets contribute under their own
/// currency, expenses (always INR) merge into the INR group when inclusion
/// is enabled. Must be re-invoked on every change to matter selection,
/// date-range filter, timesheet selection, expense inclusion or expense
/// selection.
///
/// `invoice_currency` is the user's explicit choice, if any; when absent
/// the suggestion is the currency of the group with the largest total,
/// tie-broken by the currency of the first selected matter.
pub fn reconcile(
  matters: &[Matter],
  timesheets: &[&TimesheetEntry],
  expenses: &[&ExpenseEntry],
  include_expenses: bool,
  invoice_currency: Option<Currency>,
) -> Reconciliation {
  let mut groups: BTreeMap<Currency, CurrencyGroup> = BTreeMap::new();

  for entry in timesheets {
    let group = groups
      .entry(entry.amount.currency)
      .or_insert_with(|| CurrencyGroup::new(entry.amount.currency));
    group.amount += entry.amount.amount;
    group.matter_ids.insert(entry.matter_id);
  }

  if include_expenses {
    for expense in expenses.iter().filter(|e| e.included) {
      let group = groups
        .entry(Currency::INR)
        .or_insert_with(|| CurrencyGroup::new(Currency::INR));
      group.amount += expense.amount;
      group.matter_ids.insert(expense.matter_id);
    }
  }

  let breakdown: Vec<CurrencyGroup> = groups.into_values().collect();
  let requires_conversion = breakdown.len() > 1;
  let suggested_currency = invoice_currency.or_else(|| suggest_currency(matters, &breakdown));

  Reconciliation {
    breakdown,
    requires_conversion,
    suggested_currency,
  }
}

fn suggest_currency(matters: &[Matter], breakdown: &[CurrencyGroup]) -> Option<Currency> {
  let largest = breakdown.iter().map(|g| g.amount).max()?;
  let candidates: Vec<Currency> = breakdown
    .iter()
    .filter(|g| g.amount == largest)
    .map(|g| g.currency)
    .collect();
  if candidates.len() == 1 {
    return Some(candidates[0]);
  }
  // Tie-break: the currency of the first selected matter, falling back to
  // currency-code order.
  matters
    .iter()
    .map(|m| m.currency)
    .find(|c| candidates.contains(c))
    .or_else(|| candidates.first().copied())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::value_objects::{Money, TimesheetStatus};
  use chrono::NaiveDate;
  use rust_decimal_macros::dec;
  use rust_decimal::Decimal;
  use uuid::Uuid;

  fn matter(currency: Currency) -> Matter {
    Matter::new(Uuid::new_v4(), "Acme v. Grid".to_string(), currency)
  }

  fn entry(matter: &Matter, amount: Decimal) -> TimesheetEntry {
    TimesheetEntry::new(
      matter.id,
      "A. Mehta".to_string(),
      NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
      Money::new(amount, matter.currency).unwrap(),
      TimesheetStatus::Approved,
    )
  }

  #[test]
  fn test_single_currency_needs_no_conversion() {
    let m = matter(Currency::USD);
    let a = entry(&m, dec!(500));
    let b = entry(&m, dec!(300));

    let result = reconcile(&[m.clone()], &[&a, &b], &[], false, None);

    assert_eq!(result.breakdown.len(), 1);
    assert!(!result.requires_conversion);
    let group = &result.breakdown[0];
    assert_eq!(group.currency, Currency::USD);
    assert_eq!(group.amount, dec!(800));
    assert_eq!(group.matter_ids.len(), 1);
    assert_eq!(result.suggested_currency, Some(Currency::USD));
  }

  #[test]
  fn test_two_currencies_require_conversion() {
    let usd = matter(Currency::USD);
    let eur = matter(Currency::EUR);
    let a = entry(&usd, dec!(800));
    let b = entry(&eur, dec!(200));

    let result = reconcile(&[usd.clone(), eur.clone()], &[&a, &b], &[], false, None);

    assert_eq!(result.breakdown.len(), 2);
    assert!(result.requires_conversion);
    // Largest group wins the suggestion.
    assert_eq!(result.suggested_currency, Some(Currency::USD));
  }

  #[test]
  fn test_expenses_merge_into_inr_group() {
    let usd = matter(Currency::USD);
    let a = entry(&usd, dec!(800));
    let expense = ExpenseEntry::new(usd.id, "Court fees".to_string(), dec!(2500));

    let with = reconcile(&[usd.clone()], &[&a], &[&expense], true, None);
    assert_eq!(with.breakdown.len(), 2);
    assert_eq!(with.group(Currency::INR).unwrap().amount, dec!(2500));
    assert!(with.requires_conversion);

    let without = reconcile(&[usd.clone()], &[&a], &[&expense], false, None);
    assert_eq!(without.breakdown.len(), 1);
    assert!(without.group(Currency::INR).is_none());
  }

  #[test]
  fn test_not_included_expenses_are_skipped() {
    let usd = matter(Currency::USD);
    let a = entry(&usd, dec!(800));
    let mut expense = ExpenseEntry::new(usd.id, "Courier".to_string(), dec!(400));
    expense.included = false;

    let result = reconcile(&[usd.clone()], &[&a], &[&expense], true, None);
    assert!(result.group(Currency::INR).is_none());
  }

  #[test]
  fn test_explicit_currency_choice_wins() {
    let usd = matter(Currency::USD);
    let a = entry(&usd, dec!(800));

    let result = reconcile(&[usd.clone()], &[&a], &[], false, Some(Currency::EUR));
    assert_eq!(result.suggested_currency, Some(Currency::EUR));
  }

  #[test]
  fn test_tie_break_uses_first_selected_matter() {
    let eur = matter(Currency::EUR);
    let usd = matter(Currency::USD);
    let a = entry(&eur, dec!(500));
    let b = entry(&usd, dec!(500));

    // EUR matter selected first, equal totals.
    let result = reconcile(&[eur.clone(), usd.clone()], &[&a, &b], &[], false, None);
    assert_eq!(result.suggested_currency, Some(Currency::EUR));
  }

  #[test]
  fn test_reconcile_is_idempotent() {
    let usd = matter(Currency::USD);
    let eur = matter(Currency::EUR);
    let a = entry(&usd, dec!(800));
    let b = entry(&eur, dec!(200));
    let expense = ExpenseEntry::new(usd.id, "Filing".to_string(), dec!(100));

    let matters = [usd.clone(), eur.clone()];
    let first = reconcile(&matters, &[&a, &b], &[&expense], true, None);
    let second = reconcile(&matters, &[&a, &b], &[&expense], true, None);
    assert_eq!(first, second);

    // Order-independent: permuting the inputs yields the same breakdown.
    let permuted = reconcile(&matters, &[&b, &a], &[&expense], true, None);
    assert_eq!(first.breakdown, permuted.breakdown);
  }

  #[test]
  fn test_conservation_of_amounts() {
    let usd = matter(Currency::USD);
    let eur = matter(Currency::EUR);
    let entries = [
      entry(&usd, dec!(125.50)),
      entry(&usd, dec!(74.50)),
      entry(&eur, dec!(300.25)),
    ];
    let refs: Vec<&TimesheetEntry> = entries.iter().collect();
    let expense = ExpenseEntry::new(usd.id, "Stamp duty".to_string(), dec!(999.99));

    let result = reconcile(&[usd.clone(), eur.clone()], &refs, &[&expense], true, None);

    let grouped: Decimal = result.breakdown.iter().map(|g| g.amount).sum();
    let input: Decimal =
      entries.iter().map(|e| e.amount.amount).sum::<Decimal>() + expense.amount;
    assert_eq!(grouped, input);
  }

  #[test]
  fn test_empty_selection() {
    let result = reconcile(&[], &[], &[], false, None);
    assert!(result.breakdown.is_empty());
    assert!(!result.requires_conversion);
    assert_eq!(result.suggested_currency, None);
  }
}
