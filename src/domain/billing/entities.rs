use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::value_objects::{
  BillingLocation, Currency, ExchangeRateMap, InvoiceNumber, Money, TimesheetStatus,
};

// Matter - The engagement a timesheet belongs to. Owned by the matters
// domain; the billing engine only reads its currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matter {
  pub id: Uuid,
  pub client_id: Uuid,
  pub name: String,
  pub currency: Currency,
}

impl Matter {
  pub fn new(client_id: Uuid, name: String, currency: Currency) -> Self {
    Self {
      id: Uuid::new_v4(),
      client_id,
      name,
      currency,
    }
  }
}

// Timesheet Entry - Billable work. Amount and currency are fixed once
// approved; `is_invoiced` flips exactly when the entry is attached to a
// persisted invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetEntry {
  pub id: Uuid,
  pub matter_id: Uuid,
  pub person: String,
  pub date: NaiveDate,
  pub amount: Money,
  pub status: TimesheetStatus,
  pub is_invoiced: bool,
  pub invoice_ref: Option<Uuid>,
}

impl TimesheetEntry {
  pub fn new(
    matter_id: Uuid,
    person: String,
    date: NaiveDate,
    amount: Money,
    status: TimesheetStatus,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      matter_id,
      person,
      date,
      amount,
      status,
      is_invoiced: false,
      invoice_ref: None,
    }
  }

  /// Whether the entry is locked against selection in the given draft.
  /// Entries already billed by the invoice being edited stay selectable;
  /// entries billed by any other invoice are always locked.
  pub fn is_locked_for(&self, editing_invoice: Option<Uuid>) -> bool {
    if !self.is_invoiced {
      return false;
    }
    match editing_invoice {
      Some(id) => self.invoice_ref != Some(id),
      None => true,
    }
  }
}

// Expense Entry - One-time expense, always denominated in INR. The
// `included` flag is set by the expenses collaborator; the engine only
// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
  pub id: Uuid,
  pub matter_id: Uuid,
  pub description: String,
  pub amount: Decimal,
  pub included: bool,
}

impl ExpenseEntry {
  pub fn new(matter_id: Uuid, description: String, amount: Decimal) -> Self {
    Self {
      id: Uuid::new_v4(),
      matter_id,
      description,
      amount,
      included: true,
    }
  }

  pub fn money(&self) -> Money {
    Money {
      amount: self.amount,
      currency: Currency::INR,
    }
  }
}

// Currency Group - Derived, ephemeral slice of the selection: one native
// currency, the matters contributing to it, and the summed amount.
// Recomputed on every selection change, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyGroup {
  pub currency: Currency,
  pub matter_ids: BTreeSet<Uuid>,
  pub amount: Decimal,
}

impl CurrencyGroup {
  pub fn new(currency: Currency) -> Self {
    Self {
      currency,
      matter_ids: BTreeSet::new(),
      amount: Decimal::ZERO,
    }
  }
}

// Persistable Invoice - The validated payload the draft assembler emits
// towards the invoice store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistableInvoice {
  pub client_id: Uuid,
  pub matter_ids: Vec<Uuid>,
  pub timesheet_ids: Vec<Uuid>,
  /// Empty unless expense inclusion was enabled on the draft.
  pub expense_ids: Vec<Uuid>,
  pub currency: Currency,
  /// Present only when the breakdown spanned more than one currency.
  pub exchange_rates: Option<ExchangeRateMap>,
  pub invoice_date: NaiveDate,
  pub due_date: NaiveDate,
  pub invoice_number: InvoiceNumber,
  pub billing_location: BillingLocation,
  pub description: String,
  /// Rounded to 2 decimal places, half-up.
  pub total: Decimal,
}

// Invoice Record - A persisted invoice as returned by the invoice store.
// Carries everything needed to rehydrate a draft in edit mode, including
// the stored exchange rates and the original timesheet selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
  pub id: Uuid,
  pub client_id: Uuid,
  pub matter_ids: Vec<Uuid>,
  pub timesheet_ids: Vec<Uuid>,
  pub expense_ids: Vec<Uuid>,
  pub currency: Currency,
  pub exchange_rates: Option<ExchangeRateMap>,
  pub invoice_date: NaiveDate,
  pub due_date: NaiveDate,
  pub invoice_number: InvoiceNumber,
  pub billing_location: BillingLocation,
  pub description: String,
  pub total: Decimal,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl InvoiceRecord {
  pub fn from_payload(id: Uuid, payload: PersistableInvoice) -> Self {
    let now = Utc::now();
    Self {
      id,
      client_id: payload.client_id,
      matter_ids: payload.matter_ids,
      timesheet_ids: payload.timesheet_ids,
      expense_ids: payload.expense_ids,
      currency: payload.currency,
      exchange_rates: payload.exchange_rates,
      invoice_date: payload.invoice_date,
      due_date: payload.due_date,
      invoice_number: payload.invoice_number,
      billing_location: payload.billing_location,
      description: payload.description,
      total: payload.total,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn apply_payload(&mut self, payload: PersistableInvoice) {
    self.client_id = payload.client_id;
    self.matter_ids = payload.matter_ids;
    self.timesheet_ids = payload.timesheet_ids;
    self.expense_ids = payload.expense_ids;
    self.currency = payload.currency;
    self.exchange_rates = payload.exchange_rates;
    self.invoice_date = payload.invoice_date;
    self.due_date = payload.due_date;
    self.invoice_number = payload.invoice_number;
    self.billing_location = payload.billing_location;
    self.description = payload.description;
    self.total = payload.total;
    self.updated_at = Utc::now();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::value_objects::ExchangeRate;
  use rust_decimal_macros::dec;

  fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD).unwrap()
  }

  #[test]
  fn test_uninvoiced_entry_is_never_locked() {
    let entry = TimesheetEntry::new(
      Uuid::new_v4(),
      "A. Mehta".to_string(),
      NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
      usd(dec!(500)),
      TimesheetStatus::Approved,
    );
    assert!(!entry.is_locked_for(None));
    assert!(!entry.is_locked_for(Some(Uuid::new_v4())));
  }

  #[test]
  fn test_invoiced_entry_locked_except_for_its_own_invoice() {
    let invoice_id = Uuid::new_v4();
    let mut entry = TimesheetEntry::new(
      Uuid::new_v4(),
      "A. Mehta".to_string(),
      NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
      usd(dec!(500)),
      TimesheetStatus::Approved,
    );
    entry.is_invoiced = true;
    entry.invoice_ref = Some(invoice_id);

    assert!(entry.is_locked_for(None));
    assert!(entry.is_locked_for(Some(Uuid::new_v4())));
    assert!(!entry.is_locked_for(Some(invoice_id)));
  }

  #[test]
  fn test_invoice_record_survives_json_round_trip() {
    let mut rates = ExchangeRateMap::new();
    rates.set(Currency::EUR, ExchangeRate::new(dec!(1.08)).unwrap());

    let payload = PersistableInvoice {
      client_id: Uuid::new_v4(),
      matter_ids: vec![Uuid::new_v4()],
      timesheet_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
      expense_ids: vec![],
      currency: Currency::USD,
      exchange_rates: Some(rates),
      invoice_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
      due_date: NaiveDate::from_ymd_opt(2026, 3, 16).unwrap(),
      invoice_number: InvoiceNumber::new("15012026-M".to_string()).unwrap(),
      billing_location: BillingLocation::Mumbai,
      description: "Professional fees".to_string(),
      total: dec!(1016.00),
    };
    let record = InvoiceRecord::from_payload(Uuid::new_v4(), payload);

    let json = serde_json::to_string(&record).unwrap();
    let restored: InvoiceRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, record);
  }

  #[test]
  fn test_expense_money_is_inr() {
    let expense = ExpenseEntry::new(Uuid::new_v4(), "Court fees".to_string(), dec!(2500));
    assert_eq!(expense.money().currency, Currency::INR);
    assert_eq!(expense.money().amount, dec!(2500));
  }
}
