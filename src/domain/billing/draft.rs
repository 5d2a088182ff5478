use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::convert::{Conversion, convert};
use super::entities::{ExpenseEntry, InvoiceRecord, Matter, PersistableInvoice, TimesheetEntry};
use super::errors::{BillingError, ValidationError};
use super::reconcile::{Reconciliation, reconcile};
use super::selection::{DateBounds, SelectionEvent, SelectionState};
use super::value_objects::{BillingLocation, Currency, ExchangeRate, ExchangeRateMap, InvoiceNumber};

pub const DEFAULT_DUE_DATE_OFFSET_DAYS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
  Create,
  Edit,
}

/// The invoice draft aggregate. Created when matter selection begins,
/// mutated only through named operations, finalized (immutable) once the
/// submission to the invoice store succeeds.
///
/// Dates follow the temporal constraints of the selection: in create mode
/// the invoice and due dates track the derived minimums until the user
/// overrides them; in edit mode previously persisted dates are never
/// auto-overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
  mode: DraftMode,
  client_id: Option<Uuid>,
  selection: SelectionState,
  invoice_currency: Option<Currency>,
  exchange_rates: ExchangeRateMap,
  invoice_date: Option<NaiveDate>,
  due_date: Option<NaiveDate>,
  invoice_date_overridden: bool,
  due_date_overridden: bool,
  /// Raw user input; format-checked at finalize so a bad manual entry
  /// surfaces as a field-level diagnostic, not an exception.
  invoice_number: Option<String>,
  billing_location: Option<BillingLocation>,
  description: String,
  /// Edit mode: the timesheet selection stored on the persisted invoice.
  /// Fallback when the user deselects everything, so an update never
  /// silently invoices zero items.
  original_timesheet_ids: Vec<Uuid>,
  due_date_offset_days: i64,
  persisted_invoice: Option<Uuid>,
  finalized: bool,
}

impl InvoiceDraft {
  pub fn new(client_id: Uuid, due_date_offset_days: i64) -> Self {
    Self {
      mode: DraftMode::Create,
      client_id: Some(client_id),
      selection: SelectionState::new(None),
      invoice_currency: None,
      exchange_rates: ExchangeRateMap::new(),
      invoice_date: None,
      due_date: None,
      invoice_date_overridden: false,
      due_date_overridden: false,
      invoice_number: None,
      billing_location: None,
      description: String::new(),
      original_timesheet_ids: Vec::new(),
      due_date_offset_days,
      persisted_invoice: None,
      finalized: false,
    }
  }

  /// Rebuilds a draft from a persisted invoice, including the stored
  /// exchange rates and the original timesheet selection. Persisted dates
  /// count as user overrides.
  pub fn rehydrate(record: &InvoiceRecord, due_date_offset_days: i64) -> Self {
    Self {
      mode: DraftMode::Edit,
      client_id: Some(record.client_id),
      selection: SelectionState::new(Some(record.id)),
      invoice_currency: Some(record.currency),
      exchange_rates: record.exchange_rates.clone().unwrap_or_default(),
      invoice_date: Some(record.invoice_date),
      due_date: Some(record.due_date),
      invoice_date_overridden: true,
      due_date_overridden: true,
      invoice_number: Some(record.invoice_number.value().to_string()),
      billing_location: Some(record.billing_location),
      description: record.description.clone(),
      original_timesheet_ids: record.timesheet_ids.clone(),
      due_date_offset_days,
      persisted_invoice: Some(record.id),
      finalized: false,
    }
  }

  pub fn mode(&self) -> DraftMode {
    self.mode
  }

  pub fn client_id(&self) -> Option<Uuid> {
    self.client_id
  }

  pub fn selection(&self) -> &SelectionState {
    &self.selection
  }

  pub fn exchange_rates(&self) -> &ExchangeRateMap {
    &self.exchange_rates
  }

  pub fn invoice_date(&self) -> Option<NaiveDate> {
    self.invoice_date
  }

  pub fn due_date(&self) -> Option<NaiveDate> {
    self.due_date
  }

  pub fn invoice_number(&self) -> Option<&str> {
    self.invoice_number.as_deref()
  }

  pub fn billing_location(&self) -> Option<BillingLocation> {
    self.billing_location
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn original_timesheet_ids(&self) -> &[Uuid] {
    &self.original_timesheet_ids
  }

  pub fn persisted_invoice(&self) -> Option<Uuid> {
    self.persisted_invoice
  }

  pub fn is_finalized(&self) -> bool {
    self.finalized
  }

  pub fn bounds(&self) -> DateBounds {
    self.selection.bounds()
  }

  fn ensure_mutable(&self) -> Result<(), BillingError> {
    if self.finalized {
      return Err(BillingError::DraftFinalized);
    }
    Ok(())
  }

  fn apply_selection(&mut self, event: SelectionEvent) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.selection = std::mem::take(&mut self.selection).apply(event);
    self.recompute_dates();
    Ok(())
  }

  /// Create-mode auto-fill: track the derived minimums until the user
  /// takes over a field. Edit mode never touches persisted dates.
  fn recompute_dates(&mut self) {
    if self.mode != DraftMode::Create {
      return;
    }
    let bounds = self.selection.bounds();
    if !self.invoice_date_overridden {
      self.invoice_date = bounds.min_invoice_date;
    }
    if !self.due_date_overridden {
      self.due_date = bounds
        .min_due_date
        .map(|d| d + Duration::days(self.due_date_offset_days));
    }
  }

  // Selection operations

  pub fn select_matter(
    &mut self,
    matter: Matter,
    timesheets: Vec<TimesheetEntry>,
    expenses: Vec<ExpenseEntry>,
  ) -> Result<(), BillingError> {
    self.apply_selection(SelectionEvent::MatterAdded {
      matter,
      timesheets,
      expenses,
    })
  }

  pub fn deselect_matter(&mut self, matter_id: Uuid) -> Result<(), BillingError> {
    self.apply_selection(SelectionEvent::MatterRemoved(matter_id))
  }

  pub fn toggle_timesheet(&mut self, timesheet_id: Uuid) -> Result<(), BillingError> {
    self.apply_selection(SelectionEvent::TimesheetToggled(timesheet_id))
  }

  /// Toggles the filtered, not-invoiced subset atomically: everything on
  /// unless it is already fully selected, in which case everything off.
  pub fn toggle_select_all(&mut self, person: Option<String>) -> Result<(), BillingError> {
    let event = if self.selection.fully_selected(person.as_deref()) {
      SelectionEvent::DeselectAll { person }
    } else {
      SelectionEvent::SelectAll { person }
    };
    self.apply_selection(event)
  }

  pub fn set_date_range(
    &mut self,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
  ) -> Result<(), BillingError> {
    self.apply_selection(SelectionEvent::DateRangeChanged { from, to })
  }

  pub fn set_include_expenses(&mut self, include: bool) -> Result<(), BillingError> {
    self.apply_selection(SelectionEvent::ExpensesIncluded(include))
  }

  pub fn toggle_expense(&mut self, expense_id: Uuid) -> Result<(), BillingError> {
    self.apply_selection(SelectionEvent::ExpenseToggled(expense_id))
  }

  // Currency and rates

  pub fn set_invoice_currency(&mut self, currency: Currency) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.invoice_currency = Some(currency);
    Ok(())
  }

  pub fn set_exchange_rate(
    &mut self,
    currency: Currency,
    rate: ExchangeRate,
  ) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.exchange_rates.set(currency, rate);
    Ok(())
  }

  pub fn clear_exchange_rate(&mut self, currency: Currency) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.exchange_rates.remove(currency);
    Ok(())
  }

  // Dates, number, location, description

  pub fn set_invoice_date(&mut self, date: NaiveDate) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.invoice_date = Some(date);
    self.invoice_date_overridden = true;
    Ok(())
  }

  pub fn set_due_date(&mut self, date: NaiveDate) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.due_date = Some(date);
    self.due_date_overridden = true;
    Ok(())
  }

  pub fn set_invoice_number(&mut self, raw: impl Into<String>) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    let raw = raw.into();
    let trimmed = raw.trim();
    self.invoice_number = (!trimmed.is_empty()).then(|| trimmed.to_string());
    Ok(())
  }

  pub fn set_billing_location(&mut self, location: BillingLocation) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.billing_location = Some(location);
    Ok(())
  }

  pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), BillingError> {
    self.ensure_mutable()?;
    self.description = description.into();
    Ok(())
  }

  // Derived views

  /// Per-currency breakdown of the current selection.
  pub fn reconciliation(&self) -> Reconciliation {
    self.reconcile_entries(&self.selection.selected_entries())
  }

  /// The invoice currency in effect: the user's explicit choice, else the
  /// reconciler's suggestion.
  pub fn effective_currency(&self) -> Option<Currency> {
    self.reconciliation().suggested_currency
  }

  /// Conversion of the current breakdown into the effective currency.
  pub fn conversion(&self) -> Conversion {
    match self.effective_currency() {
      Some(currency) => convert(
        &self.reconciliation().breakdown,
        currency,
        &self.exchange_rates,
      ),
      None => Conversion::empty(),
    }
  }

  /// Rounded total preview; `None` until every required rate is present.
  pub fn total_preview(&self) -> Option<Decimal> {
    self.conversion().final_total()
  }

  fn reconcile_entries(&self, entries: &[&TimesheetEntry]) -> Reconciliation {
    let expenses = if self.selection.include_expenses() {
      self.selection.selected_expense_entries()
    } else {
      Vec::new()
    };
    reconcile(
      self.selection.matters(),
      entries,
      &expenses,
      self.selection.include_expenses(),
      self.invoice_currency,
    )
  }

  /// The timesheet ids an invoice would actually bill: the current
  /// selection, or in edit mode the original stored selection when the
  /// user has deselected everything.
  pub fn effective_timesheet_ids(&self) -> Vec<Uuid> {
    let selected = self.selection.selected_timesheet_ids();
    if selected.is_empty() && self.mode == DraftMode::Edit {
      return self.original_timesheet_ids.clone();
    }
    selected
  }

  fn effective_reconciliation(&self) -> Reconciliation {
    let ids = self.effective_timesheet_ids();
    self.reconcile_entries(&self.selection.entries_by_ids(&ids))
  }

  /// Runs the full validation pass without assembling, for callers that
  /// want diagnostics after each edit.
  pub fn diagnostics(&self) -> Vec<ValidationError> {
    self.validate().1
  }

  fn validate(&self) -> (Reconciliation, Vec<ValidationError>) {
    let mut errors = Vec::new();

    // 1. Client and at least one matter.
    if self.client_id.is_none() {
      errors.push(ValidationError::MissingClient);
    }
    if self.selection.matters().is_empty() {
      errors.push(ValidationError::NoMattersSelected);
    }

    // 2. Billing location.
    if self.billing_location.is_none() {
      errors.push(ValidationError::MissingBillingLocation);
    }

    // 3. Invoice number present and format-valid.
    match &self.invoice_number {
      None => errors.push(ValidationError::MissingInvoiceNumber),
      Some(raw) => {
        if InvoiceNumber::new(raw.clone()).is_err() {
          errors.push(ValidationError::InvalidInvoiceNumberFormat(raw.clone()));
        }
      }
    }

    let bounds = self.selection.bounds();

    // 4. Invoice date present and not before the derived minimum.
    match self.invoice_date {
      None => errors.push(ValidationError::MissingInvoiceDate),
      Some(given) => {
        if let Some(minimum) = bounds.min_invoice_date
          && given < minimum
        {
          errors.push(ValidationError::InvoiceDateTooEarly { given, minimum });
        }
      }
    }

    // 5. Due date present, not before the invoice date, not before the
    //    derived minimum.
    match self.due_date {
      None => errors.push(ValidationError::MissingDueDate),
      Some(due) => {
        if let Some(invoice) = self.invoice_date
          && due < invoice
        {
          errors.push(ValidationError::DueDateBeforeInvoiceDate { due, invoice });
        }
        if let Some(minimum) = bounds.min_due_date
          && due < minimum
        {
          errors.push(ValidationError::DueDateTooEarly { given: due, minimum });
        }
      }
    }

    let reconciliation = self.effective_reconciliation();
    let conversion = reconciliation
      .suggested_currency
      .map(|currency| convert(&reconciliation.breakdown, currency, &self.exchange_rates));

    // 6. Positive total. Well-defined only once every rate is present; a
    //    missing rate is reported by check 8 instead.
    match &conversion {
      None => errors.push(ValidationError::NonPositiveTotal),
      Some(conversion) => {
        if let Some(total) = conversion.final_total()
          && total <= Decimal::ZERO
        {
          errors.push(ValidationError::NonPositiveTotal);
        }
      }
    }

    // 7. Description.
    if self.description.trim().is_empty() {
      errors.push(ValidationError::MissingDescription);
    }

    // 8. Every non-invoice-currency group has a stored positive rate.
    if let Some(conversion) = &conversion {
      for currency in &conversion.missing_rates {
        errors.push(ValidationError::MissingExchangeRate(*currency));
      }
    }

    (reconciliation, errors)
  }

  /// Validates the whole draft, accumulating every diagnostic rather than
  /// failing fast, and assembles the persistable payload on success.
  pub fn finalize(&self) -> Result<PersistableInvoice, Vec<ValidationError>> {
    let (reconciliation, errors) = self.validate();
    if !errors.is_empty() {
      return Err(errors);
    }

    // Validation guarantees presence of everything below.
    let currency = reconciliation
      .suggested_currency
      .expect("validated draft has an effective currency");
    let conversion = convert(&reconciliation.breakdown, currency, &self.exchange_rates);
    let invoice_number = self
      .invoice_number
      .clone()
      .map(InvoiceNumber::new)
      .expect("validated draft has an invoice number")
      .expect("validated draft has a well-formed invoice number");

    let expense_ids = if self.selection.include_expenses() {
      self.selection.selected_expense_ids()
    } else {
      Vec::new()
    };

    Ok(PersistableInvoice {
      client_id: self.client_id.expect("validated draft has a client"),
      matter_ids: self.selection.matters().iter().map(|m| m.id).collect(),
      timesheet_ids: self.effective_timesheet_ids(),
      expense_ids,
      currency,
      exchange_rates: reconciliation
        .requires_conversion
        .then(|| self.exchange_rates.clone()),
      invoice_date: self.invoice_date.expect("validated draft has an invoice date"),
      due_date: self.due_date.expect("validated draft has a due date"),
      invoice_number,
      billing_location: self
        .billing_location
        .expect("validated draft has a billing location"),
      description: self.description.clone(),
      total: conversion
        .final_total()
        .expect("validated draft has a complete conversion"),
    })
  }

  /// Marks the draft immutable after a successful submission.
  pub fn mark_finalized(&mut self, invoice_id: Uuid) {
    self.persisted_invoice = Some(invoice_id);
    self.finalized = true;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::billing::value_objects::{Money, TimesheetStatus};
  use rust_decimal_macros::dec;

  fn usd_matter(client_id: Uuid) -> Matter {
    Matter::new(client_id, "Acme arbitration".to_string(), Currency::USD)
  }

  fn eur_matter(client_id: Uuid) -> Matter {
    Matter::new(client_id, "Grid licensing".to_string(), Currency::EUR)
  }

  fn entry(matter: &Matter, date: (i32, u32, u32), amount: Decimal) -> TimesheetEntry {
    TimesheetEntry::new(
      matter.id,
      "A. Mehta".to_string(),
      NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
      Money::new(amount, matter.currency).unwrap(),
      TimesheetStatus::Approved,
    )
  }

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  /// Scenario: one USD matter, $500 on 10 Jan and $300 on 20 Jan, no
  /// expenses. Dates auto-fill from the latest selected work.
  fn single_matter_draft() -> InvoiceDraft {
    let client = Uuid::new_v4();
    let m1 = usd_matter(client);
    let a = entry(&m1, (2024, 1, 10), dec!(500));
    let b = entry(&m1, (2024, 1, 20), dec!(300));
    let (a_id, b_id) = (a.id, b.id);

    let mut draft = InvoiceDraft::new(client, DEFAULT_DUE_DATE_OFFSET_DAYS);
    draft.select_matter(m1, vec![a, b], vec![]).unwrap();
    draft.toggle_timesheet(a_id).unwrap();
    draft.toggle_timesheet(b_id).unwrap();
    draft
  }

  #[test]
  fn test_create_mode_auto_dates_and_total() {
    let draft = single_matter_draft();

    let reconciliation = draft.reconciliation();
    assert_eq!(reconciliation.breakdown.len(), 1);
    assert_eq!(reconciliation.breakdown[0].amount, dec!(800));
    assert!(!reconciliation.requires_conversion);

    assert_eq!(draft.bounds().min_invoice_date, Some(ymd(2024, 1, 20)));
    assert_eq!(draft.invoice_date(), Some(ymd(2024, 1, 20)));
    assert_eq!(draft.due_date(), Some(ymd(2024, 3, 20)));
    assert_eq!(draft.total_preview(), Some(dec!(800.00)));
  }

  #[test]
  fn test_user_override_survives_selection_changes() {
    let mut draft = single_matter_draft();
    draft.set_invoice_date(ymd(2024, 2, 1)).unwrap();

    // Further selection churn must not claw back the user's date.
    draft.toggle_select_all(None).unwrap();
    draft.toggle_select_all(None).unwrap();
    assert_eq!(draft.invoice_date(), Some(ymd(2024, 2, 1)));
    // The due date was never overridden and keeps tracking the bound.
    assert_eq!(draft.due_date(), Some(ymd(2024, 3, 20)));
  }

  #[test]
  fn test_finalize_happy_path() {
    let mut draft = single_matter_draft();
    draft.set_billing_location(BillingLocation::Mumbai).unwrap();
    draft.set_invoice_number("20012024-M").unwrap();
    draft.set_description("Professional fees, January 2024").unwrap();

    let payload = draft.finalize().expect("draft should finalize");
    assert_eq!(payload.total, dec!(800.00));
    assert_eq!(payload.currency, Currency::USD);
    assert_eq!(payload.timesheet_ids.len(), 2);
    assert!(payload.exchange_rates.is_none());
    assert!(payload.expense_ids.is_empty());
    assert_eq!(payload.invoice_date, ymd(2024, 1, 20));
    assert_eq!(payload.due_date, ymd(2024, 3, 20));
  }

  #[test]
  fn test_missing_rate_blocks_finalize() {
    let client = Uuid::new_v4();
    let m1 = usd_matter(client);
    let m2 = eur_matter(client);
    let a = entry(&m1, (2024, 1, 10), dec!(800));
    let b = entry(&m2, (2024, 1, 15), dec!(200));
    let (a_id, b_id) = (a.id, b.id);

    let mut draft = InvoiceDraft::new(client, DEFAULT_DUE_DATE_OFFSET_DAYS);
    draft.select_matter(m1, vec![a], vec![]).unwrap();
    draft.select_matter(m2, vec![b], vec![]).unwrap();
    draft.toggle_timesheet(a_id).unwrap();
    draft.toggle_timesheet(b_id).unwrap();
    draft.set_invoice_currency(Currency::USD).unwrap();
    draft.set_billing_location(BillingLocation::Delhi).unwrap();
    draft.set_invoice_number("15012024-D").unwrap();
    draft.set_description("Fees".to_string()).unwrap();

    // No EUR rate supplied: no total, one missing-rate diagnostic.
    assert_eq!(draft.total_preview(), None);
    let errors = draft.finalize().unwrap_err();
    assert_eq!(
      errors,
      vec![ValidationError::MissingExchangeRate(Currency::EUR)]
    );

    // Supplying the rate converts and finalizes: 800 + 200 x 1.08.
    draft
      .set_exchange_rate(Currency::EUR, ExchangeRate::new(dec!(1.08)).unwrap())
      .unwrap();
    let payload = draft.finalize().expect("rate supplied");
    assert_eq!(payload.total, dec!(1016.00));
    assert_eq!(payload.currency, Currency::USD);
    let rates = payload.exchange_rates.expect("conversion was required");
    assert_eq!(rates.get(Currency::EUR).unwrap().value(), dec!(1.08));
  }

  #[test]
  fn test_invoice_date_before_minimum_is_rejected() {
    let mut draft = single_matter_draft();
    draft.set_billing_location(BillingLocation::Mumbai).unwrap();
    draft.set_invoice_number("20012024-M").unwrap();
    draft.set_description("Fees").unwrap();
    draft.set_invoice_date(ymd(2024, 1, 15)).unwrap();

    let errors = draft.finalize().unwrap_err();
    assert!(errors.contains(&ValidationError::InvoiceDateTooEarly {
      given: ymd(2024, 1, 15),
      minimum: ymd(2024, 1, 20),
    }));
  }

  #[test]
  fn test_due_date_ordering() {
    let mut draft = single_matter_draft();
    draft.set_billing_location(BillingLocation::Mumbai).unwrap();
    draft.set_invoice_number("20012024-M").unwrap();
    draft.set_description("Fees").unwrap();
    draft.set_invoice_date(ymd(2024, 1, 25)).unwrap();
    draft.set_due_date(ymd(2024, 1, 22)).unwrap();

    let errors = draft.finalize().unwrap_err();
    assert!(errors.contains(&ValidationError::DueDateBeforeInvoiceDate {
      due: ymd(2024, 1, 22),
      invoice: ymd(2024, 1, 25),
    }));
  }

  #[test]
  fn test_all_errors_accumulate() {
    let client = Uuid::new_v4();
    let draft = InvoiceDraft::new(client, DEFAULT_DUE_DATE_OFFSET_DAYS);
    let errors = draft.finalize().unwrap_err();

    assert!(errors.contains(&ValidationError::NoMattersSelected));
    assert!(errors.contains(&ValidationError::MissingBillingLocation));
    assert!(errors.contains(&ValidationError::MissingInvoiceNumber));
    assert!(errors.contains(&ValidationError::MissingInvoiceDate));
    assert!(errors.contains(&ValidationError::MissingDueDate));
    assert!(errors.contains(&ValidationError::NonPositiveTotal));
    assert!(errors.contains(&ValidationError::MissingDescription));
  }

  #[test]
  fn test_malformed_manual_number_is_a_diagnostic() {
    let mut draft = single_matter_draft();
    draft.set_billing_location(BillingLocation::Mumbai).unwrap();
    draft.set_invoice_number("INV-0042").unwrap();
    draft.set_description("Fees").unwrap();

    let errors = draft.finalize().unwrap_err();
    assert_eq!(
      errors,
      vec![ValidationError::InvalidInvoiceNumberFormat("INV-0042".to_string())]
    );
  }

  #[test]
  fn test_edit_mode_falls_back_to_original_selection() {
    let client = Uuid::new_v4();
    let invoice_id = Uuid::new_v4();
    let m1 = usd_matter(client);
    let mut a = entry(&m1, (2024, 1, 10), dec!(500));
    a.is_invoiced = true;
    a.invoice_ref = Some(invoice_id);
    let a_id = a.id;

    let record = InvoiceRecord {
      id: invoice_id,
      client_id: client,
      matter_ids: vec![m1.id],
      timesheet_ids: vec![a_id],
      expense_ids: vec![],
      currency: Currency::USD,
      exchange_rates: None,
      invoice_date: ymd(2024, 1, 10),
      due_date: ymd(2024, 3, 10),
      invoice_number: InvoiceNumber::new("10012024-M".to_string()).unwrap(),
      billing_location: BillingLocation::Mumbai,
      description: "Professional fees".to_string(),
      total: dec!(500.00),
      created_at: chrono::Utc::now(),
      updated_at: chrono::Utc::now(),
    };

    let mut draft = InvoiceDraft::rehydrate(&record, DEFAULT_DUE_DATE_OFFSET_DAYS);
    assert_eq!(draft.mode(), DraftMode::Edit);
    draft.select_matter(m1, vec![a], vec![]).unwrap();
    draft.toggle_timesheet(a_id).unwrap();

    // Persisted dates stay put in edit mode.
    assert_eq!(draft.invoice_date(), Some(ymd(2024, 1, 10)));
    assert_eq!(draft.due_date(), Some(ymd(2024, 3, 10)));

    // Deselect everything: the payload falls back to the stored selection
    // rather than invoicing zero items.
    draft.toggle_timesheet(a_id).unwrap();
    assert!(draft.selection().selected_timesheet_ids().is_empty());
    let payload = draft.finalize().expect("fallback selection keeps it valid");
    assert_eq!(payload.timesheet_ids, vec![a_id]);
    assert_eq!(payload.total, dec!(500.00));
  }

  #[test]
  fn test_expenses_merge_and_are_listed_only_when_included() {
    let client = Uuid::new_v4();
    let m1 = usd_matter(client);
    let a = entry(&m1, (2024, 1, 20), dec!(800));
    let a_id = a.id;
    let expense = ExpenseEntry::new(m1.id, "Court fees".to_string(), dec!(2500));
    let expense_id = expense.id;

    let mut draft = InvoiceDraft::new(client, DEFAULT_DUE_DATE_OFFSET_DAYS);
    draft.select_matter(m1, vec![a], vec![expense]).unwrap();
    draft.toggle_timesheet(a_id).unwrap();
    draft.set_include_expenses(true).unwrap();
    draft.toggle_expense(expense_id).unwrap();
    draft.set_invoice_currency(Currency::USD).unwrap();
    draft
      .set_exchange_rate(Currency::INR, ExchangeRate::new(dec!(0.012)).unwrap())
      .unwrap();
    draft.set_billing_location(BillingLocation::Mumbai).unwrap();
    draft.set_invoice_number("20012024-M").unwrap();
    draft.set_description("Fees and expenses").unwrap();

    let payload = draft.finalize().expect("complete draft");
    assert_eq!(payload.expense_ids, vec![expense_id]);
    // 800 + 2500 x 0.012
    assert_eq!(payload.total, dec!(830.00));

    // Toggling inclusion off drops the expense ids and the INR group.
    draft.set_include_expenses(false).unwrap();
    let payload = draft.finalize().expect("still valid");
    assert!(payload.expense_ids.is_empty());
    assert_eq!(payload.total, dec!(800.00));
    assert!(payload.exchange_rates.is_none());
  }

  #[test]
  fn test_finalized_draft_rejects_mutation() {
    let mut draft = single_matter_draft();
    draft.mark_finalized(Uuid::new_v4());

    assert!(matches!(
      draft.toggle_select_all(None),
      Err(BillingError::DraftFinalized)
    ));
    assert!(matches!(
      draft.set_description("late edit"),
      Err(BillingError::DraftFinalized)
    ));
  }
}
