use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::billing::{
  BillableItemStore, BillingError, CurrencyDetection, CurrencyDetector, ExpenseEntry,
  InvoiceNumber, InvoiceNumberSource, InvoiceRecord, InvoiceStore, Matter, PersistableInvoice,
  TimesheetEntry, TimesheetStatus, reconcile,
};

/// In-memory billable-item store for development and testing. Seeded
/// explicitly; `mark_invoiced` mimics the real store flipping entries
/// when an invoice is persisted.
#[derive(Default)]
pub struct InMemoryBillableItemStore {
  matters: Mutex<HashMap<Uuid, Matter>>,
  timesheets: Mutex<Vec<TimesheetEntry>>,
  expenses: Mutex<Vec<ExpenseEntry>>,
}

impl InMemoryBillableItemStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_matter(&self, matter: Matter) {
    self
      .matters
      .lock()
      .expect("matter store lock poisoned")
      .insert(matter.id, matter);
  }

  pub fn insert_timesheet(&self, entry: TimesheetEntry) {
    self
      .timesheets
      .lock()
      .expect("timesheet store lock poisoned")
      .push(entry);
  }

  pub fn insert_expense(&self, entry: ExpenseEntry) {
    self
      .expenses
      .lock()
      .expect("expense store lock poisoned")
      .push(entry);
  }

  /// Flips `is_invoiced` on the given entries, as the persistence layer
  /// does exactly when an invoice is created.
  pub fn mark_invoiced(&self, timesheet_ids: &[Uuid], invoice_id: Uuid) {
    let mut timesheets = self.timesheets.lock().expect("timesheet store lock poisoned");
    for entry in timesheets.iter_mut() {
      if timesheet_ids.contains(&entry.id) {
        entry.is_invoiced = true;
        entry.invoice_ref = Some(invoice_id);
      }
    }
  }
}

#[async_trait]
impl BillableItemStore for InMemoryBillableItemStore {
  async fn fetch_matter(&self, matter_id: Uuid) -> Result<Matter, BillingError> {
    self
      .matters
      .lock()
      .expect("matter store lock poisoned")
      .get(&matter_id)
      .cloned()
      .ok_or_else(|| BillingError::Internal(format!("matter {} not found", matter_id)))
  }

  async fn list_timesheets(
    &self,
    matter_id: Uuid,
    status: TimesheetStatus,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<TimesheetEntry>, BillingError> {
    let timesheets = self.timesheets.lock().expect("timesheet store lock poisoned");
    Ok(
      timesheets
        .iter()
        .filter(|e| e.matter_id == matter_id && e.status == status)
        .filter(|e| date_from.is_none_or(|from| e.date >= from))
        .filter(|e| date_to.is_none_or(|to| e.date <= to))
        .cloned()
        .collect(),
    )
  }

  async fn list_expenses(&self, matter_id: Uuid) -> Result<Vec<ExpenseEntry>, BillingError> {
    let expenses = self.expenses.lock().expect("expense store lock poisoned");
    Ok(
      expenses
        .iter()
        .filter(|e| e.matter_id == matter_id && e.included)
        .cloned()
        .collect(),
    )
  }
}

/// Server-side currency detection backed by the same in-memory data,
/// running the engine's own reconciliation so the two stay consistent.
pub struct LocalCurrencyDetector {
  billables: Arc<InMemoryBillableItemStore>,
}

impl LocalCurrencyDetector {
  pub fn new(billables: Arc<InMemoryBillableItemStore>) -> Self {
    Self { billables }
  }
}

#[async_trait]
impl CurrencyDetector for LocalCurrencyDetector {
  async fn detect_currencies(
    &self,
    matter_ids: &[Uuid],
    timesheet_ids: Option<&[Uuid]>,
    expense_ids: Option<&[Uuid]>,
  ) -> Result<CurrencyDetection, BillingError> {
    let matters_by_id = self
      .billables
      .matters
      .lock()
      .expect("matter store lock poisoned");
    let matters: Vec<Matter> = matter_ids
      .iter()
      .filter_map(|id| matters_by_id.get(id).cloned())
      .collect();
    drop(matters_by_id);

    let all_timesheets = self
      .billables
      .timesheets
      .lock()
      .expect("timesheet store lock poisoned");
    let timesheets: Vec<&TimesheetEntry> = all_timesheets
      .iter()
      .filter(|e| matter_ids.contains(&e.matter_id))
      .filter(|e| timesheet_ids.is_none_or(|ids| ids.contains(&e.id)))
      .collect();

    let all_expenses = self
      .billables
      .expenses
      .lock()
      .expect("expense store lock poisoned");
    let expenses: Vec<&ExpenseEntry> = all_expenses
      .iter()
      .filter(|e| matter_ids.contains(&e.matter_id))
      .filter(|e| expense_ids.is_some_and(|ids| ids.contains(&e.id)))
      .collect();
    let include_expenses = !expenses.is_empty();

    let reconciliation = reconcile(&matters, &timesheets, &expenses, include_expenses, None);
    Ok(CurrencyDetection {
      breakdown: reconciliation.breakdown,
      requires_exchange_rates: reconciliation.requires_conversion,
      suggested_invoice_currency: reconciliation.suggested_currency,
    })
  }
}

/// In-memory invoice store. Enforces invoice-number uniqueness with an
/// atomic check-and-insert under one lock, the contract every real
/// implementation must honor: two clients racing to the same date+office
/// suffix get a conflict, not a duplicate.
#[derive(Default)]
pub struct InMemoryInvoiceStore {
  records: Mutex<HashMap<Uuid, InvoiceRecord>>,
}

impl InMemoryInvoiceStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_record(&self, record: InvoiceRecord) {
    self
      .records
      .lock()
      .expect("invoice store lock poisoned")
      .insert(record.id, record);
  }

  pub fn len(&self) -> usize {
    self.records.lock().expect("invoice store lock poisoned").len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
  async fn create_invoice(
    &self,
    payload: PersistableInvoice,
  ) -> Result<InvoiceRecord, BillingError> {
    let mut records = self.records.lock().expect("invoice store lock poisoned");
    if records
      .values()
      .any(|r| r.invoice_number == payload.invoice_number)
    {
      return Err(BillingError::Conflict(format!(
        "invoice number {} already exists",
        payload.invoice_number
      )));
    }
    let record = InvoiceRecord::from_payload(Uuid::new_v4(), payload);
    records.insert(record.id, record.clone());
    Ok(record)
  }

  async fn update_invoice(
    &self,
    id: Uuid,
    payload: PersistableInvoice,
  ) -> Result<InvoiceRecord, BillingError> {
    let mut records = self.records.lock().expect("invoice store lock poisoned");
    if records
      .values()
      .any(|r| r.id != id && r.invoice_number == payload.invoice_number)
    {
      return Err(BillingError::Conflict(format!(
        "invoice number {} already exists",
        payload.invoice_number
      )));
    }
    let record = records
      .get_mut(&id)
      .ok_or(BillingError::InvoiceNotFound(id))?;
    record.apply_payload(payload);
    Ok(record.clone())
  }

  async fn fetch_invoice(&self, id: Uuid) -> Result<Option<InvoiceRecord>, BillingError> {
    Ok(
      self
        .records
        .lock()
        .expect("invoice store lock poisoned")
        .get(&id)
        .cloned(),
    )
  }
}

#[async_trait]
impl InvoiceNumberSource for InMemoryInvoiceStore {
  async fn numbers_with_prefix(
    &self,
    prefix: &str,
  ) -> Result<Vec<InvoiceNumber>, BillingError> {
    Ok(
      self
        .records
        .lock()
        .expect("invoice store lock poisoned")
        .values()
        .map(|r| r.invoice_number.clone())
        .filter(|n| n.date_office_prefix() == prefix)
        .collect(),
    )
  }
}
