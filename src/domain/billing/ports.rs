use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::{
  CurrencyGroup, ExpenseEntry, InvoiceRecord, Matter, PersistableInvoice, TimesheetEntry,
};
use super::errors::BillingError;
use super::value_objects::{Currency, InvoiceNumber, TimesheetStatus};

/// Supplies billable work filtered by matter, status and date range.
/// Consumed, not implemented, by the engine.
#[async_trait]
pub trait BillableItemStore: Send + Sync {
  async fn fetch_matter(&self, matter_id: Uuid) -> Result<Matter, BillingError>;

  async fn list_timesheets(
    &self,
    matter_id: Uuid,
    status: TimesheetStatus,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
  ) -> Result<Vec<TimesheetEntry>, BillingError>;

  /// Returns only entries with a matter association and `included` not
  /// false. Optional data: callers may degrade to an empty list with a
  /// warning when this fetch fails.
  async fn list_expenses(&self, matter_id: Uuid) -> Result<Vec<ExpenseEntry>, BillingError>;
}

/// Server-side currency detection result. May duplicate the engine's own
/// reconciliation; the two must agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDetection {
  pub breakdown: Vec<CurrencyGroup>,
  pub requires_exchange_rates: bool,
  pub suggested_invoice_currency: Option<Currency>,
}

#[async_trait]
pub trait CurrencyDetector: Send + Sync {
  async fn detect_currencies(
    &self,
    matter_ids: &[Uuid],
    timesheet_ids: Option<&[Uuid]>,
    expense_ids: Option<&[Uuid]>,
  ) -> Result<CurrencyDetection, BillingError>;
}

/// Query surface for the invoice number allocator: which numbers already
/// exist in a date+office series.
#[async_trait]
pub trait InvoiceNumberSource: Send + Sync {
  async fn numbers_with_prefix(&self, prefix: &str)
  -> Result<Vec<InvoiceNumber>, BillingError>;
}

/// Terminal sink for the draft assembler's output, and the source of
/// persisted invoices for edit-mode rehydration.
///
/// Implementations MUST enforce invoice-number uniqueness with an atomic
/// check-and-insert (unique constraint or equivalent) and report a
/// collision as `BillingError::Conflict`; the engine's client-side
/// allocation is a convenience, never the correctness mechanism.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
  async fn create_invoice(
    &self,
    payload: PersistableInvoice,
  ) -> Result<InvoiceRecord, BillingError>;

  async fn update_invoice(
    &self,
    id: Uuid,
    payload: PersistableInvoice,
  ) -> Result<InvoiceRecord, BillingError>;

  async fn fetch_invoice(&self, id: Uuid) -> Result<Option<InvoiceRecord>, BillingError>;
}
