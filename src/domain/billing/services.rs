use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use super::allocator;
use super::draft::{DEFAULT_DUE_DATE_OFFSET_DAYS, InvoiceDraft};
use super::entities::{InvoiceRecord, Matter};
use super::errors::BillingError;
use super::ports::{
  BillableItemStore, CurrencyDetection, CurrencyDetector, InvoiceNumberSource, InvoiceStore,
};
use super::value_objects::{BillingLocation, InvoiceNumber, TimesheetStatus};

/// Billing policy knobs, loaded from configuration.
#[derive(Debug, Clone)]
pub struct BillingServiceConfig {
  /// Offset applied to the derived minimum due date in create mode.
  pub due_date_offset_days: i64,
  /// Status a timesheet must have reached to be billable.
  pub billable_status: TimesheetStatus,
}

impl Default for BillingServiceConfig {
  fn default() -> Self {
    Self {
      due_date_offset_days: DEFAULT_DUE_DATE_OFFSET_DAYS,
      billable_status: TimesheetStatus::Approved,
    }
  }
}

/// Orchestrates the invoice-creation workflow against the external
/// collaborators. The engine itself is synchronous and re-derives state
/// from the current selection; the collaborator calls here are the only
/// suspension points, each a single logical request-response.
pub struct BillingService {
  billables: Arc<dyn BillableItemStore>,
  currency_detector: Arc<dyn CurrencyDetector>,
  numbers: Arc<dyn InvoiceNumberSource>,
  invoices: Arc<dyn InvoiceStore>,
  config: BillingServiceConfig,
}

impl BillingService {
  pub fn new(
    billables: Arc<dyn BillableItemStore>,
    currency_detector: Arc<dyn CurrencyDetector>,
    numbers: Arc<dyn InvoiceNumberSource>,
    invoices: Arc<dyn InvoiceStore>,
    config: BillingServiceConfig,
  ) -> Self {
    Self {
      billables,
      currency_detector,
      numbers,
      invoices,
      config,
    }
  }

  /// Begins a create-mode draft for a client.
  pub fn start_draft(&self, client_id: Uuid) -> InvoiceDraft {
    InvoiceDraft::new(client_id, self.config.due_date_offset_days)
  }

  /// Fetches a matter's billable items and attaches them to the draft.
  ///
  /// Timesheets are required data and block on failure. The expense list
  /// is optional: a failed fetch degrades to an empty list with a
  /// warning so the user can keep billing fees.
  pub async fn attach_matter(
    &self,
    draft: &mut InvoiceDraft,
    matter_id: Uuid,
  ) -> Result<(), BillingError> {
    let matter = self.billables.fetch_matter(matter_id).await?;
    if let Some(client_id) = draft.client_id()
      && matter.client_id != client_id
    {
      return Err(BillingError::MatterClientMismatch(matter_id));
    }

    let (date_from, date_to) = draft.selection().date_range();
    let timesheets = self
      .billables
      .list_timesheets(matter_id, self.config.billable_status, date_from, date_to)
      .await?;
    let expenses = match self.billables.list_expenses(matter_id).await {
      Ok(expenses) => expenses,
      Err(err) => {
        tracing::warn!(%matter_id, error = %err, "expense list unavailable, continuing without");
        Vec::new()
      }
    };

    tracing::debug!(
      %matter_id,
      timesheets = timesheets.len(),
      expenses = expenses.len(),
      "attached matter billables"
    );
    draft.select_matter(matter, timesheets, expenses)
  }

  pub fn detach_matter(
    &self,
    draft: &mut InvoiceDraft,
    matter_id: Uuid,
  ) -> Result<(), BillingError> {
    draft.deselect_matter(matter_id)
  }

  /// Server-side currency detection for the given selection. Must agree
  /// with the engine's own reconciliation; exposed for callers that want
  /// the cross-check.
  pub async fn detect_currencies(
    &self,
    draft: &InvoiceDraft,
  ) -> Result<CurrencyDetection, BillingError> {
    let matter_ids: Vec<Uuid> = draft.selection().matters().iter().map(|m| m.id).collect();
    let timesheet_ids = draft.selection().selected_timesheet_ids();
    let expense_ids = draft.selection().selected_expense_ids();
    self
      .currency_detector
      .detect_currencies(&matter_ids, Some(&timesheet_ids), Some(&expense_ids))
      .await
  }

  /// Allocates the next structured invoice number for a date+office.
  ///
  /// The read here is advisory; the invoice store still enforces
  /// uniqueness atomically at submission, and a race shows up there as a
  /// conflict to regenerate from.
  pub async fn allocate_invoice_number(
    &self,
    date: NaiveDate,
    location: BillingLocation,
  ) -> Result<InvoiceNumber, BillingError> {
    let prefix = InvoiceNumber::prefix_for(date, location);
    let existing = self.numbers.numbers_with_prefix(&prefix).await?;
    let allocated = allocator::allocate(date, location, &existing)?;
    tracing::info!(number = %allocated, "allocated invoice number");
    Ok(allocated)
  }

  /// Finalizes the draft and submits it to the invoice store, creating a
  /// new invoice or updating the one being edited. On success the draft
  /// becomes immutable.
  pub async fn submit(&self, draft: &mut InvoiceDraft) -> Result<InvoiceRecord, BillingError> {
    if draft.is_finalized() {
      return Err(BillingError::DraftFinalized);
    }
    let payload = draft.finalize().map_err(BillingError::Validation)?;

    let record = match draft.persisted_invoice() {
      Some(id) => self.invoices.update_invoice(id, payload).await?,
      None => self.invoices.create_invoice(payload).await?,
    };

    tracing::info!(
      invoice = %record.invoice_number,
      total = %record.total,
      currency = %record.currency,
      "invoice submitted"
    );
    draft.mark_finalized(record.id);
    Ok(record)
  }

  /// Rehydrates an edit-mode draft from a persisted invoice: stored
  /// rates, dates, number and the original timesheet selection, plus the
  /// current billables of every matter on the invoice.
  pub async fn load_draft_for_edit(&self, invoice_id: Uuid) -> Result<InvoiceDraft, BillingError> {
    let record = self
      .invoices
      .fetch_invoice(invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

    let mut draft = InvoiceDraft::rehydrate(&record, self.config.due_date_offset_days);
    for matter_id in &record.matter_ids {
      self.attach_matter(&mut draft, *matter_id).await?;
    }
    if !record.expense_ids.is_empty() {
      draft.set_include_expenses(true)?;
    }
    for timesheet_id in &record.timesheet_ids {
      draft.toggle_timesheet(*timesheet_id)?;
    }
    for expense_id in &record.expense_ids {
      draft.toggle_expense(*expense_id)?;
    }

    tracing::debug!(%invoice_id, "rehydrated draft for edit");
    Ok(draft)
  }

  /// Re-fetches billables for all attached matters after a date-range
  /// change, discarding the stale candidate lists. A newer fetch for the
  /// same matter supersedes any earlier one.
  pub async fn refresh_billables(&self, draft: &mut InvoiceDraft) -> Result<(), BillingError> {
    let matters: Vec<Matter> = draft.selection().matters().to_vec();
    for matter in matters {
      draft.deselect_matter(matter.id)?;
      self.attach_matter(draft, matter.id).await?;
    }
    Ok(())
  }
}
