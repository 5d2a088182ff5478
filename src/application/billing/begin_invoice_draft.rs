use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService, InvoiceDraft};

#[derive(Debug, Deserialize)]
pub struct BeginInvoiceDraftCommand {
  pub client_id: Uuid,
  pub matter_ids: Vec<Uuid>,
  pub date_from: Option<NaiveDate>,
  pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CurrencyGroupDto {
  pub currency: String,
  pub matter_ids: Vec<Uuid>,
  pub amount: Decimal,
}

/// Snapshot of the derived state a client renders after every edit.
#[derive(Debug, Serialize)]
pub struct DraftSummaryDto {
  pub breakdown: Vec<CurrencyGroupDto>,
  pub requires_conversion: bool,
  pub suggested_currency: Option<String>,
  pub min_invoice_date: Option<NaiveDate>,
  pub min_due_date: Option<NaiveDate>,
  pub invoice_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  pub missing_rates: Vec<String>,
  pub total: Option<Decimal>,
}

impl DraftSummaryDto {
  pub fn from_draft(draft: &InvoiceDraft) -> Self {
    let reconciliation = draft.reconciliation();
    let conversion = draft.conversion();
    let bounds = draft.bounds();
    Self {
      breakdown: reconciliation
        .breakdown
        .iter()
        .map(|group| CurrencyGroupDto {
          currency: group.currency.to_string(),
          matter_ids: group.matter_ids.iter().copied().collect(),
          amount: group.amount,
        })
        .collect(),
      requires_conversion: reconciliation.requires_conversion,
      suggested_currency: reconciliation.suggested_currency.map(|c| c.to_string()),
      min_invoice_date: bounds.min_invoice_date,
      min_due_date: bounds.min_due_date,
      invoice_date: draft.invoice_date(),
      due_date: draft.due_date(),
      missing_rates: conversion.missing_rates.iter().map(|c| c.to_string()).collect(),
      total: draft.total_preview(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct BeginInvoiceDraftResponse {
  pub draft: InvoiceDraft,
  pub summary: DraftSummaryDto,
}

pub struct BeginInvoiceDraftUseCase {
  billing_service: Arc<BillingService>,
}

impl BeginInvoiceDraftUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: BeginInvoiceDraftCommand,
  ) -> Result<BeginInvoiceDraftResponse, BillingError> {
    let mut draft = self.billing_service.start_draft(command.client_id);
    if command.date_from.is_some() || command.date_to.is_some() {
      draft.set_date_range(command.date_from, command.date_to)?;
    }
    for matter_id in &command.matter_ids {
      self.billing_service.attach_matter(&mut draft, *matter_id).await?;
    }

    let summary = DraftSummaryDto::from_draft(&draft);
    Ok(BeginInvoiceDraftResponse { draft, summary })
  }
}
