use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::begin_invoice_draft::DraftSummaryDto;
use crate::domain::billing::{BillingError, BillingService, InvoiceDraft};

#[derive(Debug, Deserialize)]
pub struct EditInvoiceDraftCommand {
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct EditInvoiceDraftResponse {
  pub draft: InvoiceDraft,
  pub summary: DraftSummaryDto,
}

/// Loads a persisted invoice back into a mutable draft: stored rates,
/// dates and number, the original timesheet selection, and the current
/// billables of every matter on the invoice.
pub struct EditInvoiceDraftUseCase {
  billing_service: Arc<BillingService>,
}

impl EditInvoiceDraftUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: EditInvoiceDraftCommand,
  ) -> Result<EditInvoiceDraftResponse, BillingError> {
    let draft = self
      .billing_service
      .load_draft_for_edit(command.invoice_id)
      .await?;
    let summary = DraftSummaryDto::from_draft(&draft);
    Ok(EditInvoiceDraftResponse { draft, summary })
  }
}
