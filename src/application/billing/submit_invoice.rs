use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, BillingLocation, BillingService, Currency, ExchangeRate, InvoiceDraft,
};

#[derive(Debug, Deserialize)]
pub struct ExchangeRateDto {
  pub currency: String,
  pub rate: Decimal,
}

/// Final field values applied on top of the draft before submission.
/// Every field is optional; an absent field leaves the draft untouched.
#[derive(Debug, Deserialize)]
pub struct SubmitInvoiceCommand {
  pub draft: InvoiceDraft,
  pub invoice_number: Option<String>,
  pub invoice_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  pub billing_location: Option<String>,
  pub invoice_currency: Option<String>,
  pub exchange_rates: Vec<ExchangeRateDto>,
  pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitInvoiceResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub currency: String,
  pub total: Decimal,
  pub created_at: DateTime<Utc>,
}

pub struct SubmitInvoiceUseCase {
  billing_service: Arc<BillingService>,
}

impl SubmitInvoiceUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  /// Applies the final field values and submits. Validation failures come
  /// back as `BillingError::Validation` with every failing check listed;
  /// an invoice-number race at the store comes back as
  /// `BillingError::Conflict` for the caller to regenerate from.
  pub async fn execute(
    &self,
    command: SubmitInvoiceCommand,
  ) -> Result<SubmitInvoiceResponse, BillingError> {
    let mut draft = command.draft;

    if let Some(raw) = command.invoice_number {
      draft.set_invoice_number(raw)?;
    }
    if let Some(date) = command.invoice_date {
      draft.set_invoice_date(date)?;
    }
    if let Some(date) = command.due_date {
      draft.set_due_date(date)?;
    }
    if let Some(raw) = command.billing_location {
      draft.set_billing_location(BillingLocation::from_str(&raw)?)?;
    }
    if let Some(raw) = command.invoice_currency {
      draft.set_invoice_currency(Currency::from_str(&raw)?)?;
    }
    for dto in command.exchange_rates {
      let currency = Currency::from_str(&dto.currency)?;
      draft.set_exchange_rate(currency, ExchangeRate::new(dto.rate)?)?;
    }
    if let Some(description) = command.description {
      draft.set_description(description)?;
    }

    let record = self.billing_service.submit(&mut draft).await?;
    Ok(SubmitInvoiceResponse {
      invoice_id: record.id,
      invoice_number: record.invoice_number.value().to_string(),
      currency: record.currency.to_string(),
      total: record.total,
      created_at: record.created_at,
    })
  }
}
