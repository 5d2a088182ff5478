use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingLocation, BillingService};

#[derive(Debug, Deserialize)]
pub struct AllocateInvoiceNumberCommand {
  pub invoice_date: NaiveDate,
  pub billing_location: String,
}

#[derive(Debug, Serialize)]
pub struct AllocateInvoiceNumberResponse {
  pub invoice_number: String,
}

pub struct AllocateInvoiceNumberUseCase {
  billing_service: Arc<BillingService>,
}

impl AllocateInvoiceNumberUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: AllocateInvoiceNumberCommand,
  ) -> Result<AllocateInvoiceNumberResponse, BillingError> {
    let location = BillingLocation::from_str(&command.billing_location)?;
    let number = self
      .billing_service
      .allocate_invoice_number(command.invoice_date, location)
      .await?;
    Ok(AllocateInvoiceNumberResponse {
      invoice_number: number.value().to_string(),
    })
  }
}
