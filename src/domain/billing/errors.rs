use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::value_objects::{Currency, ValueObjectError};

/// Field-level validation diagnostic. Collected, never fail-fast, so the
/// caller can surface the whole set against the draft form in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
  #[error("A client must be selected")]
  MissingClient,
  #[error("At least one matter must be selected")]
  NoMattersSelected,
  #[error("A billing location must be selected")]
  MissingBillingLocation,
  #[error("An invoice number is required")]
  MissingInvoiceNumber,
  #[error("Invoice number '{0}' does not match DDMMYYYY-OFFICE[-SUFFIX]")]
  InvalidInvoiceNumberFormat(String),
  #[error("An invoice date is required")]
  MissingInvoiceDate,
  #[error("Invoice date {given} is earlier than the latest selected work ({minimum})")]
  InvoiceDateTooEarly { given: NaiveDate, minimum: NaiveDate },
  #[error("A due date is required")]
  MissingDueDate,
  #[error("Due date {due} is earlier than the invoice date {invoice}")]
  DueDateBeforeInvoiceDate { due: NaiveDate, invoice: NaiveDate },
  #[error("Due date {given} is earlier than the latest selected work ({minimum})")]
  DueDateTooEarly { given: NaiveDate, minimum: NaiveDate },
  #[error("Invoice total must be positive")]
  NonPositiveTotal,
  #[error("A description is required")]
  MissingDescription,
  #[error("Missing exchange rate for {0}")]
  MissingExchangeRate(Currency),
}

impl ValidationError {
  /// The draft field the diagnostic attaches to.
  pub fn field(&self) -> &'static str {
    match self {
      ValidationError::MissingClient => "client",
      ValidationError::NoMattersSelected => "matters",
      ValidationError::MissingBillingLocation => "billing_location",
      ValidationError::MissingInvoiceNumber
      | ValidationError::InvalidInvoiceNumberFormat(_) => "invoice_number",
      ValidationError::MissingInvoiceDate | ValidationError::InvoiceDateTooEarly { .. } => {
        "invoice_date"
      }
      ValidationError::MissingDueDate
      | ValidationError::DueDateBeforeInvoiceDate { .. }
      | ValidationError::DueDateTooEarly { .. } => "due_date",
      ValidationError::NonPositiveTotal => "total",
      ValidationError::MissingDescription => "description",
      ValidationError::MissingExchangeRate(_) => "exchange_rates",
    }
  }
}

#[derive(Debug, Error)]
pub enum BillingError {
  #[error("Invoice draft failed validation ({} error(s))", .0.len())]
  Validation(Vec<ValidationError>),

  #[error("Value error: {0}")]
  ValueObject(#[from] ValueObjectError),

  /// Invoice-number collision detected server-side at submission despite
  /// client-side allocation. Surfaced with a prompt to regenerate, never
  /// auto-retried.
  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Collaborator '{collaborator}' unavailable: {reason}")]
  CollaboratorUnavailable {
    collaborator: &'static str,
    reason: String,
  },

  #[error("Invoice not found: {0}")]
  InvoiceNotFound(Uuid),

  #[error("Matter {0} does not belong to the draft's client")]
  MatterClientMismatch(Uuid),

  #[error("Draft has already been submitted")]
  DraftFinalized,

  #[error("Internal error: {0}")]
  Internal(String),
}

impl BillingError {
  pub fn collaborator(collaborator: &'static str, reason: impl Into<String>) -> Self {
    BillingError::CollaboratorUnavailable {
      collaborator,
      reason: reason.into(),
    }
  }

  pub fn validation_errors(&self) -> Option<&[ValidationError]> {
    match self {
      BillingError::Validation(errors) => Some(errors),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_error_fields() {
    assert_eq!(ValidationError::MissingClient.field(), "client");
    assert_eq!(
      ValidationError::MissingExchangeRate(Currency::EUR).field(),
      "exchange_rates"
    );
    assert_eq!(
      ValidationError::InvalidInvoiceNumberFormat("foo".to_string()).field(),
      "invoice_number"
    );
  }

  #[test]
  fn test_billing_error_reports_count() {
    let err = BillingError::Validation(vec![
      ValidationError::MissingClient,
      ValidationError::MissingDescription,
    ]);
    assert_eq!(err.to_string(), "Invoice draft failed validation (2 error(s))");
    assert_eq!(err.validation_errors().unwrap().len(), 2);
  }
}
