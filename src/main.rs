use rust_decimal_macros::dec;
use std::sync::Arc;

use lexbill::{
  application::billing::{
    AllocateInvoiceNumberCommand, AllocateInvoiceNumberUseCase, BeginInvoiceDraftCommand,
    BeginInvoiceDraftUseCase, ExchangeRateDto, SubmitInvoiceCommand, SubmitInvoiceUseCase,
  },
  domain::billing::{
    BillingService, Currency, ExpenseEntry, Matter, Money, TimesheetEntry, TimesheetStatus,
  },
  infrastructure::{
    collaborators::{InMemoryBillableItemStore, InMemoryInvoiceStore, LocalCurrencyDetector},
    config::Config,
    telemetry,
  },
};

/// Demo entry point: wires the engine against the in-memory
/// collaborators, runs one draft through allocation and submission and
/// logs the result.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  telemetry::init();

  let config = Config::load()?;
  tracing::info!("configuration loaded");

  let billables = Arc::new(InMemoryBillableItemStore::new());
  let invoices = Arc::new(InMemoryInvoiceStore::new());
  let detector = Arc::new(LocalCurrencyDetector::new(billables.clone()));

  let client_id = uuid::Uuid::new_v4();
  let matter_usd = Matter::new(client_id, "Acme arbitration".to_string(), Currency::USD);
  let matter_eur = Matter::new(client_id, "Acme regulatory filing".to_string(), Currency::EUR);

  let date = |y, m, d| chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap();
  billables.insert_timesheet(TimesheetEntry::new(
    matter_usd.id,
    "A. Mehta".to_string(),
    date(2026, 1, 5),
    Money::new(dec!(800), Currency::USD)?,
    TimesheetStatus::Approved,
  ));
  billables.insert_timesheet(TimesheetEntry::new(
    matter_eur.id,
    "R. Iyer".to_string(),
    date(2026, 1, 7),
    Money::new(dec!(200), Currency::EUR)?,
    TimesheetStatus::Approved,
  ));
  billables.insert_expense(ExpenseEntry::new(
    matter_usd.id,
    "Court filing fees".to_string(),
    dec!(2500),
  ));
  let matter_ids = vec![matter_usd.id, matter_eur.id];
  billables.insert_matter(matter_usd);
  billables.insert_matter(matter_eur);

  let billing_service = Arc::new(BillingService::new(
    billables,
    detector,
    invoices.clone(),
    invoices,
    config.billing_service_config()?,
  ));

  let begin = BeginInvoiceDraftUseCase::new(billing_service.clone());
  let allocate = AllocateInvoiceNumberUseCase::new(billing_service.clone());
  let submit = SubmitInvoiceUseCase::new(billing_service);

  let mut response = begin
    .execute(BeginInvoiceDraftCommand {
      client_id,
      matter_ids,
      date_from: None,
      date_to: None,
    })
    .await?;
  tracing::info!(
    summary = %serde_json::to_string(&response.summary)?,
    "draft started"
  );

  response.draft.toggle_select_all(None)?;
  response.draft.set_billing_location("Mumbai".parse()?)?;
  response.draft.set_description("Professional fees, January 2026".to_string())?;

  let number = allocate
    .execute(AllocateInvoiceNumberCommand {
      invoice_date: response.draft.invoice_date().expect("selection sets the invoice date"),
      billing_location: "Mumbai".to_string(),
    })
    .await?;

  let submitted = submit
    .execute(SubmitInvoiceCommand {
      draft: response.draft,
      invoice_number: Some(number.invoice_number),
      invoice_date: None,
      due_date: None,
      billing_location: None,
      invoice_currency: Some("USD".to_string()),
      exchange_rates: vec![ExchangeRateDto {
        currency: "EUR".to_string(),
        rate: dec!(1.08),
      }],
      description: None,
    })
    .await?;

  tracing::info!(
    invoice = %submitted.invoice_number,
    total = %submitted.total,
    currency = %submitted.currency,
    "invoice submitted"
  );
  Ok(())
}
