pub mod allocator;
pub mod convert;
pub mod draft;
pub mod entities;
pub mod errors;
pub mod ports;
pub mod reconcile;
pub mod selection;
pub mod services;
pub mod value_objects;

pub use convert::{Conversion, convert, round_money};
pub use draft::{DEFAULT_DUE_DATE_OFFSET_DAYS, DraftMode, InvoiceDraft};
pub use entities::{
  CurrencyGroup, ExpenseEntry, InvoiceRecord, Matter, PersistableInvoice, TimesheetEntry,
};
pub use errors::{BillingError, ValidationError};
pub use ports::{
  BillableItemStore, CurrencyDetection, CurrencyDetector, InvoiceNumberSource, InvoiceStore,
};
pub use reconcile::{Reconciliation, reconcile};
pub use selection::{DateBounds, SelectionEvent, SelectionState};
pub use services::{BillingService, BillingServiceConfig};
pub use value_objects::{
  BillingLocation, Currency, ExchangeRate, ExchangeRateMap, InvoiceNumber, Money,
  TimesheetStatus, ValueObjectError,
};
