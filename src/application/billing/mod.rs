pub mod allocate_invoice_number;
pub mod begin_invoice_draft;
pub mod edit_invoice_draft;
pub mod submit_invoice;

pub use allocate_invoice_number::{
  AllocateInvoiceNumberCommand, AllocateInvoiceNumberResponse, AllocateInvoiceNumberUseCase,
};
pub use begin_invoice_draft::{
  BeginInvoiceDraftCommand, BeginInvoiceDraftResponse, BeginInvoiceDraftUseCase, CurrencyGroupDto,
  DraftSummaryDto,
};
pub use edit_invoice_draft::{
  EditInvoiceDraftCommand, EditInvoiceDraftResponse, EditInvoiceDraftUseCase,
};
pub use submit_invoice::{
  ExchangeRateDto, SubmitInvoiceCommand, SubmitInvoiceResponse, SubmitInvoiceUseCase,
};
