pub mod in_memory;

pub use in_memory::{InMemoryBillableItemStore, InMemoryInvoiceStore, LocalCurrencyDetector};
