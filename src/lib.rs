//! Billing aggregation engine for a legal practice: reconciles the
//! currencies of selected billable work, converts them into a single
//! invoice currency, enforces the temporal constraints of invoicing,
//! allocates structured invoice numbers and assembles invoice drafts
//! for persistence.

pub mod application;
pub mod domain;
pub mod infrastructure;
