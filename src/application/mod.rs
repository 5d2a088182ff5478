//! Application layer
//!
//! This layer contains use cases that orchestrate domain logic to implement
//! application-specific workflows. Use cases coordinate the billing domain
//! service and its collaborators to fulfill business requirements.

pub mod billing;
