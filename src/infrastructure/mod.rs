//! Infrastructure layer
//!
//! This layer contains concrete implementations of the domain's
//! collaborator ports, configuration loading and telemetry setup.

pub mod collaborators;
pub mod config;
pub mod telemetry;
