//! deltamerge library crate.
//!
//! The primary interface is the `deltamerge` binary. This crate holds the
//! plumbing around the pure engine in `deltamerge-core`: configuration,
//! telemetry, snapshot sources, staging, publication and reports. It is
//! exposed so integration tests can drive a whole run without the CLI.

pub mod config;
pub mod error;
pub mod normalize;
pub mod publish;
pub mod reconcile;
pub mod report;
pub mod source;
pub mod stage;
pub mod telemetry;

pub use deltamerge_core as core;
pub use error::ReconcileError;
