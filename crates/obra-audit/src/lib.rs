//! Construction-site compliance audits: block-by-block intake wizard, interview
//! sampling quota, completeness gating, and submission to an external
//! risk-scoring service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
