//! Pure domain logic for the staged product-view generation workflow.
//!
//! Nothing in this crate touches the database or the network; the
//! orchestrator in `atelier-pipeline` composes these pieces with I/O.

pub mod approval;
pub mod credits;
pub mod error;
pub mod features;
pub mod generation;
pub mod prompt;
pub mod retry;
pub mod revision;
pub mod types;
pub mod views;
pub mod workflow;
