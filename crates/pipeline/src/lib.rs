//! The staged product-view workflow.
//!
//! [`Workflow`] exposes the four phases (front view, decision, remaining
//! views, revision) over a set of collaborator ports. [`pg::PgStore`] and
//! the [`clients`] module provide the production implementations.

pub mod clients;
pub mod config;
pub mod error;
pub mod front_view;
pub mod pg;
pub mod ports;
pub mod remaining_views;
pub mod revision;
pub mod workflow;

pub use config::{ConfigError, ServiceConfig, WorkflowConfig};
pub use error::WorkflowError;
pub use front_view::{DecisionOutcome, FrontViewOutcome, FrontViewRequest};
pub use remaining_views::{RemainingViewsOutcome, RemainingViewsRequest};
pub use revision::{RevisionOutcome, RevisionRequest};
pub use workflow::{ActiveRevision, Collaborators, Workflow};
