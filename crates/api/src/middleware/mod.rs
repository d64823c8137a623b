//! Request extractors shared by handlers.
//!
//! - [`caller::Caller`] -- The calling user, as identified by the gateway.

pub mod caller;
