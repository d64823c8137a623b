//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize`/plain DTOs for inserts and targeted updates

pub mod approval;
pub mod credit;
pub mod product;
pub mod revision;
pub mod status;
pub mod upload_history;
