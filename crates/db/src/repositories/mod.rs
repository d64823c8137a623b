//! Repository layer: one zero-sized struct per table group, each method
//! taking a `&PgPool`.

pub mod approval_repo;
pub mod credit_repo;
pub mod product_repo;
pub mod revision_repo;
pub mod upload_history_repo;

pub use approval_repo::FrontViewApprovalRepo;
pub use credit_repo::CreditRepo;
pub use product_repo::ProductRepo;
pub use revision_repo::RevisionRepo;
pub use upload_history_repo::UploadHistoryRepo;
