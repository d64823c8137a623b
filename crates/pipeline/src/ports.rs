//! Collaborator ports used by the workflow.
//!
//! Every external dependency of the orchestrator sits behind one of these
//! traits so the phases can run against Postgres and HTTP services in
//! production and against in-memory fakes in tests.

use async_trait::async_trait;
use atelier_core::features::ExtractedFeatures;
use atelier_core::types::{Credits, DbId, Timestamp};
use atelier_core::views::ViewType;
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::{CreateFrontViewApproval, FrontViewApproval, RecordRemainingViews};
use atelier_db::models::revision::{CommittedBatch, NewRevisionBatch, RevisionView};
use atelier_db::models::upload_history::CreateUploadHistory;
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Classified storage failure. Only `Transient` is worth retrying.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Other(String),
}

impl StoreError {
    /// Retry classifier for persistence call sites.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

// ---------------------------------------------------------------------------
// Credit ledger
// ---------------------------------------------------------------------------

/// A claim on an owner's balance. Reserving deducts immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: Uuid,
    pub owner_id: DbId,
    pub amount: Credits,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient credits: {requested} required, {balance} available")]
    Insufficient { balance: Credits, requested: Credits },

    #[error("Refund rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn reserve(
        &self,
        owner_id: DbId,
        amount: Credits,
        reason: &str,
    ) -> Result<Reservation, LedgerError>;

    /// Return `amount` against a reservation. Returns the balance after.
    async fn refund(
        &self,
        owner_id: DbId,
        reservation_id: Uuid,
        amount: Credits,
    ) -> Result<Credits, LedgerError>;
}

// ---------------------------------------------------------------------------
// Image generator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// Attempts the generator may spend on this image.
    pub retry_budget: u32,
    /// Whether capacity errors may switch to the secondary model.
    pub fallback_enabled: bool,
    pub preferred_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Primary reference: the approved front view or the product reference.
    pub reference_image: Option<String>,
    /// Second reference: the newly generated back view for dependent views.
    pub additional_reference_image: Option<String>,
    /// Prior revision of this view, for pose and camera angle only.
    pub structural_reference: Option<String>,
    pub view: ViewType,
    pub style: String,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    pub url: String,
    /// Model that produced the image (after any fallback).
    pub model: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GeneratorError {
    #[error("Model at capacity: {0}")]
    Capacity(String),

    #[error("Generator request failed: {0}")]
    Transport(String),

    #[error("Generation rejected: {0}")]
    Rejected(String),

    #[error("Generator returned no image")]
    EmptyResult,
}

impl GeneratorError {
    /// Capacity and transport failures are retried within the budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeneratorError::Capacity(_) | GeneratorError::Transport(_))
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError>;
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub project_id: String,
    pub preset: String,
    pub preserve_original: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UploadError {
    #[error("Upload failed: {0}")]
    Failed(String),

    #[error("Object store returned no URL")]
    EmptyResult,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedImage, UploadError>;
}

// ---------------------------------------------------------------------------
// Feature extractor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
#[error("Feature extraction failed: {0}")]
pub struct ExtractionError(pub String);

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn analyze(&self, image_url: &str) -> Result<ExtractedFeatures, ExtractionError>;
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Persistence of front-view approval rows.
///
/// Status-changing methods return `None` when the row is not in the status
/// they act on.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    /// Insert a pending row; the store assigns the next iteration number.
    async fn create(&self, input: &CreateFrontViewApproval)
        -> Result<FrontViewApproval, StoreError>;

    async fn find_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<FrontViewApproval>, StoreError>;

    async fn find_recent_initial(
        &self,
        product_id: DbId,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Option<FrontViewApproval>, StoreError>;

    async fn mark_rejected(
        &self,
        id: DbId,
        feedback: &str,
    ) -> Result<Option<FrontViewApproval>, StoreError>;

    async fn mark_approved(
        &self,
        id: DbId,
        features: &ExtractedFeatures,
    ) -> Result<Option<FrontViewApproval>, StoreError>;

    /// Cache features if none are stored. Returns `true` if written.
    async fn cache_features(&self, id: DbId, features: &ExtractedFeatures)
        -> Result<bool, StoreError>;

    async fn set_workflow_state(&self, id: DbId, state: GenerationState)
        -> Result<(), StoreError>;

    /// Compare-and-set the workflow state. Succeeds only if the row still
    /// holds `from` and was last written at `seen_at`; returns `false`
    /// otherwise.
    async fn transition_state(
        &self,
        id: DbId,
        from: GenerationState,
        to: GenerationState,
        seen_at: Timestamp,
    ) -> Result<bool, StoreError>;

    async fn record_remaining_views(
        &self,
        id: DbId,
        input: &RecordRemainingViews,
    ) -> Result<FrontViewApproval, StoreError>;

    async fn mark_completed(&self, id: DbId) -> Result<(), StoreError>;
}

/// Persistence of revision batches.
#[async_trait]
pub trait RevisionStore: Send + Sync {
    /// Rows of the owner's batch with the given revision number.
    async fn find_revision(
        &self,
        product_id: DbId,
        user_id: DbId,
        revision_number: i32,
    ) -> Result<Vec<RevisionView>, StoreError>;

    /// The product's active rows, if they belong to `user_id`.
    async fn list_active(
        &self,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<RevisionView>, StoreError>;

    /// Commit a complete batch as the product's only active batch.
    async fn commit_batch(&self, batch: &NewRevisionBatch) -> Result<CommittedBatch, StoreError>;
}

/// Secondary log mirroring committed images.
#[async_trait]
pub trait UploadHistory: Send + Sync {
    async fn record(&self, entries: &[CreateUploadHistory]) -> Result<u64, StoreError>;
}

/// Product-level data the workflow reads.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Product or brand reference image of a product owned by `user_id`.
    async fn reference_image(
        &self,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, StoreError>;
}
