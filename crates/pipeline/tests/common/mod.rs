//! In-memory fakes of every workflow port, plus a harness wiring them into a
//! [`Workflow`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use atelier_core::features::ExtractedFeatures;
use atelier_core::retry::RetryPolicy;
use atelier_core::revision::{edit_type, next_revision_number};
use atelier_core::types::{Credits, DbId, Timestamp};
use atelier_core::views::{AllViews, ViewType};
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::{CreateFrontViewApproval, FrontViewApproval, RecordRemainingViews};
use atelier_db::models::revision::{CommittedBatch, NewRevisionBatch, RevisionView};
use atelier_db::models::status::ApprovalStatus;
use atelier_db::models::upload_history::CreateUploadHistory;
use atelier_pipeline::ports::{
    ApprovalStore, CreditLedger, ExtractionError, FeatureExtractor, GeneratedImage,
    GenerationRequest, GeneratorError, ImageGenerator, LedgerError, ObjectStore, ProductCatalog,
    Reservation, RevisionStore, StoreError, UploadError, UploadHistory, UploadOptions,
    UploadedImage,
};
use atelier_pipeline::{Collaborators, FrontViewRequest, Workflow, WorkflowConfig};
use chrono::Utc;
use uuid::Uuid;

pub const USER: DbId = 7;
pub const PRODUCT: DbId = 100;
pub const STARTING_BALANCE: Credits = 20;

// ---------------------------------------------------------------------------
// Credit ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeLedger {
    balances: Mutex<HashMap<DbId, Credits>>,
    /// reservation id -> (owner, amount, refunded)
    reservations: Mutex<HashMap<Uuid, (DbId, Credits, Credits)>>,
    pub reserve_calls: AtomicUsize,
    pub refund_calls: AtomicUsize,
}

impl FakeLedger {
    pub fn grant(&self, owner: DbId, amount: Credits) {
        *self.balances.lock().unwrap().entry(owner).or_insert(0) += amount;
    }

    pub fn balance(&self, owner: DbId) -> Credits {
        self.balances
            .lock()
            .unwrap()
            .get(&owner)
            .copied()
            .unwrap_or(0)
    }

    pub fn refunds(&self) -> usize {
        self.refund_calls.load(Ordering::SeqCst)
    }

    pub fn reserves(&self) -> usize {
        self.reserve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreditLedger for FakeLedger {
    async fn reserve(
        &self,
        owner_id: DbId,
        amount: Credits,
        _reason: &str,
    ) -> Result<Reservation, LedgerError> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(owner_id).or_insert(0);
        if *balance < amount {
            return Err(LedgerError::Insufficient {
                balance: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        let id = Uuid::new_v4();
        self.reservations
            .lock()
            .unwrap()
            .insert(id, (owner_id, amount, 0));
        Ok(Reservation {
            id,
            owner_id,
            amount,
        })
    }

    async fn refund(
        &self,
        owner_id: DbId,
        reservation_id: Uuid,
        amount: Credits,
    ) -> Result<Credits, LedgerError> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        let mut reservations = self.reservations.lock().unwrap();
        let Some(entry) = reservations.get_mut(&reservation_id) else {
            return Err(LedgerError::Store(StoreError::NotFound(
                reservation_id.to_string(),
            )));
        };
        if entry.0 != owner_id || amount > entry.1 - entry.2 {
            return Err(LedgerError::Rejected("exceeds outstanding".to_string()));
        }
        entry.2 += amount;
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(owner_id).or_insert(0);
        *balance += amount;
        Ok(*balance)
    }
}

// ---------------------------------------------------------------------------
// Image generator
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeGenerator {
    calls: AtomicUsize,
    /// 1-based call numbers that fail.
    fail_calls: Mutex<HashSet<usize>>,
    fail_views: Mutex<HashSet<ViewType>>,
    fail_all: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_call(&self, n: usize) {
        self.fail_calls.lock().unwrap().insert(n);
    }

    pub fn fail_view(&self, view: ViewType) {
        self.fail_views.lock().unwrap().insert(view);
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every generation call.
    pub fn slow(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests_for(&self, view: ViewType) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.view == view)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, GeneratorError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all.load(Ordering::SeqCst)
            || self.fail_calls.lock().unwrap().contains(&n)
            || self.fail_views.lock().unwrap().contains(&request.view)
        {
            return Err(GeneratorError::Rejected(format!("generation {n} failed")));
        }
        Ok(GeneratedImage {
            url: format!("https://gen.example/{}/{n}.png", request.view),
            model: request
                .options
                .preferred_model
                .clone()
                .unwrap_or_else(|| "fake-model".to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeObjectStore {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl FakeObjectStore {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(
        &self,
        source_url: &str,
        options: &UploadOptions,
    ) -> Result<UploadedImage, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(UploadError::Failed("bucket unavailable".to_string()));
        }
        let name = source_url.rsplit('/').next().unwrap_or("image.png");
        let kind = source_url
            .trim_start_matches("https://gen.example/")
            .split('/')
            .next()
            .unwrap_or("view");
        Ok(UploadedImage {
            url: format!("https://cdn.example/{}/{kind}/{name}", options.project_id),
            thumbnail_url: Some(format!("https://cdn.example/thumbs/{kind}/{name}")),
        })
    }
}

// ---------------------------------------------------------------------------
// Feature extractor
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeExtractor {
    fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn features() -> ExtractedFeatures {
        ExtractedFeatures {
            colors: vec!["red".to_string()],
            materials: vec!["leather".to_string()],
            key_elements: vec!["brass buckle".to_string()],
            description: "A red leather tote".to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl FeatureExtractor for FakeExtractor {
    async fn analyze(&self, _image_url: &str) -> Result<ExtractedFeatures, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExtractionError("vision model offline".to_string()));
        }
        Ok(Self::features())
    }
}

// ---------------------------------------------------------------------------
// Approval store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryApprovals {
    rows: Mutex<Vec<FrontViewApproval>>,
    next_id: AtomicU32,
    /// Number of upcoming `create` calls that fail transiently.
    transient_create_failures: AtomicU32,
    schema_error: AtomicBool,
    pub create_calls: AtomicUsize,
}

impl MemoryApprovals {
    pub fn fail_creates_transiently(&self, times: u32) {
        self.transient_create_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_with_schema_error(&self, fail: bool) {
        self.schema_error.store(fail, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<FrontViewApproval> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get(&self, id: DbId) -> FrontViewApproval {
        self.all()
            .into_iter()
            .find(|r| r.id == id)
            .expect("approval exists")
    }

    /// Move a row's creation and last-write times into the past.
    pub fn age(&self, id: DbId, secs: i64) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.created_at -= chrono::Duration::seconds(secs);
            row.updated_at -= chrono::Duration::seconds(secs);
        }
    }

    fn update<F>(&self, id: DbId, f: F) -> Option<FrontViewApproval>
    where
        F: FnOnce(&mut FrontViewApproval) -> bool,
    {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.iter_mut().find(|r| r.id == id)?;
        if !f(row) {
            return None;
        }
        row.updated_at = advance(row.updated_at);
        Some(row.clone())
    }
}

/// Next write timestamp; strictly later than the previous one.
fn advance(previous: Timestamp) -> Timestamp {
    Utc::now().max(previous + chrono::Duration::microseconds(1))
}

#[async_trait]
impl ApprovalStore for MemoryApprovals {
    async fn create(
        &self,
        input: &CreateFrontViewApproval,
    ) -> Result<FrontViewApproval, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.schema_error.load(Ordering::SeqCst) {
            return Err(StoreError::Schema(
                "column \"workflow_state\" does not exist".to_string(),
            ));
        }
        if self
            .transient_create_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Transient("connection reset".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        for row in rows.iter_mut().filter(|r| {
            r.product_id == input.product_id
                && r.user_id == input.user_id
                && r.session_id == input.session_id
                && r.status() == Some(ApprovalStatus::Pending)
        }) {
            row.status_id = ApprovalStatus::Rejected.id();
            row.workflow_state = GenerationState::Completed.id();
            row.rejection_reason = Some(atelier_core::approval::REASON_SUPERSEDED.to_string());
            row.rejected_at = Some(now);
        }

        let iteration_number = rows
            .iter()
            .filter(|r| r.product_id == input.product_id && r.user_id == input.user_id)
            .map(|r| r.iteration_number)
            .max()
            .unwrap_or(0)
            + 1;

        let row = FrontViewApproval {
            id: (self.next_id.fetch_add(1, Ordering::SeqCst) + 1) as DbId,
            user_id: input.user_id,
            product_id: input.product_id,
            session_id: input.session_id.clone(),
            front_view_url: input.front_view_url.clone(),
            prompt: input.prompt.clone(),
            reference_image_url: input.reference_image_url.clone(),
            status_id: ApprovalStatus::Pending.id(),
            workflow_state: GenerationState::AwaitingApproval.id(),
            iteration_number,
            credits_reserved: input.credits_reserved,
            credits_consumed: input.credits_consumed,
            is_initial_generation: input.is_initial_generation,
            user_feedback: None,
            rejection_reason: None,
            extracted_features: None,
            back_view_url: None,
            side_view_url: None,
            top_view_url: None,
            bottom_view_url: None,
            approved_at: None,
            rejected_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_for_user(
        &self,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        let found = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.user_id == user_id)
            .cloned();
        // Hand control back like a database round trip would, so concurrent
        // callers can read the same snapshot.
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn find_recent_initial(
        &self,
        product_id: DbId,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.product_id == product_id
                    && r.user_id == user_id
                    && r.is_initial_generation
                    && r.created_at >= since
            })
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn mark_rejected(
        &self,
        id: DbId,
        feedback: &str,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        Ok(self.update(id, |row| {
            if row.status() != Some(ApprovalStatus::Pending) {
                return false;
            }
            row.status_id = ApprovalStatus::Rejected.id();
            row.workflow_state = GenerationState::GeneratingFront.id();
            row.user_feedback = Some(feedback.to_string());
            row.rejection_reason = Some(feedback.to_string());
            row.rejected_at = Some(Utc::now());
            true
        }))
    }

    async fn mark_approved(
        &self,
        id: DbId,
        features: &ExtractedFeatures,
    ) -> Result<Option<FrontViewApproval>, StoreError> {
        Ok(self.update(id, |row| {
            if row.status() != Some(ApprovalStatus::Pending) {
                return false;
            }
            row.status_id = ApprovalStatus::Approved.id();
            row.workflow_state = GenerationState::FrontApproved.id();
            row.extracted_features = Some(features.to_json());
            row.approved_at = Some(Utc::now());
            true
        }))
    }

    async fn cache_features(
        &self,
        id: DbId,
        features: &ExtractedFeatures,
    ) -> Result<bool, StoreError> {
        Ok(self
            .update(id, |row| {
                if row.extracted_features.is_some() {
                    return false;
                }
                row.extracted_features = Some(features.to_json());
                true
            })
            .is_some())
    }

    async fn set_workflow_state(
        &self,
        id: DbId,
        state: GenerationState,
    ) -> Result<(), StoreError> {
        self.update(id, |row| {
            row.workflow_state = state.id();
            true
        })
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(format!("approval {id}")))
    }

    async fn transition_state(
        &self,
        id: DbId,
        from: GenerationState,
        to: GenerationState,
        seen_at: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(self
            .update(id, |row| {
                if row.workflow_state != from.id() || row.updated_at != seen_at {
                    return false;
                }
                row.workflow_state = to.id();
                true
            })
            .is_some())
    }

    async fn record_remaining_views(
        &self,
        id: DbId,
        input: &RecordRemainingViews,
    ) -> Result<FrontViewApproval, StoreError> {
        fn merge(slot: &mut Option<String>, url: &str) {
            if !url.is_empty() {
                *slot = Some(url.to_string());
            }
        }
        self.update(id, |row| {
            merge(&mut row.back_view_url, &input.urls.back);
            merge(&mut row.side_view_url, &input.urls.side);
            merge(&mut row.top_view_url, &input.urls.top);
            merge(&mut row.bottom_view_url, &input.urls.bottom);
            row.credits_reserved += input.credits_reserved;
            row.credits_consumed += input.credits_consumed;
            true
        })
        .ok_or_else(|| StoreError::NotFound(format!("approval {id}")))
    }

    async fn mark_completed(&self, id: DbId) -> Result<(), StoreError> {
        self.update(id, |row| {
            row.status_id = ApprovalStatus::Completed.id();
            row.workflow_state = GenerationState::Completed.id();
            row.completed_at = Some(Utc::now());
            true
        })
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(format!("approval {id}")))
    }
}

// ---------------------------------------------------------------------------
// Revision store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRevisions {
    rows: Mutex<Vec<RevisionView>>,
    next_id: AtomicU32,
    fail_commit: AtomicBool,
    pub commit_calls: AtomicUsize,
}

impl MemoryRevisions {
    pub fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<RevisionView> {
        self.rows.lock().unwrap().clone()
    }

    pub fn active_batch_ids(&self, product_id: DbId) -> HashSet<Uuid> {
        self.all()
            .into_iter()
            .filter(|r| r.product_id == product_id && r.is_active)
            .map(|r| r.batch_id)
            .collect()
    }
}

#[async_trait]
impl RevisionStore for MemoryRevisions {
    async fn find_revision(
        &self,
        product_id: DbId,
        user_id: DbId,
        revision_number: i32,
    ) -> Result<Vec<RevisionView>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|r| {
                r.product_id == product_id
                    && r.user_id == user_id
                    && r.revision_number == revision_number
            })
            .collect())
    }

    async fn list_active(
        &self,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<RevisionView>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|r| r.product_id == product_id && r.user_id == user_id && r.is_active)
            .collect())
    }

    async fn commit_batch(&self, batch: &NewRevisionBatch) -> Result<CommittedBatch, StoreError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Other("constraint violation".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        let current_max = rows
            .iter()
            .filter(|r| r.product_id == batch.product_id)
            .map(|r| r.revision_number)
            .max();
        let revision_number = next_revision_number(batch.is_initial, current_max);

        for row in rows
            .iter_mut()
            .filter(|r| r.product_id == batch.product_id && r.is_active)
        {
            row.is_active = false;
        }

        let batch_id = Uuid::new_v4();
        let now = Utc::now();
        let mut inserted = Vec::new();
        for view in &batch.views {
            let row = RevisionView {
                id: (self.next_id.fetch_add(1, Ordering::SeqCst) + 1) as DbId,
                product_id: batch.product_id,
                user_id: batch.user_id,
                revision_number,
                batch_id,
                view_type: view.view_type.as_str().to_string(),
                image_url: view.image_url.clone(),
                thumbnail_url: view.thumbnail_url.clone(),
                edit_prompt: batch.edit_prompt.clone(),
                edit_type: edit_type(batch.is_initial).to_string(),
                ai_model: batch.ai_model.clone(),
                ai_parameters: view.ai_parameters.clone(),
                is_active: true,
                front_view_approval_id: batch.front_view_approval_id,
                metadata: view.metadata.clone(),
                deleted_at: None,
                created_at: now,
                updated_at: now,
            };
            rows.push(row.clone());
            inserted.push(row);
        }

        Ok(CommittedBatch {
            revision_number,
            batch_id,
            rows: inserted,
        })
    }
}

// ---------------------------------------------------------------------------
// Upload history and product catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUploadHistory {
    pub entries: Mutex<Vec<CreateUploadHistory>>,
    fail: AtomicBool,
}

impl MemoryUploadHistory {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl UploadHistory for MemoryUploadHistory {
    async fn record(&self, entries: &[CreateUploadHistory]) -> Result<u64, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Other("history table locked".to_string()));
        }
        self.entries.lock().unwrap().extend(entries.iter().cloned());
        Ok(entries.len() as u64)
    }
}

/// Reference images keyed by product, with the owning user.
#[derive(Default)]
pub struct MemoryProducts {
    references: Mutex<HashMap<DbId, (DbId, String)>>,
}

impl MemoryProducts {
    pub fn set_reference(&self, product_id: DbId, url: &str) {
        self.set_reference_for(USER, product_id, url);
    }

    pub fn set_reference_for(&self, owner: DbId, product_id: DbId, url: &str) {
        self.references
            .lock()
            .unwrap()
            .insert(product_id, (owner, url.to_string()));
    }
}

#[async_trait]
impl ProductCatalog for MemoryProducts {
    async fn reference_image(
        &self,
        product_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .references
            .lock()
            .unwrap()
            .get(&product_id)
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, url)| url.clone()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub workflow: Workflow,
    pub ledger: Arc<FakeLedger>,
    pub generator: Arc<FakeGenerator>,
    pub object_store: Arc<FakeObjectStore>,
    pub extractor: Arc<FakeExtractor>,
    pub approvals: Arc<MemoryApprovals>,
    pub revisions: Arc<MemoryRevisions>,
    pub history: Arc<MemoryUploadHistory>,
    pub products: Arc<MemoryProducts>,
}

impl Harness {
    pub fn new() -> Self {
        let ledger = Arc::new(FakeLedger::default());
        ledger.grant(USER, STARTING_BALANCE);
        let generator = Arc::new(FakeGenerator::default());
        let object_store = Arc::new(FakeObjectStore::default());
        let extractor = Arc::new(FakeExtractor::default());
        let approvals = Arc::new(MemoryApprovals::default());
        let revisions = Arc::new(MemoryRevisions::default());
        let history = Arc::new(MemoryUploadHistory::default());
        let products = Arc::new(MemoryProducts::default());

        let ports = Collaborators {
            ledger: ledger.clone(),
            generator: generator.clone(),
            object_store: object_store.clone(),
            extractor: extractor.clone(),
            approvals: approvals.clone(),
            revisions: revisions.clone(),
            upload_history: history.clone(),
            products: products.clone(),
        };
        let config = WorkflowConfig {
            persist_policy: RetryPolicy::fixed(3, Duration::ZERO),
            ..WorkflowConfig::default()
        };

        Self {
            workflow: Workflow::new(ports, config),
            ledger,
            generator,
            object_store,
            extractor,
            approvals,
            revisions,
            history,
            products,
        }
    }

    pub fn balance(&self) -> Credits {
        self.ledger.balance(USER)
    }

    pub fn front_view_request(&self, prompt: &str) -> FrontViewRequest {
        FrontViewRequest {
            product_id: PRODUCT,
            user_id: USER,
            prompt: prompt.to_string(),
            is_edit: false,
            previous_front_view_url: None,
            session_id: Some("session-1".to_string()),
        }
    }
}

/// Five non-empty view URLs.
pub fn complete_views(tag: &str) -> AllViews {
    AllViews {
        front: format!("https://cdn.example/{tag}/front.png"),
        back: format!("https://cdn.example/{tag}/back.png"),
        side: format!("https://cdn.example/{tag}/side.png"),
        top: format!("https://cdn.example/{tag}/top.png"),
        bottom: format!("https://cdn.example/{tag}/bottom.png"),
    }
}
