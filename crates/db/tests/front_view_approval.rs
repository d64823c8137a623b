//! Integration tests for front-view approval rows.
//!
//! Exercises `FrontViewApprovalRepo` against a real database:
//! - Iteration numbers increase per (product, user)
//! - A new pending row supersedes the older pending row in the session
//! - Reject/approve only act on pending rows
//! - Feature caching never overwrites
//! - Remaining-view URLs merge without clobbering

use atelier_core::approval::REASON_SUPERSEDED;
use atelier_core::views::RemainingViewUrls;
use atelier_core::workflow::GenerationState;
use atelier_db::models::approval::{CreateFrontViewApproval, RecordRemainingViews};
use atelier_db::models::status::ApprovalStatus;
use atelier_db::repositories::FrontViewApprovalRepo;
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_approval(session: &str, url: &str) -> CreateFrontViewApproval {
    CreateFrontViewApproval {
        user_id: 7,
        product_id: 100,
        session_id: session.to_string(),
        front_view_url: url.to_string(),
        prompt: "a ceramic mug".to_string(),
        reference_image_url: None,
        credits_reserved: 2,
        credits_consumed: 2,
        is_initial_generation: true,
    }
}

// ---------------------------------------------------------------------------
// Test: iteration numbering
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_iterations_increase(pool: PgPool) {
    let first = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();
    let second = FrontViewApprovalRepo::create(&pool, &new_approval("s2", "https://cdn/2.png"))
        .await
        .unwrap();

    assert_eq!(first.iteration_number, 1);
    assert_eq!(second.iteration_number, 2);
    assert_eq!(first.status(), Some(ApprovalStatus::Pending));
    assert_eq!(first.state(), Some(GenerationState::AwaitingApproval));
    assert_eq!(
        FrontViewApprovalRepo::max_iteration(&pool, 100, 7).await.unwrap(),
        Some(2)
    );
}

// ---------------------------------------------------------------------------
// Test: superseding older pending rows
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_pending_supersedes_old_in_session(pool: PgPool) {
    let old = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();
    let new = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/2.png"))
        .await
        .unwrap();

    let old = FrontViewApprovalRepo::find_by_id(&pool, old.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old.status(), Some(ApprovalStatus::Rejected));
    assert_eq!(old.rejection_reason.as_deref(), Some(REASON_SUPERSEDED));
    assert_eq!(new.status(), Some(ApprovalStatus::Pending));
}

// ---------------------------------------------------------------------------
// Test: status transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reject_only_pending(pool: PgPool) {
    let row = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();

    let rejected = FrontViewApprovalRepo::mark_rejected(&pool, row.id, "make it blue")
        .await
        .unwrap()
        .expect("pending row should be rejected");
    assert_eq!(rejected.user_feedback.as_deref(), Some("make it blue"));
    assert_eq!(rejected.state(), Some(GenerationState::GeneratingFront));
    assert!(rejected.rejected_at.is_some());

    let again = FrontViewApprovalRepo::mark_rejected(&pool, row.id, "again")
        .await
        .unwrap();
    assert!(again.is_none(), "a rejected row cannot be rejected twice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approve_attaches_features(pool: PgPool) {
    let row = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();

    let features = json!({ "colors": ["white"], "description": "A white mug" });
    let approved = FrontViewApprovalRepo::mark_approved(&pool, row.id, &features)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(approved.status(), Some(ApprovalStatus::Approved));
    assert_eq!(approved.state(), Some(GenerationState::FrontApproved));
    assert_eq!(approved.features().unwrap().colors, vec!["white"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_transition_state_is_compare_and_set(pool: PgPool) {
    let row = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();
    let approved = FrontViewApprovalRepo::mark_approved(&pool, row.id, &json!({}))
        .await
        .unwrap()
        .unwrap();

    let first = FrontViewApprovalRepo::transition_state(
        &pool,
        row.id,
        GenerationState::FrontApproved,
        GenerationState::GeneratingRemaining,
        approved.updated_at,
    )
    .await
    .unwrap();
    assert!(first);

    // A second caller holding the same snapshot loses.
    let second = FrontViewApprovalRepo::transition_state(
        &pool,
        row.id,
        GenerationState::FrontApproved,
        GenerationState::CreatingRevision,
        approved.updated_at,
    )
    .await
    .unwrap();
    assert!(!second);

    let current = FrontViewApprovalRepo::find_by_id(&pool, row.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.state(), Some(GenerationState::GeneratingRemaining));
    assert!(current.updated_at > approved.updated_at);

    // Same state, stale timestamp.
    let stale = FrontViewApprovalRepo::transition_state(
        &pool,
        row.id,
        GenerationState::GeneratingRemaining,
        GenerationState::FrontApproved,
        approved.updated_at,
    )
    .await
    .unwrap();
    assert!(!stale);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cache_features_never_overwrites(pool: PgPool) {
    let row = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();

    let first = json!({ "description": "first" });
    let second = json!({ "description": "second" });
    assert!(FrontViewApprovalRepo::cache_features(&pool, row.id, &first)
        .await
        .unwrap());
    assert!(!FrontViewApprovalRepo::cache_features(&pool, row.id, &second)
        .await
        .unwrap());

    let row = FrontViewApprovalRepo::find_by_id(&pool, row.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.extracted_features, Some(first));
}

// ---------------------------------------------------------------------------
// Test: remaining-view merge
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_record_remaining_views_merges(pool: PgPool) {
    let row = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();

    let first = RecordRemainingViews {
        urls: RemainingViewUrls {
            back: "https://cdn/back.png".into(),
            side: "https://cdn/side.png".into(),
            top: String::new(),
            bottom: "https://cdn/bottom.png".into(),
        },
        credits_reserved: 3,
        credits_consumed: 3,
    };
    FrontViewApprovalRepo::record_remaining_views(&pool, row.id, &first)
        .await
        .unwrap();

    let retry = RecordRemainingViews {
        urls: RemainingViewUrls {
            top: "https://cdn/top.png".into(),
            ..Default::default()
        },
        credits_reserved: 3,
        credits_consumed: 3,
    };
    let row = FrontViewApprovalRepo::record_remaining_views(&pool, row.id, &retry)
        .await
        .unwrap()
        .unwrap();

    let urls = row.remaining_view_urls();
    assert_eq!(urls.back, "https://cdn/back.png");
    assert_eq!(urls.top, "https://cdn/top.png");
    assert_eq!(urls.populated(), 4);
    assert_eq!(row.credits_reserved, 8);
}

// ---------------------------------------------------------------------------
// Test: duplicate window lookup
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_recent_initial(pool: PgPool) {
    let row = FrontViewApprovalRepo::create(&pool, &new_approval("s1", "https://cdn/1.png"))
        .await
        .unwrap();

    let since = Utc::now() - Duration::seconds(5);
    let found = FrontViewApprovalRepo::find_recent_initial(&pool, 100, 7, since)
        .await
        .unwrap();
    assert_eq!(found.map(|r| r.id), Some(row.id));

    let other_user = FrontViewApprovalRepo::find_recent_initial(&pool, 100, 8, since)
        .await
        .unwrap();
    assert!(other_user.is_none());
}
