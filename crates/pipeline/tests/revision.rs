mod common;

use std::sync::atomic::Ordering;

use assert_matches::assert_matches;
use atelier_core::approval::DecisionAction;
use atelier_core::types::DbId;
use atelier_core::views::{AllViews, ViewType};
use atelier_core::workflow::GenerationState;
use atelier_db::models::status::ApprovalStatus;
use atelier_pipeline::{RemainingViewsRequest, RevisionRequest, WorkflowError};
use common::*;

/// Run phases 1-3 and return the approval id with its five views.
async fn ready_batch(h: &Harness) -> (DbId, AllViews) {
    let front = h
        .workflow
        .generate_front_view(h.front_view_request("red leather tote"))
        .await
        .unwrap();
    h.workflow
        .handle_decision(USER, front.approval_id, DecisionAction::Approve, None)
        .await
        .unwrap();
    let remaining = h
        .workflow
        .generate_remaining_views(RemainingViewsRequest {
            user_id: USER,
            approval_id: front.approval_id,
            front_view_url: front.front_view_url.clone(),
            selected_revision_number: None,
        })
        .await
        .unwrap();
    // Keep the next initial generation out of the duplicate window.
    h.approvals.age(front.approval_id, 60);
    (
        front.approval_id,
        remaining.views.with_front(front.front_view_url),
    )
}

fn revision_request(approval_id: DbId, views: AllViews, is_initial: bool) -> RevisionRequest {
    RevisionRequest {
        user_id: USER,
        product_id: PRODUCT,
        approval_id,
        views,
        is_initial,
        edit_prompt: None,
    }
}

// ---------------------------------------------------------------------------
// Test: commit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_batch_is_revision_zero() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;
    let balance = h.balance();

    let outcome = h
        .workflow
        .create_revision_after_approval(revision_request(approval_id, views.clone(), true))
        .await
        .unwrap();

    assert_eq!(outcome.revision_number, 0);
    assert_eq!(outcome.revision_ids.len(), 5);
    assert!(outcome.history_recorded);
    // No credits move in this phase.
    assert_eq!(h.balance(), balance);

    let rows = h.revisions.all();
    assert_eq!(rows.len(), 5);
    for view in ViewType::ALL {
        let row = rows.iter().find(|r| r.view_type == view.as_str()).unwrap();
        assert_eq!(row.image_url, views.get(view));
        assert_eq!(row.batch_id, outcome.batch_id);
        assert_eq!(row.edit_type, "initial");
        assert_eq!(row.front_view_approval_id, Some(approval_id));
        assert!(row.is_active);
    }

    let approval = h.approvals.get(approval_id);
    assert_eq!(approval.status(), Some(ApprovalStatus::Completed));
    assert_eq!(approval.state(), Some(GenerationState::Completed));
    assert_eq!(h.history.len(), 5);
}

#[tokio::test]
async fn later_batches_increment_and_replace_the_active_one() {
    let h = Harness::new();
    let (first_id, first_views) = ready_batch(&h).await;
    let first = h
        .workflow
        .create_revision_after_approval(revision_request(first_id, first_views, true))
        .await
        .unwrap();

    let (second_id, second_views) = ready_batch(&h).await;
    let mut request = revision_request(second_id, second_views, false);
    request.edit_prompt = Some("warmer lighting".to_string());
    let second = h
        .workflow
        .create_revision_after_approval(request)
        .await
        .unwrap();

    assert_eq!(first.revision_number, 0);
    assert_eq!(second.revision_number, 1);
    assert_ne!(first.batch_id, second.batch_id);

    let active = h.revisions.active_batch_ids(PRODUCT);
    assert_eq!(active.len(), 1);
    assert!(active.contains(&second.batch_id));

    let current = h.workflow.active_revision(USER, PRODUCT).await.unwrap().unwrap();
    assert_eq!(current.revision_number, 1);
    assert_eq!(current.views.len(), 5);
    assert!(current
        .views
        .iter()
        .all(|v| v.edit_type == "edit" && v.edit_prompt.as_deref() == Some("warmer lighting")));
    assert_eq!(h.revisions.all().len(), 10);
}

#[tokio::test]
async fn active_revision_is_scoped_to_its_owner() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;
    h.workflow
        .create_revision_after_approval(revision_request(approval_id, views, true))
        .await
        .unwrap();

    assert!(h
        .workflow
        .active_revision(USER + 1, PRODUCT)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn no_active_revision_before_first_commit() {
    let h = Harness::new();
    assert!(h.workflow.active_revision(USER, PRODUCT).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: incomplete batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incomplete_batch_writes_nothing() {
    let h = Harness::new();
    let (approval_id, mut views) = ready_batch(&h).await;
    views.top = String::new();
    views.bottom = "  ".to_string();

    let err = h
        .workflow
        .create_revision_after_approval(revision_request(approval_id, views, true))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        WorkflowError::IncompleteBatch { ref missing }
            if *missing == vec![ViewType::Top, ViewType::Bottom]
    );
    assert_eq!(err.code(), "INCOMPLETE_BATCH");
    assert_eq!(h.revisions.commit_calls.load(Ordering::SeqCst), 0);
    assert!(h.revisions.all().is_empty());
    assert_eq!(h.history.len(), 0);
    assert_eq!(
        h.approvals.get(approval_id).status(),
        Some(ApprovalStatus::Approved)
    );
}

// ---------------------------------------------------------------------------
// Test: preconditions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_must_belong_to_product() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;
    let mut request = revision_request(approval_id, views, true);
    request.product_id = PRODUCT + 1;

    let err = h
        .workflow
        .create_revision_after_approval(request)
        .await
        .unwrap_err();

    assert_matches!(err, WorkflowError::Validation(_));
    assert!(h.revisions.all().is_empty());
}

#[tokio::test]
async fn pending_approval_cannot_be_committed() {
    let h = Harness::new();
    let front = h
        .workflow
        .generate_front_view(h.front_view_request("red leather tote"))
        .await
        .unwrap();

    let err = h
        .workflow
        .create_revision_after_approval(revision_request(
            front.approval_id,
            complete_views("pending"),
            true,
        ))
        .await
        .unwrap_err();

    assert_matches!(err, WorkflowError::InvalidState(_));
    assert!(h.revisions.all().is_empty());
}

#[tokio::test]
async fn committing_twice_is_invalid() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;
    h.workflow
        .create_revision_after_approval(revision_request(approval_id, views.clone(), true))
        .await
        .unwrap();

    let err = h
        .workflow
        .create_revision_after_approval(revision_request(approval_id, views, false))
        .await
        .unwrap_err();

    assert_matches!(err, WorkflowError::InvalidState(_));
    assert_eq!(h.revisions.all().len(), 5);
}

// ---------------------------------------------------------------------------
// Test: failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_commit_marks_error_and_can_be_retried() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;
    h.revisions.fail_commit(true);

    let err = h
        .workflow
        .create_revision_after_approval(revision_request(approval_id, views.clone(), true))
        .await
        .unwrap_err();

    assert_matches!(err, WorkflowError::Persistence { .. });
    assert_eq!(h.revisions.commit_calls.load(Ordering::SeqCst), 1);
    assert!(h.revisions.all().is_empty());
    assert_eq!(
        h.approvals.get(approval_id).state(),
        Some(GenerationState::Error)
    );

    h.revisions.fail_commit(false);
    let outcome = h
        .workflow
        .create_revision_after_approval(revision_request(approval_id, views, true))
        .await
        .unwrap();
    assert_eq!(outcome.revision_number, 0);
}

#[tokio::test]
async fn upload_history_failure_does_not_fail_the_commit() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;
    h.history.fail(true);

    let outcome = h
        .workflow
        .create_revision_after_approval(revision_request(approval_id, views, true))
        .await
        .unwrap();

    assert!(!outcome.history_recorded);
    assert_eq!(h.revisions.all().len(), 5);
    assert_eq!(
        h.approvals.get(approval_id).status(),
        Some(ApprovalStatus::Completed)
    );
}

#[tokio::test]
async fn racing_commits_write_one_batch() {
    let h = Harness::new();
    let (approval_id, views) = ready_batch(&h).await;

    let (a, b) = tokio::join!(
        h.workflow
            .create_revision_after_approval(revision_request(approval_id, views.clone(), true)),
        h.workflow
            .create_revision_after_approval(revision_request(approval_id, views, true)),
    );

    let (ok, err) = match (a, b) {
        (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
        other => panic!("expected exactly one success, got {other:?}"),
    };
    assert_matches!(err, WorkflowError::InvalidState(_));
    assert_eq!(ok.revision_number, 0);
    assert_eq!(h.revisions.commit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.revisions.all().len(), 5);
    assert_eq!(h.history.len(), 5);
}
