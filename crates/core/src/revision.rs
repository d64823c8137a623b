//! Revision numbering and batch completeness rules.

use crate::views::{AllViews, ViewType};

/// Revision number of a product's first committed batch.
pub const INITIAL_REVISION: i32 = 0;

/// `edit_type` recorded on rows of the first batch.
pub const EDIT_TYPE_INITIAL: &str = "initial";

/// `edit_type` recorded on rows of later batches.
pub const EDIT_TYPE_EDIT: &str = "edit";

/// Number of rows in a complete batch.
pub const BATCH_SIZE: usize = ViewType::ALL.len();

/// Compute the revision number for a new batch from the highest existing
/// revision number of the product.
///
/// An initial commit is revision 0. If revisions already exist the initial
/// flag is ignored and numbering continues, so two batches never share a
/// revision number.
pub fn next_revision_number(is_initial: bool, current_max: Option<i32>) -> i32 {
    match current_max {
        None => INITIAL_REVISION,
        Some(_) if is_initial => {
            tracing::warn!(
                ?current_max,
                "Initial revision requested but revisions already exist; continuing numbering",
            );
            current_max.map_or(INITIAL_REVISION, |m| m + 1)
        }
        Some(max) => max + 1,
    }
}

/// `edit_type` for a batch.
pub fn edit_type(is_initial: bool) -> &'static str {
    if is_initial {
        EDIT_TYPE_INITIAL
    } else {
        EDIT_TYPE_EDIT
    }
}

/// Views missing from a batch. A batch is committable only when this is
/// empty.
pub fn missing_views(views: &AllViews) -> Vec<ViewType> {
    views.missing()
}
