//! Credit costs for each workflow phase.

use crate::error::CoreError;
use crate::types::Credits;

/// Cost of one front-view generation or regeneration. Constant per iteration.
pub const FRONT_VIEW_COST: Credits = 2;

/// Cost of the back/side/top/bottom batch, charged once for all four views.
pub const REMAINING_VIEWS_COST: Credits = 3;

/// Reservation reasons recorded on the ledger.
pub const REASON_FRONT_VIEW: &str = "front_view";
pub const REASON_FRONT_VIEW_EDIT: &str = "front_view_edit";
pub const REASON_REMAINING_VIEWS: &str = "remaining_views";

/// A reservation or refund amount must be strictly positive.
pub fn validate_amount(amount: Credits) -> Result<(), CoreError> {
    if amount <= 0 {
        return Err(CoreError::Validation(format!(
            "Credit amount must be positive (got {amount})"
        )));
    }
    Ok(())
}

/// Validate a refund against what is still outstanding on its reservation.
///
/// `reserved` is the original reservation amount and `already_refunded`
/// the sum of prior refunds against it.
pub fn validate_refund(
    amount: Credits,
    reserved: Credits,
    already_refunded: Credits,
) -> Result<(), CoreError> {
    validate_amount(amount)?;
    let outstanding = reserved - already_refunded;
    if amount > outstanding {
        return Err(CoreError::Conflict(format!(
            "Refund of {amount} exceeds outstanding reservation amount {outstanding}"
        )));
    }
    Ok(())
}
