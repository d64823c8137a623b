//! Explicit state machine for one approval cycle.
//!
//! The state is persisted on each approval row as a SMALLINT. Every phase
//! checks its transition before producing side effects, so a call arriving
//! in the wrong state is rejected rather than trusted.
//!
//! ```text
//! Idle                -> GeneratingFront
//! GeneratingFront     -> AwaitingApproval | Completed | Error
//! AwaitingApproval    -> FrontApproved | GeneratingFront
//! FrontApproved       -> GeneratingRemaining | CreatingRevision
//! GeneratingRemaining -> FrontApproved | Error
//! CreatingRevision    -> Completed | Error
//! Error               -> GeneratingRemaining | CreatingRevision
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Idle = 1,
    GeneratingFront = 2,
    AwaitingApproval = 3,
    FrontApproved = 4,
    GeneratingRemaining = 5,
    CreatingRevision = 6,
    Completed = 7,
    Error = 8,
}

impl GenerationState {
    pub const ALL: [GenerationState; 8] = [
        GenerationState::Idle,
        GenerationState::GeneratingFront,
        GenerationState::AwaitingApproval,
        GenerationState::FrontApproved,
        GenerationState::GeneratingRemaining,
        GenerationState::CreatingRevision,
        GenerationState::Completed,
        GenerationState::Error,
    ];

    /// Database id stored in `workflow_state`.
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::GeneratingFront => "generating_front",
            GenerationState::AwaitingApproval => "awaiting_approval",
            GenerationState::FrontApproved => "front_approved",
            GenerationState::GeneratingRemaining => "generating_remaining",
            GenerationState::CreatingRevision => "creating_revision",
            GenerationState::Completed => "completed",
            GenerationState::Error => "error",
        }
    }

    /// States reachable from `self` in one step.
    pub fn allowed_next(self) -> &'static [GenerationState] {
        use GenerationState::*;
        match self {
            Idle => &[GeneratingFront],
            // An edited row ends its cycle once a newer row replaces it.
            GeneratingFront => &[AwaitingApproval, Completed, Error],
            AwaitingApproval => &[FrontApproved, GeneratingFront],
            FrontApproved => &[GeneratingRemaining, CreatingRevision],
            GeneratingRemaining => &[FrontApproved, Error],
            CreatingRevision => &[Completed, Error],
            Completed => &[],
            Error => &[GeneratingRemaining, CreatingRevision],
        }
    }

    pub fn can_transition_to(self, next: GenerationState) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Validate a transition, returning the new state.
    pub fn transition_to(self, next: GenerationState) -> Result<GenerationState, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition(format!(
                "cannot move from '{}' to '{}'",
                self.as_str(),
                next.as_str()
            )))
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}
