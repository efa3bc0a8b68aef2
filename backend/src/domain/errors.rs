//! Error taxonomy for chore operations.
//!
//! Two classes: domain validation errors, each with a stable machine code, an
//! internal message (the `Display` impl, aimed at logs) and a separate
//! user-facing message/suggested-action pair for unattended display surfaces;
//! and infrastructure failures, wrapped into the single `Internal` variant
//! and surfaced as a generic operation failure. Domain errors are
//! deterministic functions of current state; the code and payload are
//! sufficient to diagnose them without a stack trace.

use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ChoreError {
    #[error("chore {chore_id} not found")]
    ChoreNotFound { chore_id: i64 },

    #[error("chore '{chore_name}' has been disabled by a parent")]
    ChoreDisabled { chore_name: String },

    #[error("chore '{chore_name}' is not available until {next_available}")]
    ChoreNotAvailable {
        chore_name: String,
        next_available: DateTime<Utc>,
    },

    #[error("weekly point cap reached ({current_points}/{max_points} points)")]
    WeeklyPointCapExceeded {
        current_points: i64,
        max_points: i64,
    },

    #[error("household member {member_id} not found")]
    MemberNotFound { member_id: i64 },

    #[error("household member '{member_name}' is inactive")]
    MemberInactive { member_name: String },

    #[error("pending completion {completion_id} not found")]
    PendingCompletionNotFound { completion_id: i64 },

    #[error("completion {completion_id} has already been confirmed or rejected")]
    CompletionAlreadyConfirmed { completion_id: i64 },

    #[error("parent access required for this action")]
    ParentAccessDenied,

    #[error("parent {parent_id} not found")]
    ParentNotFound { parent_id: i64 },

    #[error("a parent named '{name}' already exists")]
    ParentNameTaken { name: String },

    #[error("PIN must be 4 to 6 digits")]
    InvalidPin,

    #[error("room {room_id} not found")]
    RoomNotFound { room_id: i64 },

    #[error("chore points must be positive, got {points}")]
    InvalidChorePoints { points: i64 },

    #[error("invalid month key '{month_year}', expected YYYY-MM")]
    InvalidMonthYear { month_year: String },

    #[error("operation failed")]
    Internal(#[from] anyhow::Error),
}

impl ChoreError {
    /// Stable machine-readable code for transports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ChoreError::ChoreNotFound { .. } => "CHORE_NOT_FOUND",
            ChoreError::ChoreDisabled { .. } => "CHORE_DISABLED",
            ChoreError::ChoreNotAvailable { .. } => "CHORE_FREQUENCY_RESTRICTION",
            ChoreError::WeeklyPointCapExceeded { .. } => "WEEKLY_POINT_CAP_EXCEEDED",
            ChoreError::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            ChoreError::MemberInactive { .. } => "MEMBER_INACTIVE",
            ChoreError::PendingCompletionNotFound { .. } => "PENDING_COMPLETION_NOT_FOUND",
            ChoreError::CompletionAlreadyConfirmed { .. } => "COMPLETION_ALREADY_CONFIRMED",
            ChoreError::ParentAccessDenied => "PARENT_ACCESS_DENIED",
            ChoreError::ParentNotFound { .. } => "PARENT_NOT_FOUND",
            ChoreError::ParentNameTaken { .. } => "PARENT_NAME_TAKEN",
            ChoreError::InvalidPin => "INVALID_PIN",
            ChoreError::RoomNotFound { .. } => "ROOM_NOT_FOUND",
            ChoreError::InvalidChorePoints { .. } => "INVALID_CHORE_POINTS",
            ChoreError::InvalidMonthYear { .. } => "INVALID_MONTH_YEAR",
            ChoreError::Internal(_) => "OPERATION_FAILED",
        }
    }

    /// Message for the wall-mounted dashboard, written for the family rather
    /// than for logs.
    pub fn user_message(&self) -> String {
        match self {
            ChoreError::ChoreNotFound { .. } => {
                "Chore Not Found\nCouldn't find this chore.".to_string()
            }
            ChoreError::ChoreDisabled { chore_name } => {
                format!("Chore Disabled\n'{}' has been turned off by a parent.", chore_name)
            }
            ChoreError::ChoreNotAvailable {
                chore_name,
                next_available,
            } => format!(
                "'{}' Not Ready Yet\nThis chore will be available {}.",
                chore_name,
                next_available.format("%A at %I:%M %p")
            ),
            ChoreError::WeeklyPointCapExceeded {
                current_points,
                max_points,
            } => format!(
                "Weekly Goal Reached!\nYou've earned {}/{} points this week. Great job!",
                current_points, max_points
            ),
            ChoreError::MemberNotFound { .. } => {
                "Member Not Found\nCouldn't find the family member.".to_string()
            }
            ChoreError::MemberInactive { member_name } => {
                format!("Member Inactive\n{}'s account is not active.", member_name)
            }
            ChoreError::PendingCompletionNotFound { .. } => {
                "Task Not Found\nCouldn't find the task to confirm.".to_string()
            }
            ChoreError::CompletionAlreadyConfirmed { .. } => {
                "Already Confirmed\nThis task has already been reviewed.".to_string()
            }
            ChoreError::ParentAccessDenied => {
                "Parent Access Required\nOnly parents can perform this action.".to_string()
            }
            ChoreError::ParentNotFound { .. } => {
                "Parent Not Found\nCouldn't find the parent account.".to_string()
            }
            ChoreError::ParentNameTaken { name } => {
                format!("Name Taken\nA parent named '{}' already exists.", name)
            }
            ChoreError::InvalidPin => {
                "Invalid PIN\nThe PIN must be 4 to 6 digits.".to_string()
            }
            ChoreError::RoomNotFound { .. } => {
                "Room Not Found\nCouldn't find this room.".to_string()
            }
            ChoreError::InvalidChorePoints { .. } => {
                "Invalid Points\nChore points must be a positive number.".to_string()
            }
            ChoreError::InvalidMonthYear { month_year } => {
                format!("Invalid Month\n'{}' is not a valid month.", month_year)
            }
            ChoreError::Internal(_) => {
                "Something Went Wrong\nPlease try again or ask a parent for help.".to_string()
            }
        }
    }

    /// Suggested next step for the person at the dashboard.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            ChoreError::ChoreNotFound { .. } => "The chore may have been removed. Try refreshing.",
            ChoreError::ChoreDisabled { .. } => "Choose a different chore or ask a parent.",
            ChoreError::ChoreNotAvailable { .. } => {
                "Check back later or choose a different chore."
            }
            ChoreError::WeeklyPointCapExceeded { .. } => {
                "Try again next week or ask a parent to confirm pending tasks."
            }
            ChoreError::MemberNotFound { .. } => "Check the member selection or ask a parent.",
            ChoreError::MemberInactive { .. } => "Ask a parent to activate the account.",
            ChoreError::PendingCompletionNotFound { .. } => {
                "The task may have already been handled."
            }
            ChoreError::CompletionAlreadyConfirmed { .. } => "No further action needed.",
            ChoreError::ParentAccessDenied => "Ask a parent to complete this task.",
            ChoreError::ParentNotFound { .. } => "Check the parent selection.",
            ChoreError::ParentNameTaken { .. } => "Pick a different name.",
            ChoreError::InvalidPin => "Enter a numeric PIN between 4 and 6 digits.",
            ChoreError::RoomNotFound { .. } => "The room may have been removed. Try refreshing.",
            ChoreError::InvalidChorePoints { .. } => "Enter a points value of 1 or more.",
            ChoreError::InvalidMonthYear { .. } => "Use the YYYY-MM format.",
            ChoreError::Internal(_) => "Try again later.",
        }
    }

    /// Domain validation errors are the caller's problem; infrastructure
    /// failures are ours.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ChoreError::Internal(_))
    }
}

/// Builds the frequency-restriction error from a gated chore.
pub fn frequency_restriction(chore_name: &str, next_available: DateTime<Utc>) -> ChoreError {
    ChoreError::ChoreNotAvailable {
        chore_name: chore_name.to_string(),
        next_available,
    }
}
