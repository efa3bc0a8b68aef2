//! Wire types shared between the chore engine and dashboard clients.
//!
//! Everything here is serde-serializable and intended for display surfaces
//! (the wall-mounted family dashboard), so fields carry human-readable names
//! alongside the raw ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Non-fatal advisory attached to a successful completion when a member is
/// approaching the weekly point cap. This is a UX signal, not an error: the
/// completion it rides on has already succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapAdvisory {
    /// Capped points the member had before this completion
    pub current_points: i64,
    /// Points the completed chore is worth
    pub chore_points: i64,
    /// Running total after this completion
    pub new_total: i64,
    /// Headroom left under the weekly cap
    pub points_remaining: i64,
    /// Display message for the dashboard
    pub message: String,
    /// Secondary encouragement line
    pub encouragement: String,
}

/// Snapshot of a member's standing against the weekly point cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStatus {
    pub member_id: i64,
    pub member_name: String,
    /// Capped points accumulated in the current ISO week
    pub current_points: i64,
    /// The weekly ceiling (30)
    pub cap: i64,
    /// Points still earnable this week
    pub remaining: i64,
    /// True once the member can no longer complete chores this week
    pub at_cap: bool,
}

/// A chore completion as presented to clients, joined with the names the
/// dashboard needs to render it without further lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionView {
    pub id: i64,
    pub chore_id: i64,
    pub chore_name: String,
    pub member_id: i64,
    pub member_name: String,
    /// PENDING | COMPLETED | REJECTED
    pub status: String,
    /// Snapshot of the chore's points at completion time
    pub points_earned: i64,
    pub completed_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Monday of the ISO week the completion counts toward
    pub week_start: chrono::NaiveDate,
}

/// Per-item failure inside a batch confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfirmError {
    pub completion_id: i64,
    /// Stable machine-readable error code
    pub code: String,
    pub message: String,
}

/// Outcome of confirming a list of completions. Individual failures never
/// abort the batch; they are collected here instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfirmSummary {
    pub processed_count: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub confirmed: bool,
    pub results: Vec<CompletionView>,
    pub errors: Vec<BatchConfirmError>,
}

/// Events fanned out to subscribed dashboard clients. Serialized with a
/// `type` tag so clients can dispatch without inspecting the payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// First event on every new subscription
    Connected {
        connection_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// A member recorded a chore completion (now awaiting confirmation)
    ChoreCompleted {
        completion_id: i64,
        chore_id: i64,
        chore_name: String,
        member_id: i64,
        member_name: String,
        points_earned: i64,
        status: String,
        room_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<CapAdvisory>,
        timestamp: DateTime<Utc>,
    },
    /// A parent confirmed or rejected a pending completion
    ChoreConfirmed {
        completion_id: i64,
        chore_id: i64,
        chore_name: String,
        member_id: i64,
        member_name: String,
        status: String,
        confirmed: bool,
        /// Zero when the completion was rejected
        points_earned: i64,
        timestamp: DateTime<Utc>,
    },
    /// Aggregate event after a batch confirmation (individual
    /// `chore_confirmed` events are still emitted per item)
    BatchChoreConfirmed {
        processed_count: usize,
        successful_count: usize,
        failed_count: usize,
        confirmed: bool,
        completion_ids: Vec<i64>,
        timestamp: DateTime<Utc>,
    },
    /// Keep-alive sent on idle streams so proxies and clients can detect
    /// liveness
    Ping { timestamp: DateTime<Utc> },
}

impl DashboardEvent {
    /// SSE event name for this payload, matching the `type` tag.
    pub fn event_name(&self) -> &'static str {
        match self {
            DashboardEvent::Connected { .. } => "connected",
            DashboardEvent::ChoreCompleted { .. } => "chore_completed",
            DashboardEvent::ChoreConfirmed { .. } => "chore_confirmed",
            DashboardEvent::BatchChoreConfirmed { .. } => "batch_chore_confirmed",
            DashboardEvent::Ping { .. } => "ping",
        }
    }
}
