//! Domain entities for the household chore engine.
//!
//! Age and age category are derived from the date of birth at evaluation
//! time, never stored.

use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How often a chore becomes available again after a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChoreFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ChoreFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoreFrequency::Daily => "DAILY",
            ChoreFrequency::Weekly => "WEEKLY",
            ChoreFrequency::Monthly => "MONTHLY",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "DAILY" => Ok(ChoreFrequency::Daily),
            "WEEKLY" => Ok(ChoreFrequency::Weekly),
            "MONTHLY" => Ok(ChoreFrequency::Monthly),
            other => bail!("invalid chore frequency: {}", other),
        }
    }
}

/// Lifecycle state of a chore completion record.
///
/// `Disabled` is a chore-level block surfaced as an error code; it is never
/// reached from `Pending` and no completion record is stored with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    Pending,
    Completed,
    Rejected,
    Disabled,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Pending => "PENDING",
            CompletionStatus::Completed => "COMPLETED",
            CompletionStatus::Rejected => "REJECTED",
            CompletionStatus::Disabled => "DISABLED",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "PENDING" => Ok(CompletionStatus::Pending),
            "COMPLETED" => Ok(CompletionStatus::Completed),
            "REJECTED" => Ok(CompletionStatus::Rejected),
            "DISABLED" => Ok(CompletionStatus::Disabled),
            other => bail!("invalid completion status: {}", other),
        }
    }
}

/// Age bracket driving the allowance rate rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    Child,
    Preteen,
    Teenager,
    Adult,
}

impl AgeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeCategory::Child => "child",
            AgeCategory::Preteen => "preteen",
            AgeCategory::Teenager => "teenager",
            AgeCategory::Adult => "adult",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "child" => Ok(AgeCategory::Child),
            "preteen" => Ok(AgeCategory::Preteen),
            "teenager" => Ok(AgeCategory::Teenager),
            "adult" => Ok(AgeCategory::Adult),
            other => bail!("invalid age category: {}", other),
        }
    }

    pub fn from_age(age: u32) -> Self {
        if age < 8 {
            AgeCategory::Child
        } else if age <= 12 {
            AgeCategory::Preteen
        } else if age <= 17 {
            AgeCategory::Teenager
        } else {
            AgeCategory::Adult
        }
    }
}

/// Household administrator. Owns rooms, chores, and confirmation duties.
#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    pub id: i64,
    pub name: String,
    /// Salted one-way hash of the numeric PIN, stored as "hash:salt" hex
    pub pin_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person who can complete chores. Soft-deactivated, never deleted once
/// completions reference it.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdMember {
    pub id: i64,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub is_parent: bool,
    pub is_active: bool,
    pub parent_id: i64,
    /// Live weekly counter, archived and zeroed by the lazy weekly reset
    pub weekly_points: i64,
    pub last_weekly_reset: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HouseholdMember {
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        date.years_since(self.date_of_birth).unwrap_or(0)
    }

    pub fn age_category_on(&self, date: NaiveDate) -> AgeCategory {
        AgeCategory::from_age(self.age_on(date))
    }
}

/// Grouping namespace for chores, owned by a parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub parent_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A completable task worth a fixed number of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Chore {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub points: i64,
    pub frequency: ChoreFrequency,
    pub is_active: bool,
    pub room_id: i64,
    pub parent_id: i64,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub next_available_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chore {
    /// A chore is completable iff it is active and its frequency gate has
    /// elapsed.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_available_at.map_or(true, |t| t <= now)
    }
}

/// One attempt at a chore. Created PENDING, resolved exactly once to
/// COMPLETED or REJECTED, immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoreCompletion {
    pub id: i64,
    pub chore_id: i64,
    pub member_id: i64,
    /// The parent who resolved the completion, once resolved
    pub parent_id: Option<i64>,
    pub status: CompletionStatus,
    /// Snapshot of the chore's points at completion time; later chore edits
    /// never alter history
    pub points_earned: i64,
    pub completed_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Stored explicitly so chore edits never alter historical aggregation
    pub week_start: NaiveDate,
}

/// One row per (member, week). Never deleted; basis for allowance history.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyPoints {
    pub id: i64,
    pub member_id: i64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    /// Uncapped running total of confirmed-or-pending points
    pub points_earned: i64,
    /// min(points_earned, 30); the authoritative value for allowance math
    pub points_capped: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Historical snapshot written by the lazy weekly reset, keyed by the week
/// that just ended. Distinct from `WeeklyPoints` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyPointsArchive {
    pub id: i64,
    pub member_id: i64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub points_earned: i64,
    pub archived_at: DateTime<Utc>,
}

/// Cached monthly allowance aggregate, upserted by (member, month_year).
#[derive(Debug, Clone, PartialEq)]
pub struct AllowanceCalculation {
    pub id: i64,
    pub member_id: i64,
    /// "YYYY-MM"
    pub month_year: String,
    pub total_points_earned: i64,
    pub total_points_possible: i64,
    pub completion_percentage: f64,
    pub allowance_amount: f64,
    pub age_category: AgeCategory,
    pub calculated_at: DateTime<Utc>,
}
