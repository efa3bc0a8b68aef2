//! Domain layer: entities, the completion workflow, point accounting, and
//! allowance math.

pub mod allowance_service;
pub mod calendar;
pub mod chore_service;
pub mod errors;
pub mod household_service;
pub mod ledger;
pub mod locks;
pub mod models;

pub use allowance_service::AllowanceService;
pub use chore_service::{ChoreService, CompletionOutcome};
pub use errors::ChoreError;
pub use household_service::HouseholdService;
pub use ledger::{WeeklyPointsLedger, WEEKLY_POINT_CAP};
pub use locks::MemberLocks;
