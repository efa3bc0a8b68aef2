//! SQLite-backed repositories.
//!
//! Each repository owns a clone of the shared connection and maps rows to
//! domain entities by hand. All timestamps are stored as RFC 3339 TEXT and
//! dates as ISO `YYYY-MM-DD` TEXT; the chrono bindings handle both.

pub mod chores;
pub mod household;
pub mod points;

pub use chores::{ChoreRepository, CompletionRepository, CompletionWithNames};
pub use household::{MemberRepository, ParentRepository, RoomRepository};
pub use points::{AllowanceRepository, WeeklyPointsRepository};
