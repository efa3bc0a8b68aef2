//! Weekly point accounting: the capped per-week rows, the live member
//! counter, and the lazy Monday reset.
//!
//! Callers serialize per member (see `MemberLocks`) before touching the
//! ledger. The reset reads the member row itself, under the caller's lock,
//! and the live counter only ever moves by additive updates.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::info;

use shared::WeeklyStatus;

use super::calendar::{week_end_date, week_start_date};
use crate::domain::models::HouseholdMember;
use crate::storage::{MemberRepository, WeeklyPointsRepository};

/// Most points a member can bank toward allowance in a single week.
pub const WEEKLY_POINT_CAP: i64 = 30;

/// WeeklyPointsLedger coordinates the per-week rows with the member's live
/// counter so both always move together.
#[derive(Clone)]
pub struct WeeklyPointsLedger {
    weekly: WeeklyPointsRepository,
    members: MemberRepository,
}

impl WeeklyPointsLedger {
    pub fn new(weekly: WeeklyPointsRepository, members: MemberRepository) -> Self {
        Self { weekly, members }
    }

    /// Accrues `points` for the week containing `now`, updating the capped
    /// weekly row and bumping the member's live counter. The counter bump is
    /// a single additive statement, so the stored value never regresses to a
    /// caller's stale snapshot.
    pub async fn record_points(
        &self,
        member_id: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let week_start = week_start_date(now.date_naive());
        let week_end = week_end_date(now.date_naive());

        match self.weekly.get_for_week(member_id, week_start).await? {
            Some(row) => {
                let earned = row.points_earned + points;
                self.weekly
                    .update_points(row.id, earned, earned.min(WEEKLY_POINT_CAP), now)
                    .await?;
            }
            None => {
                self.weekly
                    .insert(
                        member_id,
                        week_start,
                        week_end,
                        points,
                        points.min(WEEKLY_POINT_CAP),
                        now,
                    )
                    .await?;
            }
        }

        self.members
            .adjust_weekly_counter(member_id, points, now)
            .await?;
        Ok(())
    }

    /// Backs `points` out after a rejection. The weekly row for the
    /// completion's week floors at zero; the live counter only tracks the
    /// week containing `now`, so it is deducted only when the rejected
    /// completion belongs to that week.
    pub async fn reverse_points(
        &self,
        member_id: i64,
        points: i64,
        week_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(row) = self.weekly.get_for_week(member_id, week_start).await? {
            let earned = (row.points_earned - points).max(0);
            self.weekly
                .update_points(row.id, earned, earned.min(WEEKLY_POINT_CAP), now)
                .await?;
        }

        if week_start == week_start_date(now.date_naive()) {
            self.members
                .adjust_weekly_counter(member_id, -points, now)
                .await?;
        }
        Ok(())
    }

    /// Runs the lazy weekly reset if the member's counter belongs to an
    /// earlier week: archives the old counter value and zeroes it for the
    /// week containing `now`. Returns the member with the reset applied.
    /// A second call in the same week is a no-op.
    ///
    /// Reads the member here rather than taking a snapshot argument; under
    /// the member lock that read is the one the reset decision acts on, so
    /// a row refreshed by a concurrent task is never archived twice.
    pub async fn check_and_reset_weekly(
        &self,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> Result<HouseholdMember> {
        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .context("member disappeared before weekly reset")?;

        let current_week = week_start_date(now.date_naive());
        if member.last_weekly_reset.map_or(false, |reset| reset >= current_week) {
            return Ok(member);
        }

        if member.weekly_points > 0 {
            let prev_week_start = current_week - Duration::days(7);
            let prev_week_end = current_week - Duration::days(1);
            self.weekly
                .archive_week(
                    member.id,
                    prev_week_start,
                    prev_week_end,
                    member.weekly_points,
                    now,
                )
                .await?;
            info!(
                "archived {} weekly points for {} (week of {})",
                member.weekly_points, member.name, prev_week_start
            );
        }

        self.members
            .set_weekly_counter(member.id, 0, Some(current_week), now)
            .await?;
        self.members
            .find_by_id(member.id)
            .await?
            .context("member disappeared during weekly reset")
    }

    /// Capped points banked so far in the week containing `date`.
    pub async fn capped_points(&self, member_id: i64, date: NaiveDate) -> Result<i64> {
        let week_start = week_start_date(date);
        Ok(self
            .weekly
            .get_for_week(member_id, week_start)
            .await?
            .map(|row| row.points_capped)
            .unwrap_or(0))
    }

    /// Dashboard snapshot of a member's progress toward the weekly cap.
    pub async fn weekly_status(
        &self,
        member: &HouseholdMember,
        now: DateTime<Utc>,
    ) -> Result<WeeklyStatus> {
        let current = self.capped_points(member.id, now.date_naive()).await?;
        Ok(WeeklyStatus {
            member_id: member.id,
            member_name: member.name.clone(),
            current_points: current,
            cap: WEEKLY_POINT_CAP,
            remaining: (WEEKLY_POINT_CAP - current).max(0),
            at_cap: current >= WEEKLY_POINT_CAP,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::storage::ParentRepository;
    use chrono::TimeZone;

    async fn setup_test() -> (
        WeeklyPointsLedger,
        MemberRepository,
        WeeklyPointsRepository,
        HouseholdMember,
    ) {
        let db = DbConnection::init_test()
            .await
            .expect("Failed to create test database");
        let now = Utc::now();

        let parent = ParentRepository::new(db.clone())
            .create("Dana", "x:y", now)
            .await
            .expect("parent");
        let members = MemberRepository::new(db.clone());
        let member = members
            .create(
                "Alex",
                NaiveDate::from_ymd_opt(2014, 5, 1).unwrap(),
                false,
                parent.id,
                now,
            )
            .await
            .expect("member");

        let weekly = WeeklyPointsRepository::new(db);
        let ledger = WeeklyPointsLedger::new(weekly.clone(), members.clone());
        (ledger, members, weekly, member)
    }

    #[tokio::test]
    async fn test_record_points_caps_weekly_row() {
        let (ledger, members, _, member) = setup_test().await;
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

        ledger.record_points(member.id, 28, now).await.expect("record");
        ledger.record_points(member.id, 5, now).await.expect("record");

        let date = now.date_naive();
        assert_eq!(ledger.capped_points(member.id, date).await.expect("capped"), 30);

        let member = members.find_by_id(member.id).await.expect("find").expect("exists");
        // Live counter keeps the uncapped total
        assert_eq!(member.weekly_points, 33);

        let status = ledger.weekly_status(&member, now).await.expect("status");
        assert_eq!(status.current_points, 30);
        assert_eq!(status.remaining, 0);
        assert!(status.at_cap);
    }

    #[tokio::test]
    async fn test_reverse_points_floors_at_zero() {
        let (ledger, members, _, member) = setup_test().await;
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();
        let week_start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        ledger.record_points(member.id, 5, now).await.expect("record");

        ledger
            .reverse_points(member.id, 8, week_start, now)
            .await
            .expect("reverse");
        assert_eq!(
            ledger.capped_points(member.id, now.date_naive()).await.expect("capped"),
            0
        );
        let member = members.find_by_id(member.id).await.expect("find").expect("exists");
        assert_eq!(member.weekly_points, 0);
    }

    #[tokio::test]
    async fn test_weekly_reset_archives_and_zeroes() {
        let (ledger, members, weekly, member) = setup_test().await;
        let last_week = Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap();
        let this_week = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

        ledger.record_points(member.id, 25, last_week).await.expect("record");
        let member = members.find_by_id(member.id).await.expect("find").expect("exists");
        assert_eq!(member.weekly_points, 25);

        let reset = ledger
            .check_and_reset_weekly(member.id, this_week)
            .await
            .expect("reset");
        assert_eq!(reset.weekly_points, 0);
        assert_eq!(
            reset.last_weekly_reset,
            Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );

        // Archive row covers the week that just ended
        let archives = weekly.list_archives(member.id).await.expect("archives");
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].points_earned, 25);
        assert_eq!(
            archives[0].week_start,
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        );
        assert_eq!(
            archives[0].week_end,
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );

        assert_eq!(
            ledger
                .capped_points(member.id, this_week.date_naive())
                .await
                .expect("capped"),
            0
        );

        // Idempotent within the same week
        let again = ledger
            .check_and_reset_weekly(reset.id, this_week)
            .await
            .expect("reset");
        assert_eq!(again.weekly_points, 0);
        assert_eq!(again.last_weekly_reset, reset.last_weekly_reset);
    }

    #[tokio::test]
    async fn test_rejecting_prior_week_leaves_live_counter_alone() {
        let (ledger, members, _, member) = setup_test().await;
        let last_week = Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap();
        let this_week = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();
        let last_week_start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        ledger.record_points(member.id, 5, last_week).await.expect("record");
        ledger
            .check_and_reset_weekly(member.id, this_week)
            .await
            .expect("reset");
        ledger.record_points(member.id, 7, this_week).await.expect("record");

        // Rejecting last week's completion after the rollover corrects last
        // week's row without touching this week's counter
        ledger
            .reverse_points(member.id, 5, last_week_start, this_week)
            .await
            .expect("reverse");

        let member = members.find_by_id(member.id).await.expect("find").expect("exists");
        assert_eq!(member.weekly_points, 7);
        assert_eq!(
            ledger
                .capped_points(member.id, last_week.date_naive())
                .await
                .expect("capped"),
            0
        );
        assert_eq!(
            ledger
                .capped_points(member.id, this_week.date_naive())
                .await
                .expect("capped"),
            7
        );
    }
}
