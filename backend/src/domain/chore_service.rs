//! The completion workflow: chore attempts, parent confirmation, and the
//! event fan-out that keeps dashboards current.
//!
//! Points accrue optimistically when a completion is recorded in PENDING;
//! confirmation decides whether the record archives as COMPLETED or
//! REJECTED, and a rejection reverses the ledger contribution. The
//! cap-check-then-accrue sequence runs under the member's lock so two
//! concurrent completions can never jointly overshoot the weekly cap.

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use shared::{
    BatchConfirmError, BatchConfirmSummary, CapAdvisory, CompletionView, DashboardEvent,
    WeeklyStatus,
};

use super::calendar::{next_available, week_start_date};
use super::errors::{frequency_restriction, ChoreError};
use super::ledger::{WeeklyPointsLedger, WEEKLY_POINT_CAP};
use super::locks::MemberLocks;
use super::models::{ChoreCompletion, CompletionStatus, HouseholdMember};
use crate::events::EventBroadcaster;
use crate::storage::{
    ChoreRepository, CompletionRepository, MemberRepository, ParentRepository, RoomRepository,
};

/// Capped points at which the approaching-cap advisory starts firing.
const ADVISORY_THRESHOLD: i64 = 20;

/// A successful completion attempt, plus the display names and the optional
/// approaching-cap advisory.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub completion: ChoreCompletion,
    pub chore_name: String,
    pub member_name: String,
    pub room_name: Option<String>,
    pub advisory: Option<CapAdvisory>,
}

#[derive(Clone)]
pub struct ChoreService {
    chores: ChoreRepository,
    completions: CompletionRepository,
    members: MemberRepository,
    parents: ParentRepository,
    rooms: RoomRepository,
    ledger: WeeklyPointsLedger,
    locks: MemberLocks,
    broadcaster: EventBroadcaster,
}

impl ChoreService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chores: ChoreRepository,
        completions: CompletionRepository,
        members: MemberRepository,
        parents: ParentRepository,
        rooms: RoomRepository,
        ledger: WeeklyPointsLedger,
        locks: MemberLocks,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            chores,
            completions,
            members,
            parents,
            rooms,
            ledger,
            locks,
            broadcaster,
        }
    }

    /// Records a member's attempt at a chore.
    ///
    /// Validates the chore (active, frequency gate elapsed) and the member
    /// (active, under the weekly cap), inserts the PENDING record, stamps the
    /// chore's next availability, accrues the points, and notifies the owning
    /// parent's dashboards. The cap check and the accrual run under the
    /// member's lock.
    pub async fn complete_chore(
        &self,
        chore_id: i64,
        member_id: i64,
    ) -> Result<CompletionOutcome, ChoreError> {
        let now = Utc::now();

        let chore = self
            .chores
            .find_by_id(chore_id)
            .await?
            .ok_or(ChoreError::ChoreNotFound { chore_id })?;
        if !chore.is_active {
            return Err(ChoreError::ChoreDisabled {
                chore_name: chore.name,
            });
        }
        if let Some(next) = chore.next_available_at.filter(|next| *next > now) {
            return Err(frequency_restriction(&chore.name, next));
        }

        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or(ChoreError::MemberNotFound { member_id })?;
        if !member.is_active {
            return Err(ChoreError::MemberInactive {
                member_name: member.name,
            });
        }

        let lock = self.locks.lock_for(member_id);
        let (member, completion, advisory) = {
            let _guard = lock.lock().await;

            // The reset re-reads the member row under the lock, so the cap
            // decision below never acts on a snapshot another task refreshed
            let member = self.ledger.check_and_reset_weekly(member_id, now).await?;
            let current = self.ledger.capped_points(member_id, now.date_naive()).await?;
            if current >= WEEKLY_POINT_CAP {
                return Err(ChoreError::WeeklyPointCapExceeded {
                    current_points: current,
                    max_points: WEEKLY_POINT_CAP,
                });
            }

            let advisory = approaching_cap_advisory(current, chore.points);

            let week_start = week_start_date(now.date_naive());
            let completion = self
                .completions
                .insert_pending(chore.id, member.id, chore.points, now, week_start)
                .await?;
            self.chores
                .mark_completed(chore.id, now, next_available(chore.frequency, now))
                .await?;
            self.ledger.record_points(member.id, chore.points, now).await?;

            (member, completion, advisory)
        };

        let room_name = self
            .rooms
            .find_by_id(chore.room_id)
            .await?
            .map(|room| room.name);

        info!(
            "{} completed '{}' for {} points (completion {}, pending confirmation)",
            member.name, chore.name, chore.points, completion.id
        );
        self.broadcaster.publish(
            Some(chore.parent_id),
            &DashboardEvent::ChoreCompleted {
                completion_id: completion.id,
                chore_id: chore.id,
                chore_name: chore.name.clone(),
                member_id: member.id,
                member_name: member.name.clone(),
                points_earned: completion.points_earned,
                status: completion.status.as_str().to_string(),
                room_name: room_name.clone(),
                warning: advisory.clone(),
                timestamp: now,
            },
        );

        Ok(CompletionOutcome {
            completion,
            chore_name: chore.name,
            member_name: member.name,
            room_name,
            advisory,
        })
    }

    /// Resolves a PENDING completion to COMPLETED or REJECTED.
    ///
    /// Only the parent who owns the chore may resolve it. A rejection backs
    /// the provisional points out of the ledger. Resolving an
    /// already-resolved completion fails without touching the record.
    pub async fn confirm_completion(
        &self,
        completion_id: i64,
        parent_id: i64,
        confirmed: bool,
    ) -> Result<CompletionView, ChoreError> {
        let now = Utc::now();

        let completion = self
            .completions
            .find_by_id(completion_id)
            .await?
            .ok_or(ChoreError::PendingCompletionNotFound { completion_id })?;
        if completion.status != CompletionStatus::Pending {
            return Err(ChoreError::CompletionAlreadyConfirmed { completion_id });
        }

        let chore = self
            .chores
            .find_by_id(completion.chore_id)
            .await?
            .ok_or(ChoreError::ChoreNotFound {
                chore_id: completion.chore_id,
            })?;
        let parent = self
            .parents
            .find_by_id(parent_id)
            .await?
            .filter(|parent| parent.is_active)
            .ok_or(ChoreError::ParentNotFound { parent_id })?;
        if chore.parent_id != parent.id {
            return Err(ChoreError::ParentAccessDenied);
        }

        let member = self.load_member(completion.member_id).await?;

        let lock = self.locks.lock_for(member.id);
        let (completion, status) = {
            let _guard = lock.lock().await;

            // Re-read under the lock so two parents racing on the same
            // completion cannot both resolve it
            let completion = self
                .completions
                .find_by_id(completion_id)
                .await?
                .ok_or(ChoreError::PendingCompletionNotFound { completion_id })?;
            if completion.status != CompletionStatus::Pending {
                return Err(ChoreError::CompletionAlreadyConfirmed { completion_id });
            }

            let status = if confirmed {
                CompletionStatus::Completed
            } else {
                CompletionStatus::Rejected
            };
            self.completions
                .resolve(completion.id, parent.id, status, now)
                .await?;
            if !confirmed {
                self.ledger
                    .reverse_points(member.id, completion.points_earned, completion.week_start, now)
                    .await?;
            }

            (completion, status)
        };

        info!(
            "{} {} '{}' by {} ({} points)",
            parent.name,
            if confirmed { "confirmed" } else { "rejected" },
            chore.name,
            member.name,
            completion.points_earned
        );
        self.broadcaster.publish(
            Some(parent.id),
            &DashboardEvent::ChoreConfirmed {
                completion_id: completion.id,
                chore_id: chore.id,
                chore_name: chore.name.clone(),
                member_id: member.id,
                member_name: member.name.clone(),
                status: status.as_str().to_string(),
                confirmed,
                points_earned: if confirmed { completion.points_earned } else { 0 },
                timestamp: now,
            },
        );

        Ok(CompletionView {
            id: completion.id,
            chore_id: chore.id,
            chore_name: chore.name,
            member_id: member.id,
            member_name: member.name,
            status: status.as_str().to_string(),
            points_earned: completion.points_earned,
            completed_at: completion.completed_at,
            confirmed_at: Some(now),
            week_start: completion.week_start,
        })
    }

    /// Applies `confirm_completion` to each id, collecting per-item failures
    /// instead of aborting the batch. The aggregate event fires only when at
    /// least one item succeeded; the per-item events have already gone out.
    pub async fn batch_confirm(
        &self,
        completion_ids: &[i64],
        parent_id: i64,
        confirmed: bool,
    ) -> Result<BatchConfirmSummary, ChoreError> {
        self.parents
            .find_by_id(parent_id)
            .await?
            .filter(|parent| parent.is_active)
            .ok_or(ChoreError::ParentNotFound { parent_id })?;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for &completion_id in completion_ids {
            match self.confirm_completion(completion_id, parent_id, confirmed).await {
                Ok(view) => results.push(view),
                Err(err) => errors.push(BatchConfirmError {
                    completion_id,
                    code: err.code().to_string(),
                    message: err.to_string(),
                }),
            }
        }

        let summary = BatchConfirmSummary {
            processed_count: completion_ids.len(),
            successful_count: results.len(),
            failed_count: errors.len(),
            confirmed,
            results,
            errors,
        };

        if summary.successful_count > 0 {
            self.broadcaster.publish(
                Some(parent_id),
                &DashboardEvent::BatchChoreConfirmed {
                    processed_count: summary.processed_count,
                    successful_count: summary.successful_count,
                    failed_count: summary.failed_count,
                    confirmed,
                    completion_ids: summary.results.iter().map(|view| view.id).collect(),
                    timestamp: Utc::now(),
                },
            );
        }
        info!(
            "batch confirmation: {}/{} succeeded",
            summary.successful_count, summary.processed_count
        );
        Ok(summary)
    }

    /// A member's standing against the weekly cap, running the lazy weekly
    /// reset first so a stale counter never leaks into a new week.
    pub async fn weekly_status(&self, member_id: i64) -> Result<WeeklyStatus, ChoreError> {
        let now = Utc::now();
        self.load_member(member_id).await?;

        let lock = self.locks.lock_for(member_id);
        let member = {
            let _guard = lock.lock().await;
            self.ledger.check_and_reset_weekly(member_id, now).await?
        };
        Ok(self.ledger.weekly_status(&member, now).await?)
    }

    /// The confirmation queue for a parent's chores, oldest first.
    pub async fn pending_completions(
        &self,
        parent_id: i64,
    ) -> Result<Vec<CompletionView>, ChoreError> {
        self.parents
            .find_by_id(parent_id)
            .await?
            .ok_or(ChoreError::ParentNotFound { parent_id })?;

        let pending = self.completions.list_pending_for_parent(parent_id).await?;
        Ok(pending
            .into_iter()
            .map(|item| CompletionView {
                id: item.completion.id,
                chore_id: item.completion.chore_id,
                chore_name: item.chore_name,
                member_id: item.completion.member_id,
                member_name: item.member_name,
                status: item.completion.status.as_str().to_string(),
                points_earned: item.completion.points_earned,
                completed_at: item.completion.completed_at,
                confirmed_at: item.completion.confirmed_at,
                week_start: item.completion.week_start,
            })
            .collect())
    }

    async fn load_member(&self, member_id: i64) -> Result<HouseholdMember, ChoreError> {
        self.members
            .find_by_id(member_id)
            .await
            .context("loading household member")?
            .ok_or(ChoreError::MemberNotFound { member_id })
    }
}

fn approaching_cap_advisory(current: i64, chore_points: i64) -> Option<CapAdvisory> {
    let new_total = current + chore_points;
    if current < ADVISORY_THRESHOLD || new_total >= WEEKLY_POINT_CAP {
        return None;
    }
    let remaining = WEEKLY_POINT_CAP - new_total;
    Some(CapAdvisory {
        current_points: current,
        chore_points,
        new_total,
        points_remaining: remaining,
        message: format!(
            "You're getting close to your weekly goal: {} of {} points.",
            new_total, WEEKLY_POINT_CAP
        ),
        encouragement: format!("Only {} more points until the weekly cap!", remaining),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::domain::models::ChoreFrequency;
    use crate::storage::WeeklyPointsRepository;
    use chrono::{Duration, NaiveDate};

    struct Fixture {
        service: ChoreService,
        ledger: WeeklyPointsLedger,
        members: MemberRepository,
        chores: ChoreRepository,
        weekly: WeeklyPointsRepository,
        broadcaster: EventBroadcaster,
        parent_id: i64,
        member_id: i64,
        room_id: i64,
    }

    impl Fixture {
        async fn chore(&self, name: &str, points: i64, frequency: ChoreFrequency) -> i64 {
            self.chores
                .create(name, None, points, frequency, self.room_id, self.parent_id, Utc::now())
                .await
                .expect("chore")
                .id
        }

        /// Seeds capped points for the current week the way the workflow
        /// would: reset marker stamped first, then the accrual.
        async fn seed_points(&self, points: i64) {
            self.ledger
                .check_and_reset_weekly(self.member_id, Utc::now())
                .await
                .expect("reset");
            self.ledger
                .record_points(self.member_id, points, Utc::now())
                .await
                .expect("record");
        }

        async fn capped_now(&self) -> i64 {
            self.ledger
                .capped_points(self.member_id, Utc::now().date_naive())
                .await
                .expect("capped")
        }
    }

    async fn setup_test() -> Fixture {
        let db = DbConnection::init_test()
            .await
            .expect("Failed to create test database");
        let now = Utc::now();

        let parents = ParentRepository::new(db.clone());
        let members = MemberRepository::new(db.clone());
        let rooms = RoomRepository::new(db.clone());
        let chores = ChoreRepository::new(db.clone());
        let completions = CompletionRepository::new(db.clone());
        let weekly = WeeklyPointsRepository::new(db);
        let ledger = WeeklyPointsLedger::new(weekly.clone(), members.clone());
        let broadcaster = EventBroadcaster::new();

        let parent = parents.create("Dana", "x:y", now).await.expect("parent");
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
        let room = rooms
            .create("Kitchen", None, parent.id, now)
            .await
            .expect("room");

        let service = ChoreService::new(
            chores.clone(),
            completions,
            members.clone(),
            parents,
            rooms,
            ledger.clone(),
            MemberLocks::new(),
            broadcaster.clone(),
        );

        Fixture {
            service,
            ledger,
            members,
            chores,
            weekly,
            broadcaster,
            parent_id: parent.id,
            member_id: member.id,
            room_id: room.id,
        }
    }

    #[tokio::test]
    async fn test_first_completion_accrues_and_gates() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;

        let outcome = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");
        assert_eq!(outcome.completion.status, CompletionStatus::Pending);
        assert_eq!(outcome.completion.points_earned, 5);
        assert_eq!(outcome.room_name.as_deref(), Some("Kitchen"));
        assert!(outcome.advisory.is_none());
        assert_eq!(fx.capped_now().await, 5);

        // Daily frequency gates the chore for 24 hours
        let chore = fx
            .chores
            .find_by_id(chore_id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(
            chore.next_available_at,
            Some(outcome.completion.completed_at + Duration::hours(24))
        );

        let err = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CHORE_FREQUENCY_RESTRICTION");
    }

    #[tokio::test]
    async fn test_cap_blocks_once_reached() {
        let fx = setup_test().await;
        fx.seed_points(30).await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;

        let err = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .unwrap_err();
        match err {
            ChoreError::WeeklyPointCapExceeded {
                current_points,
                max_points,
            } => {
                assert_eq!(current_points, 30);
                assert_eq!(max_points, 30);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // No ledger mutation on a rejected attempt
        assert_eq!(fx.capped_now().await, 30);
    }

    #[tokio::test]
    async fn test_under_cap_attempt_succeeds_and_clamps() {
        let fx = setup_test().await;
        fx.seed_points(28).await;
        let chore_id = fx.chore("Vacuum", 5, ChoreFrequency::Daily).await;

        // 28 is still under the cap, so the attempt goes through; the stored
        // capped value clamps at 30
        fx.service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");
        assert_eq!(fx.capped_now().await, 30);
    }

    #[tokio::test]
    async fn test_approaching_cap_advisory() {
        let fx = setup_test().await;
        fx.seed_points(22).await;
        let chore_id = fx.chore("Vacuum", 5, ChoreFrequency::Daily).await;

        let outcome = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");
        let advisory = outcome.advisory.expect("advisory attached");
        assert_eq!(advisory.current_points, 22);
        assert_eq!(advisory.new_total, 27);
        assert_eq!(advisory.points_remaining, 3);
        assert_eq!(fx.capped_now().await, 27);
    }

    #[tokio::test]
    async fn test_disabled_and_missing_chores() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        fx.chores
            .set_active(chore_id, false, Utc::now())
            .await
            .expect("disable");

        let err = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CHORE_DISABLED");

        let err = fx.service.complete_chore(999, fx.member_id).await.unwrap_err();
        assert_eq!(err.code(), "CHORE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_confirm_and_double_confirm() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        let outcome = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");

        let view = fx
            .service
            .confirm_completion(outcome.completion.id, fx.parent_id, true)
            .await
            .expect("confirm");
        assert_eq!(view.status, "COMPLETED");
        assert!(view.confirmed_at.is_some());
        // Confirmation does not re-accrue
        assert_eq!(fx.capped_now().await, 5);

        let err = fx
            .service
            .confirm_completion(outcome.completion.id, fx.parent_id, false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "COMPLETION_ALREADY_CONFIRMED");

        let err = fx
            .service
            .confirm_completion(999, fx.parent_id, true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PENDING_COMPLETION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_reject_reverses_ledger() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        let outcome = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");
        assert_eq!(fx.capped_now().await, 5);

        let view = fx
            .service
            .confirm_completion(outcome.completion.id, fx.parent_id, false)
            .await
            .expect("reject");
        assert_eq!(view.status, "REJECTED");
        assert_eq!(fx.capped_now().await, 0);

        let member = fx
            .members
            .find_by_id(fx.member_id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(member.weekly_points, 0);
    }

    #[tokio::test]
    async fn test_confirmation_requires_owning_parent() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        let outcome = fx
            .service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");

        let err = fx
            .service
            .confirm_completion(outcome.completion.id, 999, true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PARENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_batch_confirm_collects_failures() {
        let fx = setup_test().await;
        let first = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        let second = fx.chore("Vacuum", 3, ChoreFrequency::Daily).await;

        let a = fx
            .service
            .complete_chore(first, fx.member_id)
            .await
            .expect("complete");
        let b = fx
            .service
            .complete_chore(second, fx.member_id)
            .await
            .expect("complete");

        let mut events = fx.broadcaster.subscribe(Some(fx.parent_id));

        let summary = fx
            .service
            .batch_confirm(&[a.completion.id, b.completion.id, 999], fx.parent_id, true)
            .await
            .expect("batch");
        assert_eq!(summary.processed_count, 3);
        assert_eq!(summary.successful_count, 2);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.errors[0].completion_id, 999);
        assert_eq!(summary.errors[0].code, "PENDING_COMPLETION_NOT_FOUND");

        // Two per-item events, then the aggregate
        let mut names = Vec::new();
        for _ in 0..3 {
            names.push(events.recv().await.expect("event").event_name());
        }
        assert_eq!(
            names,
            vec!["chore_confirmed", "chore_confirmed", "batch_chore_confirmed"]
        );
    }

    #[tokio::test]
    async fn test_batch_with_no_successes_emits_no_aggregate() {
        let fx = setup_test().await;
        let mut events = fx.broadcaster.subscribe(Some(fx.parent_id));

        let summary = fx
            .service
            .batch_confirm(&[998, 999], fx.parent_id, true)
            .await
            .expect("batch");
        assert_eq!(summary.successful_count, 0);
        assert_eq!(summary.failed_count, 2);

        fx.broadcaster
            .publish(Some(fx.parent_id), &DashboardEvent::Ping { timestamp: Utc::now() });
        // The only event on the wire is the sentinel ping
        assert_eq!(events.recv().await.expect("event").event_name(), "ping");
    }

    #[tokio::test]
    async fn test_completed_event_reaches_parent_scope() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        let mut events = fx.broadcaster.subscribe(Some(fx.parent_id));

        fx.service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");

        match events.recv().await.expect("event") {
            DashboardEvent::ChoreCompleted {
                chore_name,
                member_name,
                points_earned,
                status,
                room_name,
                warning,
                ..
            } => {
                assert_eq!(chore_name, "Dishes");
                assert_eq!(member_name, "Alex");
                assert_eq!(points_earned, 5);
                assert_eq!(status, "PENDING");
                assert_eq!(room_name.as_deref(), Some("Kitchen"));
                assert!(warning.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_completions_never_jointly_overshoot() {
        let fx = setup_test().await;
        fx.seed_points(15).await;
        let first = fx.chore("Mow lawn", 20, ChoreFrequency::Weekly).await;
        let second = fx.chore("Clean garage", 20, ChoreFrequency::Weekly).await;

        let service_a = fx.service.clone();
        let service_b = fx.service.clone();
        let member_id = fx.member_id;
        let task_a = tokio::spawn(async move { service_a.complete_chore(first, member_id).await });
        let task_b = tokio::spawn(async move { service_b.complete_chore(second, member_id).await });

        let results = [task_a.await.expect("join"), task_b.await.expect("join")];
        let successes = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(successes, 1, "exactly one completion may pass the cap check");

        for result in &results {
            if let Err(err) = result {
                assert_eq!(err.code(), "WEEKLY_POINT_CAP_EXCEEDED");
            }
        }
        assert_eq!(fx.capped_now().await, 30);
    }

    #[tokio::test]
    async fn test_concurrent_new_week_completions_archive_once() {
        let fx = setup_test().await;
        let now = Utc::now();
        // Counter left over from last week: 25 points, reset marker a week old
        let stale_marker = week_start_date(now.date_naive()) - Duration::days(7);
        fx.members
            .set_weekly_counter(fx.member_id, 25, Some(stale_marker), now)
            .await
            .expect("stamp");

        let first = fx.chore("Mow lawn", 5, ChoreFrequency::Weekly).await;
        let second = fx.chore("Clean garage", 5, ChoreFrequency::Weekly).await;

        let service_a = fx.service.clone();
        let service_b = fx.service.clone();
        let member_id = fx.member_id;
        let task_a = tokio::spawn(async move { service_a.complete_chore(first, member_id).await });
        let task_b = tokio::spawn(async move { service_b.complete_chore(second, member_id).await });
        task_a.await.expect("join").expect("complete");
        task_b.await.expect("join").expect("complete");

        // The rollover archives last week's 25 points exactly once, no matter
        // which task wins the lock
        let archives = fx.weekly.list_archives(fx.member_id).await.expect("archives");
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].points_earned, 25);
        assert_eq!(archives[0].week_start, stale_marker);

        // Both accruals survive in the fresh week
        let member = fx
            .members
            .find_by_id(fx.member_id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(member.weekly_points, 10);
        assert_eq!(fx.capped_now().await, 10);
    }

    #[tokio::test]
    async fn test_weekly_status_and_pending_queue() {
        let fx = setup_test().await;
        let chore_id = fx.chore("Dishes", 5, ChoreFrequency::Daily).await;
        fx.service
            .complete_chore(chore_id, fx.member_id)
            .await
            .expect("complete");

        let status = fx.service.weekly_status(fx.member_id).await.expect("status");
        assert_eq!(status.current_points, 5);
        assert_eq!(status.remaining, 25);
        assert!(!status.at_cap);

        let queue = fx
            .service
            .pending_completions(fx.parent_id)
            .await
            .expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].chore_name, "Dishes");
        assert_eq!(queue[0].status, "PENDING");
    }
}
