//! Repositories for chores and their completion records.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::DbConnection;
use crate::domain::models::{Chore, ChoreCompletion, ChoreFrequency, CompletionStatus};

/// SQLite-backed chore repository
#[derive(Clone)]
pub struct ChoreRepository {
    connection: DbConnection,
}

impl ChoreRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<Chore> {
        Ok(Chore {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            points: row.try_get("points")?,
            frequency: ChoreFrequency::parse(row.try_get::<String, _>("frequency")?.as_str())?,
            is_active: row.try_get::<i64, _>("is_active")? != 0,
            room_id: row.try_get("room_id")?,
            parent_id: row.try_get("parent_id")?,
            last_completed_at: row.try_get("last_completed_at")?,
            next_available_at: row.try_get("next_available_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        points: i64,
        frequency: ChoreFrequency,
        room_id: i64,
        parent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Chore> {
        let result = sqlx::query(
            "INSERT INTO chores
                 (name, description, points, frequency, is_active, room_id, parent_id,
                  last_completed_at, next_available_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, NULL, NULL, ?7, ?7)",
        )
        .bind(name)
        .bind(description)
        .bind(points)
        .bind(frequency.as_str())
        .bind(room_id)
        .bind(parent_id)
        .bind(now)
        .execute(self.connection.pool())
        .await?;

        Ok(Chore {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            points,
            frequency,
            is_active: true,
            room_id,
            parent_id,
            last_completed_at: None,
            next_available_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, chore_id: i64) -> Result<Option<Chore>> {
        let row = sqlx::query("SELECT * FROM chores WHERE id = ?1")
            .bind(chore_id)
            .fetch_optional(self.connection.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    pub async fn list_active(&self) -> Result<Vec<Chore>> {
        let rows = sqlx::query("SELECT * FROM chores WHERE is_active = 1 ORDER BY room_id, name")
            .fetch_all(self.connection.pool())
            .await?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Stamps the frequency gate after a completion attempt is accepted.
    pub async fn mark_completed(
        &self,
        chore_id: i64,
        completed_at: DateTime<Utc>,
        next_available_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE chores
             SET last_completed_at = ?2, next_available_at = ?3, updated_at = ?2
             WHERE id = ?1",
        )
        .bind(chore_id)
        .bind(completed_at)
        .bind(next_available_at)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }

    pub async fn set_active(&self, chore_id: i64, is_active: bool, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE chores SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(chore_id)
            .bind(is_active)
            .bind(now)
            .execute(self.connection.pool())
            .await?;
        Ok(())
    }
}

/// A completion joined with the names the dashboard shows.
#[derive(Debug, Clone)]
pub struct CompletionWithNames {
    pub completion: ChoreCompletion,
    pub chore_name: String,
    pub member_name: String,
}

/// SQLite-backed completion repository
#[derive(Clone)]
pub struct CompletionRepository {
    connection: DbConnection,
}

impl CompletionRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<ChoreCompletion> {
        Ok(ChoreCompletion {
            id: row.try_get("id")?,
            chore_id: row.try_get("chore_id")?,
            member_id: row.try_get("member_id")?,
            parent_id: row.try_get("parent_id")?,
            status: CompletionStatus::parse(row.try_get::<String, _>("status")?.as_str())?,
            points_earned: row.try_get("points_earned")?,
            completed_at: row.try_get("completed_at")?,
            confirmed_at: row.try_get("confirmed_at")?,
            week_start: row.try_get("week_start")?,
        })
    }

    pub async fn insert_pending(
        &self,
        chore_id: i64,
        member_id: i64,
        points_earned: i64,
        completed_at: DateTime<Utc>,
        week_start: NaiveDate,
    ) -> Result<ChoreCompletion> {
        let result = sqlx::query(
            "INSERT INTO chore_completions
                 (chore_id, member_id, parent_id, status, points_earned,
                  completed_at, confirmed_at, week_start)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5, NULL, ?6)",
        )
        .bind(chore_id)
        .bind(member_id)
        .bind(CompletionStatus::Pending.as_str())
        .bind(points_earned)
        .bind(completed_at)
        .bind(week_start)
        .execute(self.connection.pool())
        .await?;

        Ok(ChoreCompletion {
            id: result.last_insert_rowid(),
            chore_id,
            member_id,
            parent_id: None,
            status: CompletionStatus::Pending,
            points_earned,
            completed_at,
            confirmed_at: None,
            week_start,
        })
    }

    pub async fn find_by_id(&self, completion_id: i64) -> Result<Option<ChoreCompletion>> {
        let row = sqlx::query("SELECT * FROM chore_completions WHERE id = ?1")
            .bind(completion_id)
            .fetch_optional(self.connection.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    /// Moves a completion out of PENDING, recording who resolved it and when.
    pub async fn resolve(
        &self,
        completion_id: i64,
        parent_id: i64,
        status: CompletionStatus,
        confirmed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE chore_completions
             SET parent_id = ?2, status = ?3, confirmed_at = ?4
             WHERE id = ?1",
        )
        .bind(completion_id)
        .bind(parent_id)
        .bind(status.as_str())
        .bind(confirmed_at)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }

    /// Pending completions awaiting a given parent, oldest first. The join
    /// scopes by chore ownership so each parent reviews their own chores.
    pub async fn list_pending_for_parent(&self, parent_id: i64) -> Result<Vec<CompletionWithNames>> {
        let rows = sqlx::query(
            "SELECT cc.*, c.name AS chore_name, m.name AS member_name
             FROM chore_completions cc
             JOIN chores c ON c.id = cc.chore_id
             JOIN household_members m ON m.id = cc.member_id
             WHERE cc.status = ?1 AND c.parent_id = ?2
             ORDER BY cc.completed_at",
        )
        .bind(CompletionStatus::Pending.as_str())
        .bind(parent_id)
        .fetch_all(self.connection.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CompletionWithNames {
                    completion: Self::map_row(row)?,
                    chore_name: row.try_get("chore_name")?,
                    member_name: row.try_get("member_name")?,
                })
            })
            .collect()
    }
}
