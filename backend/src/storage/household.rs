//! Repositories for parents, household members, and rooms.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::DbConnection;
use crate::domain::models::{HouseholdMember, Parent, Room};

/// SQLite-backed parent repository
#[derive(Clone)]
pub struct ParentRepository {
    connection: DbConnection,
}

impl ParentRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<Parent> {
        Ok(Parent {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            pin_hash: row.try_get("pin_hash")?,
            is_active: row.try_get::<i64, _>("is_active")? != 0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub async fn create(&self, name: &str, pin_hash: &str, now: DateTime<Utc>) -> Result<Parent> {
        let result = sqlx::query(
            "INSERT INTO parents (name, pin_hash, is_active, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)",
        )
        .bind(name)
        .bind(pin_hash)
        .bind(now)
        .execute(self.connection.pool())
        .await?;

        Ok(Parent {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            pin_hash: pin_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, parent_id: i64) -> Result<Option<Parent>> {
        let row = sqlx::query("SELECT * FROM parents WHERE id = ?1")
            .bind(parent_id)
            .fetch_optional(self.connection.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    /// Lookup is case-insensitive, matching the unique constraint.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Parent>> {
        let row = sqlx::query("SELECT * FROM parents WHERE name = ?1 COLLATE NOCASE")
            .bind(name)
            .fetch_optional(self.connection.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }
}

/// SQLite-backed household member repository
#[derive(Clone)]
pub struct MemberRepository {
    connection: DbConnection,
}

impl MemberRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<HouseholdMember> {
        Ok(HouseholdMember {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            date_of_birth: row.try_get("date_of_birth")?,
            is_parent: row.try_get::<i64, _>("is_parent")? != 0,
            is_active: row.try_get::<i64, _>("is_active")? != 0,
            parent_id: row.try_get("parent_id")?,
            weekly_points: row.try_get("weekly_points")?,
            last_weekly_reset: row.try_get("last_weekly_reset")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub async fn create(
        &self,
        name: &str,
        date_of_birth: NaiveDate,
        is_parent: bool,
        parent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<HouseholdMember> {
        let result = sqlx::query(
            "INSERT INTO household_members
                 (name, date_of_birth, is_parent, is_active, parent_id,
                  weekly_points, last_weekly_reset, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, 0, NULL, ?5, ?5)",
        )
        .bind(name)
        .bind(date_of_birth)
        .bind(is_parent)
        .bind(parent_id)
        .bind(now)
        .execute(self.connection.pool())
        .await?;

        Ok(HouseholdMember {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            date_of_birth,
            is_parent,
            is_active: true,
            parent_id,
            weekly_points: 0,
            last_weekly_reset: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, member_id: i64) -> Result<Option<HouseholdMember>> {
        let row = sqlx::query("SELECT * FROM household_members WHERE id = ?1")
            .bind(member_id)
            .fetch_optional(self.connection.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    pub async fn list_active(&self) -> Result<Vec<HouseholdMember>> {
        let rows = sqlx::query("SELECT * FROM household_members WHERE is_active = 1 ORDER BY name")
            .fetch_all(self.connection.pool())
            .await?;
        rows.iter().map(Self::map_row).collect()
    }

    /// Shifts the live weekly counter by `delta` in a single statement,
    /// flooring at zero, so concurrent accruals never overwrite each other.
    pub async fn adjust_weekly_counter(
        &self,
        member_id: i64,
        delta: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE household_members
             SET weekly_points = MAX(weekly_points + ?2, 0), updated_at = ?3
             WHERE id = ?1",
        )
        .bind(member_id)
        .bind(delta)
        .bind(now)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }

    /// Overwrites the live weekly counter and, when the weekly reset runs,
    /// the reset marker.
    pub async fn set_weekly_counter(
        &self,
        member_id: i64,
        weekly_points: i64,
        last_weekly_reset: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match last_weekly_reset {
            Some(reset) => {
                sqlx::query(
                    "UPDATE household_members
                     SET weekly_points = ?2, last_weekly_reset = ?3, updated_at = ?4
                     WHERE id = ?1",
                )
                .bind(member_id)
                .bind(weekly_points)
                .bind(reset)
                .bind(now)
                .execute(self.connection.pool())
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE household_members
                     SET weekly_points = ?2, updated_at = ?3
                     WHERE id = ?1",
                )
                .bind(member_id)
                .bind(weekly_points)
                .bind(now)
                .execute(self.connection.pool())
                .await?;
            }
        }
        Ok(())
    }
}

/// SQLite-backed room repository
#[derive(Clone)]
pub struct RoomRepository {
    connection: DbConnection,
}

impl RoomRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<Room> {
        Ok(Room {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            is_active: row.try_get::<i64, _>("is_active")? != 0,
            parent_id: row.try_get("parent_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Room> {
        let result = sqlx::query(
            "INSERT INTO rooms (name, description, is_active, parent_id, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?4)",
        )
        .bind(name)
        .bind(description)
        .bind(parent_id)
        .bind(now)
        .execute(self.connection.pool())
        .await?;

        Ok(Room {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            is_active: true,
            parent_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn find_by_id(&self, room_id: i64) -> Result<Option<Room>> {
        let row = sqlx::query("SELECT * FROM rooms WHERE id = ?1")
            .bind(room_id)
            .fetch_optional(self.connection.pool())
            .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    pub async fn list_active(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query("SELECT * FROM rooms WHERE is_active = 1 ORDER BY name")
            .fetch_all(self.connection.pool())
            .await?;
        rows.iter().map(Self::map_row).collect()
    }

    pub async fn set_active(&self, room_id: i64, is_active: bool, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE rooms SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(room_id)
            .bind(is_active)
            .bind(now)
            .execute(self.connection.pool())
            .await?;
        Ok(())
    }
}
