//! Repositories for weekly point rows, their archive, and cached allowance
//! calculations.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::db::DbConnection;
use crate::domain::models::{AgeCategory, AllowanceCalculation, WeeklyPoints, WeeklyPointsArchive};

/// SQLite-backed weekly points repository
#[derive(Clone)]
pub struct WeeklyPointsRepository {
    connection: DbConnection,
}

impl WeeklyPointsRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<WeeklyPoints> {
        Ok(WeeklyPoints {
            id: row.try_get("id")?,
            member_id: row.try_get("member_id")?,
            week_start: row.try_get("week_start")?,
            week_end: row.try_get("week_end")?,
            points_earned: row.try_get("points_earned")?,
            points_capped: row.try_get("points_capped")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub async fn get_for_week(
        &self,
        member_id: i64,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyPoints>> {
        let row = sqlx::query(
            "SELECT * FROM weekly_points WHERE member_id = ?1 AND week_start = ?2",
        )
        .bind(member_id)
        .bind(week_start)
        .fetch_optional(self.connection.pool())
        .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    pub async fn insert(
        &self,
        member_id: i64,
        week_start: NaiveDate,
        week_end: NaiveDate,
        points_earned: i64,
        points_capped: i64,
        now: DateTime<Utc>,
    ) -> Result<WeeklyPoints> {
        let result = sqlx::query(
            "INSERT INTO weekly_points
                 (member_id, week_start, week_end, points_earned, points_capped,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        )
        .bind(member_id)
        .bind(week_start)
        .bind(week_end)
        .bind(points_earned)
        .bind(points_capped)
        .bind(now)
        .execute(self.connection.pool())
        .await?;

        Ok(WeeklyPoints {
            id: result.last_insert_rowid(),
            member_id,
            week_start,
            week_end,
            points_earned,
            points_capped,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn update_points(
        &self,
        id: i64,
        points_earned: i64,
        points_capped: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE weekly_points
             SET points_earned = ?2, points_capped = ?3, updated_at = ?4
             WHERE id = ?1",
        )
        .bind(id)
        .bind(points_earned)
        .bind(points_capped)
        .bind(now)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }

    /// Weekly rows whose week starts inside `[from, to]`, oldest first.
    pub async fn list_for_range(
        &self,
        member_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeeklyPoints>> {
        let rows = sqlx::query(
            "SELECT * FROM weekly_points
             WHERE member_id = ?1 AND week_start >= ?2 AND week_start <= ?3
             ORDER BY week_start",
        )
        .bind(member_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.connection.pool())
        .await?;
        rows.iter().map(Self::map_row).collect()
    }

    pub async fn archive_week(
        &self,
        member_id: i64,
        week_start: NaiveDate,
        week_end: NaiveDate,
        points_earned: i64,
        archived_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO weekly_points_archive
                 (member_id, week_start, week_end, points_earned, archived_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(member_id)
        .bind(week_start)
        .bind(week_end)
        .bind(points_earned)
        .bind(archived_at)
        .execute(self.connection.pool())
        .await?;
        Ok(())
    }

    pub async fn list_archives(&self, member_id: i64) -> Result<Vec<WeeklyPointsArchive>> {
        let rows = sqlx::query(
            "SELECT * FROM weekly_points_archive WHERE member_id = ?1 ORDER BY week_start",
        )
        .bind(member_id)
        .fetch_all(self.connection.pool())
        .await?;
        rows.iter()
            .map(|row| {
                Ok(WeeklyPointsArchive {
                    id: row.try_get("id")?,
                    member_id: row.try_get("member_id")?,
                    week_start: row.try_get("week_start")?,
                    week_end: row.try_get("week_end")?,
                    points_earned: row.try_get("points_earned")?,
                    archived_at: row.try_get("archived_at")?,
                })
            })
            .collect()
    }
}

/// SQLite-backed allowance calculation cache
#[derive(Clone)]
pub struct AllowanceRepository {
    connection: DbConnection,
}

impl AllowanceRepository {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }

    fn map_row(row: &SqliteRow) -> Result<AllowanceCalculation> {
        Ok(AllowanceCalculation {
            id: row.try_get("id")?,
            member_id: row.try_get("member_id")?,
            month_year: row.try_get("month_year")?,
            total_points_earned: row.try_get("total_points_earned")?,
            total_points_possible: row.try_get("total_points_possible")?,
            completion_percentage: row.try_get("completion_percentage")?,
            allowance_amount: row.try_get("allowance_amount")?,
            age_category: AgeCategory::parse(row.try_get::<String, _>("age_category")?.as_str())?,
            calculated_at: row.try_get("calculated_at")?,
        })
    }

    pub async fn get_for_month(
        &self,
        member_id: i64,
        month_year: &str,
    ) -> Result<Option<AllowanceCalculation>> {
        let row = sqlx::query(
            "SELECT * FROM allowance_calculations WHERE member_id = ?1 AND month_year = ?2",
        )
        .bind(member_id)
        .bind(month_year)
        .fetch_optional(self.connection.pool())
        .await?;
        row.as_ref().map(Self::map_row).transpose()
    }

    /// Recalculating a month replaces the cached row in place.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        member_id: i64,
        month_year: &str,
        total_points_earned: i64,
        total_points_possible: i64,
        completion_percentage: f64,
        allowance_amount: f64,
        age_category: AgeCategory,
        calculated_at: DateTime<Utc>,
    ) -> Result<AllowanceCalculation> {
        sqlx::query(
            "INSERT INTO allowance_calculations
                 (member_id, month_year, total_points_earned, total_points_possible,
                  completion_percentage, allowance_amount, age_category, calculated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(member_id, month_year) DO UPDATE SET
                 total_points_earned = excluded.total_points_earned,
                 total_points_possible = excluded.total_points_possible,
                 completion_percentage = excluded.completion_percentage,
                 allowance_amount = excluded.allowance_amount,
                 age_category = excluded.age_category,
                 calculated_at = excluded.calculated_at",
        )
        .bind(member_id)
        .bind(month_year)
        .bind(total_points_earned)
        .bind(total_points_possible)
        .bind(completion_percentage)
        .bind(allowance_amount)
        .bind(age_category.as_str())
        .bind(calculated_at)
        .execute(self.connection.pool())
        .await?;

        let row = sqlx::query(
            "SELECT * FROM allowance_calculations WHERE member_id = ?1 AND month_year = ?2",
        )
        .bind(member_id)
        .bind(month_year)
        .fetch_one(self.connection.pool())
        .await?;
        Self::map_row(&row)
    }
}
