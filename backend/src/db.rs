use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;

/// DbConnection manages database access for the chore engine
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        // sqlite allows a single writer; one connection sidesteps
        // shared-cache lock errors under concurrent requests
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;

        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize a test database with a unique name
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name so tests don't share state
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS parents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                pin_hash TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS household_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                date_of_birth TEXT NOT NULL,
                is_parent INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                parent_id INTEGER NOT NULL REFERENCES parents(id),
                weekly_points INTEGER NOT NULL DEFAULT 0,
                last_weekly_reset TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS rooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                parent_id INTEGER NOT NULL REFERENCES parents(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                points INTEGER NOT NULL,
                frequency TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                room_id INTEGER NOT NULL REFERENCES rooms(id),
                parent_id INTEGER NOT NULL REFERENCES parents(id),
                last_completed_at TEXT,
                next_available_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chore_completions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chore_id INTEGER NOT NULL REFERENCES chores(id),
                member_id INTEGER NOT NULL REFERENCES household_members(id),
                parent_id INTEGER REFERENCES parents(id),
                status TEXT NOT NULL,
                points_earned INTEGER NOT NULL,
                completed_at TEXT NOT NULL,
                confirmed_at TEXT,
                week_start TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_completion_member_week
                ON chore_completions(member_id, week_start);
            CREATE INDEX IF NOT EXISTS idx_completion_status
                ON chore_completions(status);

            CREATE TABLE IF NOT EXISTS weekly_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL REFERENCES household_members(id),
                week_start TEXT NOT NULL,
                week_end TEXT NOT NULL,
                points_earned INTEGER NOT NULL DEFAULT 0,
                points_capped INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(member_id, week_start)
            );

            CREATE TABLE IF NOT EXISTS weekly_points_archive (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL REFERENCES household_members(id),
                week_start TEXT NOT NULL,
                week_end TEXT NOT NULL,
                points_earned INTEGER NOT NULL,
                archived_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS allowance_calculations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL REFERENCES household_members(id),
                month_year TEXT NOT NULL,
                total_points_earned INTEGER NOT NULL DEFAULT 0,
                total_points_possible INTEGER NOT NULL DEFAULT 0,
                completion_percentage REAL NOT NULL DEFAULT 0.0,
                allowance_amount REAL NOT NULL DEFAULT 0.0,
                age_category TEXT NOT NULL,
                calculated_at TEXT NOT NULL,
                UNIQUE(member_id, month_year)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
