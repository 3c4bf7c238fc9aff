//! Database Infrastructure Layer
//!
//! Handles database connection, schema initialization, and provides
//! data access methods for branches, users and participants.
//!
//! The `times` table is deliberately denormalized: each row is a "slot
//! group" holding up to four (date, minutes) pairs for one participant,
//! plus the branch id the participant belonged to when the row was
//! created. The slot-scanning logic lives in [`crate::TimeStore`]; this
//! layer only loads and stores the rows.

use std::{ops::Deref, str::FromStr};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

#[derive(Debug)]
pub enum DatabaseError {
    Connection(sqlx::Error),
    Query(sqlx::Error),
    InvalidData(String),
    NotFound(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::Connection(err) => write!(f, "Database connection error: {}", err),
            DatabaseError::Query(err) => write!(f, "Database query error: {}", err),
            DatabaseError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatabaseError::Connection(err) | DatabaseError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Query(err)
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Database row for the branches table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BranchRow {
    pub id: i64,
    pub name: String,
}

/// Database row for the users table (password omitted from reads)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub branch_id: i64,
    pub username: String,
}

/// Database row for the participants table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParticipantRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// One slot group: up to four (date, minutes) pairs for one participant.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimesRow {
    id: i64,
    participant_id: i64,
    branch_id: i64,
    date_1: Option<String>,
    num_minutes_1: Option<i64>,
    date_2: Option<String>,
    num_minutes_2: Option<i64>,
    date_3: Option<String>,
    num_minutes_3: Option<i64>,
    date_4: Option<String>,
    num_minutes_4: Option<i64>,
}

/// A view of one slot within a group. An empty slot has neither date nor
/// minutes.
#[derive(Debug, Clone, Copy)]
pub struct Slot<'a> {
    pub date: Option<&'a str>,
    pub num_minutes: Option<i64>,
}

impl TimesRow {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn participant_id(&self) -> i64 {
        self.participant_id
    }

    pub fn branch_id(&self) -> i64 {
        self.branch_id
    }

    /// The group's slots in their fixed local order. Replaces the
    /// original schema's `date_${n}` / `num_minutes_${n}` column-name
    /// interpolation with a plain array scan.
    pub fn slots(&self) -> [Slot<'_>; 4] {
        [
            Slot {
                date: self.date_1.as_deref(),
                num_minutes: self.num_minutes_1,
            },
            Slot {
                date: self.date_2.as_deref(),
                num_minutes: self.num_minutes_2,
            },
            Slot {
                date: self.date_3.as_deref(),
                num_minutes: self.num_minutes_3,
            },
            Slot {
                date: self.date_4.as_deref(),
                num_minutes: self.num_minutes_4,
            },
        ]
    }
}

/// Number of (date, minutes) slots per times row.
pub const SLOTS_PER_GROUP: usize = 4;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Deref for Database {
    type Target = SqlitePool;
    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let database_config = SqliteConnectOptions::from_str(database_url)
            .map_err(DatabaseError::Connection)?
            .create_if_missing(true);

        let pool = SqlitePool::connect_lazy_with(database_config);

        let db = Self { pool };
        db.initialize_tables().await?;

        info!("Database initialized at {}", database_url);
        Ok(db)
    }

    /// In-memory database for tests. A shared-memory SQLite needs a single
    /// connection, otherwise every pool connection sees its own database.
    pub async fn in_memory() -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(DatabaseError::Connection)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DatabaseError::Connection)?;

        let db = Self { pool };
        db.initialize_tables().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS branches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                branch_id INTEGER NOT NULL,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                FOREIGN KEY (branch_id) REFERENCES branches(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL UNIQUE,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Denormalized slot groups: four (date, minutes) pairs per row.
        // Dates are TEXT in YYYY-MM-DD form, which compares correctly as
        // strings for range scans.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS times (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                participant_id INTEGER NOT NULL,
                branch_id INTEGER NOT NULL,
                date_1 TEXT,
                num_minutes_1 INTEGER,
                date_2 TEXT,
                num_minutes_2 INTEGER,
                date_3 TEXT,
                num_minutes_3 INTEGER,
                date_4 TEXT,
                num_minutes_4 INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_branch ON users(branch_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_participants_user ON participants(user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_times_participant ON times(participant_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_times_branch ON times(branch_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Load the standard branch list on first boot. Does nothing once any
    /// branch exists.
    pub async fn seed_default_branches(&self) -> Result<()> {
        const DEFAULT_BRANCHES: [&str; 6] = [
            "Northern",
            "Bay of Plenty",
            "Rotorua",
            "Waikato",
            "Wellington",
            "Nelson",
        ];

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM branches")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(());
        }

        for name in DEFAULT_BRANCHES {
            self.create_branch(name).await?;
        }

        info!("Seeded {} default branches", DEFAULT_BRANCHES.len());
        Ok(())
    }

    // ========== Branch Operations ==========

    pub async fn create_branch(&self, name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO branches (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// All branches, alphabetical.
    pub async fn branches(&self) -> Result<Vec<BranchRow>> {
        sqlx::query_as::<_, BranchRow>("SELECT id, name FROM branches ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    // ========== User Operations ==========

    /// Sign up a new user.
    ///
    /// Also creates the user's own participant sharing their display name,
    /// so they can start logging minutes immediately.
    pub async fn create_user(
        &self,
        name: &str,
        branch_id: i64,
        username: &str,
        password: &str,
    ) -> Result<i64> {
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        if taken > 0 {
            return Err(DatabaseError::InvalidData(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, branch_id, username, password)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(branch_id)
        .bind(username)
        .bind(password)
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        self.create_participant(user_id, name).await?;

        Ok(user_id)
    }

    pub async fn user(&self, id: i64) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, branch_id, username
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("User with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    /// The branch the given user belongs to.
    pub async fn user_branch(&self, user_id: i64) -> Result<BranchRow> {
        sqlx::query_as::<_, BranchRow>(
            r#"
            SELECT branches.id AS id, branches.name AS name
            FROM branches, users
            WHERE branches.id = users.branch_id AND users.id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("No branch for user id {}", user_id))
            }
            e => DatabaseError::Query(e),
        })
    }

    // ========== Participant Operations ==========

    pub async fn create_participant(&self, user_id: i64, name: &str) -> Result<i64> {
        if self.participant_name_taken(name, None).await? {
            return Err(DatabaseError::InvalidData(format!(
                "Participant name '{}' is already taken",
                name
            )));
        }

        let result = sqlx::query("INSERT INTO participants (user_id, name) VALUES (?, ?)")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn participant(&self, id: i64) -> Result<ParticipantRow> {
        sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT id, user_id, name
            FROM participants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound(format!("Participant with id {} not found", id))
            }
            e => DatabaseError::Query(e),
        })
    }

    /// Participants owned by the given user, alphabetical.
    pub async fn participants_for_user(&self, user_id: i64) -> Result<Vec<ParticipantRow>> {
        sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT id, user_id, name
            FROM participants
            WHERE user_id = ?
            ORDER BY name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    /// Participant names are unique across the whole challenge. When
    /// renaming, the participant's own current name does not count.
    pub async fn participant_name_taken(&self, name: &str, exclude: Option<i64>) -> Result<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM participants WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match (existing, exclude) {
            (Some(id), Some(excluded)) => id != excluded,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }

    pub async fn rename_participant(&self, id: i64, name: &str) -> Result<()> {
        if self.participant_name_taken(name, Some(id)).await? {
            return Err(DatabaseError::InvalidData(format!(
                "Participant name '{}' is already taken",
                name
            )));
        }

        let result = sqlx::query("UPDATE participants SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Participant with id {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Remove a participant record. Their logged time rows stay behind;
    /// slot groups are never deleted.
    pub async fn delete_participant(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM participants WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Resolve a participant's current branch through the owning user.
    ///
    /// Returns `None` unless the join produces exactly one row; callers
    /// treat that as a recoverable not-found.
    pub async fn participant_branch(&self, participant_id: i64) -> Result<Option<i64>> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT users.branch_id
            FROM users, participants
            WHERE participants.id = ? AND participants.user_id = users.id
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;

        match rows.as_slice() {
            [branch_id] => Ok(Some(*branch_id)),
            _ => Ok(None),
        }
    }

    // ========== Times Operations ==========

    /// All slot groups for a participant, oldest group first.
    pub async fn times_for_participant(&self, participant_id: i64) -> Result<Vec<TimesRow>> {
        sqlx::query_as::<_, TimesRow>(
            r#"
            SELECT id, participant_id, branch_id,
                   date_1, num_minutes_1,
                   date_2, num_minutes_2,
                   date_3, num_minutes_3,
                   date_4, num_minutes_4
            FROM times
            WHERE participant_id = ?
            ORDER BY id
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    /// Number of slot groups a participant owns. Used by tests to check
    /// that overwrites do not allocate new groups.
    pub async fn times_group_count(&self, participant_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM times WHERE participant_id = ?")
            .bind(participant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }
}
