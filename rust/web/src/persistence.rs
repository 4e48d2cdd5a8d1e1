//! Match history storage.
//!
//! Finished games are written once through [`GameRepository::save`] as an
//! upsert keyed by game id. Storage is optional: without `DATABASE_URL` the
//! server runs with [`DisabledRepository`] and nothing is written.

use crate::errors::{ErrorSeverity, IntoErrorResponse};
use crate::telemetry::{EventType, Telemetry, TelemetryEvent};
use chrono::{DateTime, Utc};
use fourinrow_engine::game::{Game, GameId, Outcome};
use rusqlite::OptionalExtension;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use warp::http::StatusCode;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Rows returned by `GET /leaderboard`.
pub const LEADERBOARD_LIMIT: usize = 10;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("game {0} has not finished")]
    Unfinished(GameId),
    #[error("invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("database connection poisoned")]
    Poisoned,
}

impl IntoErrorResponse for PersistenceError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_code(&self) -> &'static str {
        match self {
            PersistenceError::Poisoned => "storage_poisoned",
            _ => "persistence_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            PersistenceError::Poisoned => ErrorSeverity::Critical,
            _ => ErrorSeverity::Server,
        }
    }
}

/// Row stored for one finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub game_id: GameId,
    pub player_one: String,
    pub player_two: String,
    /// `win`, `draw` or `forfeit`
    pub outcome: String,
    /// Display name of the credited participant
    pub winner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn from_game(game: &Game) -> Result<Self, PersistenceError> {
        let unfinished = || PersistenceError::Unfinished(game.id().to_string());
        let outcome = game.outcome().ok_or_else(unfinished)?;
        let finished_at = game.finished_at().ok_or_else(unfinished)?;
        let [one, two] = game.participants();

        let kind = match outcome {
            Outcome::Win { .. } => "win",
            Outcome::Draw => "draw",
            Outcome::Forfeit { .. } => "forfeit",
        };
        let winner = outcome
            .winner()
            .and_then(|id| game.participant(id))
            .map(|participant| participant.name().to_string());

        Ok(Self {
            game_id: game.id().to_string(),
            player_one: one.name().to_string(),
            player_two: two.name().to_string(),
            outcome: kind.to_string(),
            winner,
            created_at: game.created_at(),
            finished_at,
        })
    }
}

/// One leaderboard row: a display name and its outright wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_wins: u64,
}

pub trait GameRepository: Send + Sync + fmt::Debug {
    fn save(&self, record: &GameRecord) -> Result<(), PersistenceError>;

    /// Top `limit` winners by won games. Draws and forfeits do not count.
    fn leaderboard(&self, _limit: usize) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        Ok(Vec::new())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRepository;

impl GameRepository for DisabledRepository {
    fn save(&self, _record: &GameRecord) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct SqliteRepository {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::debug!(path = %parent.display(), error = %err, "cannot create database directory");
            }
        }
        Self::with_connection(rusqlite::Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(rusqlite::Connection::open_in_memory()?)
    }

    fn with_connection(conn: rusqlite::Connection) -> Result<Self, PersistenceError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                game_id TEXT NOT NULL PRIMARY KEY,
                player1 TEXT NOT NULL,
                player2 TEXT NOT NULL,
                outcome TEXT NOT NULL,
                winner TEXT,
                created_at TEXT NOT NULL,
                finished_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn load(&self, game_id: &str) -> Result<Option<GameRecord>, PersistenceError> {
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;
        let row = conn
            .query_row(
                "SELECT game_id, player1, player2, outcome, winner, created_at, finished_at
                 FROM games WHERE game_id = ?1",
                [game_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(game_id, player_one, player_two, outcome, winner, created_at, finished_at)|
             -> Result<GameRecord, PersistenceError> {
                Ok(GameRecord {
                    game_id,
                    player_one,
                    player_two,
                    outcome,
                    winner,
                    created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
                    finished_at: DateTime::parse_from_rfc3339(&finished_at)?.with_timezone(&Utc),
                })
            },
        )
        .transpose()
    }

    pub fn count(&self) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl GameRepository for SqliteRepository {
    fn save(&self, record: &GameRecord) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;
        conn.execute(
            "INSERT INTO games (game_id, player1, player2, outcome, winner, created_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (game_id) DO UPDATE SET
                player1 = excluded.player1,
                player2 = excluded.player2,
                outcome = excluded.outcome,
                winner = excluded.winner,
                finished_at = excluded.finished_at",
            rusqlite::params![
                &record.game_id,
                &record.player_one,
                &record.player_two,
                &record.outcome,
                &record.winner,
                record.created_at.to_rfc3339(),
                record.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        let conn = self.conn.lock().map_err(|_| PersistenceError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT winner, COUNT(*) AS wins FROM games
             WHERE outcome = 'win' AND winner IS NOT NULL
             GROUP BY winner
             ORDER BY wins DESC, winner ASC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map([limit], |row| {
                Ok(LeaderboardEntry {
                    username: row.get(0)?,
                    total_wins: u64::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

/// Builds the repository named by a `DATABASE_URL` value. Missing or blank
/// values, and stores that fail to open, disable persistence.
pub fn repository_from_url(url: Option<&str>) -> Arc<dyn GameRepository> {
    let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
        tracing::info!("DATABASE_URL not set; match history disabled");
        return Arc::new(DisabledRepository);
    };

    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    let opened = if path == ":memory:" {
        SqliteRepository::in_memory()
    } else {
        SqliteRepository::open(path)
    };

    match opened {
        Ok(repository) => {
            tracing::info!(path = %path, "match history enabled");
            Arc::new(repository)
        }
        Err(err) => {
            tracing::error!(path = %path, error = %err, "failed to open match history; continuing without it");
            Arc::new(DisabledRepository)
        }
    }
}

pub fn repository_from_env() -> Arc<dyn GameRepository> {
    repository_from_url(std::env::var(DATABASE_URL_ENV).ok().as_deref())
}

/// Game-over hook: telemetry plus a background save.
#[derive(Debug, Clone)]
pub struct MatchRecorder {
    repository: Arc<dyn GameRepository>,
    telemetry: Telemetry,
}

impl MatchRecorder {
    pub fn new(repository: Arc<dyn GameRepository>, telemetry: Telemetry) -> Self {
        Self {
            repository,
            telemetry,
        }
    }

    /// Records a finished game. The save runs on the blocking pool; the
    /// returned handle lets callers wait for it.
    pub fn game_over(&self, game: &Game) -> Option<JoinHandle<()>> {
        let detail = match game.outcome() {
            Some(Outcome::Win { participant }) => format!("win:{participant}"),
            Some(Outcome::Draw) => "draw".to_string(),
            Some(Outcome::Forfeit { forfeited, .. }) => format!("forfeit:{forfeited}"),
            None => "unfinished".to_string(),
        };
        tracing::info!(game_id = %game.id(), outcome = %detail, "game over");
        self.telemetry
            .emit(TelemetryEvent::new(EventType::GameFinished, game.id(), detail));

        if !self.repository.is_enabled() {
            return None;
        }

        let record = match GameRecord::from_game(game) {
            Ok(record) => record,
            Err(err) => {
                tracing::error!(game_id = %game.id(), error = %err, "cannot record game");
                return None;
            }
        };
        let repository = Arc::clone(&self.repository);
        Some(tokio::task::spawn_blocking(move || {
            if let Err(err) = repository.save(&record) {
                tracing::error!(game_id = %record.game_id, error = %err, "failed to save game");
            }
        }))
    }
}
