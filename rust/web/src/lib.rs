//! # fourinrow_web: Four-in-a-row Game Server
//!
//! Hosts games of [`fourinrow_engine`] over WebSocket: matchmaking with an
//! automated-opponent fallback, move orchestration, disconnect grace periods,
//! match history and telemetry.
//!
//! ## Endpoints
//!
//! - `GET /ws?username=<name>` - WebSocket game connection
//! - `GET /health` - Liveness and load summary
//! - `GET /leaderboard` - Top winners from match history

pub mod broadcast;
pub mod connection;
pub mod disconnect;
pub mod errors;
pub mod game;
pub mod handlers;
pub mod logging;
pub mod matchmaker;
pub mod orchestrator;
pub mod persistence;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod timer;

pub use connection::{Connection, ConnectionId};
pub use disconnect::DisconnectController;
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use game::{GameHandle, GameSlot};
pub use logging::{init_logging, LogCapture, LogFormat};
pub use matchmaker::{JoinOutcome, Matchmaker, BOT_NAME};
pub use orchestrator::{MoveOrchestrator, TurnResult};
pub use persistence::{
    DisabledRepository, GameRecord, GameRepository, LeaderboardEntry, MatchRecorder,
    PersistenceError, SqliteRepository, LEADERBOARD_LIMIT,
};
pub use protocol::{ClientMessage, ServerMessage, StartPayload};
pub use registry::GameRegistry;
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{Session, SessionError};
pub use settings::{GameSettings, ResolvedSettings, SettingsError, ValueSource};
pub use telemetry::{EventType, Telemetry, TelemetryEvent};
