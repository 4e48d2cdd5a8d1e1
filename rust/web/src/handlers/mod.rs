pub mod health;
pub mod leaderboard;
pub mod ws;

pub use health::health;
pub use leaderboard::leaderboard;
pub use ws::{serve, upgrade, JoinQuery};
