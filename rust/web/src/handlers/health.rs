use crate::server::AppContext;
use serde::Serialize;
use warp::reply::Json;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub active_games: usize,
    pub waiting: bool,
    pub persistence: bool,
}

impl HealthStatus {
    pub fn collect(context: &AppContext) -> Self {
        Self {
            status: "ok",
            active_games: context.registry().active_games().len(),
            waiting: context.matchmaker().waiting_name().is_some(),
            persistence: context.repository().is_enabled(),
        }
    }
}

pub fn health(context: AppContext) -> Json {
    warp::reply::json(&HealthStatus::collect(&context))
}
