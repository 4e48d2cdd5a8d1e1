use crate::errors::{ErrorResponse, IntoErrorResponse};
use crate::persistence::LEADERBOARD_LIMIT;
use crate::server::AppContext;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

/// Top winners from match history; empty while persistence is disabled.
pub async fn leaderboard(context: AppContext) -> Result<Response, Infallible> {
    let repository = context.repository();
    let query = tokio::task::spawn_blocking(move || repository.leaderboard(LEADERBOARD_LIMIT));

    let response = match query.await {
        Ok(Ok(entries)) => warp::reply::json(&entries).into_response(),
        Ok(Err(err)) => err.into_http_response(),
        Err(err) => {
            tracing::error!(error = %err, "leaderboard query panicked");
            ErrorResponse::new("internal_error", "leaderboard unavailable")
                .into_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(response)
}
