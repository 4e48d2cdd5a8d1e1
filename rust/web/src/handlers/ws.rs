use crate::connection::{Connection, ConnectionId};
use crate::errors::IntoErrorResponse;
use crate::protocol::ServerMessage;
use crate::server::AppContext;
use crate::session::{validate_username, Session};
use futures::stream::SplitSink;
use futures::{future, FutureExt, SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_stream::wrappers::UnboundedReceiverStream;
use warp::reply::{Reply, Response};
use warp::ws::{Message, WebSocket, Ws};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Deserialize)]
pub struct JoinQuery {
    pub username: Option<String>,
}

/// Upgrades the request once the username checks out; otherwise answers
/// with a JSON error and no upgrade.
pub fn upgrade(ws: Ws, query: JoinQuery, context: AppContext) -> Response {
    match validate_username(query.username.as_deref()) {
        Ok(name) => ws
            .on_upgrade(move |socket| serve(socket, name, context))
            .into_response(),
        Err(err) => err.into_http_response(),
    }
}

/// Drives one upgraded socket: a writer task forwards queued messages into
/// the sink while the session consumes text frames. Once the session ends the
/// writer flushes what is already queued and closes the socket.
pub async fn serve(socket: WebSocket, name: String, context: AppContext) {
    let (mut sink, stream) = socket.split();
    let (connection, receiver) = Connection::channel();
    let connection_id = connection.id();
    let (closing, mut closed) = oneshot::channel::<()>();

    let mut writer = tokio::spawn(async move {
        let mut outbound = UnboundedReceiverStream::new(receiver);
        loop {
            tokio::select! {
                biased;
                message = outbound.next() => match message {
                    Some(message) => {
                        if !deliver(&mut sink, connection_id, message).await {
                            break;
                        }
                    }
                    None => break,
                },
                _ = &mut closed => {
                    while let Some(Some(message)) = outbound.next().now_or_never() {
                        if !deliver(&mut sink, connection_id, message).await {
                            break;
                        }
                    }
                    break;
                }
            }
        }
        let _ = sink.close().await;
    });

    let inbound = stream
        .take_while(|frame| future::ready(!matches!(frame, Ok(message) if message.is_close())))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(message) => message.to_str().ok().map(|text| Ok(text.to_owned())),
                Err(err) => Some(Err(err)),
            })
        });

    Session::new(name, connection, context)
        .run(Box::pin(inbound))
        .await;

    let _ = closing.send(());
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut writer).await.is_err() {
        tracing::debug!(connection_id, "socket flush timed out");
        writer.abort();
    }
}

/// Encodes and sends one message; false once the socket is gone.
async fn deliver(
    sink: &mut SplitSink<WebSocket, Message>,
    connection_id: ConnectionId,
    message: ServerMessage,
) -> bool {
    let text = match serde_json::to_string(&message) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(connection_id, error = %err, "failed to encode message");
            return true;
        }
    };
    sink.send(Message::text(text)).await.is_ok()
}
