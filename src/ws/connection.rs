//! WebSocket connection lifecycle management.

use std::fmt::Display;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::liveness::Liveness;
use crate::http::routes::AppState;
use crate::room::{Connection, ConnectionRouter};

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let mut conn = state.router.connect(tx);
    drive(stream, sink, rx, &state.router, &mut conn, state.heartbeat).await;
    state.router.disconnect(&conn);
}

/// Forwards queued payloads and pings to the peer until either channel closes.
async fn write_loop<S>(mut sink: S, mut outbox: mpsc::UnboundedReceiver<String>, mut pings: mpsc::UnboundedReceiver<()>)
where
    S: Sink<Message> + Unpin,
{
    loop {
        let msg = tokio::select! {
            Some(payload) = outbox.recv() => Message::Text(payload),
            Some(()) = pings.recv() => Message::Ping(Vec::new()),
            else => break,
        };
        if sink.send(msg).await.is_err() {
            break;
        }
    }
}

/// Runs one connection until the peer leaves, errors or stops answering pings.
///
/// Writes happen on their own task, so a peer that stops reading only stalls
/// that task; the read loop keeps ticking and evicts it once a ping goes
/// unanswered.
async fn drive<St, Si, E>(
    mut stream: St,
    sink: Si,
    outbox: mpsc::UnboundedReceiver<String>,
    router: &ConnectionRouter,
    conn: &mut Connection,
    heartbeat: Duration,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    Si: Sink<Message> + Unpin + Send + 'static,
    E: Display,
{
    let (ping_tx, ping_rx) = mpsc::unbounded_channel();
    let mut writer = tokio::spawn(write_loop(sink, outbox, ping_rx));

    let mut ticker = tokio::time::interval(heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    let mut liveness = Liveness::new(Instant::now());

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => router.on_message(conn, &text),
                Some(Ok(Message::Pong(_))) => liveness.ack(Instant::now()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(conn = %conn.id(), %err, "websocket error");
                    break;
                }
            },
            _ = ticker.tick() => {
                if liveness.is_stale() {
                    info!(conn = %conn.id(), "terminating unresponsive connection");
                    break;
                }
                liveness.pinged(Instant::now());
                if ping_tx.send(()).is_err() {
                    break;
                }
            }
            _ = &mut writer => {
                debug!(conn = %conn.id(), "writer closed");
                break;
            }
        }
    }

    writer.abort();
}
