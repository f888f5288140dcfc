//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ClientId, ClientSink, RuntimeEvent, RuntimeHandle, SinkError};
use crate::util::rate_limit::ClientRateLimiter;
use crate::ws::protocol::parse_client_msg;

/// Frames buffered per socket before the runtime treats it as stalled
const OUTBOUND_CAPACITY: usize = 256;

/// WebSocket upgrade handler.
///
/// Identity and admission are settled upstream; every upgraded socket gets a
/// fresh client id.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let client_id = Uuid::new_v4();
    let rate_limit = state.config.input_rate_limit;
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state.runtime, rate_limit))
}

/// Outbound half handed to the runtime; frames go through a bounded queue
/// drained by the socket's writer task.
pub struct WsSink {
    tx: mpsc::Sender<Message>,
}

impl ClientSink for WsSink {
    fn send(&self, frame: String) -> Result<(), SinkError> {
        self.tx.try_send(Message::Text(frame)).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Backpressure,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn close(&self, code: u16) {
        let _ = self.tx.try_send(Message::Close(Some(CloseFrame {
            code,
            reason: "".into(),
        })));
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    client_id: ClientId,
    runtime: RuntimeHandle,
    rate_limit: u32,
) {
    info!(client_id = %client_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);

    let registered = runtime
        .send(RuntimeEvent::Connected {
            client_id,
            sink: Box::new(WsSink { tx: out_tx }),
        })
        .await;
    if !registered {
        error!(client_id = %client_id, "Runtime unavailable, closing connection");
        return;
    }

    // Writer task: runtime frames -> WebSocket
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = ws_sink.send(msg).await {
                debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Reader runs until the client leaves or the runtime drops our sink
    tokio::select! {
        _ = read_loop(client_id, ws_stream, &runtime, ClientRateLimiter::new(rate_limit)) => {}
        _ = &mut writer => {
            debug!(client_id = %client_id, "Writer finished");
        }
    }
    writer.abort();

    // Signal disconnect to the runtime
    let _ = runtime.send(RuntimeEvent::Disconnected { client_id }).await;

    info!(client_id = %client_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> runtime
async fn read_loop(
    client_id: ClientId,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    runtime: &RuntimeHandle,
    rate_limiter: ClientRateLimiter,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(client_id = %client_id, "Rate limited input message");
                    continue;
                }

                match parse_client_msg(&text) {
                    Ok(msg) => {
                        if !runtime.send(RuntimeEvent::Message { client_id, msg }).await {
                            debug!(client_id = %client_id, "Runtime channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(client_id = %client_id, error = %e, "Dropped client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(client_id = %client_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(client_id = %client_id, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}
