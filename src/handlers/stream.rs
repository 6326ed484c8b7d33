//! Live event stream (WebSocket)

use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use serde::Serialize;

use crate::AppState;
use crate::hub::Subscription;
use crate::models::{AnomalyEvent, EventNotice};

#[derive(Serialize)]
struct StreamMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: EventNotice<'a>,
}

pub(crate) fn encode_event(event: &AnomalyEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&StreamMessage {
        kind: "new_event",
        data: EventNotice::from(event),
    })
}

/// Upgrade and subscribe to events ingested from now on
pub async fn events(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let subscription = state.hub.register();
        let id = subscription.id();

        run_stream(socket, subscription).await;

        // No-op when the hub already dropped us
        state.hub.unregister(id);
    })
}

async fn run_stream(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    // Removed by the hub (lagging or shutdown)
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };

                let payload = match encode_event(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("Failed to encode event {}: {}", event.id, e);
                        continue;
                    }
                };

                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) if text == "ping" => {
                        if socket.send(Message::Text("pong".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Subscriber {} socket error: {}", subscription.id(), e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
