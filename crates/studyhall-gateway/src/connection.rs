use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tracing::{info, trace, warn};

use studyhall_directory::{DirectoryStore, Relay};
use studyhall_types::api::Claims;
use studyhall_types::events::{GatewayCommand, GatewayEvent};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle a single WebSocket connection: Identify, Ready, then forward every
/// directory update until either side goes away.
pub async fn handle_connection(
    socket: WebSocket,
    directory: Arc<Mutex<DirectoryStore>>,
    relay: Relay,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(claims) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        return;
    };

    info!("{} ({}) connected to sync gateway", claims.username, claims.sub);

    // Subscribe before taking the snapshot so no update falls in between
    let updates = relay.subscribe();
    let groups = directory.lock().await.directory().clone();

    let ready = GatewayEvent::Ready {
        user_id: claims.sub.clone(),
        username: claims.username.clone(),
        groups,
    };
    let Some(frame) = text_frame(&ready) else {
        return;
    };
    if sender.send(frame).await.is_err() {
        return;
    }

    run_connection_loop(sender, receiver, updates).await;
    info!("{} ({}) disconnected from sync gateway", claims.username, claims.sub);
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut updates: broadcast::Receiver<studyhall_directory::SyncEnvelope>,
) {
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward relay updates -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = updates.recv() => {
                    let envelope = match result {
                        Ok(envelope) => envelope,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Every update is the full directory, the next one catches us up
                            warn!("Sync receiver lagged by {} updates", n);
                            continue;
                        }
                        Err(_) => break,
                    };

                    let Some(frame) = text_frame(&envelope.event) else {
                        continue;
                    };
                    if sender.send(frame).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Clients only talk to us through the REST routes; the socket is listen-only
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Text(text) => {
                    let preview: String = text.chars().take(200).collect();
                    trace!("Ignoring client frame: {}", preview);
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return verify_token(jwt_secret, &token);
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

fn verify_token(jwt_secret: &str, token: &str) -> Option<Claims> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

fn text_frame<T: Serialize>(event: &T) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode gateway frame: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use studyhall_types::events::SyncEvent;
    use studyhall_types::models::Directory;

    fn token(secret: &str) -> String {
        let claims = Claims {
            sub: "ana@example.com".into(),
            username: "ana".into(),
            exp: u32::MAX as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn verify_token_checks_secret() {
        let claims = verify_token("s3cret", &token("s3cret")).unwrap();
        assert_eq!(claims.sub, "ana@example.com");
        assert!(verify_token("other", &token("s3cret")).is_none());
    }

    #[test]
    fn update_frames_use_sync_event_shape() {
        let frame = text_frame(&SyncEvent::UpdateGroups(Directory::default())).unwrap();
        let Message::Text(text) = frame else {
            panic!("expected a text frame");
        };
        assert_eq!(text.as_str(), r#"{"type":"UPDATE_GROUPS","payload":[]}"#);
    }
}
