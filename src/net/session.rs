//! Connection sessions
//!
//! One session per socket: validate the join request before anything is
//! allocated, bind the socket to a player in a room, then pump frames.
//! The session owns the send queue (a writer task) and the per-connection
//! chat spam counter; everything authoritative happens in the room actor.
//!
//! Two error tiers apply to inbound traffic. Malformed frames are fatal
//! and close the connection with a specific code; semantic disagreements
//! (stale claimed position, frozen player) are answered by the room with
//! a resync line and the connection lives on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitStream, StreamExt};
use futures_util::SinkExt;
use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::game::constants::{auth, chat};
use crate::net::close;
use crate::net::codec::MoveRequest;
use crate::net::heartbeat::HeartbeatRegistry;
use crate::room::actor::{JoinError, RoomCmd, RoomHandle};
use crate::room::registry::{RegistryError, RoomRegistry};
use crate::room::state::JoinRejection;

pub type SharedRegistry = Arc<RwLock<RoomRegistry>>;

/// Query parameters carried by the join request. A missing `roomid`
/// makes the request a create-room request, which needs `roomname`.
#[derive(Debug, Default, Deserialize)]
pub struct JoinParams {
    pub name: Option<String>,
    pub roomid: Option<String>,
    pub pass: Option<String>,
    pub roomname: Option<String>,
}

/// Display-name rule shared by players and rooms: 1..=max_len word
/// characters (ASCII letters, digits, underscore)
pub fn valid_name(name: &str, max_len: usize) -> bool {
    !name.is_empty()
        && name.len() <= max_len
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decaying per-connection chat counter: every message charges a point,
/// one point drains per decay tick, and crossing the limit is fatal.
/// Tolerates bursts without letting a client flood a zone.
#[derive(Debug, Default)]
pub struct SpamCounter {
    score: u32,
}

impl SpamCounter {
    /// Charge one message; `false` means the connection must close
    pub fn charge(&mut self) -> bool {
        self.score += 1;
        self.score <= chat::SPAM_LIMIT
    }

    pub fn decay(&mut self) {
        self.score = self.score.saturating_sub(1);
    }
}

/// Drive one accepted WebSocket for its whole life
pub async fn handle_socket(
    socket: WebSocket,
    params: Option<JoinParams>,
    registry: SharedRegistry,
    heartbeat: Arc<HeartbeatRegistry>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // writer task: the only owner of the sink; a close frame ends it
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let (room, player_id) = match resolve_join(params, &registry, &tx).await {
        Ok(joined) => joined,
        Err((code, reason)) => {
            warn!(code, %reason, "join rejected");
            send_close(&tx, code, reason);
            let _ = writer.await;
            return;
        }
    };

    let (probe_id, alive) = heartbeat.register(tx.clone());
    read_loop(&mut stream, &tx, &room, player_id, &alive).await;

    // teardown: stop probing, detach from the room, drain the writer.
    // the spam decay timer died with the read loop.
    heartbeat.deregister(probe_id);
    let _ = room.send(RoomCmd::Leave { player_id }).await;
    drop(tx);
    let _ = writer.await;
}

/// Validate the join request and register a player. Nothing is allocated
/// until every parameter check has passed.
async fn resolve_join(
    params: Option<JoinParams>,
    registry: &SharedRegistry,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(Arc<RoomHandle>, u8), (u16, String)> {
    let Some(params) = params else {
        return Err((close::MALFORMED_REQUEST, "Malformed request".to_string()));
    };
    let Some(name) = params.name.as_deref() else {
        return Err((close::MALFORMED_REQUEST, "Missing name".to_string()));
    };
    if !valid_name(name, auth::MAX_NAME_LEN) {
        return Err((close::INVALID_NAME, "invalid name".to_string()));
    }
    let pass = params.pass.as_deref().unwrap_or("");

    let room = match params.roomid.as_deref() {
        None => {
            let room_name = params.roomname.as_deref().unwrap_or("");
            if !valid_name(room_name, auth::MAX_ROOM_NAME_LEN) {
                return Err((close::MALFORMED_REQUEST, "Missing room name".to_string()));
            }
            if pass.len() > auth::MAX_PASSWORD_LEN {
                return Err((close::MALFORMED_REQUEST, "Password is too long".to_string()));
            }
            registry
                .write()
                .await
                .create_room(room_name, pass)
                .map_err(|err| match err {
                    RegistryError::AtCapacity => (close::SERVER_AT_CAPACITY, err.to_string()),
                    RegistryError::IdCollision => (close::MALFORMED_REQUEST, err.to_string()),
                })?
        }
        Some(roomid) => {
            let Some(room) = registry.read().await.get(roomid) else {
                return Err((
                    close::ROOM_NOT_FOUND,
                    "Room not found; try a different room!".to_string(),
                ));
            };
            if !room.verify_password(pass) {
                return Err((close::WRONG_PASSWORD, "Wrong password".to_string()));
            }
            room
        }
    };

    match room.join(name.to_string(), tx.clone()).await {
        Ok(player_id) => Ok((room, player_id)),
        Err(JoinError::Rejected(rejection)) => {
            let code = match rejection {
                JoinRejection::NameTaken => close::NAME_TAKEN,
                JoinRejection::RoomFull => close::ROOM_FULL,
            };
            Err((code, rejection.to_string()))
        }
        // the room emptied and shut down between lookup and join
        Err(JoinError::Closed) => Err((
            close::ROOM_NOT_FOUND,
            "Room not found; try a different room!".to_string(),
        )),
    }
}

async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    tx: &mpsc::UnboundedSender<Message>,
    room: &RoomHandle,
    player_id: u8,
    alive: &AtomicBool,
) {
    let mut spam = SpamCounter::default();
    let mut decay = tokio::time::interval(chat::SPAM_DECAY);
    decay.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = decay.tick() => {
                spam.decay();
            }
            frame = stream.next() => {
                let Some(Ok(msg)) = frame else { break };
                alive.store(true, Ordering::Relaxed);
                match msg {
                    Message::Binary(data) => match MoveRequest::parse(&data) {
                        Ok(req) => {
                            let sent = room
                                .send(RoomCmd::Move {
                                    player_id,
                                    claimed: (req.claimed_x, req.claimed_y),
                                    direction: req.direction,
                                    face_only: req.face_only,
                                })
                                .await;
                            if !sent {
                                break;
                            }
                        }
                        Err(err) => {
                            debug!(player = player_id, %err, "closing on protocol violation");
                            send_close(tx, close::PROTOCOL_VIOLATION, err.to_string());
                            break;
                        }
                    },
                    Message::Text(text) => {
                        if text.len() > chat::MAX_LEN {
                            continue;
                        }
                        if !spam.charge() {
                            send_close(
                                tx,
                                close::TOO_MANY_MESSAGES,
                                "Too many messages!".to_string(),
                            );
                            break;
                        }
                        if !room.send(RoomCmd::Chat { player_id, text }).await {
                            break;
                        }
                    }
                    Message::Ping(_) | Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }
}

fn send_close(tx: &mpsc::UnboundedSender<Message>, code: u16, reason: String) {
    let _ = tx.send(Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    })));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_name_rules() {
        assert!(valid_name("Tom", auth::MAX_NAME_LEN));
        assert!(valid_name("cat_42", auth::MAX_NAME_LEN));
        assert!(valid_name("a", auth::MAX_NAME_LEN));
        assert!(valid_name("abcdefghij", auth::MAX_NAME_LEN));

        assert!(!valid_name("", auth::MAX_NAME_LEN));
        assert!(!valid_name("abcdefghijk", auth::MAX_NAME_LEN));
        assert!(!valid_name("two words", auth::MAX_NAME_LEN));
        assert!(!valid_name("h4x<script>", auth::MAX_NAME_LEN));
        assert!(!valid_name("naïve", auth::MAX_NAME_LEN));
    }

    #[test]
    fn test_room_names_get_the_longer_bound() {
        let twenty = "a".repeat(20);
        assert!(valid_name(&twenty, auth::MAX_ROOM_NAME_LEN));
        assert!(!valid_name(&twenty, auth::MAX_NAME_LEN));
        assert!(!valid_name(&format!("{twenty}a"), auth::MAX_ROOM_NAME_LEN));
    }

    #[test]
    fn test_spam_counter_tolerates_burst_at_limit() {
        let mut counter = SpamCounter::default();
        for _ in 0..chat::SPAM_LIMIT {
            assert!(counter.charge());
        }
        assert!(!counter.charge());
    }

    #[test]
    fn test_spam_counter_decay_extends_budget() {
        let mut counter = SpamCounter::default();
        for _ in 0..chat::SPAM_LIMIT {
            assert!(counter.charge());
        }
        counter.decay();
        counter.decay();
        assert!(counter.charge());
        assert!(counter.charge());
        assert!(!counter.charge());
    }
}
