//! Per-room actor
//!
//! Each room runs as one tokio task draining a command mailbox, so every
//! inbound frame is fully validated, applied, and fanned out before the
//! next one is touched. Rooms never share state; sessions talk to a room
//! only through its `RoomHandle`. Timer callbacks (freeze expiry) re-enter
//! through the same mailbox to keep the single-writer discipline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::Message;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use ring::constant_time;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::game::constants::{auth, mechanics, rooms};
use crate::game::map::TileMap;
use crate::game::player::Direction;
use crate::net::codec::Frame;
use crate::room::state::{JoinRejection, Outbound, Room};

/// Commands accepted by a room's mailbox
pub enum RoomCmd {
    Join {
        name: String,
        tx: mpsc::UnboundedSender<Message>,
        reply: oneshot::Sender<Result<u8, JoinRejection>>,
    },
    Move {
        player_id: u8,
        claimed: (u8, u8),
        direction: Direction,
        face_only: bool,
    },
    Chat {
        player_id: u8,
        text: String,
    },
    Unfreeze {
        player_id: u8,
    },
    Leave {
        player_id: u8,
    },
}

/// Why a join through the handle did not produce a player
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error(transparent)]
    Rejected(#[from] JoinRejection),
    /// The room task already shut down
    #[error("room is gone")]
    Closed,
}

/// Shared entry point to one room task
pub struct RoomHandle {
    id: String,
    name: String,
    password: Option<Vec<u8>>,
    occupancy: AtomicUsize,
    tx: mpsc::Sender<RoomCmd>,
}

impl RoomHandle {
    /// Spawn the room task and return its handle. `reaper` receives the
    /// room id once the last player leaves a non-default room.
    pub fn spawn(
        id: String,
        name: String,
        password: Option<Vec<u8>>,
        map: Arc<TileMap>,
        reaper: mpsc::UnboundedSender<String>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(rooms::MAILBOX_CAPACITY);
        let handle = Arc::new(Self {
            id: id.clone(),
            name: name.clone(),
            password,
            occupancy: AtomicUsize::new(0),
            tx,
        });

        let room = Room::new(id, name, map, SmallRng::from_entropy());
        let task_handle = Arc::clone(&handle);
        tokio::spawn(async move {
            RoomTask {
                handle: task_handle,
                room,
                conns: HashMap::new(),
                rx,
                reaper,
            }
            .run()
            .await;
        });

        handle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn occupant_count(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    /// Check a supplied password against the room secret. Rooms without a
    /// secret accept anything.
    pub fn verify_password(&self, supplied: &str) -> bool {
        match &self.password {
            None => true,
            Some(secret) => passwords_match(supplied, secret),
        }
    }

    /// Register a player, waiting for the room task's verdict
    pub async fn join(
        &self,
        name: String,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Result<u8, JoinError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RoomCmd::Join {
                name,
                tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| JoinError::Closed)?;
        match reply_rx.await {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(rejection)) => Err(JoinError::Rejected(rejection)),
            Err(_) => Err(JoinError::Closed),
        }
    }

    /// Queue a command; `false` means the room task is gone
    pub async fn send(&self, cmd: RoomCmd) -> bool {
        self.tx.send(cmd).await.is_ok()
    }
}

/// Length-gated constant-time password comparison. On a length mismatch
/// the supplied bytes are compared against themselves so the observable
/// timing does not depend on the secret.
pub fn passwords_match(supplied: &str, secret: &[u8]) -> bool {
    if supplied.len() > auth::MAX_PASSWORD_LEN {
        return false;
    }
    let supplied = supplied.as_bytes();
    let lengths_differ = supplied.len() != secret.len();
    let probe: &[u8] = if lengths_differ { supplied } else { secret };
    let matched = constant_time::verify_slices_are_equal(supplied, probe).is_ok();
    matched && !lengths_differ
}

struct RoomTask {
    handle: Arc<RoomHandle>,
    room: Room,
    conns: HashMap<u8, mpsc::UnboundedSender<Message>>,
    rx: mpsc::Receiver<RoomCmd>,
    reaper: mpsc::UnboundedSender<String>,
}

impl RoomTask {
    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                RoomCmd::Join { name, tx, reply } => match self.room.join(&name) {
                    Ok((id, out)) => {
                        self.conns.insert(id, tx);
                        self.sync_occupancy();
                        info!(room = %self.room.id(), player = id, name = %name, "player joined");
                        self.deliver(out);
                        let _ = reply.send(Ok(id));
                    }
                    Err(rejection) => {
                        let _ = reply.send(Err(rejection));
                    }
                },
                RoomCmd::Move {
                    player_id,
                    claimed,
                    direction,
                    face_only,
                } => {
                    let fx =
                        self.room
                            .handle_move(player_id, claimed, direction, face_only, Instant::now());
                    self.deliver(fx.outbound);
                    if let Some(frozen_id) = fx.freeze {
                        // room-global timer: must outlive the tagger's
                        // connection, so it re-enters through the mailbox
                        let tx = self.handle.tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(mechanics::FREEZE_DURATION).await;
                            let _ = tx.send(RoomCmd::Unfreeze { player_id: frozen_id }).await;
                        });
                    }
                }
                RoomCmd::Chat { player_id, text } => {
                    let out = self.room.handle_chat(player_id, &text);
                    self.deliver(out);
                }
                RoomCmd::Unfreeze { player_id } => self.room.unfreeze(player_id),
                RoomCmd::Leave { player_id } => {
                    self.conns.remove(&player_id);
                    let out = self.room.remove_player(player_id);
                    self.sync_occupancy();
                    info!(room = %self.room.id(), player = player_id, "player left");
                    self.deliver(out);
                    if self.room.is_empty() && self.room.id() != rooms::DEFAULT_ROOM_ID {
                        debug!(room = %self.room.id(), "empty room shutting down");
                        let _ = self.reaper.send(self.room.id().to_string());
                        break;
                    }
                }
            }
        }
    }

    fn sync_occupancy(&self) {
        self.handle
            .occupancy
            .store(self.room.occupant_count(), Ordering::Relaxed);
    }

    /// Fan out scoped deliveries. A dead receiver is skipped; one slow or
    /// closed socket never affects the others.
    fn deliver(&self, out: Vec<Outbound>) {
        for item in out {
            match item {
                Outbound::Broadcast(frame) => {
                    if let Frame::Text(line) = &frame {
                        info!(room = %self.room.id(), "{line}");
                    }
                    for tx in self.conns.values() {
                        let _ = tx.send(to_message(frame.clone()));
                    }
                }
                Outbound::Zone(zone, frame) => {
                    if let Frame::Text(line) = &frame {
                        info!(room = %self.room.id(), "{line}");
                    }
                    for id in self.room.zone_members(zone) {
                        if let Some(tx) = self.conns.get(&id) {
                            let _ = tx.send(to_message(frame.clone()));
                        }
                    }
                }
                Outbound::To(id, frame) => {
                    if let Some(tx) = self.conns.get(&id) {
                        let _ = tx.send(to_message(frame));
                    }
                }
            }
        }
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}
