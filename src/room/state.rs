//! Room state machine
//!
//! A room owns everything one game session shares: the player set, the
//! name/score/holder/frozen tables, and the mouse cell. Methods here are
//! synchronous and never touch a socket; every mutation returns the scoped
//! deliveries it produced, and the actor layer fans them out. That keeps
//! the whole mechanics engine testable without a runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::Rng;

use crate::game::constants::{mechanics, rooms, spawn};
use crate::game::ids::IdentityPool;
use crate::game::map::{self, TileMap, Zone};
use crate::game::player::{Direction, Player};
use crate::net::codec::{self, Frame};

/// Scoped outbound traffic produced by one mutation step
#[derive(Debug)]
pub enum Outbound {
    /// Every connection in the room
    Broadcast(Frame),
    /// Connections whose player currently stands in the zone
    Zone(Zone, Frame),
    /// A single connection
    To(u8, Frame),
}

/// Everything one movement frame produced
#[derive(Debug, Default)]
pub struct FrameEffects {
    pub outbound: Vec<Outbound>,
    /// Player whose freeze window must be scheduled
    pub freeze: Option<u8>,
}

impl FrameEffects {
    fn resync(player_id: u8) -> Self {
        Self {
            outbound: vec![Outbound::To(
                player_id,
                Frame::Text(codec::RESYNC_LINE.to_string()),
            )],
            freeze: None,
        }
    }
}

/// Join refusals decided by room state; format checks happen at the
/// session layer before the room is consulted
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum JoinRejection {
    #[error("That name is already taken")]
    NameTaken,
    #[error("Too many players online")]
    RoomFull,
}

/// Per-player announcement clocks
#[derive(Debug, Default)]
struct Throttles {
    pad: Option<Instant>,
    repeat_find: Option<Instant>,
}

fn throttle(slot: &mut Option<Instant>, window: Duration, now: Instant) -> bool {
    if slot.map_or(true, |last| now.duration_since(last) >= window) {
        *slot = Some(now);
        true
    } else {
        false
    }
}

const DOG_COMMANDS: [&str; 5] = ["/bark", "/woof", "/pant", "/howl", "/nap"];

/// Dogs may only use the command whitelist; anything else gets rewritten
fn dog_chat_allowed(text: &str) -> bool {
    text.starts_with("/me ") || DOG_COMMANDS.contains(&text)
}

fn woofs(rng: &mut SmallRng) -> String {
    const COUNTS: [usize; 4] = [2, 3, 3, 4];
    let n = COUNTS[rng.gen_range(0..COUNTS.len())];
    vec!["woof"; n].join(" ")
}

/// One isolated game session
pub struct Room {
    id: String,
    name: String,
    map: Arc<TileMap>,
    ids: IdentityPool,
    players: HashMap<u8, Player>,
    names: HashMap<u8, String>,
    scores: HashMap<u8, u32>,
    has_mouse: HashMap<u8, bool>,
    frozen: HashMap<u8, bool>,
    throttles: HashMap<u8, Throttles>,
    mouse: (u8, u8),
    rng: SmallRng,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        map: Arc<TileMap>,
        rng: SmallRng,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            map,
            ids: IdentityPool::new(rooms::MAX_PLAYERS),
            players: HashMap::new(),
            names: HashMap::new(),
            scores: HashMap::new(),
            has_mouse: HashMap::new(),
            frozen: HashMap::new(),
            throttles: HashMap::new(),
            mouse: (spawn::MOUSE_X, spawn::MOUSE_Y),
            rng,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn occupant_count(&self) -> usize {
        self.players.len()
    }

    /// Ids of players currently standing in a zone
    pub fn zone_members(&self, zone: Zone) -> Vec<u8> {
        self.players
            .values()
            .filter(|p| p.zone() == zone)
            .map(|p| p.id)
            .collect()
    }

    /// Register a new player and produce the initial snapshot traffic:
    /// the assigned id, the full name table, the binary roster, and the
    /// mouse cell to the joiner; the arrival notice, the name-table delta,
    /// and the new record to everyone else.
    pub fn join(&mut self, name: &str) -> Result<(u8, Vec<Outbound>), JoinRejection> {
        if self.names.values().any(|n| n == name) {
            return Err(JoinRejection::NameTaken);
        }
        let Some(id) = self.ids.acquire() else {
            return Err(JoinRejection::RoomFull);
        };

        let player = Player::new(id);
        let record = codec::encode_player(&player);
        self.players.insert(id, player);
        self.names.insert(id, name.to_string());
        self.scores.insert(id, 0);
        self.has_mouse.insert(id, false);
        self.frozen.insert(id, false);
        self.throttles.insert(id, Throttles::default());

        let mut roster = Vec::with_capacity(self.players.len() * codec::PLAYER_RECORD_LEN);
        for p in self.players.values() {
            roster.extend_from_slice(&codec::encode_player(p));
        }

        let mut out = vec![
            Outbound::To(id, Frame::Text(codec::id_line(id))),
            Outbound::To(id, Frame::Text(codec::names_line(&self.names))),
            Outbound::To(id, Frame::Binary(roster)),
            Outbound::To(id, Frame::Text(codec::mouse_line(self.mouse.0, self.mouse.1))),
            Outbound::Broadcast(Frame::Text(format!(
                "join-message [ {name} entered the game ]"
            ))),
            Outbound::Broadcast(Frame::Text(codec::names_line(
                self.names.iter().filter(|(other, _)| **other == id),
            ))),
        ];
        for other in self.players.keys().filter(|other| **other != id) {
            out.push(Outbound::To(*other, Frame::Binary(record.to_vec())));
        }

        Ok((id, out))
    }

    /// Apply one validated movement request. The claimed position is the
    /// anti-desync check: a mismatch means the client is behind, not
    /// hostile, so it gets a resync line instead of a close.
    pub fn handle_move(
        &mut self,
        player_id: u8,
        claimed: (u8, u8),
        direction: Direction,
        face_only: bool,
        now: Instant,
    ) -> FrameEffects {
        let Some(player) = self.players.get(&player_id) else {
            return FrameEffects::default();
        };
        if self.frozen.get(&player_id).copied().unwrap_or(false) {
            return FrameEffects::resync(player_id);
        }
        if (player.x, player.y) != claimed {
            return FrameEffects::resync(player_id);
        }

        let old = player.clone();
        let mut mover = old.clone();
        let outcome = mover.try_move(
            direction,
            &self.map,
            |x, y| {
                self.players
                    .values()
                    .find(|p| p.id != player_id && p.x == x && p.y == y)
                    .map(|p| p.id)
            },
            face_only,
        );

        if !outcome.updated && outcome.target.is_none() {
            return FrameEffects::resync(player_id);
        }

        let mut fx = FrameEffects::default();
        let name = self.names.get(&player_id).cloned().unwrap_or_default();

        let old_zone = old.zone();
        let new_zone = mover.zone();
        if old_zone != new_zone {
            fx.outbound.push(Outbound::Zone(
                old_zone,
                Frame::Text(format!("move-message [ {name} left {} ]", old_zone.name())),
            ));
            fx.outbound.push(Outbound::Zone(
                new_zone,
                Frame::Text(format!(
                    "move-message [ {name} entered {} ]",
                    new_zone.name()
                )),
            ));
        }

        let holding = self.has_mouse.get(&player_id).copied().unwrap_or(false);
        let tile = self.map.tile(mover.x, mover.y);
        let tag_target = outcome.target.filter(|tid| {
            mover.is_dog && self.players.get(tid).is_some_and(|t| !t.is_dog)
        });

        if let Some(target_id) = tag_target {
            // the restricted mover passes its role to whoever it caught
            mover.is_dog = false;
            if let Some(target) = self.players.get_mut(&target_id) {
                target.is_dog = true;
                fx.outbound.push(Outbound::Broadcast(Frame::Binary(
                    codec::encode_player(target).to_vec(),
                )));
            }
            let target_name = self.names.get(&target_id).cloned().unwrap_or_default();
            fx.outbound.push(Outbound::Broadcast(Frame::Text(format!(
                "join-message [ {name} caught {target_name}! {target_name} is a dog now ]"
            ))));
            fx.outbound.push(Outbound::To(
                target_id,
                Frame::Text(codec::FROZEN_LINE.to_string()),
            ));
            self.frozen.insert(target_id, true);
            fx.freeze = Some(target_id);
        } else if (mover.x, mover.y) == self.mouse {
            if holding {
                let slot = self.throttles.entry(player_id).or_default();
                if throttle(&mut slot.repeat_find, mechanics::REPEAT_FIND_COOLDOWN, now) {
                    fx.outbound.push(Outbound::Broadcast(Frame::Text(format!(
                        "move-message [ {name} found a mouse - but already has one! ]"
                    ))));
                }
            } else {
                self.relocate_mouse();
                fx.outbound.push(Outbound::Broadcast(Frame::Text(format!(
                    "move-message [ {name} found a mouse! ]"
                ))));
                fx.outbound.push(Outbound::Broadcast(Frame::Text(codec::mouse_line(
                    self.mouse.0,
                    self.mouse.1,
                ))));
                self.has_mouse.insert(player_id, true);
                fx.outbound.push(Outbound::To(
                    player_id,
                    Frame::Text(codec::hasmouse_line(true)),
                ));
            }
        } else if mover.at_doorstep() && holding {
            self.deliver(&mut mover, &name, false, &mut fx);
        } else if mover.at_altar() && holding {
            self.deliver(&mut mover, &name, true, &mut fx);
        } else if let Some(pad) = map::pad_message(tile, mover.is_dog) {
            let slot = self.throttles.entry(player_id).or_default();
            if throttle(&mut slot.pad, mechanics::PAD_COOLDOWN, now) {
                fx.outbound.push(Outbound::Broadcast(Frame::Text(format!(
                    "pad-message -= Broadcast from {name}: {pad} =-"
                ))));
            }
        }

        // the mover's record always closes an accepted frame
        fx.outbound.push(Outbound::Broadcast(Frame::Binary(
            codec::encode_player(&mover).to_vec(),
        )));
        self.players.insert(player_id, mover);
        fx
    }

    /// Item handover at one of the two destination zones. The doorstep
    /// always leaves the deliverer a cat, the altar always a dog; a role
    /// flip is a transformation, a same-role delivery scores. Turning
    /// into the dog freezes the deliverer for the freeze window, the same
    /// as being caught.
    fn deliver(&mut self, mover: &mut Player, name: &str, to_dog: bool, fx: &mut FrameEffects) {
        let transformed = if to_dog { !mover.is_dog } else { mover.is_dog };
        mover.is_dog = to_dog;
        self.has_mouse.insert(mover.id, false);
        fx.outbound.push(Outbound::To(
            mover.id,
            Frame::Text(codec::hasmouse_line(false)),
        ));
        fx.outbound.push(Outbound::Zone(
            mover.zone(),
            Frame::Text(codec::dropoff_line(mover.is_dog, transformed)),
        ));
        if transformed {
            let role = if to_dog { "dog" } else { "cat" };
            fx.outbound.push(Outbound::Broadcast(Frame::Text(format!(
                "join-message [ {name} is a {role} now ]"
            ))));
            if to_dog {
                fx.outbound.push(Outbound::To(
                    mover.id,
                    Frame::Text(codec::FROZEN_LINE.to_string()),
                ));
                self.frozen.insert(mover.id, true);
                fx.freeze = Some(mover.id);
            }
        } else {
            let score = self.scores.entry(mover.id).and_modify(|s| *s += 1).or_insert(1);
            let score = *score;
            fx.outbound
                .push(Outbound::To(mover.id, Frame::Text(codec::score_line(score))));
            let place = if to_dog { "altar" } else { "house" };
            fx.outbound.push(Outbound::Broadcast(Frame::Text(format!(
                "join-message [ {name} left a present at the {place}! SCORE: {score} ]"
            ))));
        }
    }

    /// Rejection-sample a fresh mouse cell on plain floor
    fn relocate_mouse(&mut self) {
        loop {
            let x = 20 + self.rng.gen_range(0..60u8);
            let y = 12 + self.rng.gen_range(0..36u8);
            if self.map.tile(x, y) == map::TILE_FLOOR {
                self.mouse = (x, y);
                return;
            }
        }
    }

    /// Relay a chat line into the sender's zone, rewriting dog chatter
    /// that strays off the whitelist, then apply any chat command.
    pub fn handle_chat(&mut self, player_id: u8, text: &str) -> Vec<Outbound> {
        let (is_dog, zone) = match self.players.get(&player_id) {
            Some(p) => (p.is_dog, p.zone()),
            None => return Vec::new(),
        };
        let words = if is_dog && !dog_chat_allowed(text) {
            woofs(&mut self.rng)
        } else {
            text.to_string()
        };
        let out = vec![Outbound::Zone(
            zone,
            Frame::Text(codec::chat_line(player_id, &words)),
        )];
        if let Some(p) = self.players.get_mut(&player_id) {
            p.apply_chat_message(text);
        }
        out
    }

    /// Freeze-window expiry, delivered through the room mailbox. A no-op
    /// when the player already left.
    pub fn unfreeze(&mut self, player_id: u8) {
        if let Some(f) = self.frozen.get_mut(&player_id) {
            *f = false;
        }
    }

    /// Drop a player, free its id, and tell the survivors. An empty room
    /// produces no traffic; the registry decides whether it dies.
    pub fn remove_player(&mut self, player_id: u8) -> Vec<Outbound> {
        if self.players.remove(&player_id).is_none() {
            return Vec::new();
        }
        let name = self.names.remove(&player_id).unwrap_or_default();
        self.scores.remove(&player_id);
        self.has_mouse.remove(&player_id);
        self.frozen.remove(&player_id);
        self.throttles.remove(&player_id);
        self.ids.release(player_id);

        if self.players.is_empty() {
            return Vec::new();
        }
        vec![
            Outbound::Broadcast(Frame::Binary(codec::encode_removal(player_id).to_vec())),
            Outbound::Broadcast(Frame::Text(format!("join-message [ {name} left the game ]"))),
        ]
    }
}
