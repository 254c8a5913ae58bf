//! Wire codec
//!
//! Two encodings share the socket: a fixed 4-byte big-endian player record
//! for position sync, and line-oriented tagged text for everything else
//! (`<tag> <payload>`, where the tag is a keyword or a sender id). Binary
//! keeps the hot path small; text keeps the rest debuggable.

use std::collections::BTreeMap;

use crate::game::player::{Direction, Player};

/// One outbound frame, either encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Unicast text telling a client its last movement frame was ignored and
/// it should wait for the next authoritative record
pub const RESYNC_LINE: &str = "invalid invalid";

/// Unicast text telling a tagged client it is frozen
pub const FROZEN_LINE: &str = "frozen true";

/// Encoded size of one player record
pub const PLAYER_RECORD_LEN: usize = 4;

/// Pack a player into the 4-byte wire record:
/// id(8) | x(8) | y(8) | color(4) dog(1) napping(1) facing(2)
pub fn encode_player(p: &Player) -> [u8; PLAYER_RECORD_LEN] {
    let packed = ((p.id as u32) << 24)
        | ((p.x as u32) << 16)
        | ((p.y as u32) << 8)
        | (((p.color & 0x0F) as u32) << 4)
        | ((p.is_dog as u32) << 3)
        | ((p.is_napping as u32) << 2)
        | (p.facing.code() as u32);
    packed.to_be_bytes()
}

/// Removal sentinel: same record with x = 0, y = 0 and all flags clear
pub fn encode_removal(id: u8) -> [u8; PLAYER_RECORD_LEN] {
    ((id as u32) << 24).to_be_bytes()
}

/// Decoded form of a wire record, used by tests and tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: u8,
    pub x: u8,
    pub y: u8,
    pub color: u8,
    pub is_dog: bool,
    pub is_napping: bool,
    pub facing: Direction,
}

impl PlayerRecord {
    pub fn decode(bytes: [u8; PLAYER_RECORD_LEN]) -> Self {
        let packed = u32::from_be_bytes(bytes);
        Self {
            id: (packed >> 24) as u8,
            x: (packed >> 16) as u8,
            y: (packed >> 8) as u8,
            color: ((packed >> 4) & 0x0F) as u8,
            is_dog: packed & 0x08 != 0,
            is_napping: packed & 0x04 != 0,
            facing: Direction::from_code((packed & 0x03) as u8)
                .expect("two-bit field is always a valid direction"),
        }
    }

    /// A record with x = 0, y = 0 announces the player left
    pub fn is_removal(&self) -> bool {
        self.x == 0 && self.y == 0
    }
}

/// Movement request as sent by clients: claimed position, direction, and
/// an optional face-only flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub claimed_x: u8,
    pub claimed_y: u8,
    pub direction: Direction,
    pub face_only: bool,
}

/// Malformed inbound frames are protocol violations and cost the client
/// its connection
#[derive(Debug, Clone, thiserror::Error)]
pub enum FrameError {
    #[error("movement frame must be 3 or 4 bytes, got {0}")]
    WrongSize(usize),
    #[error("invalid direction code {0}")]
    BadDirection(u8),
}

impl MoveRequest {
    pub fn parse(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() != 3 && data.len() != 4 {
            return Err(FrameError::WrongSize(data.len()));
        }
        let direction =
            Direction::from_code(data[2]).ok_or(FrameError::BadDirection(data[2]))?;
        Ok(Self {
            claimed_x: data[0],
            claimed_y: data[1],
            direction,
            face_only: data.len() == 4 && data[3] != 0,
        })
    }
}

/// `id <n>` - tells a new connection its assigned id
pub fn id_line(id: u8) -> String {
    format!("id {id}")
}

/// `names {"<id>":"<name>",...}` - full or incremental name table
pub fn names_line<'a>(entries: impl IntoIterator<Item = (&'a u8, &'a String)>) -> String {
    let table: BTreeMap<String, &str> = entries
        .into_iter()
        .map(|(id, name)| (id.to_string(), name.as_str()))
        .collect();
    format!(
        "names {}",
        serde_json::to_string(&table).expect("string map always serializes")
    )
}

/// `mouse [x,y]` - current shared item cell
pub fn mouse_line(x: u8, y: u8) -> String {
    format!("mouse [{x},{y}]")
}

/// `hasmouse true|false` - personal holder-state ack
pub fn hasmouse_line(holding: bool) -> String {
    format!("hasmouse {holding}")
}

/// `score <n>` - personal score ack after a delivery
pub fn score_line(score: u32) -> String {
    format!("score {score}")
}

/// `<id> <words>` - chat relay
pub fn chat_line(id: u8, words: &str) -> String {
    format!("{id} {words}")
}

/// `dropoff {"isDog":..,"transformed":..}` - delivery outcome for the
/// deliverer's zone
pub fn dropoff_line(is_dog: bool, transformed: bool) -> String {
    format!(
        "dropoff {}",
        serde_json::json!({ "isDog": is_dog, "transformed": transformed })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_player_record_round_trip() {
        let mut p = Player::new(42);
        p.x = 51;
        p.y = 32;
        p.is_dog = true;
        p.facing = Direction::Right;
        let rec = PlayerRecord::decode(encode_player(&p));
        assert_eq!(rec.id, 42);
        assert_eq!((rec.x, rec.y), (51, 32));
        assert_eq!(rec.color, 2);
        assert!(rec.is_dog);
        assert!(!rec.is_napping);
        assert_eq!(rec.facing, Direction::Right);
        assert!(!rec.is_removal());
    }

    #[test]
    fn test_napping_bit() {
        let mut p = Player::new(1);
        p.is_napping = true;
        let rec = PlayerRecord::decode(encode_player(&p));
        assert!(rec.is_napping);
        assert!(!rec.is_dog);
    }

    #[test]
    fn test_removal_sentinel() {
        let rec = PlayerRecord::decode(encode_removal(9));
        assert_eq!(rec.id, 9);
        assert!(rec.is_removal());
    }

    #[test]
    fn test_record_layout_matches_wire() {
        // the scenario from the protocol docs: id 3 at (51,32) facing right
        let mut p = Player::new(3);
        p.x = 51;
        p.y = 32;
        p.facing = Direction::Right;
        let bytes = encode_player(&p);
        assert_eq!(bytes[0], 3);
        assert_eq!(bytes[1], 51);
        assert_eq!(bytes[2], 32);
        assert_eq!(bytes[3], (3 << 4) | 3); // color 3, cat, awake, facing right
    }

    #[test]
    fn test_move_request_parse() {
        let req = MoveRequest::parse(&[50, 32, 3]).unwrap();
        assert_eq!((req.claimed_x, req.claimed_y), (50, 32));
        assert_eq!(req.direction, Direction::Right);
        assert!(!req.face_only);

        let req = MoveRequest::parse(&[50, 32, 0, 1]).unwrap();
        assert_eq!(req.direction, Direction::Up);
        assert!(req.face_only);

        let req = MoveRequest::parse(&[50, 32, 2, 0]).unwrap();
        assert!(!req.face_only);
    }

    #[test]
    fn test_move_request_rejects_garbage() {
        assert!(matches!(
            MoveRequest::parse(&[1, 2]),
            Err(FrameError::WrongSize(2))
        ));
        assert!(matches!(
            MoveRequest::parse(&[1, 2, 3, 4, 5]),
            Err(FrameError::WrongSize(5))
        ));
        assert!(matches!(
            MoveRequest::parse(&[1, 2, 9]),
            Err(FrameError::BadDirection(9))
        ));
    }

    #[test]
    fn test_text_lines() {
        assert_eq!(id_line(7), "id 7");
        assert_eq!(mouse_line(54, 41), "mouse [54,41]");
        assert_eq!(hasmouse_line(true), "hasmouse true");
        assert_eq!(score_line(3), "score 3");
        assert_eq!(chat_line(7, "hello there"), "7 hello there");
        assert_eq!(
            dropoff_line(false, true),
            r#"dropoff {"isDog":false,"transformed":true}"#
        );
    }

    #[test]
    fn test_names_line_is_json() {
        let mut names = HashMap::new();
        names.insert(0u8, "Tom".to_string());
        names.insert(3u8, "Jerry".to_string());
        let line = names_line(&names);
        let json = line.strip_prefix("names ").unwrap();
        let parsed: HashMap<String, String> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed["0"], "Tom");
        assert_eq!(parsed["3"], "Jerry");
    }
}
