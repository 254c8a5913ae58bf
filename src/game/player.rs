//! Player entity and authoritative movement
//!
//! A player is a handful of bytes of state: grid position, facing, and two
//! flags (napping, dog). All position mutation funnels through `try_move`,
//! which is the server's collision authority; nothing else ever writes
//! `x`/`y`, so coordinates can never land inside a wall.

use crate::game::constants::spawn;
use crate::game::map::{self, TileMap, Zone};

/// The four movement directions with their wire codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Two-bit wire code
    pub const fn code(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    pub const fn dx(self) -> i16 {
        match self {
            Direction::Right => 1,
            Direction::Left => -1,
            _ => 0,
        }
    }

    pub const fn dy(self) -> i16 {
        match self {
            Direction::Down => 1,
            Direction::Up => -1,
            _ => 0,
        }
    }
}

/// Result of one movement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Observable state changed; the caller must broadcast
    pub updated: bool,
    /// Coordinates actually changed
    pub moved: bool,
    /// The candidate cell was a wall or occupied
    pub collided: bool,
    /// Occupant of the candidate cell, if any
    pub target: Option<u8>,
}

/// One connected actor on the grid
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u8,
    pub x: u8,
    pub y: u8,
    pub color: u8,
    pub facing: Direction,
    pub is_napping: bool,
    pub is_dog: bool,
}

impl Player {
    /// New player at the spawn cell, facing left, as a cat
    pub fn new(id: u8) -> Self {
        Self {
            id,
            x: spawn::PLAYER_X,
            y: spawn::PLAYER_Y,
            color: id % 10,
            facing: Direction::Left,
            is_napping: false,
            is_dog: false,
        }
    }

    pub fn zone(&self) -> Zone {
        Zone::of(self.x, self.y)
    }

    pub fn at_doorstep(&self) -> bool {
        map::is_doorstep(self.x, self.y)
    }

    pub fn at_altar(&self) -> bool {
        map::is_altar(self.x, self.y)
    }

    /// Attempt one step. `occupant_at` reports another live player on a
    /// cell; it is consulted even for face-only turns so the caller still
    /// learns who was bumped. Facing follows the input and any nap ends
    /// regardless of whether the step lands.
    pub fn try_move(
        &mut self,
        direction: Direction,
        map: &TileMap,
        occupant_at: impl Fn(u8, u8) -> Option<u8>,
        face_only: bool,
    ) -> MoveOutcome {
        let nx = self.x as i16 + direction.dx();
        let ny = self.y as i16 + direction.dy();

        let wall = map.is_wall_at(nx, ny, self.is_dog);
        let target = if wall {
            None
        } else {
            occupant_at(nx as u8, ny as u8)
        };

        let collided = wall || target.is_some();
        let moved = !collided && !face_only;
        if moved {
            self.x = nx as u8;
            self.y = ny as u8;
        }

        let updated = moved || self.facing != direction || self.is_napping;
        self.facing = direction;
        self.is_napping = false;

        MoveOutcome {
            updated,
            moved,
            collided,
            target,
        }
    }

    /// Commands carried in chat rather than movement frames
    pub fn apply_chat_message(&mut self, text: &str) -> bool {
        if text == "/nap" {
            self.is_napping = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_map() -> Arc<TileMap> {
        Arc::new(TileMap::standard())
    }

    fn no_one(_x: u8, _y: u8) -> Option<u8> {
        None
    }

    #[test]
    fn test_new_player_defaults() {
        let p = Player::new(13);
        assert_eq!((p.x, p.y), (spawn::PLAYER_X, spawn::PLAYER_Y));
        assert_eq!(p.color, 3);
        assert_eq!(p.facing, Direction::Left);
        assert!(!p.is_dog);
        assert!(!p.is_napping);
    }

    #[test]
    fn test_move_into_open_cell() {
        let map = test_map();
        let mut p = Player::new(0);
        let out = p.try_move(Direction::Right, &map, no_one, false);
        assert!(out.moved);
        assert!(out.updated);
        assert!(!out.collided);
        assert_eq!((p.x, p.y), (spawn::PLAYER_X + 1, spawn::PLAYER_Y));
        assert_eq!(p.facing, Direction::Right);
    }

    #[test]
    fn test_move_into_wall_keeps_position() {
        let map = test_map();
        let mut p = Player::new(0);
        // walk up against the house wall above the porch
        p.x = 50;
        p.y = 29;
        p.try_move(Direction::Up, &map, no_one, false); // onto the porch
        assert_eq!((p.x, p.y), (50, 28));
        let out = p.try_move(Direction::Up, &map, no_one, false);
        assert!(out.collided);
        assert!(!out.moved);
        assert_eq!((p.x, p.y), (50, 28));
    }

    #[test]
    fn test_turning_against_wall_still_updates() {
        let map = test_map();
        let mut p = Player::new(0);
        p.x = 50;
        p.y = 28;
        p.facing = Direction::Down;
        let out = p.try_move(Direction::Up, &map, no_one, false);
        assert!(out.collided);
        assert!(out.updated, "facing change must force a broadcast");
        assert_eq!(p.facing, Direction::Up);
    }

    #[test]
    fn test_bump_against_wall_without_turn_is_no_update() {
        let map = test_map();
        let mut p = Player::new(0);
        p.x = 50;
        p.y = 28;
        p.facing = Direction::Up;
        let out = p.try_move(Direction::Up, &map, no_one, false);
        assert!(!out.updated);
        assert!(out.target.is_none());
    }

    #[test]
    fn test_occupied_cell_reports_target() {
        let map = test_map();
        let mut p = Player::new(0);
        let out = p.try_move(Direction::Right, &map, |x, y| {
            (x == spawn::PLAYER_X + 1 && y == spawn::PLAYER_Y).then_some(7)
        }, false);
        assert!(out.collided);
        assert!(!out.moved);
        assert_eq!(out.target, Some(7));
        assert_eq!((p.x, p.y), (spawn::PLAYER_X, spawn::PLAYER_Y));
    }

    #[test]
    fn test_face_only_never_moves_but_sees_target() {
        let map = test_map();
        let mut p = Player::new(0);
        let out = p.try_move(Direction::Right, &map, |x, y| {
            (x == spawn::PLAYER_X + 1 && y == spawn::PLAYER_Y).then_some(7)
        }, true);
        assert!(!out.moved);
        assert_eq!(out.target, Some(7));

        let out = p.try_move(Direction::Down, &map, no_one, true);
        assert!(!out.moved);
        assert!(out.updated); // facing changed
        assert_eq!((p.x, p.y), (spawn::PLAYER_X, spawn::PLAYER_Y));
    }

    #[test]
    fn test_dog_blocked_by_fence() {
        let map = test_map();
        let mut p = Player::new(0);
        // west of the dog park fence at x=62
        p.x = 61;
        p.y = 40;
        p.is_dog = true;
        let out = p.try_move(Direction::Right, &map, no_one, false);
        assert!(out.collided);

        p.is_dog = false;
        let out = p.try_move(Direction::Right, &map, no_one, false);
        assert!(out.moved, "cats pass through fences");
    }

    #[test]
    fn test_any_move_input_clears_nap() {
        let map = test_map();
        let mut p = Player::new(0);
        assert!(p.apply_chat_message("/nap"));
        assert!(p.is_napping);
        let out = p.try_move(Direction::Left, &map, no_one, true);
        assert!(out.updated, "waking up must force a broadcast");
        assert!(!p.is_napping);
    }

    #[test]
    fn test_chat_other_than_nap_ignored() {
        let mut p = Player::new(0);
        assert!(!p.apply_chat_message("hello"));
        assert!(!p.is_napping);
    }
}
