//! Static tile map oracle
//!
//! The map is a fixed 100x60 grid of tile ids built once at startup. Game
//! logic only ever asks two questions of it: can a player of a given role
//! stand on a cell, and which named zone a cell belongs to. Tile ids encode
//! collision by range, so the renderer and the server agree on walls without
//! sharing geometry.

/// Map width in tiles; coordinates must fit the 8-bit wire fields
pub const MAP_W: u8 = 100;
/// Map height in tiles
pub const MAP_H: u8 = 60;

/// Zone block width in tiles
pub const ZONE_W: u8 = 20;
/// Zone block height in tiles
pub const ZONE_H: u8 = 12;

/// Plain floor, the only tile the mouse may respawn on
pub const TILE_FLOOR: u8 = 0;
/// Decorative walkable path
pub const TILE_PATH: u8 = 1;
/// Decorative walkable grass
pub const TILE_GRASS: u8 = 2;
/// Generic rock wall, used for the map border
pub const TILE_ROCK: u8 = 11;
/// Building wall
pub const TILE_BRICK: u8 = 30;
/// Market crate
pub const TILE_CRATE: u8 = 35;
/// Carved stone (fountain, altar)
pub const TILE_STONE: u8 = 60;
/// Fence: blocks dogs, lets cats through
pub const TILE_FENCE: u8 = 127;
/// Water
pub const TILE_WATER: u8 = 134;
/// Signpost (action tile, impassable)
pub const TILE_SIGN: u8 = 180;

/// Collision class of a single tile for a given role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Passable,
    Wall,
}

/// Classify a tile id. Walls are fixed id ranges; the fence range only
/// blocks dogs.
pub fn classify(tile: u8, is_dog: bool) -> TileKind {
    let wall = (11..80).contains(&tile)
        || (134..140).contains(&tile)
        || (180..200).contains(&tile)
        || (is_dog && (127..134).contains(&tile));
    if wall {
        TileKind::Wall
    } else {
        TileKind::Passable
    }
}

/// Pad announcement text for broadcast-pad tiles. Dogs can only bark.
pub fn pad_message(tile: u8, is_dog: bool) -> Option<&'static str> {
    let msg = match tile {
        100 => {
            if is_dog {
                "Woof Woof Woof!"
            } else {
                "I'm in the mush room!"
            }
        }
        101 => {
            if is_dog {
                "Woof Woof Woof!"
            } else {
                "I'm by the fountain!"
            }
        }
        102 => {
            if is_dog {
                "Woof Woof Woof!"
            } else {
                "I found treasure!"
            }
        }
        103 => {
            if is_dog {
                "Woof Woof Woof!"
            } else {
                "Meet me in the alley!"
            }
        }
        104 => {
            if is_dog {
                "Woof! Woof Woof Woof!"
            } else {
                "Meow Meow Meow!"
            }
        }
        _ => return None,
    };
    Some(msg)
}

/// A logical sub-room: one 20x12 block of the grid. Used purely to scope
/// chat and entered/left notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone {
    pub col: u8,
    pub row: u8,
}

const ZONE_NAMES: [[&str; 5]; 5] = [
    [
        "the north woods",
        "the mush room",
        "the clock tower",
        "the orchard",
        "the lookout",
    ],
    [
        "the alley",
        "the fountain plaza",
        "the market",
        "the garden",
        "the boardwalk",
    ],
    [
        "the meadow",
        "the town square",
        "the old house",
        "the library",
        "the pier",
    ],
    [
        "the creek",
        "the cellar",
        "the warehouse",
        "the dog park",
        "the dunes",
    ],
    [
        "the south gate",
        "the junkyard",
        "the greenhouse",
        "the altar grounds",
        "the cove",
    ],
];

impl Zone {
    /// Zone containing a map cell
    pub fn of(x: u8, y: u8) -> Self {
        Self {
            col: x / ZONE_W,
            row: y / ZONE_H,
        }
    }

    pub fn name(self) -> &'static str {
        ZONE_NAMES[self.row as usize][self.col as usize]
    }
}

/// Doorstep delivery tiles: the porch in front of the old house
pub fn is_doorstep(x: u8, y: u8) -> bool {
    y == 28 && (49..=51).contains(&x)
}

/// Altar delivery tiles: the steps below the altar in the altar grounds
pub fn is_altar(x: u8, y: u8) -> bool {
    y == 52 && (69..=71).contains(&x)
}

/// The fixed world grid
pub struct TileMap {
    tiles: Vec<u8>,
}

impl TileMap {
    /// Build the standard world. Deterministic; landmark cells (spawn,
    /// doorstep, altar, pads, initial mouse cell) are kept passable.
    pub fn standard() -> Self {
        let mut map = Self {
            tiles: vec![TILE_FLOOR; MAP_W as usize * MAP_H as usize],
        };

        // 2-tile rock border so movement never has to bounds-check
        map.fill_rect(0, 0, MAP_W - 1, 1, TILE_ROCK);
        map.fill_rect(0, MAP_H - 2, MAP_W - 1, MAP_H - 1, TILE_ROCK);
        map.fill_rect(0, 0, 1, MAP_H - 1, TILE_ROCK);
        map.fill_rect(MAP_W - 2, 0, MAP_W - 1, MAP_H - 1, TILE_ROCK);

        // the old house, with a porch row of path below it
        map.fill_rect(46, 24, 54, 27, TILE_BRICK);
        map.fill_rect(49, 28, 51, 28, TILE_PATH);
        map.set(47, 28, TILE_SIGN);
        map.set(53, 28, TILE_SIGN);

        // fountain in the plaza
        map.fill_rect(28, 15, 32, 17, TILE_STONE);

        // market stalls
        map.fill_rect(44, 14, 46, 16, TILE_CRATE);
        map.fill_rect(52, 14, 54, 16, TILE_CRATE);

        // warehouse with a south door
        map.fill_rect(42, 38, 50, 44, TILE_BRICK);
        map.set(46, 44, TILE_FLOOR);

        // fenced dog park, gates north and south
        map.outline_rect(62, 38, 77, 45, TILE_FENCE);
        map.set(70, 38, TILE_FLOOR);
        map.set(70, 45, TILE_FLOOR);

        // pond east of the mouse respawn window
        map.fill_rect(84, 20, 94, 28, TILE_WATER);

        // altar block with path steps below it
        map.fill_rect(68, 50, 72, 51, TILE_STONE);
        map.fill_rect(69, 52, 71, 52, TILE_PATH);

        // grass accents around the mush room
        map.fill_rect(26, 4, 34, 8, TILE_GRASS);

        // broadcast pads
        map.set(30, 6, 100);
        map.set(30, 18, 101);
        map.set(90, 55, 102);
        map.set(10, 18, 103);
        map.set(30, 30, 104);

        map
    }

    /// Tile id at a cell. Callers must stay in bounds; movement goes
    /// through `is_wall_at`, which treats the outside as wall.
    pub fn tile(&self, x: u8, y: u8) -> u8 {
        debug_assert!(x < MAP_W && y < MAP_H);
        self.tiles[y as usize * MAP_W as usize + x as usize]
    }

    /// Collision query for a candidate cell in signed coordinates.
    /// Anything beyond the edge counts as wall.
    pub fn is_wall_at(&self, x: i16, y: i16, is_dog: bool) -> bool {
        if x < 0 || y < 0 || x >= MAP_W as i16 || y >= MAP_H as i16 {
            return true;
        }
        classify(self.tile(x as u8, y as u8), is_dog) == TileKind::Wall
    }

    fn set(&mut self, x: u8, y: u8, tile: u8) {
        self.tiles[y as usize * MAP_W as usize + x as usize] = tile;
    }

    fn fill_rect(&mut self, x0: u8, y0: u8, x1: u8, y1: u8, tile: u8) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, tile);
            }
        }
    }

    fn outline_rect(&mut self, x0: u8, y0: u8, x1: u8, y1: u8, tile: u8) {
        for x in x0..=x1 {
            self.set(x, y0, tile);
            self.set(x, y1, tile);
        }
        for y in y0..=y1 {
            self.set(x0, y, tile);
            self.set(x1, y, tile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::spawn;

    #[test]
    fn test_classify_wall_ranges() {
        assert_eq!(classify(TILE_FLOOR, false), TileKind::Passable);
        assert_eq!(classify(10, false), TileKind::Passable);
        assert_eq!(classify(11, false), TileKind::Wall);
        assert_eq!(classify(79, false), TileKind::Wall);
        assert_eq!(classify(80, false), TileKind::Passable);
        assert_eq!(classify(134, false), TileKind::Wall);
        assert_eq!(classify(139, false), TileKind::Wall);
        assert_eq!(classify(140, false), TileKind::Passable);
        assert_eq!(classify(180, false), TileKind::Wall);
        assert_eq!(classify(199, false), TileKind::Wall);
        assert_eq!(classify(200, false), TileKind::Passable);
    }

    #[test]
    fn test_fence_blocks_dogs_only() {
        for tile in 127..134u8 {
            assert_eq!(classify(tile, false), TileKind::Passable);
            assert_eq!(classify(tile, true), TileKind::Wall);
        }
    }

    #[test]
    fn test_pads_are_passable() {
        for tile in 100..=104u8 {
            assert_eq!(classify(tile, false), TileKind::Passable);
            assert_eq!(classify(tile, true), TileKind::Passable);
            assert!(pad_message(tile, false).is_some());
            assert!(pad_message(tile, true).is_some());
        }
        assert!(pad_message(TILE_FLOOR, false).is_none());
    }

    #[test]
    fn test_zone_lookup() {
        assert_eq!(Zone::of(0, 0), Zone { col: 0, row: 0 });
        assert_eq!(Zone::of(50, 32).name(), "the old house");
        assert_eq!(Zone::of(99, 59), Zone { col: 4, row: 4 });
        assert_eq!(Zone::of(70, 40).name(), "the dog park");
    }

    #[test]
    fn test_landmarks_are_passable() {
        let map = TileMap::standard();
        assert!(!map.is_wall_at(spawn::PLAYER_X as i16, spawn::PLAYER_Y as i16, false));
        assert!(!map.is_wall_at(spawn::MOUSE_X as i16, spawn::MOUSE_Y as i16, false));
        for x in 49..=51i16 {
            assert!(is_doorstep(x as u8, 28));
            assert!(!map.is_wall_at(x, 28, false));
        }
        for x in 69..=71i16 {
            assert!(is_altar(x as u8, 52));
            assert!(!map.is_wall_at(x, 52, false));
        }
    }

    #[test]
    fn test_border_is_walled() {
        let map = TileMap::standard();
        for x in 0..MAP_W as i16 {
            assert!(map.is_wall_at(x, 0, false));
            assert!(map.is_wall_at(x, MAP_H as i16 - 1, false));
        }
        assert!(map.is_wall_at(-1, 30, false));
        assert!(map.is_wall_at(MAP_W as i16, 30, false));
    }

    #[test]
    fn test_respawn_window_has_floor() {
        let map = TileMap::standard();
        let floors = (12..48u8)
            .flat_map(|y| (20..80u8).map(move |x| (x, y)))
            .filter(|&(x, y)| map.tile(x, y) == TILE_FLOOR)
            .count();
        // rejection sampling needs plenty of candidate cells
        assert!(floors > 1000, "only {floors} floor cells in respawn window");
    }
}
