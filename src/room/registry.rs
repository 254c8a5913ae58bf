//! Room registry
//!
//! Process-wide mapping of room id to room handle, capacity-bounded. The
//! default room is seeded at startup and never destroyed; every other room
//! lives exactly as long as it has players. The registry is also the
//! minimal surface the HTTP lobby consumes: a public listing and a
//! create operation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::game::constants::rooms::DEFAULT_ROOM_ID;
use crate::game::map::TileMap;
use crate::room::actor::RoomHandle;

/// Create-room refusals
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Server overloaded - too many rooms")]
    AtCapacity,
    /// Freshly generated id already taken; the client should retry
    #[error("Temporary error - please try again")]
    IdCollision,
}

/// Public listing entry, shaped for the lobby JSON
#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub cats: usize,
    #[serde(rename = "hasPassword")]
    pub has_password: bool,
}

pub struct RoomRegistry {
    rooms: HashMap<String, Arc<RoomHandle>>,
    map: Arc<TileMap>,
    reaper: mpsc::UnboundedSender<String>,
    max_rooms: usize,
}

impl RoomRegistry {
    /// New registry with the permanent default room already seeded
    pub fn new(
        map: Arc<TileMap>,
        reaper: mpsc::UnboundedSender<String>,
        max_rooms: usize,
    ) -> Self {
        let mut registry = Self {
            rooms: HashMap::new(),
            map,
            reaper,
            max_rooms,
        };
        let default = RoomHandle::spawn(
            DEFAULT_ROOM_ID.to_string(),
            DEFAULT_ROOM_ID.to_string(),
            None,
            registry.map.clone(),
            registry.reaper.clone(),
        );
        registry.rooms.insert(DEFAULT_ROOM_ID.to_string(), default);
        registry
    }

    /// Create a room with an optional password (empty string means none)
    pub fn create_room(
        &mut self,
        name: &str,
        password: &str,
    ) -> Result<Arc<RoomHandle>, RegistryError> {
        if self.rooms.len() >= self.max_rooms {
            return Err(RegistryError::AtCapacity);
        }
        let id = fresh_room_id();
        if self.rooms.contains_key(&id) {
            return Err(RegistryError::IdCollision);
        }
        let secret = (!password.is_empty()).then(|| password.as_bytes().to_vec());
        let handle = RoomHandle::spawn(
            id.clone(),
            name.to_string(),
            secret,
            self.map.clone(),
            self.reaper.clone(),
        );
        info!(room = %id, name = %name, "room created");
        self.rooms.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.get(id).cloned()
    }

    /// Drop an empty room's handle. The default room is permanent and
    /// ignores removal.
    pub fn remove(&mut self, id: &str) {
        if id == DEFAULT_ROOM_ID {
            return;
        }
        if self.rooms.remove(id).is_some() {
            info!(room = %id, "room destroyed");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Listing consumed by the HTTP lobby endpoint
    pub fn list_public(&self) -> Vec<RoomInfo> {
        self.rooms
            .values()
            .map(|room| RoomInfo {
                id: room.id().to_string(),
                name: room.name().to_string(),
                cats: room.occupant_count(),
                has_password: room.has_password(),
            })
            .collect()
    }
}

/// Last 12 hex characters of a v4 UUID: short enough for an address bar,
/// random enough that ids are not guessable at this scale
fn fresh_room_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    uuid[uuid.len() - 12..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(max_rooms: usize) -> RoomRegistry {
        let (reap_tx, _reap_rx) = mpsc::unbounded_channel();
        RoomRegistry::new(Arc::new(TileMap::standard()), reap_tx, max_rooms)
    }

    #[tokio::test]
    async fn test_default_room_is_seeded() {
        let registry = registry(8);
        assert_eq!(registry.room_count(), 1);
        let room = registry.get(DEFAULT_ROOM_ID).unwrap();
        assert!(!room.has_password());
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let mut registry = registry(8);
        let room = registry.create_room("my_room", "secret").unwrap();
        assert_eq!(room.id().len(), 12);
        assert!(room.has_password());
        assert!(room.verify_password("secret"));
        assert!(!room.verify_password("wrong"));
        assert!(registry.get(room.id()).is_some());
    }

    #[tokio::test]
    async fn test_empty_password_means_open_room() {
        let mut registry = registry(8);
        let room = registry.create_room("open", "").unwrap();
        assert!(!room.has_password());
        assert!(room.verify_password("anything"));
    }

    #[tokio::test]
    async fn test_capacity_counts_default_room() {
        let mut registry = registry(2);
        registry.create_room("one", "").unwrap();
        assert!(matches!(
            registry.create_room("two", ""),
            Err(RegistryError::AtCapacity)
        ));
    }

    #[tokio::test]
    async fn test_remove_frees_capacity_but_spares_default() {
        let mut registry = registry(2);
        let room = registry.create_room("one", "").unwrap();
        let id = room.id().to_string();

        registry.remove(DEFAULT_ROOM_ID);
        assert!(registry.get(DEFAULT_ROOM_ID).is_some());

        registry.remove(&id);
        assert!(registry.get(&id).is_none());
        assert!(registry.create_room("two", "").is_ok());
    }

    #[tokio::test]
    async fn test_list_public_shape() {
        let mut registry = registry(8);
        registry.create_room("secret_club", "pw").unwrap();
        let listing = registry.list_public();
        assert_eq!(listing.len(), 2);

        let club = listing.iter().find(|r| r.name == "secret_club").unwrap();
        assert!(club.has_password);
        assert_eq!(club.cats, 0);

        let json = serde_json::to_string(&listing).unwrap();
        assert!(json.contains(r#""hasPassword":true"#));
        assert!(json.contains(r#""cats":0"#));
    }
}
