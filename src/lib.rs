//! Alleycat Server Library
//!
//! The authoritative server for a small real-time multiplayer grid game:
//! cats (and the odd dog) move on a fixed tile map split into rooms, carry
//! a mouse around, and chat. Clients connect over WebSocket; the server is
//! the single source of truth for position, identity, and mechanics.
//!
//! Layering, leaves first: `game` holds the map oracle and pure player
//! logic, `room` owns per-session state behind one actor task per room,
//! and `net` carries the wire codec, connection sessions, liveness
//! probing, and the HTTP lobby surface.

pub mod config;
pub mod game;
pub mod net;
pub mod room;
