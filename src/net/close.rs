//! Application-level WebSocket close codes
//!
//! One code per rejection category so clients can tell apart "fix your
//! request" from "try another room" without parsing reason strings.

/// Request line or query parameters unusable
pub const MALFORMED_REQUEST: u16 = 4400;
/// Display name fails the pattern check
pub const INVALID_NAME: u16 = 4401;
/// Display name already in use in the room
pub const NAME_TAKEN: u16 = 4402;
/// Password did not match the room secret
pub const WRONG_PASSWORD: u16 = 4403;
/// No room with the requested id
pub const ROOM_NOT_FOUND: u16 = 4404;
/// Room is at its player cap
pub const ROOM_FULL: u16 = 4405;
/// Registry is at its room cap
pub const SERVER_AT_CAPACITY: u16 = 4406;
/// Chat spam threshold crossed
pub const TOO_MANY_MESSAGES: u16 = 4429;
/// Malformed or hostile frame after join
pub const PROTOCOL_VIOLATION: u16 = 4490;
