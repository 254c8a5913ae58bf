/// Room capacity constants - MAX_PLAYERS is a wire-format bound (ids fit 8 bits)
pub mod rooms {
    /// Maximum concurrent rooms in the registry
    pub const MAX_ROOMS: usize = 256;
    /// Maximum players per room; player ids are reused from a bounded pool
    pub const MAX_PLAYERS: u8 = 64;
    /// The permanent room seeded at startup, never destroyed
    pub const DEFAULT_ROOM_ID: &str = "default_room";
    /// Mailbox depth for a room's command channel
    pub const MAILBOX_CAPACITY: usize = 256;
}

/// Spawn coordinates
pub mod spawn {
    /// Player spawn cell
    pub const PLAYER_X: u8 = 50;
    pub const PLAYER_Y: u8 = 32;
    /// Initial shared item cell
    pub const MOUSE_X: u8 = 54;
    pub const MOUSE_Y: u8 = 41;
}

/// Mechanic timing windows
pub mod mechanics {
    use std::time::Duration;

    /// How long a freshly-tagged player stays frozen
    pub const FREEZE_DURATION: Duration = Duration::from_secs(5);
    /// Minimum gap between pad announcements from one player
    pub const PAD_COOLDOWN: Duration = Duration::from_secs(5);
    /// Minimum gap between "already has one" notices from one player
    pub const REPEAT_FIND_COOLDOWN: Duration = Duration::from_secs(5);
}

/// Chat limits enforced per connection
pub mod chat {
    use std::time::Duration;

    /// Text frames longer than this are dropped without reply
    pub const MAX_LEN: usize = 50;
    /// Closing threshold for the decaying spam counter
    pub const SPAM_LIMIT: u32 = 10;
    /// Decay step interval for the spam counter
    pub const SPAM_DECAY: Duration = Duration::from_secs(1);
}

/// Connection liveness probing
pub mod heartbeat {
    use std::time::Duration;

    /// Probe cycle; a socket silent for two cycles is terminated
    pub const INTERVAL: Duration = Duration::from_secs(30);
}

/// Join-request validation bounds
pub mod auth {
    /// Longest password accepted at join or room creation
    pub const MAX_PASSWORD_LEN: usize = 100;
    /// Player display name length bound (word characters only)
    pub const MAX_NAME_LEN: usize = 10;
    /// Room display name length bound (word characters only)
    pub const MAX_ROOM_NAME_LEN: usize = 20;
}
