pub mod close;
pub mod codec;
pub mod heartbeat;
pub mod http;
pub mod session;
