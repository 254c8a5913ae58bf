pub mod constants;
pub mod ids;
pub mod map;
pub mod player;
