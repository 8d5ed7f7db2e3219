//! Utility modules: wall-clock alignment, pacing, and formatting

pub mod clock;
pub mod pacer;
pub mod time;

pub use clock::{delay_to_next_minute, SystemClock, WallClock};
pub use pacer::Pacer;
