pub mod clock;
pub mod packet;

pub use clock::MonotonicClock;
pub use packet::{PacketEvent, WorkItem};
