pub mod manager;
pub mod router;

pub use manager::{Member, Outbox, Room, RoomError, RoomManager, RoomSummary};
pub use router::{Connection, ConnectionRouter};
