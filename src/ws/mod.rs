pub mod connection;
pub mod liveness;
