/// Packet content lookup.
pub mod packets;
/// Session document storage.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
