pub mod connection;
mod connection_tx_storage;
pub mod handlers;
pub mod relay;
mod room_registry;
