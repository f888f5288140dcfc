//! WebSocket transport: wire protocol and socket handling

pub mod handler;
pub mod protocol;
