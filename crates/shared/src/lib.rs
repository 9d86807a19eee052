//! Shared types and wire codecs for the HostelMate client.

pub mod error;
pub mod events;
pub mod models;
pub mod protocol;

pub use error::*;
pub use events::*;
pub use models::*;
pub use protocol::*;
