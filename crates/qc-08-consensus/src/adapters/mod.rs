//! Adapters layer: concrete implementations of the outbound ports the
//! domain layer depends on.

mod state_bridge;

pub use state_bridge::*;
