//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for Smart Contract execution.
//! These are the interfaces between the domain and the outside world.
//!
//! ## Hexagonal layering
//!
//! - **Driving Ports (Inbound)**: `SmartContractApi`
//! - **Driven Ports (Outbound)**: `StateAccess`, `Host`, `SignatureVerifier`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
