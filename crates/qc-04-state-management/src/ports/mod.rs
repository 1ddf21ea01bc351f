//! # Ports
//!
//! Hexagonal boundary traits: `api` is the inbound (driven) contract callers
//! use, `database` is the outbound port the Storage Adapter is built on.

pub mod api;
pub mod database;

pub use api::*;
pub use database::*;
