//! # qc-04-state-management
//!
//! The State Store and Storage Adapter: the versioned, per-contract state
//! manager described in spec.md §3/§4.2/§4.3.
//!
//! ## Role in the workspace
//!
//! - **Single source of truth**: the only owner of every [`ContractState`].
//!   All outbound accessors return deep copies (spec.md §3's ownership rule).
//! - **Bounded history**: a per-address snapshot list, pruned to
//!   `StateConfig::max_history_size`, with atomic backup/rollback on a
//!   failed `update_contract_state`.
//! - **Storage Adapter**: a cache/pending/deleted overlay over a flat
//!   [`KvBackend`], scoped by `"<address-hex>:<hash-hex>"` keys.
//!
//! The Consensus Integration crate (`qc-08-consensus`) holds a non-owning
//! handle to this crate's [`StateStore`] rather than embedding it, per
//! spec.md §9's cyclic-reference note.
//!
//! ## Domain invariants
//!
//! | ID | Invariant | Enforcement location |
//! |----|-----------|-----------------------|
//! | I-1 | Version strictly increases per accepted update | `domain/store.rs` - `update_contract_state()` |
//! | I-2 | Failed update leaves state byte-identical | `domain/store.rs` - `update_contract_state()` (backup/restore) |
//! | I-3 | Snapshot list length ≤ `MaxHistorySize` | `domain/store.rs` - `update_contract_state()` pruning |
//! | I-4 | Deterministic, order-independent storage root | `domain/store.rs` - `recompute_storage_root()` |
//! | I-5 | Commit is terminal for the Storage Adapter | `domain/storage_adapter.rs` - `commit()`/`rollback()` |
//!
//! ## Modules
//!
//! - `domain`: value objects, entities, the `StateStore`, and the `StorageAdapter`
//! - `ports`: the driven-side `StateStoreApi`/`StorageAdapterApi` traits and
//!   the outbound `KvBackend` port
//! - `adapters`: an in-memory `KvBackend` test double
//! - `metrics`: optional Prometheus counters (the `metrics` feature)

#![warn(missing_docs)]
#![allow(missing_docs)] // TODO: Add documentation for all public items

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
