//! Ports layer (Hexagonal Architecture): the driving contract the
//! Consensus Integration service implements. The outbound ports it depends
//! on are the ones `qc-04-state-management` and `qc-11-smart-contracts`
//! already expose (`StateStoreApi`, `SmartContractApi`) — no outbound port
//! of its own is needed.

mod inbound;

pub use inbound::*;
