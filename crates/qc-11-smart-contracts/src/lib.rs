//! # Smart Contract Execution Engine
//!
//! A sandboxed EVM for executing deterministic smart contract bytecode.
//! Handles gas metering, memory expansion, warm/cold access-list accounting,
//! and the full `CREATE`/`CALL` family against a pluggable state backend.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Gas Limit Enforcement | `domain/invariants.rs` - `check_gas_limit_invariant()` |
//! | INVARIANT-2 | Deterministic Execution | `domain/invariants.rs` - `check_determinism_invariant()` |
//! | INVARIANT-3 | No State Change on Revert | `domain/invariants.rs` - `check_revert_rollback_invariant()` |
//! | INVARIANT-4 | Static Call Purity | `domain/invariants.rs` - `check_static_purity_invariant()` |
//! | INVARIANT-5 | Call Depth Limit | `domain/invariants.rs` - `check_call_depth_invariant()` |
//!
//! ### Execution safety limits
//!
//! | Limit | Value | Purpose |
//! |-------|-------|---------|
//! | `max_call_depth` | 1024 | Prevent stack overflow |
//! | `max_code_size` | 24 KB (EIP-170) | Limit contract size |
//! | `max_init_code_size` | 48 KB (EIP-3860) | Limit deployment code |
//! | `max_stack_size` | 1024 | EVM stack limit |
//! | `max_memory_size` | 16 MB | Memory expansion limit |
//! | `execution_timeout` | 5 seconds | Hard timeout |
//!
//! ## Outbound dependencies
//!
//! | Port | Purpose |
//! |------|---------|
//! | `StateAccess` | Read/write contract state |
//! | `Host` | Contract registry bookkeeping for CREATE/CREATE2/SELFDESTRUCT |
//! | `SignatureVerifier` | ecrecover precompile |
//!
//! ## EVM components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Interpreter | `evm/interpreter.rs` | Main execution engine |
//! | Stack | `evm/stack.rs` | 1024-item stack |
//! | Memory | `evm/memory.rs` | Dynamic memory with gas |
//! | Gas | `evm/gas.rs` | Cost tables & calculations |
//! | Precompiles | `evm/precompiles/` | ecrecover, sha256, modexp |
//!
//! ## Usage example
//!
//! ```ignore
//! use qc_11_smart_contracts::prelude::*;
//!
//! let engine = create_test_engine();
//! let result = engine.call(contract, input, sender, &block).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod evm;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccountState, BlockContext, ExecutionContext, ExecutionResult, EvmVersion, Log,
        StateChange, VmConfig,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, Bytes, EcdsaSignature, GasCounter, Hash, StorageKey, StorageValue, U256,
    };

    // Domain services
    pub use crate::domain::services::{
        compute_contract_address, compute_contract_address_create2, estimate_base_gas, keccak256,
        precompiles,
    };

    // Registry
    pub use crate::domain::registry::{Contract, ContractRegistry, RegistryError};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, limits, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::{SignedTransaction, SmartContractApi};
    pub use crate::ports::outbound::{
        AccessList, AccessStatus, BlockHashOracle, Host, SignatureVerifier, StateAccess,
    };

    // Errors
    pub use crate::errors::{PrecompileError, StateError, VmError};

    // EVM components
    pub use crate::evm::{
        gas, memory::Memory, opcodes::Opcode, stack::Stack, transient::TransientStorage,
        Interpreter,
    };

    // Adapters
    pub use crate::adapters::{InMemoryAccessList, InMemoryState};

    // Service
    pub use crate::service::{create_test_engine, EngineConfig, EngineStats, ExecutionEngine};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        // Verify prelude exports compile
        use prelude::*;
        let _ = VmConfig::default();
        let _ = Address::ZERO;
    }
}
