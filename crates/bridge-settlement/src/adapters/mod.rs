//! Backends for the settlement ports.
//!
//! - [`evm`]: a JSON-RPC node and a local signing key.
//! - [`memory`]: in-process ledger used by tests and `--simulate` runs.

pub mod evm;
pub mod memory;

pub use evm::EvmEscrowChain;
pub use memory::{CallEvent, CallLog, MemoryEscrow, MemoryRegistry, ScriptedStatusFeed};
