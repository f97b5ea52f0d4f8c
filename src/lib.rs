// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Host-side execution context for contract bytecode.
//!
//! The crate drives one contract invocation at a time: it interprets the
//! script, charges gas for every step, mediates all host access through a
//! named dispatch table, emits authorized events, answers oracle price
//! queries with exact integer arithmetic, and supports deterministic
//! randomness and nested trigger sub-execution. Chain state, storage and
//! oracles are reached through the traits in [`chain`], so the engine itself
//! stays independent of any particular ledger implementation.

pub mod abi;
pub mod builder;
pub mod chain;
pub mod disasm;
pub mod error;
pub mod event;
pub mod extcalls;
pub mod gas;
pub mod opcode;
pub mod runtime;
pub mod testing;
pub mod types;
pub mod value;
pub mod vm;

pub use abi::{ContractInterface, ContractMethod, ContractParameter};
pub use builder::ScriptBuilder;
pub use chain::{ChainLedger, ChangeSet, OracleReader, TokenFlags, TokenInfo, Transaction};
pub use error::{VmError, VmResult};
pub use event::{Event, EventKind, GasEventData, NativeContract};
pub use extcalls::ExtcallHandler;
pub use runtime::RuntimeContext;
pub use types::{Address, Hash, Timestamp};
pub use value::{Stack, VmType, VmValue};
pub use vm::ExecutionState;
