//! Structured events and the per-kind emission authorization policy.
//!
//! Events are the invocation's side-effect log: append-only, ordered, and
//! only created through the runtime's `notify`. Kinds with protocol side
//! effects may only be emitted by the single native contract owning that
//! concern; everything else (token movement, account, market and custom
//! kinds) is unrestricted.

use num_bigint::BigInt;
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{VmError, VmResult};
use crate::types::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, strum::Display)]
#[repr(u32)]
pub enum EventKind {
    Unknown = 0,
    ChainCreate = 1,
    BlockCreate = 2,
    BlockClose = 3,
    TokenCreate = 4,
    TokenSend = 5,
    TokenReceive = 6,
    TokenMint = 7,
    TokenBurn = 8,
    TokenStake = 9,
    TokenUnstake = 10,
    TokenClaim = 11,
    AddressRegister = 12,
    AddressLink = 13,
    AddressUnlink = 14,
    GasEscrow = 15,
    GasPayment = 16,
    GasLoan = 17,
    OrderCreated = 18,
    OrderCancelled = 19,
    OrderFilled = 20,
    OrderClosed = 21,
    FeedCreate = 22,
    FeedUpdate = 23,
    FileCreate = 24,
    FileDelete = 25,
    ValidatorAdd = 26,
    ValidatorRemove = 27,
    ValidatorSwitch = 28,
    BrokerRequest = 29,
    ValueCreate = 30,
    ValueUpdate = 31,
    PollCreated = 32,
    PollClosed = 33,
    PollVote = 34,
    Custom = 64,
}

/// The native contracts deployed on every chain, each owning one protocol
/// concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeContract {
    /// Fee accounting: escrow, payment and loans of gas.
    Gas,
    /// Block lifecycle management.
    Block,
    /// Governance polls and voting.
    Consensus,
    /// Root registry: chains, tokens and price feeds.
    Registry,
    /// File storage.
    Storage,
    /// Validator set management.
    Validator,
    /// Cross-chain interop brokerage.
    Interop,
    /// Chain parameter governance.
    Governance,
}

impl NativeContract {
    pub fn contract_name(&self) -> &'static str {
        match self {
            NativeContract::Gas => "gas",
            NativeContract::Block => "block",
            NativeContract::Consensus => "consensus",
            NativeContract::Registry => "registry",
            NativeContract::Storage => "storage",
            NativeContract::Validator => "validator",
            NativeContract::Interop => "interop",
            NativeContract::Governance => "governance",
        }
    }

    pub fn address(&self) -> Address {
        Address::from_contract_name(self.contract_name())
    }
}

/// The sole contract allowed to emit `kind`, or `None` when unrestricted.
pub fn required_emitter(kind: EventKind) -> Option<NativeContract> {
    use EventKind::*;
    match kind {
        GasEscrow | GasPayment | GasLoan => Some(NativeContract::Gas),
        BlockCreate | BlockClose | ValidatorSwitch => Some(NativeContract::Block),
        PollCreated | PollClosed | PollVote => Some(NativeContract::Consensus),
        ChainCreate | TokenCreate | FeedCreate => Some(NativeContract::Registry),
        FileCreate | FileDelete => Some(NativeContract::Storage),
        ValidatorAdd | ValidatorRemove => Some(NativeContract::Validator),
        BrokerRequest => Some(NativeContract::Interop),
        ValueCreate | ValueUpdate => Some(NativeContract::Governance),
        _ => None,
    }
}

/// One emitted event. The emitting contract is resolved from the call frame
/// active at emission time, never supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub address: Address,
    pub contract: String,
    pub data: Vec<u8>,
}

/// Payload of the gas escrow/payment/loan event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEventData {
    pub amount: BigInt,
    pub price: BigInt,
}

impl GasEventData {
    pub fn encode(&self) -> Vec<u8> {
        // infallible for this struct shape
        bincode::serialize(self).unwrap_or_default()
    }

    pub fn decode(bytes: &[u8]) -> VmResult<Self> {
        bincode::deserialize(bytes).map_err(|err| {
            VmError::InvalidArgument(format!("malformed gas event payload: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_kinds_map_to_their_owning_contract() {
        assert_eq!(required_emitter(EventKind::GasEscrow), Some(NativeContract::Gas));
        assert_eq!(required_emitter(EventKind::GasPayment), Some(NativeContract::Gas));
        assert_eq!(required_emitter(EventKind::GasLoan), Some(NativeContract::Gas));
        assert_eq!(required_emitter(EventKind::BlockCreate), Some(NativeContract::Block));
        assert_eq!(required_emitter(EventKind::BlockClose), Some(NativeContract::Block));
        assert_eq!(
            required_emitter(EventKind::ValidatorSwitch),
            Some(NativeContract::Block)
        );
        assert_eq!(required_emitter(EventKind::PollVote), Some(NativeContract::Consensus));
        assert_eq!(required_emitter(EventKind::ChainCreate), Some(NativeContract::Registry));
        assert_eq!(required_emitter(EventKind::TokenCreate), Some(NativeContract::Registry));
        assert_eq!(required_emitter(EventKind::FeedCreate), Some(NativeContract::Registry));
        assert_eq!(required_emitter(EventKind::FileCreate), Some(NativeContract::Storage));
        assert_eq!(
            required_emitter(EventKind::ValidatorAdd),
            Some(NativeContract::Validator)
        );
        assert_eq!(
            required_emitter(EventKind::BrokerRequest),
            Some(NativeContract::Interop)
        );
        assert_eq!(
            required_emitter(EventKind::ValueUpdate),
            Some(NativeContract::Governance)
        );
    }

    #[test]
    fn token_and_custom_kinds_are_unrestricted() {
        assert_eq!(required_emitter(EventKind::TokenSend), None);
        assert_eq!(required_emitter(EventKind::TokenMint), None);
        assert_eq!(required_emitter(EventKind::AddressRegister), None);
        assert_eq!(required_emitter(EventKind::OrderCreated), None);
        assert_eq!(required_emitter(EventKind::Custom), None);
    }

    #[test]
    fn gas_event_payload_round_trips() {
        let data = GasEventData {
            amount: BigInt::from(10_000),
            price: BigInt::from(3),
        };
        let decoded = GasEventData::decode(&data.encode()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn garbage_gas_payload_is_a_fault() {
        assert!(GasEventData::decode(&[0xFF; 3]).is_err());
    }
}
