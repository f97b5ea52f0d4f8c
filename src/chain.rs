// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Collaborator contracts consumed by the runtime: the chain/ledger registry,
//! the transactional storage change-set and the oracle reader, plus the
//! transaction container and token metadata they exchange.

use bitflags::bitflags;
use num_bigint::BigInt;

use crate::error::VmResult;
use crate::types::{Address, Hash};

/// Reference fiat token used as the common denominator for oracle quotes.
pub const FIAT_TOKEN_SYMBOL: &str = "USD";
pub const FIAT_TOKEN_DECIMALS: u32 = 8;

/// The network's gas/fuel token. Priced at one fifth of the staking token.
pub const FUEL_TOKEN_SYMBOL: &str = "FUEL";

/// The staking token.
pub const STAKING_TOKEN_SYMBOL: &str = "STAKE";

bitflags! {
    pub struct TokenFlags: u32 {
        const NONE         = 0;
        const TRANSFERABLE = 1 << 0;
        const FUNGIBLE     = 1 << 1;
        const FINITE       = 1 << 2;
        const DIVISIBLE    = 1 << 3;
        const BURNABLE     = 1 << 4;
    }
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    pub flags: TokenFlags,
}

/// A signed transaction, reduced to what the runtime needs: its identity and
/// the set of addresses carrying a valid signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    hash: Hash,
    signers: Vec<Address>,
}

impl Transaction {
    pub fn new(hash: Hash, signers: Vec<Address>) -> Self {
        Self { hash, signers }
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn is_signed_by(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }
}

/// Transactional view of storage mutations accumulated during one invocation.
pub trait ChangeSet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn put(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
    /// True once any write or delete happened through this change-set.
    fn has_any_mutation(&self) -> bool;
}

/// External data-feed collaborator supplying prices and arbitrary off-chain
/// data by URL-like key.
pub trait OracleReader {
    fn read(&self, url: &str) -> VmResult<Vec<u8>>;
}

/// The chain/ledger object graph: token registry, contract registry and the
/// token movement primitives host calls delegate to.
pub trait ChainLedger {
    fn chain_name(&self) -> &str;
    fn chain_address(&self) -> Address;
    /// Name of the parent chain, absent for root chains.
    fn parent_chain_name(&self) -> Option<String>;
    /// False until the genesis token is minted; gas accounting is suspended
    /// before that point.
    fn has_genesis(&self) -> bool;
    fn chain_owner(&self) -> Address;

    fn token_exists(&self, symbol: &str) -> bool;
    fn token_info(&self, symbol: &str) -> Option<TokenInfo>;

    /// Bytecode of a named contract deployed on this chain.
    fn contract_script(&self, name: &str) -> Option<Vec<u8>>;
    /// Custom script attached to a user account, if any.
    fn address_script(&self, address: &Address) -> Option<Vec<u8>>;
    fn lookup_name(&self, name: &str) -> Option<Address>;

    fn transfer_tokens(
        &self,
        symbol: &str,
        source: &Address,
        destination: &Address,
        amount: &BigInt,
    ) -> bool;
    fn transfer_token(
        &self,
        symbol: &str,
        source: &Address,
        destination: &Address,
        token_id: &BigInt,
    ) -> bool;
    fn mint_tokens(&self, symbol: &str, destination: &Address, amount: &BigInt) -> bool;
    /// Mints one non-fungible item and returns its assigned identifier.
    fn mint_token(
        &self,
        symbol: &str,
        destination: &Address,
        rom: &[u8],
        ram: &[u8],
    ) -> Option<BigInt>;

    fn deploy_native_contract(&self, address: &Address) -> bool;
}

/// Rescales an integer token amount between decimal precisions using exact
/// integer arithmetic. Never goes through floating point: results feed fee
/// and settlement computations.
pub fn convert_decimals(value: &BigInt, from_decimals: u32, to_decimals: u32) -> BigInt {
    use core::cmp::Ordering;
    match to_decimals.cmp(&from_decimals) {
        Ordering::Equal => value.clone(),
        Ordering::Greater => value * BigInt::from(10u32).pow(to_decimals - from_decimals),
        Ordering::Less => value / BigInt::from(10u32).pow(from_decimals - to_decimals),
    }
}
