//! In-memory stand-ins for the runtime's collaborators, used by the test
//! suites. Not part of the public contract of the crate.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use num_bigint::BigInt;

use crate::chain::{
    ChainLedger, ChangeSet, OracleReader, TokenFlags, TokenInfo, FIAT_TOKEN_DECIMALS,
    FIAT_TOKEN_SYMBOL, FUEL_TOKEN_SYMBOL, STAKING_TOKEN_SYMBOL,
};
use crate::error::{VmError, VmResult};
use crate::types::Address;

/// Change-set backed by an ordered map, tracking whether anything mutated.
#[derive(Debug, Default)]
pub struct MemoryChangeSet {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    mutated: bool,
}

impl MemoryChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates an entry without counting as a mutation, for read tests.
    pub fn seed(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }

    pub fn entries(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.entries
    }
}

impl ChangeSet for MemoryChangeSet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
        self.mutated = true;
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
        self.mutated = true;
    }

    fn has_any_mutation(&self) -> bool {
        self.mutated
    }
}

/// Oracle answering from a fixed URL-to-bytes table.
#[derive(Debug, Default)]
pub struct TestOracle {
    feeds: HashMap<String, Vec<u8>>,
}

impl TestOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, url: &str, value: &[u8]) {
        self.feeds.insert(url.to_string(), value.to_vec());
    }

    /// Convenience for price feeds: stores `value` under `price://<symbol>`
    /// in the little-endian unsigned encoding the runtime decodes.
    pub fn set_price(&mut self, symbol: &str, value: u64) {
        let bytes = num_bigint::BigUint::from(value).to_bytes_le();
        self.set(&format!("price://{symbol}"), &bytes);
    }
}

impl OracleReader for TestOracle {
    fn read(&self, url: &str) -> VmResult<Vec<u8>> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| VmError::InvalidArgument(format!("no oracle entry for {url}")))
    }
}

/// Ledger with a configurable token/contract registry, recording token
/// movements so tests can assert on them.
pub struct TestLedger {
    pub name: String,
    pub owner: Address,
    pub genesis: bool,
    pub parent: Option<String>,
    tokens: HashMap<String, TokenInfo>,
    contracts: HashMap<String, Vec<u8>>,
    account_scripts: HashMap<Address, Vec<u8>>,
    names: HashMap<String, Address>,
    transfers: RefCell<Vec<String>>,
    mints: RefCell<Vec<String>>,
    deployments: RefCell<Vec<Address>>,
    next_token_id: Cell<u64>,
    pub fail_transfers: bool,
}

impl TestLedger {
    /// A main chain with genesis done and the three protocol tokens known.
    pub fn new() -> Self {
        let mut ledger = Self {
            name: "main".to_string(),
            owner: Address::from_bytes(&[1u8; 32]).unwrap_or(Address::NULL),
            genesis: true,
            parent: None,
            tokens: HashMap::new(),
            contracts: HashMap::new(),
            account_scripts: HashMap::new(),
            names: HashMap::new(),
            transfers: RefCell::new(Vec::new()),
            mints: RefCell::new(Vec::new()),
            deployments: RefCell::new(Vec::new()),
            next_token_id: Cell::new(1),
            fail_transfers: false,
        };
        ledger.add_token(FIAT_TOKEN_SYMBOL, FIAT_TOKEN_DECIMALS);
        ledger.add_token(FUEL_TOKEN_SYMBOL, 10);
        ledger.add_token(STAKING_TOKEN_SYMBOL, 8);
        ledger
    }

    pub fn add_token(&mut self, symbol: &str, decimals: u32) {
        self.tokens.insert(
            symbol.to_string(),
            TokenInfo {
                symbol: symbol.to_string(),
                name: symbol.to_string(),
                decimals,
                flags: TokenFlags::TRANSFERABLE | TokenFlags::FUNGIBLE | TokenFlags::DIVISIBLE,
            },
        );
    }

    pub fn add_contract(&mut self, name: &str, script: Vec<u8>) {
        self.contracts.insert(name.to_string(), script);
    }

    pub fn add_account_script(&mut self, address: Address, script: Vec<u8>) {
        self.account_scripts.insert(address, script);
    }

    pub fn register_name(&mut self, name: &str, address: Address) {
        self.names.insert(name.to_string(), address);
    }

    pub fn transfers(&self) -> Vec<String> {
        self.transfers.borrow().clone()
    }

    pub fn mints(&self) -> Vec<String> {
        self.mints.borrow().clone()
    }

    pub fn deployments(&self) -> Vec<Address> {
        self.deployments.borrow().clone()
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainLedger for TestLedger {
    fn chain_name(&self) -> &str {
        &self.name
    }

    fn chain_address(&self) -> Address {
        Address::from_contract_name(&self.name)
    }

    fn parent_chain_name(&self) -> Option<String> {
        self.parent.clone()
    }

    fn has_genesis(&self) -> bool {
        self.genesis
    }

    fn chain_owner(&self) -> Address {
        self.owner
    }

    fn token_exists(&self, symbol: &str) -> bool {
        self.tokens.contains_key(symbol)
    }

    fn token_info(&self, symbol: &str) -> Option<TokenInfo> {
        self.tokens.get(symbol).cloned()
    }

    fn contract_script(&self, name: &str) -> Option<Vec<u8>> {
        self.contracts.get(name).cloned()
    }

    fn address_script(&self, address: &Address) -> Option<Vec<u8>> {
        self.account_scripts.get(address).cloned()
    }

    fn lookup_name(&self, name: &str) -> Option<Address> {
        self.names.get(name).copied()
    }

    fn transfer_tokens(
        &self,
        symbol: &str,
        source: &Address,
        destination: &Address,
        amount: &BigInt,
    ) -> bool {
        if self.fail_transfers {
            return false;
        }
        self.transfers
            .borrow_mut()
            .push(format!("{amount} {symbol}: {source} -> {destination}"));
        true
    }

    fn transfer_token(
        &self,
        symbol: &str,
        source: &Address,
        destination: &Address,
        token_id: &BigInt,
    ) -> bool {
        if self.fail_transfers {
            return false;
        }
        self.transfers
            .borrow_mut()
            .push(format!("{symbol}#{token_id}: {source} -> {destination}"));
        true
    }

    fn mint_tokens(&self, symbol: &str, destination: &Address, amount: &BigInt) -> bool {
        self.mints
            .borrow_mut()
            .push(format!("{amount} {symbol} -> {destination}"));
        true
    }

    fn mint_token(
        &self,
        symbol: &str,
        destination: &Address,
        _rom: &[u8],
        _ram: &[u8],
    ) -> Option<BigInt> {
        let id = self.next_token_id.get();
        self.next_token_id.set(id + 1);
        self.mints
            .borrow_mut()
            .push(format!("{symbol}#{id} -> {destination}"));
        Some(BigInt::from(id))
    }

    fn deploy_native_contract(&self, address: &Address) -> bool {
        self.deployments.borrow_mut().push(*address);
        true
    }
}
