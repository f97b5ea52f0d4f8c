// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use core::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{VmError, VmResult};

/// Length in bytes of the public key material backing an address.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length in bytes of a hash value.
pub const HASH_LENGTH: usize = 32;

/// Account classes, encoded in the first byte of the raw address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Null,
    User,
    System,
    Interop,
}

const ADDRESS_PREFIX_USER: u8 = 1;
const ADDRESS_PREFIX_SYSTEM: u8 = 2;
const ADDRESS_PREFIX_INTEROP: u8 = 3;

/// An account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address([u8; PUBLIC_KEY_LENGTH]);

impl Address {
    pub const NULL: Address = Address([0u8; PUBLIC_KEY_LENGTH]);

    /// Builds an address from raw bytes. The input must be exactly
    /// [`PUBLIC_KEY_LENGTH`] bytes; anything else is a fault.
    pub fn from_bytes(bytes: &[u8]) -> VmResult<Self> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(VmError::InvalidArgument(format!(
                "invalid key: expected {PUBLIC_KEY_LENGTH} bytes, found {}",
                bytes.len()
            )));
        }
        let mut data = [0u8; PUBLIC_KEY_LENGTH];
        data.copy_from_slice(bytes);
        Ok(Address(data))
    }

    /// Deterministic system address assigned to a native contract name.
    pub fn from_contract_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut data = [0u8; PUBLIC_KEY_LENGTH];
        data.copy_from_slice(&digest);
        data[0] = ADDRESS_PREFIX_SYSTEM;
        Address(data)
    }

    pub fn kind(&self) -> AddressKind {
        if self.0 == [0u8; PUBLIC_KEY_LENGTH] {
            return AddressKind::Null;
        }
        match self.0[0] {
            ADDRESS_PREFIX_SYSTEM => AddressKind::System,
            ADDRESS_PREFIX_INTEROP => AddressKind::Interop,
            _ => AddressKind::User,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind() == AddressKind::Null
    }

    pub fn is_user(&self) -> bool {
        self.kind() == AddressKind::User
    }

    pub fn is_system(&self) -> bool {
        self.kind() == AddressKind::System
    }

    pub fn is_interop(&self) -> bool {
        self.kind() == AddressKind::Interop
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A 256-bit hash, typically a transaction or block identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash([u8; HASH_LENGTH]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_LENGTH]);

    pub fn from_bytes(bytes: &[u8]) -> VmResult<Self> {
        if bytes.len() != HASH_LENGTH {
            return Err(VmError::InvalidArgument(format!(
                "invalid hash: expected {HASH_LENGTH} bytes, found {}",
                bytes.len()
            )));
        }
        let mut data = [0u8; HASH_LENGTH];
        data.copy_from_slice(bytes);
        Ok(Hash(data))
    }

    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; HASH_LENGTH];
        out.copy_from_slice(&digest);
        Hash(out)
    }

    pub fn to_bytes(&self) -> [u8; HASH_LENGTH] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Unix timestamp with second resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub u32);

impl Timestamp {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Timestamp {
    fn from(value: u32) -> Self {
        Timestamp(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
