//! Binary ABI descriptors for deployed contracts.
//!
//! The descriptor is the compact wire form a contract publishes alongside its
//! bytecode: a method list with parameter names and value kinds. The `ABI()`
//! constructor host call deserializes it from untrusted bytes, so every read
//! here is bounds-checked and resolves to a fault on malformed input.

use num_traits::FromPrimitive;

use crate::error::{VmError, VmResult};
use crate::value::VmType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractParameter {
    pub name: String,
    pub vm_type: VmType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractMethod {
    pub name: String,
    pub return_type: VmType,
    pub parameters: Vec<ContractParameter>,
}

/// The public interface of a contract: its callable methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInterface {
    pub methods: Vec<ContractMethod>,
}

impl ContractInterface {
    pub fn decode(bytes: &[u8]) -> VmResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let method_count = reader.read_u8()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let name = reader.read_string()?;
            let return_type = reader.read_vm_type()?;
            let parameter_count = reader.read_u8()?;
            let mut parameters = Vec::with_capacity(parameter_count as usize);
            for _ in 0..parameter_count {
                let name = reader.read_string()?;
                let vm_type = reader.read_vm_type()?;
                parameters.push(ContractParameter { name, vm_type });
            }
            methods.push(ContractMethod {
                name,
                return_type,
                parameters,
            });
        }
        Ok(ContractInterface { methods })
    }

    pub fn method(&self, name: &str) -> Option<&ContractMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn read_u8(&mut self) -> VmResult<u8> {
        let byte = *self
            .data
            .get(self.position)
            .ok_or_else(|| VmError::InvalidArgument("invalid abi: truncated input".into()))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_string(&mut self) -> VmResult<String> {
        let length = self.read_u8()? as usize;
        let end = self.position + length;
        let slice = self
            .data
            .get(self.position..end)
            .ok_or_else(|| VmError::InvalidArgument("invalid abi: truncated string".into()))?;
        self.position = end;
        String::from_utf8(slice.to_vec())
            .map_err(|_| VmError::InvalidArgument("invalid abi: name is not utf-8".into()))
    }

    fn read_vm_type(&mut self) -> VmResult<VmType> {
        let raw = self.read_u8()?;
        VmType::from_u8(raw)
            .ok_or_else(|| VmError::InvalidArgument(format!("invalid abi: unknown type {raw}")))
    }
}
