// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Bytecode assembly.
//!
//! `ScriptBuilder` emits the binary instruction encoding the interpreter
//! consumes. It is the writing half of the wire format: one opcode byte,
//! then register operands as single bytes, code offsets as little-endian
//! `u16`, and literals as a type tag plus a `u16` length-prefixed payload.

use crate::error::{VmError, VmResult};
use crate::opcode::Opcode;
use crate::value::{VmType, VmValue};

#[derive(Debug, Default)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write offset, usable as a jump or call target.
    pub fn offset(&self) -> usize {
        self.bytes.len()
    }

    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        self.bytes.push(opcode as u8);
        self
    }

    pub fn emit_move(&mut self, src: u8, dst: u8) -> &mut Self {
        self.emit(Opcode::MOVE);
        self.bytes.push(src);
        self.bytes.push(dst);
        self
    }

    pub fn emit_copy(&mut self, src: u8, dst: u8) -> &mut Self {
        self.emit(Opcode::COPY);
        self.bytes.push(src);
        self.bytes.push(dst);
        self
    }

    pub fn emit_push(&mut self, src: u8) -> &mut Self {
        self.emit(Opcode::PUSH);
        self.bytes.push(src);
        self
    }

    pub fn emit_pop(&mut self, dst: u8) -> &mut Self {
        self.emit(Opcode::POP);
        self.bytes.push(dst);
        self
    }

    pub fn emit_swap(&mut self, a: u8, b: u8) -> &mut Self {
        self.emit(Opcode::SWAP);
        self.bytes.push(a);
        self.bytes.push(b);
        self
    }

    pub fn emit_call(&mut self, target: u16) -> &mut Self {
        self.emit(Opcode::CALL);
        self.bytes.extend_from_slice(&target.to_le_bytes());
        self
    }

    pub fn emit_jmp(&mut self, target: u16) -> &mut Self {
        self.emit(Opcode::JMP);
        self.bytes.extend_from_slice(&target.to_le_bytes());
        self
    }

    pub fn emit_jmp_if(&mut self, src: u8, target: u16) -> &mut Self {
        self.emit(Opcode::JMPIF);
        self.bytes.push(src);
        self.bytes.extend_from_slice(&target.to_le_bytes());
        self
    }

    pub fn emit_jmp_not(&mut self, src: u8, target: u16) -> &mut Self {
        self.emit(Opcode::JMPNOT);
        self.bytes.push(src);
        self.bytes.extend_from_slice(&target.to_le_bytes());
        self
    }

    pub fn emit_ret(&mut self) -> &mut Self {
        self.emit(Opcode::RET)
    }

    pub fn emit_throw(&mut self) -> &mut Self {
        self.emit(Opcode::THROW)
    }

    pub fn emit_ctx(&mut self, src: u8, dst: u8) -> &mut Self {
        self.emit(Opcode::CTX);
        self.bytes.push(src);
        self.bytes.push(dst);
        self
    }

    pub fn emit_switch(&mut self, src: u8) -> &mut Self {
        self.emit(Opcode::SWITCH);
        self.bytes.push(src);
        self
    }

    /// Emits a literal load into `dst`. Only value kinds with a literal wire
    /// form can be emitted; objects and `None` have none.
    pub fn emit_load(&mut self, dst: u8, value: &VmValue) -> VmResult<&mut Self> {
        let (vm_type, payload): (VmType, Vec<u8>) = match value {
            VmValue::Bytes(b) => (VmType::Bytes, b.clone()),
            VmValue::String(s) => (VmType::String, s.as_bytes().to_vec()),
            VmValue::Number(n) => (VmType::Number, n.to_signed_bytes_le()),
            VmValue::Bool(b) => (VmType::Bool, vec![*b as u8]),
            VmValue::Enum(v) => (VmType::Enum, v.to_le_bytes().to_vec()),
            VmValue::Timestamp(t) => (VmType::Timestamp, t.value().to_le_bytes().to_vec()),
            VmValue::Address(a) => (VmType::Bytes, a.to_bytes().to_vec()),
            VmValue::Hash(h) => (VmType::Bytes, h.to_bytes().to_vec()),
            other => {
                return Err(VmError::InvalidArgument(format!(
                    "no literal encoding for {}",
                    other.kind()
                )))
            }
        };
        if payload.len() > u16::MAX as usize {
            return Err(VmError::InvalidArgument("literal too large".into()));
        }

        self.emit(Opcode::LOAD);
        self.bytes.push(dst);
        self.bytes.push(vm_type as u8);
        self.bytes
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes.extend_from_slice(&payload);
        Ok(self)
    }

    /// Loads the method name into `reg` and dispatches it. The scratch
    /// register is clobbered.
    pub fn emit_extcall(&mut self, reg: u8, method: &str) -> VmResult<&mut Self> {
        self.emit_load(reg, &VmValue::String(method.to_string()))?;
        self.emit(Opcode::EXTCALL);
        self.bytes.push(reg);
        Ok(self)
    }

    /// Pushes `value` through a scratch register.
    pub fn emit_push_value(&mut self, reg: u8, value: &VmValue) -> VmResult<&mut Self> {
        self.emit_load(reg, value)?;
        Ok(self.emit_push(reg))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}
