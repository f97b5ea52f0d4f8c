// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Static bytecode inspection.
//!
//! Decodes the instruction stream without executing it, chiefly so callers
//! can enumerate which host methods a script is able to reach before
//! admitting it to a chain.

use std::collections::{BTreeSet, HashMap};

use num_traits::FromPrimitive;

use crate::error::{VmError, VmResult};
use crate::opcode::Opcode;
use crate::value::VmType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    /// An absolute code offset, as carried by jumps and calls.
    Offset(u16),
    Literal(VmType, Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

/// Decodes a whole script into its instruction sequence. Faults on unknown
/// opcode bytes and on operands running past the end of the script.
pub fn disassemble(script: &[u8]) -> VmResult<Vec<Instruction>> {
    let mut reader = Reader {
        script,
        position: 0,
    };
    let mut instructions = Vec::new();

    while reader.position < script.len() {
        let offset = reader.position;
        let raw = reader.read_u8()?;
        let opcode = Opcode::from_u8(raw)
            .ok_or_else(|| VmError::BadScript(format!("invalid opcode 0x{raw:02x}")))?;

        let operands = match opcode {
            Opcode::MOVE | Opcode::COPY | Opcode::SWAP | Opcode::CTX => vec![
                Operand::Register(reader.read_u8()?),
                Operand::Register(reader.read_u8()?),
            ],
            Opcode::PUSH | Opcode::POP | Opcode::EXTCALL | Opcode::SWITCH => {
                vec![Operand::Register(reader.read_u8()?)]
            }
            Opcode::CALL | Opcode::JMP => vec![Operand::Offset(reader.read_u16()?)],
            Opcode::JMPIF | Opcode::JMPNOT => vec![
                Operand::Register(reader.read_u8()?),
                Operand::Offset(reader.read_u16()?),
            ],
            Opcode::LOAD => {
                let register = Operand::Register(reader.read_u8()?);
                let type_raw = reader.read_u8()?;
                let vm_type = VmType::from_u8(type_raw).ok_or_else(|| {
                    VmError::BadScript(format!("invalid literal type {type_raw}"))
                })?;
                let length = reader.read_u16()? as usize;
                let payload = reader.read_bytes(length)?;
                vec![register, Operand::Literal(vm_type, payload)]
            }
            _ => Vec::new(),
        };

        instructions.push(Instruction {
            offset,
            opcode,
            operands,
        });
    }

    Ok(instructions)
}

/// Names of every host method the script dispatches through `EXTCALL`.
///
/// Resolution is a linear scan tracking string literals through registers,
/// which covers the encoding compilers emit (load name, dispatch). A name
/// computed dynamically at run time is not visible to this analysis.
pub fn extract_method_calls(script: &[u8]) -> VmResult<BTreeSet<String>> {
    let instructions = disassemble(script)?;
    let mut strings: HashMap<u8, String> = HashMap::new();
    let mut methods = BTreeSet::new();

    for instruction in &instructions {
        match (instruction.opcode, instruction.operands.as_slice()) {
            (Opcode::LOAD, [Operand::Register(reg), Operand::Literal(vm_type, payload)]) => {
                if *vm_type == VmType::String {
                    if let Ok(text) = String::from_utf8(payload.clone()) {
                        strings.insert(*reg, text);
                        continue;
                    }
                }
                strings.remove(reg);
            }
            (Opcode::MOVE, [Operand::Register(src), Operand::Register(dst)]) => {
                match strings.remove(src) {
                    Some(text) => {
                        strings.insert(*dst, text);
                    }
                    None => {
                        strings.remove(dst);
                    }
                }
            }
            (Opcode::COPY, [Operand::Register(src), Operand::Register(dst)]) => {
                match strings.get(src).cloned() {
                    Some(text) => {
                        strings.insert(*dst, text);
                    }
                    None => {
                        strings.remove(dst);
                    }
                }
            }
            (Opcode::EXTCALL, [Operand::Register(reg)]) => {
                if let Some(name) = strings.get(reg) {
                    methods.insert(name.clone());
                }
            }
            (Opcode::POP, [Operand::Register(reg)]) => {
                strings.remove(reg);
            }
            _ => {}
        }
    }

    Ok(methods)
}

struct Reader<'a> {
    script: &'a [u8],
    position: usize,
}

impl Reader<'_> {
    fn read_u8(&mut self) -> VmResult<u8> {
        let byte = *self
            .script
            .get(self.position)
            .ok_or_else(|| VmError::BadScript("unexpected end of script".into()))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> VmResult<u16> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read_bytes(&mut self, length: usize) -> VmResult<Vec<u8>> {
        let end = self.position + length;
        let slice = self
            .script
            .get(self.position..end)
            .ok_or_else(|| VmError::BadScript("unexpected end of script".into()))?;
        self.position = end;
        Ok(slice.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ScriptBuilder;
    use crate::value::VmValue;

    #[test]
    fn finds_dispatched_method_names() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_value(0, &VmValue::String("hello".into()))
            .unwrap();
        sb.emit_extcall(1, "Runtime.Log").unwrap();
        sb.emit_extcall(1, "Runtime.IsTrigger").unwrap();
        sb.emit_extcall(2, "Oracle.Price").unwrap();
        sb.emit_ret();

        let methods = extract_method_calls(&sb.to_vec()).unwrap();
        let expected: BTreeSet<String> = ["Runtime.Log", "Runtime.IsTrigger", "Oracle.Price"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(methods, expected);
    }

    #[test]
    fn names_survive_register_moves() {
        let mut sb = ScriptBuilder::new();
        sb.emit_load(0, &VmValue::String("Data.Get".into())).unwrap();
        sb.emit_copy(0, 5);
        sb.emit(Opcode::EXTCALL);
        let mut bytes = sb.to_vec();
        bytes.push(5);

        let methods = extract_method_calls(&bytes).unwrap();
        assert!(methods.contains("Data.Get"));
    }

    #[test]
    fn truncated_scripts_fault() {
        let mut sb = ScriptBuilder::new();
        sb.emit_load(0, &VmValue::String("Data.Get".into())).unwrap();
        let bytes = sb.to_vec();
        assert!(disassemble(&bytes[..bytes.len() - 2]).is_err());
    }

    #[test]
    fn unknown_opcode_bytes_fault() {
        assert!(disassemble(&[0xEE]).is_err());
    }

    #[test]
    fn offsets_track_instruction_starts() {
        let mut sb = ScriptBuilder::new();
        sb.emit(Opcode::NOP);
        sb.emit_jmp(0);
        sb.emit_ret();

        let instructions = disassemble(&sb.to_vec()).unwrap();
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].offset, 0);
        assert_eq!(instructions[1].offset, 1);
        assert_eq!(instructions[2].offset, 4);
    }
}
