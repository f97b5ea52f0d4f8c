//! Interpreter scaffolding: execution states, register frames and the
//! per-context activation records driven by `RuntimeContext`.

/// Terminal and intermediate states of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ExecutionState {
    Running,
    Break,
    Fault,
    Halt,
}

/// Number of general-purpose registers per call frame.
pub const REGISTER_COUNT: usize = 16;

use crate::value::VmValue;

/// One call frame: a register file plus the return location of the `CALL`
/// that created it.
#[derive(Debug)]
pub struct Frame {
    pub registers: [VmValue; REGISTER_COUNT],
    pub return_ip: usize,
}

impl Frame {
    pub fn new(return_ip: usize) -> Self {
        Self {
            registers: core::array::from_fn(|_| VmValue::None),
            return_ip,
        }
    }
}

/// One loaded execution context: a named script with its own instruction
/// pointer and frame stack. `SWITCH` pushes a new activation; it pops when
/// its script returns.
#[derive(Debug)]
pub struct Activation {
    pub name: String,
    pub script: Vec<u8>,
    pub ip: usize,
    pub frames: Vec<Frame>,
}

impl Activation {
    pub fn new(name: String, script: Vec<u8>) -> Self {
        Self {
            name,
            script,
            ip: 0,
            frames: vec![Frame::new(0)],
        }
    }
}
