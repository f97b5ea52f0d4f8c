//! Bytecode opcode enumeration.

use num_derive::FromPrimitive;

/// The instruction set understood by the interpreter and priced by the gas
/// meter. Arithmetic and collection opcodes are enumerated (and priced) but
/// not executed by this engine; see `RuntimeContext::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, strum::Display)]
#[repr(u8)]
pub enum Opcode {
    NOP = 0,
    MOVE = 1,
    COPY = 2,
    PUSH = 3,
    POP = 4,
    SWAP = 5,
    CALL = 6,
    EXTCALL = 7,
    JMP = 8,
    JMPIF = 9,
    JMPNOT = 10,
    RET = 11,
    THROW = 12,
    LOAD = 13,
    CAST = 14,
    CAT = 15,
    RANGE = 16,
    LEFT = 17,
    RIGHT = 18,
    SIZE = 19,
    COUNT = 20,
    NOT = 21,
    AND = 22,
    OR = 23,
    XOR = 24,
    EQUAL = 25,
    LT = 26,
    GT = 27,
    LTE = 28,
    GTE = 29,
    INC = 30,
    DEC = 31,
    SIGN = 32,
    NEGATE = 33,
    ABS = 34,
    ADD = 35,
    SUB = 36,
    MUL = 37,
    DIV = 38,
    MOD = 39,
    SHL = 40,
    SHR = 41,
    MIN = 42,
    MAX = 43,
    THIS = 44,
    CTX = 45,
    SWITCH = 46,
    PUT = 47,
    GET = 48,
}
