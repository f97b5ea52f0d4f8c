// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! Gas accounting.
//!
//! Every opcode step is charged against the context's gas budget before it
//! executes. Costs are a fixed function of the opcode category; the meter
//! itself only ever moves the `used` counter forward.

use num_bigint::{BigInt, Sign};
use num_traits::Zero;

use crate::error::{VmError, VmResult};
use crate::opcode::Opcode;

/// Fixed execution cost of an opcode.
pub fn opcode_gas_cost(opcode: Opcode) -> i64 {
    match opcode {
        Opcode::GET | Opcode::PUT | Opcode::CALL | Opcode::LOAD => 2,
        Opcode::EXTCALL => 3,
        Opcode::CTX => 5,
        Opcode::SWITCH => 10,
        Opcode::NOP | Opcode::RET => 0,
        _ => 1,
    }
}

/// Gas counters for one execution context.
#[derive(Debug, Clone)]
pub struct GasMeter {
    pub used: BigInt,
    pub paid: BigInt,
    pub max: BigInt,
    pub price: BigInt,
}

impl GasMeter {
    pub fn new(max: BigInt) -> Self {
        Self {
            used: BigInt::zero(),
            paid: BigInt::zero(),
            max,
            price: BigInt::zero(),
        }
    }

    /// Charges `cost` units against the budget.
    ///
    /// Zero-cost steps and block-operation mode never charge. `exempt` covers
    /// read-only and pre-genesis execution, where accounting is suspended but
    /// negative amounts still fault. With `delay_payment` the counter grows
    /// past `max` without faulting; the deferred charge is settled by the
    /// parent context afterward.
    pub fn consume(
        &mut self,
        cost: &BigInt,
        block_operation: bool,
        exempt: bool,
        delay_payment: bool,
    ) -> VmResult<()> {
        if cost.is_zero() || block_operation {
            return Ok(());
        }
        if cost.sign() == Sign::Minus {
            return Err(VmError::InvalidArgument("negative gas amount".into()));
        }
        if exempt {
            return Ok(());
        }

        self.used += cost;
        if self.used > self.max && !delay_payment {
            return Err(VmError::OutOfGas {
                used: self.used.clone(),
                max: self.max.clone(),
            });
        }
        Ok(())
    }
}
