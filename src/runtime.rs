// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! The execution context: one `RuntimeContext` per contract invocation.
//!
//! The context binds a chain ledger, a storage change-set, an optional oracle
//! and an optional transaction, then drives bytecode execution with gas
//! metering on every step, authorized event emission, deterministic
//! pseudo-randomness and nested trigger sub-execution. It is created at
//! invocation start, mutated only by itself while running, and discarded once
//! the caller has read its result.

use std::collections::HashMap;

use num_bigint::{BigInt, BigUint};
use num_traits::{FromPrimitive, Zero};

use crate::chain::{
    convert_decimals, ChainLedger, ChangeSet, OracleReader, Transaction, FIAT_TOKEN_DECIMALS,
    FIAT_TOKEN_SYMBOL, FUEL_TOKEN_SYMBOL, STAKING_TOKEN_SYMBOL,
};
use crate::error::{VmError, VmResult};
use crate::event::{required_emitter, Event, EventKind, GasEventData};
use crate::extcalls::{self, ExtcallHandler};
use crate::gas::{opcode_gas_cost, GasMeter};
use crate::opcode::Opcode;
use crate::types::{Address, Timestamp, HASH_LENGTH};
use crate::value::{Stack, VmType, VmValue};
use crate::vm::{Activation, ExecutionState, Frame};

/// Name of the context the entry script runs in.
pub const ENTRY_CONTEXT_NAME: &str = "entry";

/// Trigger invoked on a script-backed account to approve a witness check.
pub const ACCOUNT_TRIGGER_ON_WITNESS: &str = "OnWitness";

/// Multiplier of the linear congruential PRNG step.
pub const RND_A: u32 = 16807;
/// Modulus of the linear congruential PRNG step.
pub const RND_M: u32 = 2147483647;

/// Hard cap on nested trigger invocations. The chain has no other recursion
/// bound, so this protects the host stack from adversarial trigger chains.
pub const MAX_TRIGGER_DEPTH: u32 = 8;

const DEFAULT_MAX_GAS: u64 = 10_000;

pub struct RuntimeContext<'a> {
    pub(crate) time: Timestamp,
    pub(crate) transaction: Option<Transaction>,
    pub(crate) ledger: &'a dyn ChainLedger,
    pub(crate) parent_chain: Option<String>,
    pub(crate) oracle: Option<&'a dyn OracleReader>,
    pub(crate) changeset: &'a mut dyn ChangeSet,

    pub(crate) read_only: bool,
    pub(crate) delay_payment: bool,
    pub(crate) min_fee: BigInt,

    pub(crate) gas: GasMeter,
    pub(crate) gas_target: Address,
    pub(crate) fee_target: Address,

    pub(crate) block_operation: bool,

    randomized: bool,
    seed: BigUint,

    pub(crate) events: Vec<Event>,
    pub(crate) stack: Stack,

    handlers: HashMap<String, ExtcallHandler>,
    activations: Vec<Activation>,
    entry_script: Vec<u8>,
    fault_reason: Option<VmError>,
    trigger_depth: u32,
}

impl<'a> RuntimeContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        script: Vec<u8>,
        ledger: &'a dyn ChainLedger,
        time: Timestamp,
        transaction: Option<Transaction>,
        changeset: &'a mut dyn ChangeSet,
        oracle: Option<&'a dyn OracleReader>,
        read_only: bool,
        delay_payment: bool,
    ) -> Self {
        let parent_chain = ledger.parent_chain_name();
        let gas_target = ledger.chain_address();

        let mut handlers = HashMap::new();
        extcalls::register_defaults(&mut handlers);

        Self {
            time,
            transaction,
            ledger,
            parent_chain,
            oracle,
            changeset,
            read_only,
            delay_payment,
            min_fee: BigInt::from(1),
            gas: GasMeter::new(BigInt::from(DEFAULT_MAX_GAS)),
            gas_target,
            fee_target: Address::NULL,
            block_operation: false,
            randomized: false,
            seed: BigUint::zero(),
            events: Vec::new(),
            stack: Stack::new(),
            handlers,
            activations: vec![Activation::new(
                ENTRY_CONTEXT_NAME.to_string(),
                script.clone(),
            )],
            entry_script: script,
            fault_reason: None,
            trigger_depth: 0,
        }
    }

    // ---- accessors -------------------------------------------------------

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    pub fn parent_chain(&self) -> Option<&str> {
        self.parent_chain.as_deref()
    }

    pub fn used_gas(&self) -> &BigInt {
        &self.gas.used
    }

    pub fn paid_gas(&self) -> &BigInt {
        &self.gas.paid
    }

    pub fn max_gas(&self) -> &BigInt {
        &self.gas.max
    }

    pub fn gas_price(&self) -> &BigInt {
        &self.gas.price
    }

    pub fn gas_target(&self) -> &Address {
        &self.gas_target
    }

    pub fn fee_target(&self) -> &Address {
        &self.fee_target
    }

    pub fn minimum_fee(&self) -> &BigInt {
        &self.min_fee
    }

    pub fn set_minimum_fee(&mut self, fee: BigInt) {
        self.min_fee = fee;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True for trigger sub-invocations, whose gas payment is deferred.
    pub fn is_trigger(&self) -> bool {
        self.delay_payment
    }

    pub fn is_block_operation(&self) -> bool {
        self.block_operation
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// The error behind the most recent fault, if any.
    pub fn fault_reason(&self) -> Option<&VmError> {
        self.fault_reason.as_ref()
    }

    /// Name of the contract context currently executing. Event authorization
    /// resolves the emitter from this, never from caller-supplied data.
    pub fn current_context_name(&self) -> &str {
        self.activations
            .last()
            .map(|a| a.name.as_str())
            .unwrap_or(ENTRY_CONTEXT_NAME)
    }

    /// Registers an additional host function. The default table is installed
    /// at construction; this exists for chain-specific extensions.
    pub fn register_method(&mut self, name: &str, handler: ExtcallHandler) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn expect(&self, condition: bool, description: &str) -> VmResult<()> {
        if condition {
            Ok(())
        } else {
            Err(VmError::Assertion(description.to_string()))
        }
    }

    // ---- execution -------------------------------------------------------

    /// Runs the entry script to completion and validates the terminal state.
    ///
    /// A successful halt additionally requires that a read-only context
    /// produced no storage mutations and that, once the genesis token exists
    /// and payment is not deferred, the paid gas covers the used gas. Either
    /// violation is an engine-level defect reported through the log and
    /// surfaced as a fault.
    pub fn execute(&mut self) -> ExecutionState {
        let mut result = match self.run_until(0) {
            Ok(()) => ExecutionState::Halt,
            Err(err) => {
                log::debug!(target: "vm", "execution fault: {err}");
                self.fault_reason = Some(err);
                ExecutionState::Fault
            }
        };

        if result == ExecutionState::Halt {
            if self.read_only {
                if self.changeset.has_any_mutation() {
                    self.report_defect("change-set modified in read-only mode");
                    result = ExecutionState::Fault;
                }
            } else if self.gas.paid < self.gas.used
                && self.ledger.has_genesis()
                && !self.delay_payment
            {
                self.report_defect("unpaid gas");
                result = ExecutionState::Fault;
            }
        }

        result
    }

    fn report_defect(&mut self, description: &str) {
        log::error!(target: "vm", "defect: {description}");
        self.fault_reason = Some(VmError::Defect(description.to_string()));
    }

    fn run_until(&mut self, floor: usize) -> VmResult<()> {
        while self.activations.len() > floor {
            let finished = match self.activations.last() {
                Some(act) => act.ip >= act.script.len(),
                None => break,
            };
            if finished {
                self.activations.pop();
                continue;
            }
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> VmResult<()> {
        let raw = self.fetch_u8()?;
        let opcode = Opcode::from_u8(raw)
            .ok_or_else(|| VmError::BadScript(format!("invalid opcode 0x{raw:02x}")))?;
        self.validate_opcode(opcode)?;

        match opcode {
            Opcode::NOP => {}
            Opcode::MOVE => {
                let src = self.fetch_u8()?;
                let dst = self.fetch_u8()?;
                let value = self.take_reg(src)?;
                *self.reg_mut(dst)? = value;
            }
            Opcode::COPY => {
                let src = self.fetch_u8()?;
                let dst = self.fetch_u8()?;
                let value = self.reg(src)?.clone();
                *self.reg_mut(dst)? = value;
            }
            Opcode::PUSH => {
                let src = self.fetch_u8()?;
                let value = self.reg(src)?.clone();
                self.stack.push(value)?;
            }
            Opcode::POP => {
                let dst = self.fetch_u8()?;
                let value = self.stack.pop()?;
                *self.reg_mut(dst)? = value;
            }
            Opcode::SWAP => {
                let a = self.fetch_u8()?;
                let b = self.fetch_u8()?;
                let value_a = self.take_reg(a)?;
                let value_b = self.take_reg(b)?;
                *self.reg_mut(a)? = value_b;
                *self.reg_mut(b)? = value_a;
            }
            Opcode::CALL => {
                let target = self.fetch_u16()? as usize;
                let act = self.current_activation_mut()?;
                if target > act.script.len() {
                    return Err(VmError::BadScript("call target out of range".into()));
                }
                let return_ip = act.ip;
                act.frames.push(Frame::new(return_ip));
                act.ip = target;
            }
            Opcode::EXTCALL => {
                let src = self.fetch_u8()?;
                let method = self.reg(src)?.as_string()?;
                self.execute_interop(&method)?;
            }
            Opcode::JMP => {
                let target = self.fetch_u16()? as usize;
                self.jump_to(target)?;
            }
            Opcode::JMPIF | Opcode::JMPNOT => {
                let src = self.fetch_u8()?;
                let target = self.fetch_u16()? as usize;
                let condition = self.reg(src)?.as_bool()?;
                if condition == (opcode == Opcode::JMPIF) {
                    self.jump_to(target)?;
                }
            }
            Opcode::RET => {
                let finished = {
                    let act = self.current_activation_mut()?;
                    match act.frames.pop() {
                        Some(frame) if !act.frames.is_empty() => {
                            act.ip = frame.return_ip;
                            false
                        }
                        _ => true,
                    }
                };
                if finished {
                    self.activations.pop();
                }
            }
            Opcode::THROW => {
                return Err(VmError::Thrown("explicit throw".into()));
            }
            Opcode::LOAD => {
                let dst = self.fetch_u8()?;
                let type_raw = self.fetch_u8()?;
                let vm_type = VmType::from_u8(type_raw).ok_or_else(|| {
                    VmError::BadScript(format!("invalid literal type {type_raw}"))
                })?;
                let length = self.fetch_u16()? as usize;
                let bytes = self.fetch_bytes(length)?;
                let value = VmValue::from_typed_bytes(vm_type, &bytes)?;
                *self.reg_mut(dst)? = value;
            }
            Opcode::CTX => {
                let src = self.fetch_u8()?;
                let dst = self.fetch_u8()?;
                let name = self.reg(src)?.as_string()?;
                self.load_context(&name)?;
                *self.reg_mut(dst)? = VmValue::Context(name);
            }
            Opcode::SWITCH => {
                let src = self.fetch_u8()?;
                let name = match self.reg(src)? {
                    VmValue::Context(name) => name.clone(),
                    other => {
                        return Err(VmError::InvalidType(format!(
                            "expected context, found {}",
                            other.kind()
                        )))
                    }
                };
                let script = self.load_context(&name)?;
                self.activations.push(Activation::new(name, script));
            }
            other => {
                return Err(VmError::BadScript(format!(
                    "opcode {other} not supported by this engine"
                )));
            }
        }

        Ok(())
    }

    /// Charges the per-opcode gas cost. Pre-genesis and read-only execution
    /// is not metered, which keeps bootstrap transactions and queries
    /// runnable before the fuel token exists.
    fn validate_opcode(&mut self, opcode: Opcode) -> VmResult<()> {
        if self.read_only || !self.ledger.has_genesis() {
            return Ok(());
        }
        self.consume_gas(BigInt::from(opcode_gas_cost(opcode)))
    }

    pub fn consume_gas(&mut self, amount: BigInt) -> VmResult<()> {
        let exempt = self.read_only || !self.ledger.has_genesis();
        self.gas
            .consume(&amount, self.block_operation, exempt, self.delay_payment)
    }

    /// Dispatches one named host call. Block-operation mode forbids all
    /// dispatch; unknown names fault.
    pub fn execute_interop(&mut self, method: &str) -> VmResult<()> {
        self.expect(
            !self.block_operation,
            "no interops available in block operations",
        )?;
        match self.handlers.get(method).copied() {
            Some(handler) => handler(self),
            None => Err(VmError::UnknownMethod(method.to_string())),
        }
    }

    /// Resolves the bytecode of a named contract context.
    pub fn load_context(&self, name: &str) -> VmResult<Vec<u8>> {
        if self.block_operation && self.ledger.has_genesis() {
            return Err(VmError::InvalidArgument(format!(
                "{name} context not available in block operations"
            )));
        }
        self.ledger
            .contract_script(name)
            .ok_or_else(|| VmError::UnknownContext(name.to_string()))
    }

    /// Synchronous cross-context call: pushes `args` in reverse followed by
    /// the method name, executes the named context to completion and pops at
    /// most one result.
    pub fn call_context(
        &mut self,
        context_name: &str,
        method: &str,
        args: &[VmValue],
    ) -> VmResult<VmValue> {
        let script = self.load_context(context_name)?;
        for arg in args.iter().rev() {
            self.stack.push(arg.clone())?;
        }
        self.stack.push(VmValue::String(method.to_string()))?;

        let floor = self.activations.len();
        self.activations
            .push(Activation::new(context_name.to_string(), script));
        self.run_until(floor)?;

        if self.stack.is_empty() {
            Ok(VmValue::None)
        } else {
            self.stack.pop()
        }
    }

    // ---- events ----------------------------------------------------------

    /// Emits an event after checking the authorization policy. The emitter
    /// identity is the contract context active right now; kinds with protocol
    /// side effects additionally update the gas counters or flip the context
    /// into block-operation mode before the event is appended.
    pub fn notify(&mut self, kind: EventKind, address: Address, data: Vec<u8>) -> VmResult<()> {
        let contract = self.current_context_name().to_string();

        if let Some(required) = required_emitter(kind) {
            if contract != required.contract_name() {
                return Err(VmError::Unauthorized(format!(
                    "event {kind} may only be emitted by the {} contract",
                    required.contract_name()
                )));
            }
        }

        match kind {
            EventKind::GasEscrow => {
                let info = GasEventData::decode(&data)?;
                self.expect(info.price >= self.min_fee, "gas fee is too low")?;
                self.gas.max = info.amount.clone();
                self.gas.price = info.price.clone();
                self.gas_target = address;
            }
            EventKind::GasPayment => {
                let info = GasEventData::decode(&data)?;
                self.gas.paid += &info.amount;
                if address != self.ledger.chain_address() {
                    self.fee_target = address;
                }
            }
            EventKind::BlockCreate | EventKind::BlockClose => {
                self.block_operation = true;
                self.gas.used = BigInt::zero();
            }
            _ => {}
        }

        self.events.push(Event {
            kind,
            address,
            contract,
            data,
        });
        Ok(())
    }

    // ---- witness checks --------------------------------------------------

    /// True iff the bound transaction carries a valid signature for
    /// `address`. Interop addresses never witness; script-backed user
    /// accounts delegate the decision to their `OnWitness` trigger.
    pub fn is_witness(&mut self, address: &Address) -> VmResult<bool> {
        if address.is_interop() {
            return Ok(false);
        }
        let Some(transaction) = self.transaction.clone() else {
            return Ok(false);
        };
        if address.is_user() {
            if let Some(script) = self.ledger.address_script(address) {
                return self.invoke_trigger(
                    &script,
                    ACCOUNT_TRIGGER_ON_WITNESS,
                    &[VmValue::Address(*address)],
                );
            }
        }
        Ok(transaction.is_signed_by(address))
    }

    // ---- oracle arithmetic -----------------------------------------------

    /// Price of one unit of `symbol`, denominated in the fiat reference
    /// token. The fiat token prices at its own unit value; the fuel token is
    /// pegged to one fifth of the staking token.
    pub fn get_token_price(&self, symbol: &str) -> VmResult<BigInt> {
        if symbol == FIAT_TOKEN_SYMBOL {
            return Ok(BigInt::from(10u32).pow(FIAT_TOKEN_DECIMALS));
        }

        if symbol == FUEL_TOKEN_SYMBOL {
            let staking_price = self.get_token_price(STAKING_TOKEN_SYMBOL)?;
            return Ok(staking_price / 5);
        }

        let oracle = self.oracle.ok_or_else(|| {
            VmError::InvalidArgument("cannot read price without an oracle".into())
        })?;
        self.expect(
            self.ledger.token_exists(symbol),
            "cannot read price for invalid token",
        )?;

        let bytes = oracle.read(&format!("price://{symbol}"))?;
        Ok(BigInt::from(BigUint::from_bytes_le(&bytes)))
    }

    /// Converts `amount` of `base_symbol` into `quote_symbol` units via the
    /// fiat reference, rescaling across the tokens' decimal precisions with
    /// exact integer arithmetic.
    pub fn get_token_quote(
        &self,
        base_symbol: &str,
        quote_symbol: &str,
        amount: &BigInt,
    ) -> VmResult<BigInt> {
        if base_symbol == quote_symbol {
            return Ok(amount.clone());
        }

        let base_price = self.get_token_price(base_symbol)?;
        let quote_price = self.get_token_price(quote_symbol)?;
        // a dead feed must fault, not divide by zero
        if quote_price.is_zero() {
            return Err(VmError::InvalidArgument(format!(
                "token {quote_symbol} has no price"
            )));
        }

        let base_token = self
            .ledger
            .token_info(base_symbol)
            .ok_or_else(|| VmError::InvalidArgument(format!("unknown token {base_symbol}")))?;
        let quote_token = self
            .ledger
            .token_info(quote_symbol)
            .ok_or_else(|| VmError::InvalidArgument(format!("unknown token {quote_symbol}")))?;

        let mut result = base_price * amount;
        result = convert_decimals(&result, base_token.decimals, FIAT_TOKEN_DECIMALS);
        result /= &quote_price;
        result = convert_decimals(&result, FIAT_TOKEN_DECIMALS, quote_token.decimals);

        Ok(result)
    }

    // ---- deterministic randomness ----------------------------------------

    /// Next value of the chain-reproducible pseudo-random stream. Not
    /// cryptographically secure. The first call seeds from the transaction
    /// hash (or zeros), the entry script and the context timestamp; later
    /// calls advance a linear congruential step. Identical inputs reproduce
    /// an identical sequence, which consensus replay requires.
    pub fn generate_random(&mut self) -> BigUint {
        if !self.randomized {
            let mut bytes = match &self.transaction {
                Some(tx) => tx.hash().to_bytes().to_vec(),
                None => vec![0u8; HASH_LENGTH],
            };

            for (i, script_byte) in self.entry_script.iter().enumerate() {
                let index = i % bytes.len();
                bytes[index] ^= script_byte;
            }

            let time = self.time.value().to_le_bytes();
            for (i, slot) in bytes.iter_mut().enumerate() {
                *slot ^= time[i % time.len()];
            }

            self.seed = BigUint::from_bytes_le(&bytes);
            self.randomized = true;
        } else {
            self.seed = (&self.seed * RND_A) % RND_M;
        }

        self.seed.clone()
    }

    // ---- nested triggers -------------------------------------------------

    /// Runs a trigger script in a child context sharing this context's
    /// chain, time, transaction, change-set and oracle. The child's gas
    /// payment is deferred and its ceiling is the parent's unused gas; the
    /// parent settles the child's consumption afterward in every outcome.
    /// A child fault resolves to `Ok(false)` with no event propagation.
    pub fn invoke_trigger(
        &mut self,
        script: &[u8],
        trigger_name: &str,
        args: &[VmValue],
    ) -> VmResult<bool> {
        if script.is_empty() {
            return Ok(true);
        }

        if self.trigger_depth >= MAX_TRIGGER_DEPTH {
            log::warn!(target: "vm", "trigger depth limit reached, refusing {trigger_name}");
            return Ok(false);
        }

        let ceiling = &self.gas.max - &self.gas.used;

        let (state, child_used, child_events) = {
            let mut child = RuntimeContext::new(
                script.to_vec(),
                self.ledger,
                self.time,
                self.transaction.clone(),
                &mut *self.changeset,
                self.oracle,
                false,
                true,
            );
            child.gas.max = ceiling;
            child.min_fee = self.min_fee.clone();
            child.trigger_depth = self.trigger_depth + 1;

            for arg in args.iter().rev() {
                child.stack.push(arg.clone())?;
            }
            child.stack.push(VmValue::String(trigger_name.to_string()))?;

            let state = child.execute();
            (state, child.gas.used.clone(), std::mem::take(&mut child.events))
        };

        // settle the deferred charge against this context
        self.consume_gas(child_used)?;

        if state == ExecutionState::Halt {
            for event in child_events {
                self.notify(event.kind, event.address, event.data)?;
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ---- instruction fetch helpers ---------------------------------------

    fn current_activation_mut(&mut self) -> VmResult<&mut Activation> {
        self.activations
            .last_mut()
            .ok_or_else(|| VmError::BadScript("no active context".into()))
    }

    fn fetch_u8(&mut self) -> VmResult<u8> {
        let act = self.current_activation_mut()?;
        let byte = *act
            .script
            .get(act.ip)
            .ok_or_else(|| VmError::BadScript("unexpected end of script".into()))?;
        act.ip += 1;
        Ok(byte)
    }

    fn fetch_u16(&mut self) -> VmResult<u16> {
        let lo = self.fetch_u8()?;
        let hi = self.fetch_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn fetch_bytes(&mut self, length: usize) -> VmResult<Vec<u8>> {
        let act = self.current_activation_mut()?;
        let end = act.ip + length;
        let slice = act
            .script
            .get(act.ip..end)
            .ok_or_else(|| VmError::BadScript("unexpected end of script".into()))?;
        let bytes = slice.to_vec();
        act.ip = end;
        Ok(bytes)
    }

    fn jump_to(&mut self, target: usize) -> VmResult<()> {
        let act = self.current_activation_mut()?;
        if target > act.script.len() {
            return Err(VmError::BadScript("jump target out of range".into()));
        }
        act.ip = target;
        Ok(())
    }

    fn reg(&self, index: u8) -> VmResult<&VmValue> {
        let act = self
            .activations
            .last()
            .ok_or_else(|| VmError::BadScript("no active context".into()))?;
        let frame = act
            .frames
            .last()
            .ok_or_else(|| VmError::BadScript("no active frame".into()))?;
        frame
            .registers
            .get(index as usize)
            .ok_or_else(|| VmError::BadScript(format!("register r{index} out of range")))
    }

    fn reg_mut(&mut self, index: u8) -> VmResult<&mut VmValue> {
        let act = self.current_activation_mut()?;
        let frame = act
            .frames
            .last_mut()
            .ok_or_else(|| VmError::BadScript("no active frame".into()))?;
        frame
            .registers
            .get_mut(index as usize)
            .ok_or_else(|| VmError::BadScript(format!("register r{index} out of range")))
    }

    fn take_reg(&mut self, index: u8) -> VmResult<VmValue> {
        Ok(std::mem::take(self.reg_mut(index)?))
    }
}
