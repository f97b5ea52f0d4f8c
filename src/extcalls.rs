// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

//! The host function table.
//!
//! Bytecode reaches the host exclusively through `EXTCALL` with a method
//! name; dispatch is an exact string match against the table built here.
//! Handlers pop their arguments from the operand stack, validate everything
//! (the caller is untrusted bytecode) and push at most one result.

use std::collections::HashMap;

use num_traits::FromPrimitive;

use crate::abi::ContractInterface;
use crate::error::{VmError, VmResult};
use crate::event::EventKind;
use crate::runtime::RuntimeContext;
use crate::types::{Address, Hash, Timestamp};
use crate::value::VmValue;

/// A host function. Plain function pointers keep the table `Copy`-able, so
/// dispatch can lift the handler out of the map before borrowing the context.
pub type ExtcallHandler = fn(&mut RuntimeContext<'_>) -> VmResult<()>;

/// Installs the default host functions into `table`.
pub fn register_defaults(table: &mut HashMap<String, ExtcallHandler>) {
    let entries: &[(&str, ExtcallHandler)] = &[
        ("Runtime.Log", runtime_log),
        ("Runtime.Event", runtime_event),
        ("Runtime.IsWitness", runtime_is_witness),
        ("Runtime.IsTrigger", runtime_is_trigger),
        ("Runtime.TransferTokens", runtime_transfer_tokens),
        ("Runtime.TransferToken", runtime_transfer_token),
        ("Runtime.MintTokens", runtime_mint_tokens),
        ("Runtime.MintToken", runtime_mint_token),
        ("Runtime.DeployContract", runtime_deploy_contract),
        ("Data.Get", data_get),
        ("Data.Set", data_set),
        ("Data.Delete", data_delete),
        ("Oracle.Read", oracle_read),
        ("Oracle.Price", oracle_price),
        ("Oracle.Quote", oracle_quote),
        ("ABI()", constructor_abi),
        ("Address()", constructor_address),
        ("Hash()", constructor_hash),
        ("Timestamp()", constructor_timestamp),
    ];
    for (name, handler) in entries {
        table.insert((*name).to_string(), *handler);
    }
}

// ---- argument helpers ------------------------------------------------------

/// Pops an address. A string argument is resolved through the chain's name
/// registry; anything else must coerce to raw address bytes.
fn pop_address(ctx: &mut RuntimeContext<'_>) -> VmResult<Address> {
    let value = ctx.stack_mut().pop()?;
    if let VmValue::String(name) = &value {
        return ctx
            .ledger
            .lookup_name(name)
            .ok_or_else(|| VmError::InvalidArgument(format!("name not registered: {name}")));
    }
    value.as_address()
}

fn pop_string(ctx: &mut RuntimeContext<'_>) -> VmResult<String> {
    ctx.stack_mut().pop()?.as_string()
}

fn pop_bytes(ctx: &mut RuntimeContext<'_>) -> VmResult<Vec<u8>> {
    ctx.stack_mut().pop()?.as_bytes()
}

fn pop_number(ctx: &mut RuntimeContext<'_>) -> VmResult<num_bigint::BigInt> {
    ctx.stack_mut().pop()?.as_number()
}

// ---- Runtime.* -------------------------------------------------------------

fn runtime_log(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let message = pop_string(ctx)?;
    log::info!(target: "contract", "{}: {message}", ctx.current_context_name());
    Ok(())
}

fn runtime_event(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let data = pop_bytes(ctx)?;
    let address = pop_address(ctx)?;
    let raw_kind = ctx.stack_mut().pop()?.as_u32()?;
    let kind = EventKind::from_u32(raw_kind)
        .ok_or_else(|| VmError::InvalidArgument(format!("unknown event kind {raw_kind}")))?;
    ctx.notify(kind, address, data)
}

fn runtime_is_witness(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let address = pop_address(ctx)?;
    let witness = ctx.is_witness(&address)?;
    ctx.stack_mut().push(VmValue::Bool(witness))
}

fn runtime_is_trigger(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let is_trigger = ctx.is_trigger();
    ctx.stack_mut().push(VmValue::Bool(is_trigger))
}

fn runtime_transfer_tokens(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    ctx.expect(ctx.stack().len() >= 4, "transfer expects 4 arguments")?;
    let source = pop_address(ctx)?;
    let destination = pop_address(ctx)?;
    let symbol = pop_string(ctx)?;
    let amount = pop_number(ctx)?;

    ctx.expect(ctx.ledger.token_exists(&symbol), "invalid token")?;
    if !ctx.is_witness(&source)? {
        return Err(VmError::Unauthorized(format!(
            "missing witness for {source}"
        )));
    }
    let moved = ctx
        .ledger
        .transfer_tokens(&symbol, &source, &destination, &amount);
    ctx.stack_mut().push(VmValue::Bool(moved))
}

fn runtime_transfer_token(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    ctx.expect(ctx.stack().len() >= 4, "transfer expects 4 arguments")?;
    let source = pop_address(ctx)?;
    let destination = pop_address(ctx)?;
    let symbol = pop_string(ctx)?;
    let token_id = pop_number(ctx)?;

    ctx.expect(ctx.ledger.token_exists(&symbol), "invalid token")?;
    if !ctx.is_witness(&source)? {
        return Err(VmError::Unauthorized(format!(
            "missing witness for {source}"
        )));
    }
    let moved = ctx
        .ledger
        .transfer_token(&symbol, &source, &destination, &token_id);
    ctx.stack_mut().push(VmValue::Bool(moved))
}

fn runtime_mint_tokens(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let destination = pop_address(ctx)?;
    let symbol = pop_string(ctx)?;
    let amount = pop_number(ctx)?;

    ctx.expect(ctx.ledger.token_exists(&symbol), "invalid token")?;
    let owner = ctx.ledger.chain_owner();
    if !ctx.is_witness(&owner)? {
        return Err(VmError::Unauthorized("minting requires owner witness".into()));
    }
    let minted = ctx.ledger.mint_tokens(&symbol, &destination, &amount);
    ctx.stack_mut().push(VmValue::Bool(minted))
}

fn runtime_mint_token(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let destination = pop_address(ctx)?;
    let symbol = pop_string(ctx)?;
    let rom = pop_bytes(ctx)?;
    let ram = pop_bytes(ctx)?;

    ctx.expect(ctx.ledger.token_exists(&symbol), "invalid token")?;
    let owner = ctx.ledger.chain_owner();
    if !ctx.is_witness(&owner)? {
        return Err(VmError::Unauthorized("minting requires owner witness".into()));
    }
    let token_id = ctx
        .ledger
        .mint_token(&symbol, &destination, &rom, &ram)
        .ok_or_else(|| VmError::InvalidArgument("minting failed".into()))?;
    ctx.stack_mut().push(VmValue::Number(token_id))
}

fn runtime_deploy_contract(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    ctx.expect(
        ctx.transaction().is_some(),
        "cannot deploy outside a transaction",
    )?;
    let name = pop_string(ctx)?;

    let owner = ctx.ledger.chain_owner();
    if !ctx.is_witness(&owner)? {
        return Err(VmError::Unauthorized(
            "deployment requires owner witness".into(),
        ));
    }

    let address = Address::from_contract_name(&name);
    let deployed = ctx.ledger.deploy_native_contract(&address);
    if deployed {
        log::info!(target: "vm", "deployed contract {name} at {address}");
    }
    ctx.stack_mut().push(VmValue::Bool(deployed))
}

// ---- Data.* ----------------------------------------------------------------

/// Keys starting with '.' are reserved for the protocol; contract writes and
/// deletes never touch them. Reads are allowed.
const RESERVED_KEY_PREFIX: u8 = b'.';

fn data_get(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let key = pop_bytes(ctx)?;
    ctx.expect(!key.is_empty(), "storage key is empty")?;
    let value = match ctx.changeset.get(&key) {
        Some(bytes) => VmValue::Bytes(bytes),
        None => VmValue::None,
    };
    ctx.stack_mut().push(value)
}

fn data_set(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let key = pop_bytes(ctx)?;
    let value = pop_bytes(ctx)?;
    ctx.expect(!key.is_empty(), "storage key is empty")?;
    if key.first() == Some(&RESERVED_KEY_PREFIX) {
        return Err(VmError::PermissionDenied("reserved key prefix".into()));
    }
    ctx.changeset.put(&key, &value);
    Ok(())
}

fn data_delete(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let key = pop_bytes(ctx)?;
    ctx.expect(!key.is_empty(), "storage key is empty")?;
    if key.first() == Some(&RESERVED_KEY_PREFIX) {
        return Err(VmError::PermissionDenied("reserved key prefix".into()));
    }
    ctx.changeset.delete(&key);
    Ok(())
}

// ---- Oracle.* --------------------------------------------------------------

fn oracle_read(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let value = ctx.stack_mut().pop()?;
    let VmValue::String(url) = value else {
        return Err(VmError::InvalidType(format!(
            "oracle url must be a string, found {}",
            value.kind()
        )));
    };
    let url = url.trim().to_lowercase();
    ctx.expect(!url.is_empty(), "oracle url is empty")?;

    let oracle = ctx
        .oracle
        .ok_or_else(|| VmError::InvalidArgument("no oracle available".into()))?;
    let bytes = oracle.read(&url)?;
    ctx.stack_mut().push(VmValue::Bytes(bytes))
}

fn oracle_price(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let symbol = pop_string(ctx)?;
    let price = ctx.get_token_price(&symbol)?;
    ctx.stack_mut().push(VmValue::Number(price))
}

fn oracle_quote(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let base_symbol = pop_string(ctx)?;
    let quote_symbol = pop_string(ctx)?;
    let amount = pop_number(ctx)?;
    let quote = ctx.get_token_quote(&base_symbol, &quote_symbol, &amount)?;
    ctx.stack_mut().push(VmValue::Number(quote))
}

// ---- constructors ----------------------------------------------------------

fn constructor_abi(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let bytes = pop_bytes(ctx)?;
    let interface = ContractInterface::decode(&bytes)?;
    ctx.stack_mut().push(VmValue::Abi(interface))
}

fn constructor_address(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let address = pop_address(ctx)?;
    ctx.stack_mut().push(VmValue::Address(address))
}

fn constructor_hash(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let bytes = pop_bytes(ctx)?;
    let hash = Hash::from_bytes(&bytes)?;
    ctx.stack_mut().push(VmValue::Hash(hash))
}

fn constructor_timestamp(ctx: &mut RuntimeContext<'_>) -> VmResult<()> {
    let value = ctx.stack_mut().pop()?;
    let seconds = match &value {
        VmValue::Timestamp(t) => t.value(),
        _ => value.as_u32()?,
    };
    ctx.stack_mut().push(VmValue::Timestamp(Timestamp(seconds)))
}
