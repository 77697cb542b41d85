//! Builders: functions returning the [`Transformer`](crate::pipeline::Transformer)s that shape
//! an interaction.
//!
//! Template builders pick what the interaction does (`transaction`, `script`, `ping`), query
//! builders select what to read, utility builders fill in roles, arguments and scalars.
//! Invalid input never panics; it rejects the interaction with a message naming the builder.
use std::{collections::BTreeMap, str::FromStr};

use crate::{
    address::Address,
    interaction::{normalize_id, Authorization, InteractionTag},
    pipeline::{reject, transformer, BoxedTransformer},
    types::Value,
};

pub use crate::{
    interaction::authorization,
    pipeline::{invariant, validator},
};

fn invalid_id(builder: &str, id: &str) -> String {
    format!("{builder}: {id:?} is not a valid 32 byte hex id")
}

// Template builders

pub fn transaction(cadence: impl Into<String>) -> BoxedTransformer {
    let cadence = cadence.into();
    transformer("transaction", move |mut ix| {
        if cadence.trim().is_empty() {
            return reject(ix, "transaction: cadence source is empty");
        }
        ix.set_tag(InteractionTag::Transaction);
        ix.message_mut().cadence = Some(cadence.clone());
        Ok(ix)
    })
}

pub fn script(cadence: impl Into<String>) -> BoxedTransformer {
    let cadence = cadence.into();
    transformer("script", move |mut ix| {
        if cadence.trim().is_empty() {
            return reject(ix, "script: cadence source is empty");
        }
        ix.set_tag(InteractionTag::Script);
        ix.message_mut().cadence = Some(cadence.clone());
        Ok(ix)
    })
}

pub fn ping() -> BoxedTransformer {
    transformer("ping", |mut ix| {
        ix.set_tag(InteractionTag::Ping);
        Ok(ix)
    })
}

/// Pins a block query or script execution to a block height.
pub fn at_block_height(height: u64) -> BoxedTransformer {
    transformer("at_block_height", move |mut ix| {
        if ix.block().id.is_some() {
            return reject(ix, "at_block_height: interaction is already pinned to a block id");
        }
        ix.block_mut().height = Some(height);
        Ok(ix)
    })
}

/// Pins a block query or script execution to a block id.
pub fn at_block_id(id: impl Into<String>) -> BoxedTransformer {
    let id = id.into();
    transformer("at_block_id", move |mut ix| {
        let Some(normalized) = normalize_id(&id) else {
            return reject(ix, invalid_id("at_block_id", &id));
        };
        if ix.block().height.is_some() {
            return reject(ix, "at_block_id: interaction is already pinned to a block height");
        }
        ix.block_mut().id = Some(normalized);
        Ok(ix)
    })
}

// Query builders

pub fn get_account(address: impl Into<String>) -> BoxedTransformer {
    let address = address.into();
    transformer("get_account", move |mut ix| match Address::from_str(&address) {
        Ok(addr) => {
            ix.set_tag(InteractionTag::GetAccount);
            ix.set_account(addr);
            Ok(ix)
        }
        Err(e) => reject(ix, format!("get_account: {e}")),
    })
}

/// Events of `event_type` emitted between `start` and `end` height, both inclusive.
pub fn get_events(event_type: impl Into<String>, start: u64, end: u64) -> BoxedTransformer {
    get_events_at_block_height_range(event_type, start, end)
}

pub fn get_events_at_block_height_range(
    event_type: impl Into<String>,
    start: u64,
    end: u64,
) -> BoxedTransformer {
    let event_type = event_type.into();
    transformer("get_events_at_block_height_range", move |mut ix| {
        if event_type.trim().is_empty() {
            return reject(ix, "get_events_at_block_height_range: event type is empty");
        }
        if start > end {
            return reject(
                ix,
                format!("get_events_at_block_height_range: start height {start} is above end height {end}"),
            );
        }
        ix.set_tag(InteractionTag::GetEvents);
        let events = ix.events_mut();
        events.event_type = Some(event_type.clone());
        events.start = Some(start);
        events.end = Some(end);
        events.block_ids.clear();
        Ok(ix)
    })
}

pub fn get_events_at_block_ids(
    event_type: impl Into<String>,
    block_ids: Vec<String>,
) -> BoxedTransformer {
    let event_type = event_type.into();
    transformer("get_events_at_block_ids", move |mut ix| {
        if event_type.trim().is_empty() {
            return reject(ix, "get_events_at_block_ids: event type is empty");
        }
        if block_ids.is_empty() {
            return reject(ix, "get_events_at_block_ids: no block ids given");
        }
        let mut normalized = Vec::with_capacity(block_ids.len());
        for id in &block_ids {
            match normalize_id(id) {
                Some(n) => normalized.push(n),
                None => return reject(ix, invalid_id("get_events_at_block_ids", id)),
            }
        }
        ix.set_tag(InteractionTag::GetEvents);
        let events = ix.events_mut();
        events.event_type = Some(event_type.clone());
        events.start = None;
        events.end = None;
        events.block_ids = normalized;
        Ok(ix)
    })
}

/// Latest block, either sealed or merely finalized.
pub fn get_latest_block(is_sealed: bool) -> BoxedTransformer {
    get_block(is_sealed)
}

/// Block query. Without `at_block_id`/`at_block_height` the latest block is returned.
pub fn get_block(is_sealed: bool) -> BoxedTransformer {
    transformer("get_block", move |mut ix| {
        ix.set_tag(InteractionTag::GetBlock);
        ix.block_mut().is_sealed = Some(is_sealed);
        Ok(ix)
    })
}

pub fn get_block_header(is_sealed: bool) -> BoxedTransformer {
    transformer("get_block_header", move |mut ix| {
        ix.set_tag(InteractionTag::GetBlockHeader);
        ix.block_mut().is_sealed = Some(is_sealed);
        Ok(ix)
    })
}

pub fn get_block_by_id(id: impl Into<String>) -> BoxedTransformer {
    let id = id.into();
    transformer("get_block_by_id", move |mut ix| {
        let Some(normalized) = normalize_id(&id) else {
            return reject(ix, invalid_id("get_block_by_id", &id));
        };
        ix.set_tag(InteractionTag::GetBlock);
        let block = ix.block_mut();
        block.id = Some(normalized);
        block.height = None;
        Ok(ix)
    })
}

pub fn get_block_by_height(height: u64) -> BoxedTransformer {
    transformer("get_block_by_height", move |mut ix| {
        ix.set_tag(InteractionTag::GetBlock);
        let block = ix.block_mut();
        block.height = Some(height);
        block.id = None;
        Ok(ix)
    })
}

pub fn get_collection(id: impl Into<String>) -> BoxedTransformer {
    let id = id.into();
    transformer("get_collection", move |mut ix| {
        let Some(normalized) = normalize_id(&id) else {
            return reject(ix, invalid_id("get_collection", &id));
        };
        ix.set_tag(InteractionTag::GetCollection);
        ix.set_collection_id(normalized);
        Ok(ix)
    })
}

pub fn get_transaction_status(id: impl Into<String>) -> BoxedTransformer {
    let id = id.into();
    transformer("get_transaction_status", move |mut ix| {
        let Some(normalized) = normalize_id(&id) else {
            return reject(ix, invalid_id("get_transaction_status", &id));
        };
        ix.set_tag(InteractionTag::GetTransactionStatus);
        ix.set_transaction_id(normalized);
        Ok(ix)
    })
}

pub fn get_transaction(id: impl Into<String>) -> BoxedTransformer {
    let id = id.into();
    transformer("get_transaction", move |mut ix| {
        let Some(normalized) = normalize_id(&id) else {
            return reject(ix, invalid_id("get_transaction", &id));
        };
        ix.set_tag(InteractionTag::GetTransaction);
        ix.set_transaction_id(normalized);
        Ok(ix)
    })
}

// Utility builders

/// Appends authorizers, keeping their order.
pub fn authorizations(auths: Vec<Authorization>) -> BoxedTransformer {
    transformer("authorizations", move |mut ix| {
        ix.authorizations_mut()
            .extend(auths.iter().cloned());
        Ok(ix)
    })
}

pub fn proposer(auth: Authorization) -> BoxedTransformer {
    transformer("proposer", move |mut ix| {
        ix.set_proposer(auth.clone());
        Ok(ix)
    })
}

pub fn payer(auth: Authorization) -> BoxedTransformer {
    transformer("payer", move |mut ix| {
        ix.set_payer(auth.clone());
        Ok(ix)
    })
}

/// Appends positional arguments after validating each of them.
pub fn args(values: Vec<Value>) -> BoxedTransformer {
    transformer("args", move |mut ix| {
        for (position, value) in values.iter().enumerate() {
            if let Err(e) = value.validate() {
                return reject(ix, format!("args: argument {position} is invalid: {e}"));
            }
        }
        ix.arguments_mut()
            .extend(values.iter().cloned());
        Ok(ix)
    })
}

pub fn arg(value: Value) -> BoxedTransformer {
    transformer("arg", move |mut ix| {
        if let Err(e) = value.validate() {
            return reject(ix, format!("arg: {e}"));
        }
        ix.arguments_mut().push(value.clone());
        Ok(ix)
    })
}

/// Compute limit for scripts and transactions.
pub fn limit(compute_limit: u64) -> BoxedTransformer {
    transformer("limit", move |mut ix| {
        if compute_limit == 0 {
            return reject(ix, "limit: compute limit must be positive");
        }
        ix.message_mut().compute_limit = Some(compute_limit);
        Ok(ix)
    })
}

/// Reference block a transaction is valid from.
pub fn ref_block(id: impl Into<String>) -> BoxedTransformer {
    let id = id.into();
    transformer("ref", move |mut ix| {
        let Some(normalized) = normalize_id(&id) else {
            return reject(ix, invalid_id("ref", &id));
        };
        ix.message_mut().ref_block = Some(normalized);
        Ok(ix)
    })
}

pub fn params(values: BTreeMap<String, Value>) -> BoxedTransformer {
    transformer("params", move |mut ix| {
        if let Some(key) = values.keys().find(|k| k.trim().is_empty()) {
            return reject(ix, format!("params: invalid param name {key:?}"));
        }
        ix.params_mut()
            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(ix)
    })
}

pub fn param(name: impl Into<String>, value: Value) -> BoxedTransformer {
    let name = name.into();
    transformer("param", move |mut ix| {
        if name.trim().is_empty() {
            return reject(ix, "param: param name is empty");
        }
        ix.params_mut()
            .insert(name.clone(), value.clone());
        Ok(ix)
    })
}
