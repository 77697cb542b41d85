//! Turns raw access node answers into domain values.
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use fcl_common::{
    address::{Address, AddressError},
    t::Value,
};
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::{
    dto::{
        AccountDto, BlockDto, BlockEventsDto, CollectionDto, EventDto, TransactionDto,
        TransactionResultDto,
    },
    models::{
        Account, AccountKey, Block, BlockHeader, Collection, Event, ProposalKey, Transaction,
        TransactionStatus, TransactionStatusInfo,
    },
    rpc::Response,
};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 in {0}: {1}")]
    Base64(&'static str, #[source] base64::DecodeError),
    #[error("Invalid JSON-Cadence value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid number in field {0}: {1:?}")]
    InvalidNumber(&'static str, String),
    #[error("Invalid timestamp {0:?}: {1}")]
    InvalidTimestamp(String, String),
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("{0}")]
    UnknownStatus(String),
}

/// Decoded answer. Serializes to plain JSON without a variant tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Decoded {
    Ping,
    Block(Block),
    BlockHeader(BlockHeader),
    Account(Account),
    /// A script result with type annotations dropped.
    Value(serde_json::Value),
    TransactionId(String),
    Transaction(Transaction),
    TransactionStatus(TransactionStatusInfo),
    Events(Vec<Event>),
    Collection(Collection),
}

impl Decoded {
    pub fn kind(&self) -> &'static str {
        match self {
            Decoded::Ping => "Ping",
            Decoded::Block(_) => "Block",
            Decoded::BlockHeader(_) => "BlockHeader",
            Decoded::Account(_) => "Account",
            Decoded::Value(_) => "Value",
            Decoded::TransactionId(_) => "TransactionId",
            Decoded::Transaction(_) => "Transaction",
            Decoded::TransactionStatus(_) => "TransactionStatus",
            Decoded::Events(_) => "Events",
            Decoded::Collection(_) => "Collection",
        }
    }
}

pub fn decode(response: Response) -> Result<Decoded, DecodeError> {
    trace!(kind = response.kind(), "Decoding response");
    Ok(match response {
        Response::Ping => Decoded::Ping,
        Response::Block(dto) => Decoded::Block(decode_block(dto)?),
        Response::BlockHeader(dto) => Decoded::BlockHeader(decode_block(dto)?.header()),
        Response::Account(dto) => Decoded::Account(decode_account(dto)?),
        Response::ScriptResult(b64) => Decoded::Value(decode_value(&b64)?.to_native()),
        Response::TransactionId(id) => Decoded::TransactionId(id),
        Response::Transaction(dto) => Decoded::Transaction(decode_transaction(dto)?),
        Response::TransactionStatus(dto) => {
            Decoded::TransactionStatus(decode_transaction_status(dto)?)
        }
        Response::Events(blocks) => Decoded::Events(decode_block_events(blocks)?),
        Response::Collection(dto) => Decoded::Collection(decode_collection(dto)),
    })
}

/// Decodes a base64 encoded JSON-Cadence document.
pub fn decode_value(b64: &str) -> Result<Value, DecodeError> {
    let raw = BASE64
        .decode(b64.trim())
        .map_err(|e| DecodeError::Base64("value", e))?;
    Ok(serde_json::from_slice(&raw)?)
}

fn number<T: FromStr>(field: &'static str, value: &str) -> Result<T, DecodeError> {
    value
        .parse()
        .map_err(|_| DecodeError::InvalidNumber(field, value.to_string()))
}

fn timestamp(value: &str) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DecodeError::InvalidTimestamp(value.to_string(), e.to_string()))
}

pub(crate) fn decode_block(dto: BlockDto) -> Result<Block, DecodeError> {
    Ok(Block {
        height: number("height", &dto.header.height)?,
        timestamp: timestamp(&dto.header.timestamp)?,
        id: dto.header.id,
        parent_id: dto.header.parent_id,
        collection_guarantees: dto
            .payload
            .map(|p| {
                p.collection_guarantees
                    .into_iter()
                    .map(|g| g.collection_id)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

pub(crate) fn decode_account(dto: AccountDto) -> Result<Account, DecodeError> {
    let keys = dto
        .keys
        .into_iter()
        .map(|k| {
            Ok(AccountKey {
                index: number("keys.index", &k.index)?,
                public_key: k.public_key,
                signing_algorithm: k.signing_algorithm,
                hashing_algorithm: k.hashing_algorithm,
                sequence_number: number("keys.sequence_number", &k.sequence_number)?,
                weight: number("keys.weight", &k.weight)?,
                revoked: k.revoked,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;
    let contracts = dto
        .contracts
        .into_iter()
        .map(|(name, code)| {
            let source = BASE64
                .decode(&code)
                .ok()
                .and_then(|raw| String::from_utf8(raw).ok())
                .unwrap_or(code);
            (name, source)
        })
        .collect();
    Ok(Account {
        address: Address::from_str(&dto.address)?,
        balance: number("balance", &dto.balance)?,
        keys,
        contracts,
    })
}

fn decode_event(dto: EventDto, block: Option<(&str, u64, DateTime<Utc>)>) -> Result<Event, DecodeError> {
    let payload = BASE64
        .decode(&dto.payload)
        .map_err(|e| DecodeError::Base64("event payload", e))?;
    let value: Value = serde_json::from_slice(&payload)?;
    Ok(Event {
        transaction_index: number("transaction_index", &dto.transaction_index)?,
        event_index: number("event_index", &dto.event_index)?,
        event_type: dto.event_type,
        transaction_id: dto.transaction_id,
        block_id: block.map(|(id, _, _)| id.to_string()),
        block_height: block.map(|(_, height, _)| height),
        block_timestamp: block.map(|(_, _, ts)| ts),
        data: value.to_native(),
        payload: Some(value),
    })
}

pub(crate) fn decode_block_events(blocks: Vec<BlockEventsDto>) -> Result<Vec<Event>, DecodeError> {
    let mut events = Vec::new();
    for block in blocks {
        let height = number("block_height", &block.block_height)?;
        let ts = timestamp(&block.block_timestamp)?;
        for event in block.events {
            events.push(decode_event(event, Some((block.block_id.as_str(), height, ts)))?);
        }
    }
    Ok(events)
}

fn decode_transaction(dto: TransactionDto) -> Result<Transaction, DecodeError> {
    let script = BASE64
        .decode(&dto.script)
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
        .unwrap_or(dto.script);
    Ok(Transaction {
        id: dto.id,
        script,
        arguments: dto
            .arguments
            .iter()
            .map(|a| decode_value(a))
            .collect::<Result<_, _>>()?,
        reference_block_id: dto.reference_block_id,
        gas_limit: number("gas_limit", &dto.gas_limit)?,
        payer: Address::from_str(&dto.payer)?,
        proposal_key: ProposalKey {
            address: Address::from_str(&dto.proposal_key.address)?,
            key_index: number("proposal_key.key_index", &dto.proposal_key.key_index)?,
            sequence_number: number(
                "proposal_key.sequence_number",
                &dto.proposal_key.sequence_number,
            )?,
        },
        authorizers: dto
            .authorizers
            .iter()
            .map(|a| Address::from_str(a))
            .collect::<Result<_, _>>()?,
    })
}

pub(crate) fn decode_transaction_status(
    dto: TransactionResultDto,
) -> Result<TransactionStatusInfo, DecodeError> {
    Ok(TransactionStatusInfo {
        status: TransactionStatus::from_str(&dto.status).map_err(DecodeError::UnknownStatus)?,
        block_id: dto.block_id,
        status_code: dto.status_code,
        error_message: dto.error_message,
        events: dto
            .events
            .into_iter()
            .map(|e| decode_event(e, None))
            .collect::<Result<_, _>>()?,
    })
}

fn decode_collection(dto: CollectionDto) -> Collection {
    Collection {
        id: dto.id,
        transaction_ids: dto
            .transactions
            .into_iter()
            .map(|t| t.id)
            .collect(),
    }
}
