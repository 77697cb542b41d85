//! Decoded access node answers.
use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use fcl_common::{address::Address, t::Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id: String,
    pub parent_id: String,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub parent_id: String,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub collection_guarantees: Vec<String>,
}

impl Block {
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            height: self.height,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKey {
    pub index: u32,
    pub public_key: String,
    pub signing_algorithm: String,
    pub hashing_algorithm: String,
    pub sequence_number: u64,
    pub weight: u32,
    pub revoked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub balance: u64,
    pub keys: Vec<AccountKey>,
    /// Contract name to Cadence source.
    pub contracts: BTreeMap<String, String>,
}

impl Account {
    pub fn key(&self, index: u32) -> Option<&AccountKey> {
        self.keys.iter().find(|k| k.index == index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub transaction_id: String,
    pub transaction_index: u32,
    pub event_index: u32,
    pub block_id: Option<String>,
    pub block_height: Option<u64>,
    pub block_timestamp: Option<DateTime<Utc>>,
    /// The payload with type annotations dropped.
    pub data: serde_json::Value,
    #[serde(skip)]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub script: String,
    pub arguments: Vec<Value>,
    pub reference_block_id: String,
    pub gas_limit: u64,
    pub payer: Address,
    pub proposal_key: ProposalKey,
    pub authorizers: Vec<Address>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum TransactionStatus {
    #[default]
    Unknown = 0,
    Pending = 1,
    Finalized = 2,
    Executed = 3,
    Sealed = 4,
    Expired = 5,
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unknown" => Ok(TransactionStatus::Unknown),
            "Pending" => Ok(TransactionStatus::Pending),
            "Finalized" => Ok(TransactionStatus::Finalized),
            "Executed" => Ok(TransactionStatus::Executed),
            "Sealed" => Ok(TransactionStatus::Sealed),
            "Expired" => Ok(TransactionStatus::Expired),
            other => Err(format!("Unknown transaction status: {other}")),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatusInfo {
    pub block_id: String,
    pub status: TransactionStatus,
    pub status_code: u32,
    pub error_message: String,
    pub events: Vec<Event>,
}

impl TransactionStatusInfo {
    pub fn is_failed(&self) -> bool {
        self.status_code != 0 || !self.error_message.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub transaction_ids: Vec<String>,
}
