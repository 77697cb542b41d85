//! The interaction record threaded through the builder pipeline.
//!
//! An [`Interaction`] describes one pending request to an access node: a transaction, a script
//! or one of the read queries. Callers only ever read it; every change goes through a
//! [`crate::pipeline::Transformer`].
use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    address::{Address, AddressError},
    types::Value,
};

/// Length in bytes of block, collection and transaction identifiers.
pub const ID_LENGTH: usize = 32;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, Default,
)]
pub enum InteractionTag {
    #[default]
    Unknown,
    Script,
    Transaction,
    GetTransactionStatus,
    GetTransaction,
    GetAccount,
    GetEvents,
    GetBlock,
    GetBlockHeader,
    GetCollection,
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
pub enum Status {
    #[default]
    Ok,
    Bad,
}

/// A signer reference attached to one of the transaction roles.
///
/// Signatures are opaque hex strings produced outside of this library; the payer's signature
/// covers the envelope, everyone else signs the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authorization {
    pub addr: Address,
    pub key_id: u32,
    pub sequence_num: Option<u64>,
    pub signature: Option<String>,
}

impl Authorization {
    pub fn new(addr: Address, key_id: u32) -> Self {
        Self { addr, key_id, sequence_num: None, signature: None }
    }

    pub fn with_sequence_num(mut self, sequence_num: u64) -> Self {
        self.sequence_num = Some(sequence_num);
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.addr, self.key_id)
    }
}

/// Builds an [`Authorization`] from a textual address.
pub fn authorization(
    addr: &str,
    key_id: u32,
    sequence_num: Option<u64>,
) -> Result<Authorization, AddressError> {
    Ok(Authorization { addr: Address::from_str(addr)?, key_id, sequence_num, signature: None })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub cadence: Option<String>,
    pub ref_block: Option<String>,
    pub compute_limit: Option<u64>,
}

/// Which block a block query or a script execution is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockSelector {
    pub id: Option<String>,
    pub height: Option<u64>,
    pub is_sealed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventSelector {
    pub event_type: Option<String>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub block_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interaction {
    tag: InteractionTag,
    status: Status,
    reason: Option<String>,
    message: Message,
    arguments: Vec<Value>,
    params: BTreeMap<String, Value>,
    proposer: Option<Authorization>,
    payer: Option<Authorization>,
    authorizations: Vec<Authorization>,
    block: BlockSelector,
    events: EventSelector,
    account: Option<Address>,
    collection_id: Option<String>,
    transaction_id: Option<String>,
}

impl Interaction {
    pub fn tag(&self) -> InteractionTag {
        self.tag
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn is_bad(&self) -> bool {
        self.status == Status::Bad
    }

    /// The reason the interaction was marked bad, if it was.
    pub fn why(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn cadence(&self) -> Option<&str> {
        self.message.cadence.as_deref()
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn proposer(&self) -> Option<&Authorization> {
        self.proposer.as_ref()
    }

    pub fn payer(&self) -> Option<&Authorization> {
        self.payer.as_ref()
    }

    pub fn authorizations(&self) -> &[Authorization] {
        &self.authorizations
    }

    pub fn block(&self) -> &BlockSelector {
        &self.block
    }

    pub fn events(&self) -> &EventSelector {
        &self.events
    }

    pub fn account(&self) -> Option<&Address> {
        self.account.as_ref()
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Params rendered as plain strings, ready for [`crate::template::template`].
    pub fn param_strings(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| {
                let rendered = match v.to_native() {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect()
    }

    pub(crate) fn mark_bad(&mut self, reason: String) {
        self.status = Status::Bad;
        self.reason = Some(reason);
    }

    pub(crate) fn set_tag(&mut self, tag: InteractionTag) {
        self.tag = tag;
    }

    pub(crate) fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    pub(crate) fn arguments_mut(&mut self) -> &mut Vec<Value> {
        &mut self.arguments
    }

    pub(crate) fn params_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.params
    }

    pub(crate) fn set_proposer(&mut self, auth: Authorization) {
        self.proposer = Some(auth);
    }

    pub(crate) fn set_payer(&mut self, auth: Authorization) {
        self.payer = Some(auth);
    }

    pub(crate) fn authorizations_mut(&mut self) -> &mut Vec<Authorization> {
        &mut self.authorizations
    }

    pub(crate) fn block_mut(&mut self) -> &mut BlockSelector {
        &mut self.block
    }

    pub(crate) fn events_mut(&mut self) -> &mut EventSelector {
        &mut self.events
    }

    pub(crate) fn set_account(&mut self, addr: Address) {
        self.account = Some(addr);
    }

    pub(crate) fn set_collection_id(&mut self, id: String) {
        self.collection_id = Some(id);
    }

    pub(crate) fn set_transaction_id(&mut self, id: String) {
        self.transaction_id = Some(id);
    }
}

/// Normalizes a block, collection or transaction id to lowercase hex without prefix.
///
/// Returns `None` unless the input is exactly 32 bytes of hex.
pub fn normalize_id(id: &str) -> Option<String> {
    let raw = id
        .trim()
        .strip_prefix("0x")
        .unwrap_or(id.trim());
    if raw.len() != ID_LENGTH * 2 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(raw.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_default_interaction() {
        let ix = Interaction::default();

        assert_eq!(ix.tag(), InteractionTag::Unknown);
        assert!(ix.is_ok());
        assert_eq!(ix.why(), None);
        assert!(ix.authorizations().is_empty());
        assert!(ix.arguments().is_empty());
        assert!(ix.params().is_empty());
        assert_eq!(ix.proposer(), None);
        assert_eq!(ix.payer(), None);
    }

    #[test]
    fn test_mark_bad() {
        let mut ix = Interaction::default();

        ix.mark_bad("nope".to_string());

        assert!(ix.is_bad());
        assert_eq!(ix.status(), Status::Bad);
        assert_eq!(ix.why(), Some("nope"));
    }

    #[test]
    fn test_tag_from_str() {
        assert_eq!(InteractionTag::from_str("GetAccount").unwrap(), InteractionTag::GetAccount);
        assert_eq!(InteractionTag::Ping.to_string(), "Ping");
    }

    #[rstest]
    #[case::prefixed(
        "0x7BC89E2EFB2E1D3AA1C6B0D5CF1B4EA1E0C9C1A5E3F1D6A9B8C7D6E5F4A3B2C1",
        Some("7bc89e2efb2e1d3aa1c6b0d5cf1b4ea1e0c9c1a5e3f1d6a9b8c7d6e5f4a3b2c1")
    )]
    #[case::short("abcd", None)]
    #[case::not_hex("zz89e2efb2e1d3aa1c6b0d5cf1b4ea1e0c9c1a5e3f1d6a9b8c7d6e5f4a3b2c1", None)]
    fn test_normalize_id(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_id(input).as_deref(), expected);
    }

    #[test]
    fn test_param_strings() {
        let mut ix = Interaction::default();
        ix.params_mut()
            .insert("name".to_string(), Value::string("flow"));
        ix.params_mut()
            .insert("amount".to_string(), Value::uint8(7));

        let rendered = ix.param_strings();

        assert_eq!(rendered["name"], "flow");
        assert_eq!(rendered["amount"], "7");
    }

    #[test]
    fn test_authorization_display() {
        let auth = authorization("0x01", 2, Some(5)).unwrap();

        assert_eq!(auth.to_string(), "0x0000000000000001#2");
        assert_eq!(auth.sequence_num, Some(5));
        assert!(authorization("0xnothex", 0, None).is_err());
    }
}
