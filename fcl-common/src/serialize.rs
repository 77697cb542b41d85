//! Voucher serialization.
//!
//! A voucher is the JSON document wallets and signing services exchange for a transaction or
//! script: the cadence source, arguments, reference block, compute limit and every role with
//! the signatures gathered so far.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    interaction::{Authorization, Interaction, InteractionTag},
    types::Value,
};

#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("Cannot serialize a bad interaction: {0}")]
    BadInteraction(String),

    #[error("Only scripts and transactions can be serialized, got {0}")]
    UnsupportedTag(InteractionTag),

    #[error("Interaction has no cadence source")]
    MissingCadence,

    #[error("Failed to encode voucher: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalKey {
    pub address: String,
    pub key_id: u32,
    pub sequence_num: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSignature {
    pub address: String,
    pub key_id: u32,
    pub sig: Option<String>,
}

impl From<&Authorization> for VoucherSignature {
    fn from(auth: &Authorization) -> Self {
        Self { address: auth.addr.to_string(), key_id: auth.key_id, sig: auth.signature.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub cadence: String,
    pub ref_block: Option<String>,
    pub compute_limit: Option<u64>,
    pub arguments: Vec<Value>,
    pub proposal_key: Option<ProposalKey>,
    pub payer: Option<String>,
    pub authorizers: Vec<String>,
    pub payload_sigs: Vec<VoucherSignature>,
    pub envelope_sigs: Vec<VoucherSignature>,
}

impl Voucher {
    pub fn from_interaction(ix: &Interaction) -> Result<Self, SerializeError> {
        if ix.is_bad() {
            return Err(SerializeError::BadInteraction(ix.why().unwrap_or_default().to_string()));
        }
        if !matches!(ix.tag(), InteractionTag::Transaction | InteractionTag::Script) {
            return Err(SerializeError::UnsupportedTag(ix.tag()));
        }
        let cadence = ix
            .cadence()
            .ok_or(SerializeError::MissingCadence)?
            .to_string();

        let payer_addr = ix.payer().map(|p| p.addr);
        // the payer signs the envelope only, so it never appears among the payload signers
        let mut payload_sigs: Vec<VoucherSignature> = Vec::new();
        for auth in ix
            .proposer()
            .into_iter()
            .chain(ix.authorizations())
        {
            if Some(auth.addr) == payer_addr {
                continue;
            }
            let sig = VoucherSignature::from(auth);
            if !payload_sigs
                .iter()
                .any(|s| s.address == sig.address && s.key_id == sig.key_id)
            {
                payload_sigs.push(sig);
            }
        }

        Ok(Self {
            cadence,
            ref_block: ix.message().ref_block.clone(),
            compute_limit: ix.message().compute_limit,
            arguments: ix.arguments().to_vec(),
            proposal_key: ix.proposer().map(|p| ProposalKey {
                address: p.addr.to_string(),
                key_id: p.key_id,
                sequence_num: p.sequence_num,
            }),
            payer: ix.payer().map(|p| p.addr.to_string()),
            authorizers: ix
                .authorizations()
                .iter()
                .map(|a| a.addr.to_string())
                .collect(),
            payload_sigs,
            envelope_sigs: ix
                .payer()
                .map(VoucherSignature::from)
                .into_iter()
                .collect(),
        })
    }
}

/// Renders the interaction's voucher as pretty printed JSON.
pub fn serialize(ix: &Interaction) -> Result<String, SerializeError> {
    let voucher = Voucher::from_interaction(ix)?;
    Ok(serde_json::to_string_pretty(&voucher)?)
}
