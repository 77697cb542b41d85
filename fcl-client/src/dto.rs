//! Data Transfer Objects of the Flow REST access API.
//!
//! These mirror the wire format one to one: 64 bit integers are strings, binary payloads
//! (scripts, arguments, event payloads, signatures) are base64. Turning them into something
//! useful is the job of [`crate::decode`].
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeaderDto {
    pub id: String,
    pub parent_id: String,
    pub height: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionGuaranteeDto {
    pub collection_id: String,
    #[serde(default)]
    pub signer_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockPayloadDto {
    #[serde(default)]
    pub collection_guarantees: Vec<CollectionGuaranteeDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockDto {
    pub header: BlockHeaderDto,
    #[serde(default)]
    pub payload: Option<BlockPayloadDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeyDto {
    pub index: String,
    pub public_key: String,
    pub signing_algorithm: String,
    pub hashing_algorithm: String,
    pub sequence_number: String,
    pub weight: String,
    pub revoked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDto {
    pub address: String,
    pub balance: String,
    #[serde(default)]
    pub keys: Vec<AccountKeyDto>,
    #[serde(default)]
    pub contracts: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDto {
    #[serde(rename = "type")]
    pub event_type: String,
    pub transaction_id: String,
    pub transaction_index: String,
    pub event_index: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEventsDto {
    pub block_id: String,
    pub block_height: String,
    pub block_timestamp: String,
    #[serde(default)]
    pub events: Vec<EventDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTransactionDto {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDto {
    pub id: String,
    #[serde(default)]
    pub transactions: Vec<CollectionTransactionDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalKeyDto {
    pub address: String,
    pub key_index: String,
    pub sequence_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDto {
    pub address: String,
    pub key_index: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDto {
    pub id: String,
    pub script: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    pub reference_block_id: String,
    pub gas_limit: String,
    pub payer: String,
    pub proposal_key: ProposalKeyDto,
    #[serde(default)]
    pub authorizers: Vec<String>,
    #[serde(default)]
    pub payload_signatures: Vec<SignatureDto>,
    #[serde(default)]
    pub envelope_signatures: Vec<SignatureDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResultDto {
    #[serde(default)]
    pub block_id: String,
    pub status: String,
    pub status_code: u32,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub computation_used: String,
    #[serde(default)]
    pub events: Vec<EventDto>,
}

/// Body of `POST /v1/scripts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRequestBody {
    pub script: String,
    pub arguments: Vec<String>,
}

/// Body of `POST /v1/transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequestBody {
    pub script: String,
    pub arguments: Vec<String>,
    pub reference_block_id: String,
    pub gas_limit: String,
    pub payer: String,
    pub proposal_key: ProposalKeyDto,
    pub authorizers: Vec<String>,
    pub payload_signatures: Vec<SignatureDto>,
    pub envelope_signatures: Vec<SignatureDto>,
}

/// Error body returned by the access node for 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_transaction_result() {
        let body = r#"
        {
            "block_id": "7bc89e2efb2e1d3aa1c6b0d5cf1b4ea1e0c9c1a5e3f1d6a9b8c7d6e5f4a3b2c1",
            "collection_id": "1111111111111111111111111111111111111111111111111111111111111111",
            "execution": "Success",
            "status": "Sealed",
            "status_code": 0,
            "error_message": "",
            "computation_used": "12",
            "events": [],
            "_links": {"_self": "/v1/transaction_results/abc"}
        }
        "#;

        let res: TransactionResultDto = serde_json::from_str(body).expect("deserialize");

        assert_eq!(res.status, "Sealed");
        assert_eq!(res.status_code, 0);
        assert_eq!(res.computation_used, "12");
    }

    #[test]
    fn test_deserialize_block_without_payload() {
        let body = r#"[{"header": {"id": "aa", "parent_id": "bb", "height": "10", "timestamp": "2024-01-01T00:00:00Z"}}]"#;

        let blocks: Vec<BlockDto> = serde_json::from_str(body).expect("deserialize");

        assert_eq!(blocks[0].header.height, "10");
        assert_eq!(blocks[0].payload, None);
    }
}
