use fcl_common::{config::ConfigError, template::TemplateError};
use thiserror::Error;

use crate::{decode::DecodeError, rpc::RPCError};

/// Errors of the high level helpers, which chain pipeline, resolution, transport and decoding.
#[derive(Error, Debug)]
pub enum FclError {
    /// The pipeline marked the interaction bad; carries the diagnostic.
    #[error("Interaction rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Rpc(#[from] RPCError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    /// The access node answered with a different kind of response than requested.
    #[error("Unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: &'static str, got: &'static str },
}
