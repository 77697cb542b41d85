use fcl_common::{
    builders::{args, script},
    t::Value,
    Config,
};
use tracing::{debug, instrument};

use crate::{
    decode::{decode, Decoded},
    error::FclError,
    rpc::AccessClient,
    send,
};

/// Executes a read-only Cadence script and returns its result as plain JSON.
///
/// Import aliases are resolved from `config` and the configured default compute limit applies.
#[instrument(skip_all)]
pub async fn query<C: AccessClient + ?Sized>(
    client: &C,
    config: &Config,
    cadence: &str,
    arguments: Vec<Value>,
) -> Result<serde_json::Value, FclError> {
    let response = send(client, config, [script(cadence), args(arguments)]).await?;
    match decode(response)? {
        Decoded::Value(value) => {
            debug!(%value, "Script returned");
            Ok(value)
        }
        other => Err(FclError::UnexpectedResponse { expected: "Value", got: other.kind() }),
    }
}
