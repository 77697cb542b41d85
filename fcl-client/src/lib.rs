//! Flow client library.
//!
//! Build an interaction with the builders from [`fcl_common`], [`send`] it to an access node
//! and [`decode`] the answer:
//!
//! ```no_run
//! use fcl_client::{builders::get_block, decode, send, Config, HttpAccessClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::with_defaults();
//! let client = HttpAccessClient::new(config.access_node()?, Default::default())?;
//! let block = decode(send(&client, &config, [get_block(true)]).await?)?;
//! println!("{}", serde_json::to_string(&block)?);
//! # Ok(())
//! # }
//! ```
pub mod cli;
pub mod config;
pub mod decode;
pub mod dto;
pub mod error;
pub mod events;
pub mod models;
pub mod query;
pub mod resolve;
pub mod rpc;
pub mod session;
pub mod tx;

use fcl_common::{
    build,
    builders::{get_account, get_block},
    Transformer,
};
use tracing::instrument;

pub use crate::{
    decode::{decode, Decoded},
    error::FclError,
    events::events,
    query::query,
    rpc::{AccessClient, HttpAccessClient, HttpAccessClientOptions, RPCError, Response},
    session::{AuthOptions, Authenticator, CurrentUser, CurrentUserSnapshot},
    tx::{tx, TransactionWatcher},
};
pub use fcl_common::{
    address::{display, sans_prefix, with_prefix},
    builders,
    config::Config,
    is_bad, is_ok,
    pipeline::{invariant, validator},
    t,
    template::{cadence, cdc, template},
    why, Interaction,
};

/// Version of this library, reported in the user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path prefix of the Flow REST access API.
pub(crate) const ACCESS_API_VERSION: &str = "v1";

/// Builds an interaction from `transformers`, resolves it and sends it.
///
/// A rejected interaction never reaches the network; its diagnostic is returned as
/// [`FclError::Rejected`].
#[instrument(skip_all)]
pub async fn send<C, I>(client: &C, config: &Config, transformers: I) -> Result<Response, FclError>
where
    C: AccessClient + ?Sized,
    I: IntoIterator,
    I::Item: Transformer,
{
    let ix = build(transformers);
    send_interaction(client, config, ix).await
}

/// Resolves and sends an already built interaction.
pub async fn send_interaction<C: AccessClient + ?Sized>(
    client: &C,
    config: &Config,
    ix: Interaction,
) -> Result<Response, FclError> {
    let ix = resolve::resolve(client, config, ix).await?;
    Ok(client.send(&ix).await?)
}

/// Fetches an account at the latest sealed block.
pub async fn account<C: AccessClient + ?Sized>(
    client: &C,
    address: &str,
) -> Result<models::Account, FclError> {
    match send(client, &Config::new(), [get_account(address)]).await? {
        Response::Account(dto) => Ok(decode::decode_account(dto)?),
        other => Err(FclError::UnexpectedResponse { expected: "Account", got: other.kind() }),
    }
}

/// Fetches the latest sealed or finalized block.
pub async fn latest_block<C: AccessClient + ?Sized>(
    client: &C,
    sealed: bool,
) -> Result<models::Block, FclError> {
    match send(client, &Config::new(), [get_block(sealed)]).await? {
        Response::Block(dto) => Ok(decode::decode_block(dto)?),
        other => Err(FclError::UnexpectedResponse { expected: "Block", got: other.kind() }),
    }
}
