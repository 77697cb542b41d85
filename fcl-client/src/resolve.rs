//! Fills in what a built interaction still lacks before it can be sent: import addresses,
//! the compute limit, the reference block and the proposer's sequence number.
use fcl_common::{
    build,
    builders::{get_account, get_block, limit, proposer, ref_block, script, transaction},
    pipe,
    template::resolve_imports,
    BoxedTransformer, Config, Interaction, InteractionTag,
};
use tracing::{debug, instrument};

use crate::{
    decode::{decode_account, decode_block},
    error::FclError,
    rpc::{AccessClient, Response},
};

fn rejected(ix: &Interaction) -> FclError {
    FclError::Rejected(
        ix.why()
            .unwrap_or("unknown reason")
            .to_string(),
    )
}

fn apply(ix: Interaction, step: BoxedTransformer) -> Result<Interaction, FclError> {
    let ix = pipe(ix, [step]);
    if ix.is_bad() {
        return Err(rejected(&ix));
    }
    Ok(ix)
}

/// Resolves a script or transaction interaction against the access node and config.
///
/// Other interactions pass through unchanged. A bad interaction is an error.
#[instrument(skip_all, fields(tag = %ix.tag()))]
pub async fn resolve<C: AccessClient + ?Sized>(
    client: &C,
    config: &Config,
    ix: Interaction,
) -> Result<Interaction, FclError> {
    if ix.is_bad() {
        return Err(rejected(&ix));
    }
    let tag = ix.tag();
    if !matches!(tag, InteractionTag::Script | InteractionTag::Transaction) {
        return Ok(ix);
    }

    let mut ix = ix;
    let resolved = ix
        .cadence()
        .map(|cadence| resolve_imports(cadence, config))
        .transpose()?;
    if let Some(resolved) = resolved {
        if ix.cadence() != Some(resolved.as_str()) {
            debug!("Resolved import aliases");
            let step = if tag == InteractionTag::Script {
                script(resolved)
            } else {
                transaction(resolved)
            };
            ix = apply(ix, step)?;
        }
    }

    if ix.message().compute_limit.is_none() {
        ix = apply(ix, limit(config.default_limit()?))?;
    }

    if tag == InteractionTag::Transaction {
        if ix.message().ref_block.is_none() {
            let block = match client
                .send(&build([get_block(true)]))
                .await?
            {
                Response::Block(dto) => decode_block(dto)?,
                other => {
                    return Err(FclError::UnexpectedResponse {
                        expected: "Block",
                        got: other.kind(),
                    })
                }
            };
            debug!(ref_block = %block.id, height = block.height, "Using latest sealed block as reference");
            ix = apply(ix, ref_block(block.id))?;
        }

        if let Some(auth) = ix
            .proposer()
            .filter(|p| p.sequence_num.is_none())
            .cloned()
        {
            let account = match client
                .send(&build([get_account(auth.addr.to_string())]))
                .await?
            {
                Response::Account(dto) => decode_account(dto)?,
                other => {
                    return Err(FclError::UnexpectedResponse {
                        expected: "Account",
                        got: other.kind(),
                    })
                }
            };
            let Some(key) = account.key(auth.key_id) else {
                return Err(FclError::Rejected(format!(
                    "proposer: account {} has no key {}",
                    auth.addr, auth.key_id
                )));
            };
            debug!(proposer = %auth, sequence_num = key.sequence_number, "Resolved proposer sequence number");
            let sequence_num = key.sequence_number;
            ix = apply(ix, proposer(auth.with_sequence_num(sequence_num)))?;
        }
    }

    Ok(ix)
}
