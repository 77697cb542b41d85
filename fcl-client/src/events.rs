//! Event subscriptions.
//!
//! [`events`] spawns a task that follows the sealed chain head and forwards every event of the
//! requested type over a channel, in block order.
use std::{sync::Arc, time::Duration};

use fcl_common::{
    build,
    builders::{get_block, get_events},
    Interaction,
};
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    decode::{decode_block, decode_block_events},
    error::FclError,
    models::Event,
    rpc::{AccessClient, Response},
};

/// Upper bound of blocks per events request accepted by access nodes.
pub const MAX_BLOCK_RANGE: u64 = 250;
const MAX_CONSECUTIVE_FAILURES: u32 = 10;
const CHANNEL_CAPACITY: usize = 128;

/// Subscribes to events of `event_type`, starting after the current sealed block.
///
/// The task ends with `Ok(())` once the receiver is dropped, or with the last error after
/// repeated failures.
pub fn events<C>(
    client: Arc<C>,
    event_type: impl Into<String>,
    poll_interval: Duration,
) -> (JoinHandle<Result<(), FclError>>, Receiver<Event>)
where
    C: AccessClient + ?Sized + 'static,
{
    let event_type = event_type.into();
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let span = info_span!("events", subscription = %Uuid::new_v4(), %event_type);
    let handle = tokio::spawn(
        async move {
            let res = poll_events(client, event_type, poll_interval, tx).await;
            if let Err(e) = &res {
                error!(error = %e, "Event subscription failed");
            }
            res
        }
        .instrument(span),
    );
    (handle, rx)
}

fn ensure_ok(ix: Interaction) -> Result<Interaction, FclError> {
    if ix.is_bad() {
        return Err(FclError::Rejected(
            ix.why()
                .unwrap_or("unknown reason")
                .to_string(),
        ));
    }
    Ok(ix)
}

async fn latest_sealed_height<C: AccessClient + ?Sized>(client: &C) -> Result<u64, FclError> {
    match client
        .send(&build([get_block(true)]))
        .await?
    {
        Response::Block(dto) => Ok(decode_block(dto)?.height),
        other => Err(FclError::UnexpectedResponse { expected: "Block", got: other.kind() }),
    }
}

async fn fetch_range<C: AccessClient + ?Sized>(
    client: &C,
    event_type: &str,
    start: u64,
    end: u64,
) -> Result<Vec<Event>, FclError> {
    let ix = ensure_ok(build([get_events(event_type, start, end)]))?;
    match client.send(&ix).await? {
        Response::Events(blocks) => Ok(decode_block_events(blocks)?),
        other => Err(FclError::UnexpectedResponse { expected: "Events", got: other.kind() }),
    }
}

/// One polling round: forwards events of all blocks in `cursor..=latest`.
///
/// `cursor` advances after each fully forwarded batch, so a failed round resumes at the range
/// that failed. Returns `false` once the receiver is gone.
async fn forward_new_events<C: AccessClient + ?Sized>(
    client: &C,
    event_type: &str,
    cursor: &mut u64,
    tx: &Sender<Event>,
) -> Result<bool, FclError> {
    let latest = latest_sealed_height(client).await?;
    while *cursor <= latest {
        let start = *cursor;
        let end = latest.min(start + MAX_BLOCK_RANGE - 1);
        let batch = fetch_range(client, event_type, start, end).await?;
        debug!(start, end, count = batch.len(), "Fetched events");
        for event in batch {
            if tx.send(event).await.is_err() {
                return Ok(false);
            }
        }
        *cursor = end + 1;
    }
    Ok(true)
}

async fn poll_events<C: AccessClient + ?Sized>(
    client: Arc<C>,
    event_type: String,
    poll_interval: Duration,
    tx: Sender<Event>,
) -> Result<(), FclError> {
    // Fail fast on a malformed subscription instead of retrying it.
    ensure_ok(build([get_events(event_type.as_str(), 0, 0)]))?;

    // Unset until the sealed head at subscription time is known.
    let mut cursor: Option<u64> = None;
    let mut failures = 0;
    loop {
        if tx.is_closed() {
            info!("Event receiver dropped, stopping subscription");
            return Ok(());
        }
        if cursor.is_some() || failures > 0 {
            sleep(poll_interval).await;
        }

        let round = match cursor {
            None => latest_sealed_height(client.as_ref())
                .await
                .map(|height| {
                    info!(start = height + 1, "Event subscription started");
                    cursor = Some(height + 1);
                    true
                }),
            Some(ref mut next) => forward_new_events(client.as_ref(), &event_type, next, &tx).await,
        };

        match round {
            Ok(true) => failures = 0,
            Ok(false) => {
                info!("Event receiver dropped, stopping subscription");
                return Ok(());
            }
            Err(e @ FclError::Rejected(_)) => return Err(e),
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "Polling events failed");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    return Err(e);
                }
            }
        }
    }
}
