//! Transaction status tracking.
//!
//! [`tx`] returns a [`TransactionWatcher`] that polls the access node until the transaction
//! reaches the requested status.
use backoff::backoff::Backoff;
use fcl_common::{build, builders::get_transaction_status, interaction::normalize_id};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::{
    config::RetryConfiguration,
    decode::decode_transaction_status,
    error::FclError,
    models::{TransactionStatus, TransactionStatusInfo},
    rpc::{AccessClient, Response},
};

#[derive(Error, Debug)]
pub enum TxError {
    #[error("Invalid transaction id: {0:?}")]
    InvalidId(String),
    #[error("Transaction {id} failed with code {code}: {message}")]
    Failed { id: String, code: u32, message: String },
    #[error("Transaction {0} expired")]
    Expired(String),
    #[error("Gave up waiting for transaction {id} to become {target}, last status {last}")]
    Timeout { id: String, target: TransactionStatus, last: TransactionStatus },
    #[error(transparent)]
    Fcl(#[from] FclError),
}

/// Watches a single transaction.
pub struct TransactionWatcher<C> {
    client: C,
    id: String,
    polling: RetryConfiguration,
}

/// Starts watching the transaction with the given id.
pub fn tx<C: AccessClient>(client: C, id: &str) -> Result<TransactionWatcher<C>, TxError> {
    let id = normalize_id(id).ok_or_else(|| TxError::InvalidId(id.to_string()))?;
    Ok(TransactionWatcher { client, id, polling: RetryConfiguration::polling_default() })
}

impl<C: AccessClient> TransactionWatcher<C> {
    pub fn with_polling(mut self, polling: RetryConfiguration) -> Self {
        self.polling = polling;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetches the current status once.
    pub async fn snapshot(&self) -> Result<TransactionStatusInfo, TxError> {
        let response = self
            .client
            .send(&build([get_transaction_status(self.id.as_str())]))
            .await
            .map_err(FclError::from)?;
        match response {
            Response::TransactionStatus(dto) => {
                Ok(decode_transaction_status(dto).map_err(FclError::from)?)
            }
            other => Err(FclError::UnexpectedResponse {
                expected: "TransactionStatus",
                got: other.kind(),
            }
            .into()),
        }
    }

    pub async fn once_finalized(&self) -> Result<TransactionStatusInfo, TxError> {
        self.once(TransactionStatus::Finalized)
            .await
    }

    pub async fn once_executed(&self) -> Result<TransactionStatusInfo, TxError> {
        self.once(TransactionStatus::Executed)
            .await
    }

    pub async fn once_sealed(&self) -> Result<TransactionStatusInfo, TxError> {
        self.once(TransactionStatus::Sealed)
            .await
    }

    /// Polls until the status is at least `target`.
    ///
    /// An execution error or an expired transaction ends the wait with an error.
    #[instrument(skip(self), fields(id = %self.id))]
    pub async fn once(&self, target: TransactionStatus) -> Result<TransactionStatusInfo, TxError> {
        let mut schedule = self.polling.schedule();
        let mut attempt = 0;
        loop {
            let info = self.snapshot().await?;
            debug!(status = %info.status, attempt, "Polled transaction status");
            if info.status == TransactionStatus::Expired {
                return Err(TxError::Expired(self.id.clone()));
            }
            if info.is_failed() {
                warn!(code = info.status_code, error = %info.error_message, "Transaction failed");
                return Err(TxError::Failed {
                    id: self.id.clone(),
                    code: info.status_code,
                    message: info.error_message,
                });
            }
            if info.status >= target {
                return Ok(info);
            }

            let Some(delay) = schedule.next_backoff() else {
                return Err(TxError::Timeout { id: self.id.clone(), target, last: info.status });
            };
            sleep(delay).await;
            attempt += 1;
        }
    }
}
