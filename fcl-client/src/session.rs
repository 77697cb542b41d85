//! # Current user session
//!
//! [`CurrentUser`] tracks who is logged in. Authentication itself is delegated to an
//! [`Authenticator`] (a wallet discovery flow, a dev wallet, a fixed service account in tests);
//! the session only keeps the resulting identity, expires it and broadcasts changes to
//! subscribers through a `watch` channel.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fcl_common::{address::Address, Authorization};
#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("No user is logged in")]
    NotAuthenticated,
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOptions {
    /// Authenticate again even if a valid session exists.
    pub force: bool,
    /// Wallet service endpoint to authenticate against, the authenticator's default if unset.
    pub service: Option<String>,
}

/// Account and key an authenticator vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub addr: Address,
    pub key_id: u32,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, options: &AuthOptions) -> Result<Identity, SessionError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentUserSnapshot {
    pub addr: Option<Address>,
    pub key_id: Option<u32>,
    pub logged_in: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub session_id: Option<Uuid>,
}

impl CurrentUserSnapshot {
    fn from_identity(identity: Identity) -> Self {
        Self {
            addr: Some(identity.addr),
            key_id: Some(identity.key_id),
            logged_in: true,
            expires_at: identity.expires_at,
            session_id: Some(Uuid::new_v4()),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expiry| expiry <= now)
    }

    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.logged_in && !self.is_expired(now)
    }
}

/// An explicitly owned login session.
pub struct CurrentUser<A> {
    authenticator: A,
    state: watch::Sender<CurrentUserSnapshot>,
}

impl<A: Authenticator> CurrentUser<A> {
    pub fn new(authenticator: A) -> Self {
        let (state, _) = watch::channel(CurrentUserSnapshot::default());
        Self { authenticator, state }
    }

    /// Logs in, unless a valid session exists and `force` is not set.
    pub async fn authenticate(
        &self,
        options: &AuthOptions,
    ) -> Result<CurrentUserSnapshot, SessionError> {
        let current = self.snapshot();
        if current.logged_in && !options.force {
            debug!(addr = ?current.addr, "Reusing existing session");
            return Ok(current);
        }

        let identity = self
            .authenticator
            .authenticate(options)
            .await?;
        if identity
            .expires_at
            .is_some_and(|expiry| expiry <= Utc::now())
        {
            return Err(SessionError::AuthenticationFailed(format!(
                "session for {} is already expired",
                identity.addr
            )));
        }
        let snapshot = CurrentUserSnapshot::from_identity(identity);
        info!(addr = ?snapshot.addr, session_id = ?snapshot.session_id, "User authenticated");
        self.state
            .send_replace(snapshot.clone());
        Ok(snapshot)
    }

    pub fn unauthenticate(&self) {
        let previous = self
            .state
            .send_replace(CurrentUserSnapshot::default());
        if previous.logged_in {
            info!(addr = ?previous.addr, "User logged out");
        }
    }

    /// Drops the current session and authenticates again.
    pub async fn reauthenticate(&self) -> Result<CurrentUserSnapshot, SessionError> {
        self.unauthenticate();
        self.authenticate(&AuthOptions::default())
            .await
    }

    pub async fn sign_up(&self, options: &AuthOptions) -> Result<CurrentUserSnapshot, SessionError> {
        self.authenticate(options).await
    }

    pub async fn log_in(&self, options: &AuthOptions) -> Result<CurrentUserSnapshot, SessionError> {
        self.authenticate(options).await
    }

    /// Current session state. An expired session is logged out on access.
    pub fn snapshot(&self) -> CurrentUserSnapshot {
        let current = self.state.borrow().clone();
        if current.logged_in && !current.is_valid(Utc::now()) {
            debug!(addr = ?current.addr, "Session expired");
            self.unauthenticate();
            return CurrentUserSnapshot::default();
        }
        current
    }

    pub fn subscribe(&self) -> watch::Receiver<CurrentUserSnapshot> {
        self.state.subscribe()
    }

    /// Signer reference of the logged in account, usable as proposer, payer or authorizer.
    pub fn authorization(&self) -> Result<Authorization, SessionError> {
        let snapshot = self.snapshot();
        match (snapshot.logged_in, snapshot.addr, snapshot.key_id) {
            (true, Some(addr), Some(key_id)) => Ok(Authorization::new(addr, key_id)),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}
