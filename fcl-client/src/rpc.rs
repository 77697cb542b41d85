//! # Access node transport
//!
//! Sends a finished [`Interaction`] to a Flow access node over its REST API. Every interaction
//! tag maps to one endpoint; the raw answer comes back as a [`Response`] which
//! [`crate::decode::decode`] turns into typed values.
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fcl_common::{
    address::sans_prefix,
    interaction::{Authorization, Interaction, InteractionTag},
    template::template,
};
#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;
use reqwest::{header, Client, ClientBuilder, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use tokio::{sync::RwLock, time::sleep};
use tracing::{debug, instrument, trace, warn};

use crate::{
    config::RetryConfiguration,
    dto::{
        AccountDto, BlockDto, BlockEventsDto, CollectionDto, ErrorBody, ProposalKeyDto,
        ScriptRequestBody, SignatureDto, TransactionDto, TransactionRequestBody,
        TransactionResultDto,
    },
    ACCESS_API_VERSION,
};

#[derive(Error, Debug)]
pub enum RPCError {
    /// The passed access node url failed to parse.
    #[error("Failed to parse URL: {0}. Error: {1}")]
    UrlParsing(String, String),

    /// The interaction was marked bad by the pipeline and is never sent.
    #[error("Refusing to send bad interaction: {0}")]
    BadInteraction(String),

    /// The interaction tag has no endpoint.
    #[error("Interaction {0} cannot be sent")]
    Unsupported(InteractionTag),

    /// The request data is not correctly formed.
    #[error("Failed to format request: {0}")]
    FormatRequest(String),

    /// Errors forwarded from the HTTP protocol.
    #[error("Unexpected HTTP client error: {0}")]
    HttpClient(String, #[source] reqwest::Error),

    /// The response from the server could not be parsed correctly.
    #[error("Failed to parse response: {0}")]
    ParseResponse(String),

    /// The access node answered with an error status.
    #[error("Access node returned {0}: {1}")]
    Server(u16, String),

    #[error("Rate limited until {0:?}")]
    RateLimited(Option<SystemTime>),

    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),
}

/// Undecoded answer of the access node, one variant per interaction kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ping,
    Block(BlockDto),
    BlockHeader(BlockDto),
    Account(AccountDto),
    /// Base64 encoded JSON-Cadence value.
    ScriptResult(String),
    TransactionId(String),
    Transaction(TransactionDto),
    TransactionStatus(TransactionResultDto),
    Events(Vec<BlockEventsDto>),
    Collection(CollectionDto),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Ping => "Ping",
            Response::Block(_) => "Block",
            Response::BlockHeader(_) => "BlockHeader",
            Response::Account(_) => "Account",
            Response::ScriptResult(_) => "ScriptResult",
            Response::TransactionId(_) => "TransactionId",
            Response::Transaction(_) => "Transaction",
            Response::TransactionStatus(_) => "TransactionStatus",
            Response::Events(_) => "Events",
            Response::Collection(_) => "Collection",
        }
    }
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccessClient: Send + Sync {
    /// Submits the interaction and returns the raw answer.
    ///
    /// Bad interactions are refused without any network traffic.
    async fn send(&self, interaction: &Interaction) -> Result<Response, RPCError>;
}

#[async_trait]
impl<T: AccessClient + ?Sized> AccessClient for Arc<T> {
    async fn send(&self, interaction: &Interaction) -> Result<Response, RPCError> {
        (**self).send(interaction).await
    }
}

/// Configuration options for HttpAccessClient
#[derive(Debug, Clone)]
pub struct HttpAccessClientOptions {
    /// Optional API key sent as `Authorization` header
    pub auth_key: Option<String>,
    /// Retry policy for rate limited or unreachable servers
    pub retry: RetryConfiguration,
    /// How long to wait before retrying once the server reported itself unavailable
    pub server_restart_duration: Duration,
}

impl Default for HttpAccessClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpAccessClientOptions {
    pub fn new() -> Self {
        Self {
            auth_key: None,
            retry: RetryConfiguration::transport_default(),
            server_restart_duration: Duration::from_secs(120),
        }
    }

    /// Set the authentication key
    pub fn with_auth_key(mut self, auth_key: Option<String>) -> Self {
        self.auth_key = auth_key;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfiguration) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_server_restart_duration(mut self, duration: Duration) -> Self {
        self.server_restart_duration = duration;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpAccessClient {
    http_client: Client,
    url: Url,
    retry_after: Arc<RwLock<Option<SystemTime>>>,
    backoff_policy: ExponentialBackoff,
    server_restart_duration: Duration,
}

impl HttpAccessClient {
    pub fn new(base_uri: &str, options: HttpAccessClientOptions) -> Result<Self, RPCError> {
        let uri = base_uri
            .parse::<Url>()
            .map_err(|e| RPCError::UrlParsing(base_uri.to_string(), e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let user_agent = format!("fcl-client-{version}", version = env!("CARGO_PKG_VERSION"));
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&user_agent)
                .map_err(|e| RPCError::FormatRequest(format!("Invalid user agent format: {e}")))?,
        );

        if let Some(key) = options.auth_key.as_deref() {
            let mut auth_value = header::HeaderValue::from_str(key).map_err(|e| {
                RPCError::FormatRequest(format!("Invalid authorization key format: {e}"))
            })?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = ClientBuilder::new()
            .default_headers(headers)
            .build()
            .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;
        Ok(Self {
            http_client: client,
            url: uri,
            retry_after: Arc::new(RwLock::new(None)),
            backoff_policy: options.retry.to_backoff(),
            server_restart_duration: options.server_restart_duration,
        })
    }

    #[cfg(test)]
    pub fn with_test_backoff_policy(mut self) -> Self {
        self.backoff_policy = RetryConfiguration::exponential(
            Duration::from_millis(1),
            1.1,
            Duration::from_millis(5),
            Some(Duration::from_millis(50)),
        )
        .to_backoff();
        self.server_restart_duration = Duration::from_millis(50);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url
                .to_string()
                .trim_end_matches('/'),
            ACCESS_API_VERSION,
            path
        )
    }

    /// Converts an error response to a Result.
    ///
    /// 429 yields `RateLimited` (with the parsed `Retry-After` header, if any), 502, 503 and 504
    /// yield `ServerUnreachable`, any other non success status a permanent `Server` error.
    async fn error_for_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RPCError> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_raw = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|h| h.to_str().ok())
                    .and_then(parse_retry_value);

                Err(RPCError::RateLimited(retry_after_raw))
            }
            StatusCode::BAD_GATEWAY |
            StatusCode::SERVICE_UNAVAILABLE |
            StatusCode::GATEWAY_TIMEOUT => Err(RPCError::ServerUnreachable(
                response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Server Unreachable".to_string()),
            )),
            status if !status.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.message)
                    .unwrap_or(body);
                Err(RPCError::Server(status.as_u16(), message))
            }
            _ => Ok(response),
        }
    }

    /// Classifies errors into transient or permanent ones.
    ///
    /// Transient errors are retried with a potential backoff, permanent ones are not.
    /// If the error is RateLimited, this method will set the self.retry_after value so
    /// future requests wait until the rate limit has been reset.
    async fn handle_error_for_backoff(&self, e: RPCError) -> backoff::Error<RPCError> {
        match e {
            RPCError::ServerUnreachable(_) => {
                backoff::Error::retry_after(e, self.server_restart_duration)
            }
            RPCError::RateLimited(Some(until)) => {
                let mut retry_after_guard = self.retry_after.write().await;
                *retry_after_guard = Some(
                    retry_after_guard
                        .unwrap_or(until)
                        .max(until),
                );

                if let Ok(duration) = until.duration_since(SystemTime::now()) {
                    backoff::Error::retry_after(e, duration)
                } else {
                    e.into()
                }
            }
            RPCError::RateLimited(None) => e.into(),
            _ => backoff::Error::permanent(e),
        }
    }

    /// Waits until the current rate limit time has passed.
    async fn wait_until_retry_after(&self) {
        if let Some(&until) = self.retry_after.read().await.as_ref() {
            let now = SystemTime::now();
            if until > now {
                if let Ok(duration) = until.duration_since(now) {
                    sleep(duration).await
                }
            }
        }
    }

    /// Makes a request handling transient failures, then reads the body.
    ///
    /// If a retry-after header is received it will be respected. Else the configured
    /// backoff policy is used to deal with transient network or server errors.
    async fn make_request<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        uri: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<String, RPCError> {
        self.wait_until_retry_after().await;
        let response = backoff::future::retry(self.backoff_policy.clone(), || async {
            let mut request = self
                .http_client
                .request(method.clone(), uri)
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            }
            let server_response = request
                .send()
                .await
                .map_err(|e| RPCError::HttpClient(e.to_string(), e))?;

            match self
                .error_for_response(server_response)
                .await
            {
                Ok(response) => Ok(response),
                Err(e) => Err(self.handle_error_for_backoff(e).await),
            }
        })
        .await?;
        trace!(?response, "Received response from access node");

        response
            .text()
            .await
            .map_err(|e| RPCError::ParseResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RPCError> {
        let uri = self.endpoint(path);
        debug!(%uri, ?query, "Sending GET request to access node");
        let body = self
            .make_request::<()>(Method::GET, &uri, query, None)
            .await?;
        parse_body(&body)
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        request: &B,
    ) -> Result<T, RPCError> {
        let uri = self.endpoint(path);
        debug!(%uri, ?query, "Sending POST request to access node");
        let body = self
            .make_request(Method::POST, &uri, query, Some(request))
            .await?;
        parse_body(&body)
    }

    async fn get_block(&self, ix: &Interaction) -> Result<BlockDto, RPCError> {
        let selector = ix.block();
        let blocks: Vec<BlockDto> = match (&selector.id, selector.height) {
            (Some(id), _) => {
                self.get(&format!("blocks/{id}"), &[("expand", "payload".to_string())])
                    .await?
            }
            (None, Some(height)) => {
                self.get(
                    "blocks",
                    &[("height", height.to_string()), ("expand", "payload".to_string())],
                )
                .await?
            }
            (None, None) => {
                let height = if selector.is_sealed.unwrap_or(false) { "sealed" } else { "final" };
                self.get("blocks", &[("height", height.to_string()), ("expand", "payload".to_string())])
                    .await?
            }
        };
        blocks
            .into_iter()
            .next()
            .ok_or_else(|| RPCError::ParseResponse("Access node returned no block".to_string()))
    }

    async fn get_account(&self, ix: &Interaction) -> Result<AccountDto, RPCError> {
        let address = ix
            .account()
            .ok_or_else(|| RPCError::FormatRequest("GetAccount without address".to_string()))?;
        let block_height = ix
            .block()
            .height
            .map(|h| h.to_string())
            .unwrap_or_else(|| "sealed".to_string());
        self.get(
            &format!("accounts/{}", address.to_hex()),
            &[("block_height", block_height), ("expand", "keys,contracts".to_string())],
        )
        .await
    }

    async fn execute_script(&self, ix: &Interaction) -> Result<String, RPCError> {
        let body = ScriptRequestBody {
            script: BASE64.encode(render_cadence(ix)?),
            arguments: encode_arguments(ix)?,
        };
        let selector = ix.block();
        let pin = match (&selector.id, selector.height) {
            (Some(id), _) => ("block_id", id.clone()),
            (None, Some(height)) => ("block_height", height.to_string()),
            (None, None) => ("block_height", "sealed".to_string()),
        };
        self.post("scripts", &[pin], &body)
            .await
    }

    async fn send_transaction(&self, ix: &Interaction) -> Result<String, RPCError> {
        let body = transaction_body(ix)?;
        trace!(?body, "Submitting transaction");
        let tx: TransactionDto = self
            .post("transactions", &[], &body)
            .await?;
        Ok(tx.id)
    }

    async fn get_events(&self, ix: &Interaction) -> Result<Vec<BlockEventsDto>, RPCError> {
        let selector = ix.events();
        let event_type = selector
            .event_type
            .clone()
            .ok_or_else(|| RPCError::FormatRequest("GetEvents without event type".to_string()))?;
        let mut query = vec![("type", event_type)];
        if selector.block_ids.is_empty() {
            let (Some(start), Some(end)) = (selector.start, selector.end) else {
                return Err(RPCError::FormatRequest(
                    "GetEvents needs a height range or block ids".to_string(),
                ));
            };
            query.push(("start_height", start.to_string()));
            query.push(("end_height", end.to_string()));
        } else {
            query.push(("block_ids", selector.block_ids.join(",")));
        }
        self.get("events", &query).await
    }

    fn required_id<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, RPCError> {
        value.ok_or_else(|| RPCError::FormatRequest(format!("Interaction has no {what} id")))
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, RPCError> {
    serde_json::from_str::<T>(body)
        .map_err(|err| RPCError::ParseResponse(format!("Error: {err}, Body: {body}")))
}

fn parse_retry_value(val: &str) -> Option<SystemTime> {
    if let Ok(secs) = val.parse::<u64>() {
        return Some(SystemTime::now() + Duration::from_secs(secs));
    }
    if let Ok(date) = OffsetDateTime::parse(val, &Rfc2822) {
        return Some(date.into());
    }
    None
}

/// Cadence source with params substituted, if the interaction carries any.
fn render_cadence(ix: &Interaction) -> Result<String, RPCError> {
    let cadence = ix
        .cadence()
        .ok_or_else(|| RPCError::FormatRequest("Interaction has no cadence source".to_string()))?;
    if ix.params().is_empty() {
        return Ok(cadence.to_string());
    }
    template(cadence, &ix.param_strings()).map_err(|e| RPCError::FormatRequest(e.to_string()))
}

fn encode_arguments(ix: &Interaction) -> Result<Vec<String>, RPCError> {
    ix.arguments()
        .iter()
        .map(|arg| {
            serde_json::to_vec(arg)
                .map(|json| BASE64.encode(json))
                .map_err(|e| RPCError::FormatRequest(format!("Failed to encode argument: {e}")))
        })
        .collect()
}

fn signature_dto(auth: &Authorization) -> Result<Option<SignatureDto>, RPCError> {
    let Some(signature) = auth.signature.as_deref() else {
        return Ok(None);
    };
    let raw = hex::decode(sans_prefix(signature)).map_err(|e| {
        RPCError::FormatRequest(format!("Signature of {auth} is not valid hex: {e}"))
    })?;
    Ok(Some(SignatureDto {
        address: auth.addr.to_hex(),
        key_index: auth.key_id.to_string(),
        signature: BASE64.encode(raw),
    }))
}

/// Builds the REST body of a resolved transaction interaction.
///
/// The payer signs the envelope, every other distinct signer the payload.
pub(crate) fn transaction_body(ix: &Interaction) -> Result<TransactionRequestBody, RPCError> {
    let missing = |what: &str| RPCError::FormatRequest(format!("Transaction has no {what}"));
    let message = ix.message();
    let proposer = ix
        .proposer()
        .ok_or_else(|| missing("proposer"))?;
    let payer = ix.payer().ok_or_else(|| missing("payer"))?;
    let sequence_number = proposer
        .sequence_num
        .ok_or_else(|| missing("proposer sequence number"))?;

    let mut payload_signatures: Vec<SignatureDto> = Vec::new();
    for auth in std::iter::once(proposer).chain(ix.authorizations()) {
        if auth.addr == payer.addr {
            continue;
        }
        if let Some(sig) = signature_dto(auth)? {
            if !payload_signatures
                .iter()
                .any(|s| s.address == sig.address && s.key_index == sig.key_index)
            {
                payload_signatures.push(sig);
            }
        }
    }

    Ok(TransactionRequestBody {
        script: BASE64.encode(render_cadence(ix)?),
        arguments: encode_arguments(ix)?,
        reference_block_id: message
            .ref_block
            .clone()
            .ok_or_else(|| missing("reference block"))?,
        gas_limit: message
            .compute_limit
            .ok_or_else(|| missing("compute limit"))?
            .to_string(),
        payer: payer.addr.to_hex(),
        proposal_key: ProposalKeyDto {
            address: proposer.addr.to_hex(),
            key_index: proposer.key_id.to_string(),
            sequence_number: sequence_number.to_string(),
        },
        authorizers: ix
            .authorizations()
            .iter()
            .map(|a| a.addr.to_hex())
            .collect(),
        payload_signatures,
        envelope_signatures: signature_dto(payer)?
            .into_iter()
            .collect(),
    })
}

#[async_trait]
impl AccessClient for HttpAccessClient {
    #[instrument(skip(self, interaction), fields(tag = %interaction.tag()))]
    async fn send(&self, interaction: &Interaction) -> Result<Response, RPCError> {
        if interaction.is_bad() {
            let reason = interaction
                .why()
                .unwrap_or("unknown reason")
                .to_string();
            warn!(%reason, "Refusing to send bad interaction");
            return Err(RPCError::BadInteraction(reason));
        }

        match interaction.tag() {
            InteractionTag::Ping => {
                let _: Vec<BlockDto> = self
                    .get("blocks", &[("height", "sealed".to_string())])
                    .await?;
                Ok(Response::Ping)
            }
            InteractionTag::GetBlock => Ok(Response::Block(self.get_block(interaction).await?)),
            InteractionTag::GetBlockHeader => {
                Ok(Response::BlockHeader(self.get_block(interaction).await?))
            }
            InteractionTag::GetAccount => {
                Ok(Response::Account(self.get_account(interaction).await?))
            }
            InteractionTag::Script => {
                Ok(Response::ScriptResult(self.execute_script(interaction).await?))
            }
            InteractionTag::Transaction => {
                Ok(Response::TransactionId(self.send_transaction(interaction).await?))
            }
            InteractionTag::GetEvents => Ok(Response::Events(self.get_events(interaction).await?)),
            InteractionTag::GetCollection => {
                let id = Self::required_id(interaction.collection_id(), "collection")?;
                let collection = self
                    .get(&format!("collections/{id}"), &[("expand", "transactions".to_string())])
                    .await?;
                Ok(Response::Collection(collection))
            }
            InteractionTag::GetTransaction => {
                let id = Self::required_id(interaction.transaction_id(), "transaction")?;
                let tx = self
                    .get(&format!("transactions/{id}"), &[])
                    .await?;
                Ok(Response::Transaction(tx))
            }
            InteractionTag::GetTransactionStatus => {
                let id = Self::required_id(interaction.transaction_id(), "transaction")?;
                let result = self
                    .get(&format!("transaction_results/{id}"), &[])
                    .await?;
                Ok(Response::TransactionStatus(result))
            }
            InteractionTag::Unknown => Err(RPCError::Unsupported(InteractionTag::Unknown)),
        }
    }
}

#[cfg(test)]
mod tests {
    use fcl_common::{
        builders::{
            args, at_block_height, authorizations, get_account, get_block, get_events,
            get_transaction_status, limit, param, payer, ping, proposer, ref_block, script,
            transaction,
        },
        build,
        interaction::authorization,
        t::Value,
    };
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;

    use super::*;

    const REF: &str = "7bc89e2efb2e1d3aa1c6b0d5cf1b4ea1e0c9c1a5e3f1d6a9b8c7d6e5f4a3b2c1";

    const BLOCK_RESP: &str = r#"
        [
            {
                "header": {
                    "id": "7bc89e2efb2e1d3aa1c6b0d5cf1b4ea1e0c9c1a5e3f1d6a9b8c7d6e5f4a3b2c1",
                    "parent_id": "1111111111111111111111111111111111111111111111111111111111111111",
                    "height": "1234",
                    "timestamp": "2024-05-01T10:00:00.000000000Z"
                },
                "payload": {
                    "collection_guarantees": [
                        {"collection_id": "2222222222222222222222222222222222222222222222222222222222222222", "signer_ids": []}
                    ],
                    "block_seals": []
                }
            }
        ]
        "#;

    fn client(server: &Server) -> HttpAccessClient {
        HttpAccessClient::new(server.url().as_str(), HttpAccessClientOptions::default())
            .expect("create client")
            .with_test_backoff_policy()
    }

    #[tokio::test]
    async fn test_get_latest_sealed_block() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("GET", "/v1/blocks")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("height".into(), "sealed".into()),
                Matcher::UrlEncoded("expand".into(), "payload".into()),
            ]))
            .expect(1)
            .with_body(BLOCK_RESP)
            .create_async()
            .await;

        let response = client(&server)
            .send(&build([get_block(true)]))
            .await
            .expect("get block");

        mocked_server.assert();
        let Response::Block(block) = response else { panic!("expected block, got {response:?}") };
        assert_eq!(block.header.height, "1234");
    }

    #[tokio::test]
    async fn test_ping() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("GET", "/v1/blocks")
            .match_query(Matcher::UrlEncoded("height".into(), "sealed".into()))
            .expect(1)
            .with_body(BLOCK_RESP)
            .create_async()
            .await;

        let response = client(&server)
            .send(&build([ping()]))
            .await
            .expect("ping");

        mocked_server.assert();
        assert_eq!(response, Response::Ping);
    }

    #[tokio::test]
    async fn test_get_account() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("GET", "/v1/accounts/f8d6e0586b0a20c7")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("block_height".into(), "sealed".into()),
                Matcher::UrlEncoded("expand".into(), "keys,contracts".into()),
            ]))
            .expect(1)
            .with_body(r#"{"address": "f8d6e0586b0a20c7", "balance": "100000", "keys": [], "contracts": {}}"#)
            .create_async()
            .await;

        let response = client(&server)
            .send(&build([get_account("0xf8d6e0586b0a20c7")]))
            .await
            .expect("get account");

        mocked_server.assert();
        let Response::Account(account) = response else { panic!("expected account") };
        assert_eq!(account.balance, "100000");
    }

    #[tokio::test]
    async fn test_execute_script_at_height() {
        let mut server = Server::new_async().await;
        let expected_body = serde_json::json!({
            "script": BASE64.encode("pub fun main(a: Int): Int { return a * 2 }"),
            "arguments": [BASE64.encode(r#"{"type":"Int","value":"21"}"#)],
        });
        let mocked_server = server
            .mock("POST", "/v1/scripts")
            .match_query(Matcher::UrlEncoded("block_height".into(), "42".into()))
            .match_body(Matcher::Json(expected_body))
            .expect(1)
            .with_body(format!("\"{}\"", BASE64.encode(r#"{"type":"Int","value":"42"}"#)))
            .create_async()
            .await;

        let response = client(&server)
            .send(&build([
                script("pub fun main(a: Int): Int { return a * ${factor} }"),
                param("factor", Value::int(2)),
                args(vec![Value::int(21)]),
                at_block_height(42),
            ]))
            .await
            .expect("execute script");

        mocked_server.assert();
        assert_eq!(
            response,
            Response::ScriptResult(BASE64.encode(r#"{"type":"Int","value":"42"}"#))
        );
    }

    #[tokio::test]
    async fn test_send_transaction() {
        let mut server = Server::new_async().await;
        let tx_resp = format!(
            r#"{{
                "id": "{REF}",
                "script": "",
                "arguments": [],
                "reference_block_id": "{REF}",
                "gas_limit": "100",
                "payer": "f8d6e0586b0a20c7",
                "proposal_key": {{"address": "f8d6e0586b0a20c7", "key_index": "0", "sequence_number": "7"}},
                "authorizers": [],
                "payload_signatures": [],
                "envelope_signatures": []
            }}"#
        );
        let mocked_server = server
            .mock("POST", "/v1/transactions")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "reference_block_id": REF,
                "gas_limit": "100",
                "payer": "f8d6e0586b0a20c7",
                "proposal_key": {"address": "f8d6e0586b0a20c7", "key_index": "0", "sequence_number": "7"},
                "authorizers": ["f8d6e0586b0a20c7"],
                "payload_signatures": [],
                "envelope_signatures": [{"address": "f8d6e0586b0a20c7", "key_index": "0", "signature": BASE64.encode([0xab, 0xcd])}],
            })))
            .expect(1)
            .with_body(tx_resp)
            .create_async()
            .await;
        let service = authorization("0xf8d6e0586b0a20c7", 0, Some(7))
            .unwrap()
            .with_signature("abcd");

        let response = client(&server)
            .send(&build([
                transaction("transaction { prepare(acct: AuthAccount) {} }"),
                proposer(service.clone()),
                payer(service.clone()),
                authorizations(vec![service]),
                limit(100),
                ref_block(REF),
            ]))
            .await
            .expect("send transaction");

        mocked_server.assert();
        assert_eq!(response, Response::TransactionId(REF.to_string()));
    }

    #[test]
    fn test_transaction_body_requires_resolved_fields() {
        let auth = authorization("0x01", 0, None).unwrap();
        let ix = build([
            transaction("transaction {}"),
            proposer(auth.clone()),
            payer(auth),
            limit(10),
            ref_block(REF),
        ]);

        let err = transaction_body(&ix).unwrap_err();

        assert_eq!(err.to_string(), "Failed to format request: Transaction has no proposer sequence number");
    }

    #[test]
    fn test_transaction_body_splits_signatures() {
        let alice = authorization("0x01", 0, Some(1))
            .unwrap()
            .with_signature("01");
        let service = authorization("0x02", 3, None)
            .unwrap()
            .with_signature("0x02");
        let ix = build([
            transaction("transaction {}"),
            proposer(alice.clone()),
            payer(service),
            authorizations(vec![alice]),
            limit(10),
            ref_block(REF),
        ]);

        let body = transaction_body(&ix).unwrap();

        assert_eq!(
            body.payload_signatures,
            vec![SignatureDto {
                address: "0000000000000001".to_string(),
                key_index: "0".to_string(),
                signature: BASE64.encode([1u8]),
            }]
        );
        assert_eq!(body.envelope_signatures[0].key_index, "3");
    }

    #[tokio::test]
    async fn test_get_events_range() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("GET", "/v1/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("type".into(), "A.1.Foo.Bar".into()),
                Matcher::UrlEncoded("start_height".into(), "5".into()),
                Matcher::UrlEncoded("end_height".into(), "6".into()),
            ]))
            .expect(1)
            .with_body("[]")
            .create_async()
            .await;

        let response = client(&server)
            .send(&build([get_events("A.1.Foo.Bar", 5, 6)]))
            .await
            .expect("get events");

        mocked_server.assert();
        assert_eq!(response, Response::Events(vec![]));
    }

    #[tokio::test]
    async fn test_bad_interaction_is_not_sent() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let res = client(&server)
            .send(&build([ping(), limit(0)]))
            .await;

        mocked_server.assert();
        assert!(matches!(res, Err(RPCError::BadInteraction(reason)) if reason.starts_with("limit")));
    }

    #[tokio::test]
    async fn test_unknown_interaction() {
        let server = Server::new_async().await;

        let res = client(&server)
            .send(&Interaction::default())
            .await;

        assert!(matches!(res, Err(RPCError::Unsupported(InteractionTag::Unknown))));
    }

    #[tokio::test]
    async fn test_server_error_is_permanent() {
        let mut server = Server::new_async().await;
        let id = REF;
        let mocked_server = server
            .mock("GET", format!("/v1/transaction_results/{id}").as_str())
            .expect(1)
            .with_status(404)
            .with_body(r#"{"code": 404, "message": "transaction not found"}"#)
            .create_async()
            .await;

        let res = client(&server)
            .send(&build([get_transaction_status(id)]))
            .await;

        mocked_server.assert();
        assert!(matches!(res, Err(RPCError::Server(404, msg)) if msg == "transaction not found"));
    }

    #[test_log::test(tokio::test)]
    async fn test_retries_unavailable_server() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/v1/blocks")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/v1/blocks")
            .match_query(Matcher::Any)
            .with_body(BLOCK_RESP)
            .expect(1)
            .create_async()
            .await;

        let res = client(&server)
            .send(&build([get_block(false)]))
            .await;

        failing.assert();
        succeeding.assert();
        assert!(res.is_ok());
    }

    #[test]
    fn test_parse_retry_value() {
        let now = SystemTime::now();

        let parsed = parse_retry_value("10").expect("seconds");
        assert!(parsed >= now + Duration::from_secs(9));

        assert!(parse_retry_value("Wed, 21 Oct 2015 07:28:00 GMT").is_some());
        assert!(parse_retry_value("soon").is_none());
    }
}
