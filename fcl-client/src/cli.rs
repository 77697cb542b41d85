use std::{fs, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use fcl_common::{
    builders::{
        at_block_height, get_block, get_block_by_height, get_block_by_id, get_events,
        get_transaction_status, ping,
    },
    config::ACCESS_NODE_API,
    t::Value,
    BoxedTransformer, Config,
};
use tracing::{debug, info};
use tracing_appender::rolling;

use crate::{
    decode::{decode, Decoded},
    query::query,
    rpc::{HttpAccessClient, HttpAccessClientOptions},
    send,
};

/// Flow Client CLI - send scripts and queries to a Flow access node
///
/// Every command prints the decoded answer as JSON on stdout.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    /// Access node REST endpoint. Example: https://rest-testnet.onflow.org
    #[clap(long, default_value = "http://localhost:8888", env = "FCL_ACCESS_NODE")]
    access_node: String,

    /// Access node API key, sent as Authorization header.
    #[clap(short = 'k', long, env = "FCL_AUTH_KEY")]
    auth_key: Option<String>,

    /// Address aliases used to resolve imports, in the format 0xAlias=0xADDRESS.
    #[clap(long = "alias", number_of_values = 1)]
    aliases: Vec<String>,

    /// Default compute limit for scripts.
    #[clap(long, default_value = "100")]
    limit: u64,

    /// Logging folder path.
    #[clap(long, default_value = "logs")]
    log_folder: String,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Checks that the access node is reachable.
    Ping,
    /// Fetches a block, the latest finalized one by default.
    Block(BlockArgs),
    /// Fetches an account with its keys and contracts.
    Account {
        address: String,
    },
    /// Executes a read-only Cadence script.
    Script {
        /// Path of the Cadence source file.
        file: PathBuf,
        /// JSON-Cadence argument, e.g. '{"type":"Int","value":"1"}'. Repeatable.
        #[clap(long = "arg", number_of_values = 1)]
        args: Vec<String>,
        /// Execute against this block height instead of the latest sealed block.
        #[clap(long)]
        height: Option<u64>,
    },
    /// Fetches events of a type in an inclusive height range.
    Events {
        event_type: String,
        #[clap(long)]
        start: u64,
        #[clap(long)]
        end: u64,
    },
    /// Fetches the status of a transaction.
    TxStatus {
        id: String,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
struct BlockArgs {
    /// Latest sealed instead of latest finalized block.
    #[clap(long, conflicts_with_all = ["height", "id"])]
    sealed: bool,
    #[clap(long, conflicts_with = "id")]
    height: Option<u64>,
    #[clap(long)]
    id: Option<String>,
}

impl CliArgs {
    fn config(&self) -> Result<Config, String> {
        let mut config = Config::with_defaults()
            .put(ACCESS_NODE_API, self.access_node.as_str())
            .put(fcl_common::config::DEFAULT_LIMIT, self.limit.to_string());
        for alias in &self.aliases {
            let (name, address) = alias
                .split_once('=')
                .filter(|(name, _)| name.starts_with("0x"))
                .ok_or_else(|| format!("Invalid alias {alias:?}, expected 0xAlias=0xADDRESS"))?;
            config.set(name, address);
        }
        Ok(config)
    }
}

impl BlockArgs {
    fn transformers(&self) -> Vec<BoxedTransformer> {
        match (&self.id, self.height) {
            (Some(id), _) => vec![get_block_by_id(id.as_str())],
            (None, Some(height)) => vec![get_block_by_height(height)],
            (None, None) => vec![get_block(self.sealed)],
        }
    }
}

fn parse_args(raw: &[String]) -> Result<Vec<Value>, String> {
    raw.iter()
        .map(|arg| {
            serde_json::from_str::<Value>(arg)
                .map_err(|e| format!("Invalid JSON-Cadence argument {arg}: {e}"))
        })
        .collect()
}

pub async fn run_cli() -> Result<(), String> {
    // Parse CLI Args
    let args: CliArgs = CliArgs::parse();
    let config = args.config()?;

    // Setup Logging
    let log_level = if args.verbose { "debug" } else { "info" };
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(rolling::never(&args.log_folder, "fcl.log"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(non_blocking)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set up logging subscriber: {e}"))?;

    info!(access_node = %args.access_node, command = ?args.command, "Running command");
    let decoded = run(args.command, &config, args.auth_key).await?;
    let output = serde_json::to_string_pretty(&decoded)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{output}");
    Ok(())
}

async fn run(command: Command, config: &Config, auth_key: Option<String>) -> Result<Decoded, String> {
    let access_node = config
        .access_node()
        .map_err(|e| e.to_string())?;
    let client = HttpAccessClient::new(
        access_node,
        HttpAccessClientOptions::new().with_auth_key(auth_key),
    )
    .map_err(|e| e.to_string())?;

    let transformers: Vec<BoxedTransformer> = match command {
        Command::Ping => vec![ping()],
        Command::Block(block) => block.transformers(),
        Command::Account { address } => {
            return crate::account(&client, &address)
                .await
                .map(Decoded::Account)
                .map_err(|e| e.to_string())
        }
        Command::Script { file, args, height: None } => {
            let cadence = fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            debug!(file = %file.display(), "Executing script");
            return query(&client, config, &cadence, parse_args(&args)?)
                .await
                .map(Decoded::Value)
                .map_err(|e| e.to_string());
        }
        Command::Script { file, args, height: Some(height) } => {
            let cadence = fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            vec![
                fcl_common::builders::script(cadence),
                fcl_common::builders::args(parse_args(&args)?),
                at_block_height(height),
            ]
        }
        Command::Events { event_type, start, end } => vec![get_events(event_type, start, end)],
        Command::TxStatus { id } => vec![get_transaction_status(id)],
    };

    let response = send(&client, config, transformers)
        .await
        .map_err(|e| e.to_string())?;
    decode(response).map_err(|e| e.to_string())
}

#[cfg(test)]
mod cli_tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_cli_args() {
        let args = CliArgs::parse_from([
            "fcl",
            "--access-node",
            "http://localhost:5000",
            "--alias",
            "0xFungibleToken=0xee82856bf20e2aa6",
            "--limit",
            "999",
            "--log-folder",
            "test_logs",
            "script",
            "main.cdc",
            "--arg",
            r#"{"type":"Int","value":"1"}"#,
            "--arg",
            r#"{"type":"Bool","value":true}"#,
        ]);

        assert_eq!(args.access_node, "http://localhost:5000");
        assert_eq!(args.log_folder, "test_logs");
        assert!(!args.verbose);
        let Command::Script { file, args: script_args, height } = args.command.clone() else {
            panic!("expected script command");
        };
        assert_eq!(file, PathBuf::from("main.cdc"));
        assert_eq!(height, None);
        assert_eq!(
            parse_args(&script_args).unwrap(),
            vec![Value::int(1), Value::bool(true)]
        );

        let config = args.config().unwrap();
        assert_eq!(config.get("0xFungibleToken"), Some("0xee82856bf20e2aa6"));
        assert_eq!(config.default_limit().unwrap(), 999);
        assert_eq!(config.access_node().unwrap(), "http://localhost:5000");
    }

    #[test]
    fn test_block_args() {
        let args = CliArgs::parse_from(["fcl", "block", "--height", "12"]);

        assert_eq!(
            args.command,
            Command::Block(BlockArgs { sealed: false, height: Some(12), id: None })
        );
        assert!(CliArgs::try_parse_from(["fcl", "block", "--sealed", "--height", "12"]).is_err());
    }

    #[test]
    fn test_events_and_tx_status_args() {
        let args = CliArgs::parse_from(["fcl", "events", "A.1.Foo.Bar", "--start", "1", "--end", "3"]);
        assert_eq!(
            args.command,
            Command::Events { event_type: "A.1.Foo.Bar".to_string(), start: 1, end: 3 }
        );

        let args = CliArgs::parse_from(["fcl", "tx-status", "abc"]);
        assert_eq!(args.command, Command::TxStatus { id: "abc".to_string() });
    }

    #[test]
    fn test_invalid_alias() {
        let args = CliArgs::parse_from(["fcl", "--alias", "FungibleToken=0x01", "ping"]);

        assert!(args.config().is_err());
    }

    #[test]
    fn test_invalid_script_argument() {
        assert!(parse_args(&["{\"type\":\"Nope\"}".to_string()]).is_err());
    }
}
