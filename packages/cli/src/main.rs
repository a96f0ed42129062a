//! `consulctl`: a small command-line front end for the Consul agent API.
//!
//! Subcommands:
//!
//! - **`members`**: list gossip pool members (`--wan` for the WAN pool).
//! - **`node-name`**: print the name of the agent's node.
//! - **`kv get|put|delete`**: read and write the key/value store.
//! - **`watch`**: follow a key with blocking queries, printing each change.
//! - **`monitor`**: stream the agent's log.
//!
//! Connection settings come from the usual `CONSUL_HTTP_*` environment
//! variables and may be overridden with `--addr`, `--token` and
//! `--datacenter`. Ctrl-C cancels whatever request is in flight.
//!
//! Exit codes: 0 on success, 1 when a request fails or a key is missing,
//! 2 on usage or configuration errors.

use std::process::{self, ExitCode};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use consul_api::{KvPair, LogLevel};
use consul_client::{CancellationToken, ClientConfig, ClientError, ConsulClient, QueryOptions, WriteOptions};
use tracing::{debug, info};

/// consulctl: talk to a Consul agent over HTTP.
#[derive(Parser)]
#[command(name = "consulctl", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Agent address, e.g. `http://127.0.0.1:8500`. Overrides CONSUL_HTTP_ADDR.
    #[arg(long, global = true, value_name = "URL")]
    addr: Option<String>,

    /// ACL token. Overrides CONSUL_HTTP_TOKEN.
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    /// Datacenter to query instead of the agent's own.
    #[arg(long = "datacenter", short = 'd', global = true, value_name = "DC")]
    datacenter: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List the members of the agent's gossip pool.
    Members {
        /// Show the WAN pool instead of the LAN pool.
        #[arg(long)]
        wan: bool,
    },

    /// Print the agent's node name.
    NodeName,

    /// Read and write keys.
    #[command(subcommand)]
    Kv(KvCommand),

    /// Follow a key, printing its value every time it changes.
    ///
    /// Issues blocking queries back to back; each one waits on the index
    /// returned by the previous. Stop with Ctrl-C.
    Watch {
        key: String,

        /// Maximum time each blocking query waits, in seconds.
        #[arg(long, value_name = "SECS")]
        wait: Option<u64>,
    },

    /// Stream the agent's log until Ctrl-C.
    Monitor {
        /// trace | debug | info | warn | err
        #[arg(long, default_value_t = LogLevel::Info)]
        level: LogLevel,
    },
}

#[derive(Subcommand)]
enum KvCommand {
    /// Print the value stored under KEY.
    Get {
        key: String,

        /// Print the whole pair as JSON (value base64-encoded).
        #[arg(long)]
        json: bool,
    },

    /// Store VALUE under KEY.
    Put {
        key: String,
        value: String,

        /// Opaque flags stored alongside the value.
        #[arg(long, default_value_t = 0)]
        flags: u64,
    },

    /// Delete KEY, or every key under it with `--recurse`.
    Delete {
        key: String,

        #[arg(long)]
        recurse: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consulctl=info,consul_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = match build_config(&cli.global).and_then(|c| ConsulClient::new(c)) {
        Ok(client) => client,
        Err(e) => fatal(&e.to_string()),
    };
    debug!(address = %client.config().address, "client ready");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted");
                cancel.cancel();
            }
        });
    }

    match run(&client, cli.command, &cancel).await {
        Ok(code) => code,
        Err(e) if e.is_cancelled() => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("consulctl: {e}");
            ExitCode::from(1)
        }
    }
}

/// Environment first, then command-line overrides.
fn build_config(args: &GlobalArgs) -> Result<ClientConfig, consul_client::ConfigError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(addr) = &args.addr {
        config = config.with_address(addr)?;
    }
    if let Some(token) = &args.token {
        config = config.with_token(token.clone());
    }
    if let Some(dc) = &args.datacenter {
        config = config.with_datacenter(dc.clone());
    }
    Ok(config)
}

async fn run(
    client: &ConsulClient,
    command: Command,
    cancel: &CancellationToken,
) -> Result<ExitCode, ClientError> {
    match command {
        Command::Members { wan } => {
            let members = client.agent().members(wan, cancel).await?;
            for m in members.response.unwrap_or_default() {
                println!("{:<32} {}:{:<6} status={}", m.name, m.addr, m.port, m.status);
            }
        }

        Command::NodeName => {
            println!("{}", client.agent().node_name(cancel).await?);
        }

        Command::Kv(KvCommand::Get { key, json }) => {
            let res = client.kv().get(&key, &QueryOptions::default(), cancel).await?;
            let Some(pair) = res.response else {
                eprintln!("consulctl: no key {key:?}");
                return Ok(ExitCode::from(1));
            };
            if json {
                match serde_json::to_string_pretty(&pair) {
                    Ok(text) => println!("{text}"),
                    Err(e) => fatal(&format!("failed to encode pair: {e}")),
                }
            } else {
                print_value(&pair);
            }
        }

        Command::Kv(KvCommand::Put { key, value, flags }) => {
            let pair = KvPair {
                flags,
                ..KvPair::new(key, value)
            };
            let res = client.kv().put(&pair, &WriteOptions::default(), cancel).await?;
            if res.response != Some(true) {
                eprintln!("consulctl: write of {:?} was rejected", pair.key);
                return Ok(ExitCode::from(1));
            }
        }

        Command::Kv(KvCommand::Delete { key, recurse }) => {
            let opts = WriteOptions::default();
            if recurse {
                client.kv().delete_tree(&key, &opts, cancel).await?;
            } else {
                client.kv().delete(&key, &opts, cancel).await?;
            }
        }

        Command::Watch { key, wait } => watch(client, &key, wait, cancel).await?,

        Command::Monitor { level } => {
            let mut stream = client.agent().monitor(level, cancel).await?;
            while let Some(line) = stream.next_line().await {
                println!("{}", line?);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Blocking-query loop over a single key.
async fn watch(
    client: &ConsulClient,
    key: &str,
    wait: Option<u64>,
    cancel: &CancellationToken,
) -> Result<(), ClientError> {
    let mut opts = QueryOptions::new();
    if let Some(secs) = wait {
        opts = opts.wait_time(Duration::from_secs(secs));
    }

    let mut last: Option<u64> = None;
    loop {
        let res = client.kv().get(key, &opts, cancel).await?;
        let index = res.meta.last_index;
        if last != Some(index) {
            match &res.response {
                Some(pair) => print_value(pair),
                None => println!("(absent)"),
            }
        }
        // The index can go backwards after a snapshot restore; start over.
        let next = match last {
            Some(prev) if index < prev => 0,
            _ => index,
        };
        last = Some(index);
        opts = opts.wait_index(next);
    }
}

fn print_value(pair: &KvPair) {
    match (pair.value_str(), &pair.value) {
        (Some(text), _) => println!("{text}"),
        (None, Some(bytes)) => println!("{}", String::from_utf8_lossy(bytes)),
        (None, None) => println!(),
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("consulctl: {msg}");
    process::exit(2);
}
