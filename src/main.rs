//! KVMemo server entry point.
//!
//! Parses command-line options into a [`Config`], wires up the engine and
//! the background sweeper, and runs the accept loop until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Semaphore;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kvmemo::commands::CommandHandler;
use kvmemo::config::{Config, EvictionPolicyKind};
use kvmemo::connection::{handle_connection, ConnectionStats, COMMAND_OVERHEAD_BYTES};
use kvmemo::storage::{Engine, TtlSweeper};

/// Parses command-line arguments on top of the defaults.
fn config_from_args() -> Config {
    let mut config = Config::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("kvmemo {}", kvmemo::VERSION);
                std::process::exit(0);
            }
            "--no-ttl" => {
                config.enable_ttl = false;
                i += 1;
            }
            "--host" | "-h" | "--port" | "-p" | "--shards" | "--shard-capacity"
            | "--max-memory" | "--max-value" | "--max-connections" | "--sweep-interval"
            | "--eviction-policy" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {flag} requires a value");
                    std::process::exit(1);
                };
                if let Err(message) = apply_flag(&mut config, flag, value) {
                    eprintln!("Error: {message}");
                    std::process::exit(1);
                }
                i += 2;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn apply_flag(config: &mut Config, flag: &str, value: &str) -> Result<(), String> {
    fn parse<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
        value
            .parse()
            .map_err(|_| format!("invalid value '{value}' for {flag}"))
    }

    match flag {
        "--host" | "-h" => config.listen_host = value.to_string(),
        "--port" | "-p" => config.listen_port = parse(flag, value)?,
        "--shards" => config.shard_count = parse(flag, value)?,
        "--shard-capacity" => config.shard_capacity = parse(flag, value)?,
        "--max-memory" => config.max_memory_bytes = parse(flag, value)?,
        "--max-value" => config.max_value_bytes = parse(flag, value)?,
        "--max-connections" => config.max_connections = parse(flag, value)?,
        "--sweep-interval" => config.ttl_sweep_interval_ms = parse(flag, value)?,
        "--eviction-policy" => {
            config.eviction_policy =
                EvictionPolicyKind::parse(value).map_err(|e| e.to_string())?;
        }
        _ => unreachable!("unhandled flag {flag}"),
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"
KVMemo - In-Memory Key-Value Store

USAGE:
    kvmemo [OPTIONS]

OPTIONS:
    -h, --host <HOST>             Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>             Port to listen on (default: 8080)
        --shards <N>              Shard count, power of two (default: 64)
        --shard-capacity <N>      Max entries per shard (default: 1024)
        --max-memory <BYTES>      Global memory budget (default: 256 MiB)
        --max-value <BYTES>       Max size of one value (default: 8 MiB)
        --max-connections <N>     Connection cap (default: 4096)
        --sweep-interval <MS>     TTL sweep cadence (default: 250)
        --no-ttl                  Disable TTL support
        --eviction-policy <P>     'lru' or 'none' (default: lru)
    -v, --version                 Print version information
        --help                    Print this help message

PROTOCOL:
    Requests are length-prefixed frames: <len>\r\n<payload>
    where the payload is one of:
        SET <key> <value> [PX <ttl_ms>]
        GET <key>
        DEL <key>
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config_from_args();

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    config
        .validate()
        .context("invalid configuration")?;

    let engine = Arc::new(Engine::new(&config).context("engine startup failed")?);
    info!(
        shards = config.shard_count,
        shard_capacity = config.shard_capacity,
        max_memory_bytes = config.max_memory_bytes,
        "storage engine initialized"
    );

    let _sweeper = config.enable_ttl.then(|| {
        TtlSweeper::start(
            Arc::clone(&engine),
            Duration::from_millis(config.ttl_sweep_interval_ms),
        )
    });

    let stats = Arc::new(ConnectionStats::new());
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("listening on {}", config.bind_address());

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
        info!("shutdown signal received, stopping server");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&engine), stats, &config) => {}
        _ = shutdown => {}
    }

    info!(
        uptime_secs = engine.uptime().as_secs(),
        keys = engine.len(),
        "server shutdown complete"
    );
    Ok(())
}

/// Accepts connections and spawns a handler task per client, holding a
/// semaphore permit for the lifetime of each connection.
async fn accept_loop(
    listener: TcpListener,
    engine: Arc<Engine>,
    stats: Arc<ConnectionStats>,
    config: &Config,
) {
    let limiter = Arc::new(Semaphore::new(config.max_connections));
    let max_payload = config.max_value_bytes + COMMAND_OVERHEAD_BYTES;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let Ok(permit) = Arc::clone(&limiter).try_acquire_owned() else {
                    warn!(client = %addr, "connection limit reached, rejecting");
                    drop(stream);
                    continue;
                };

                let commands = CommandHandler::new(Arc::clone(&engine));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, commands, stats, max_payload).await;
                    drop(permit);
                });
            }
            Err(e) => {
                error!("failed to accept connection: {e}");
            }
        }
    }
}
