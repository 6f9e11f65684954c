//! Radio CLI binary
//!
//! Run with:
//! ```bash
//! cargo run -p radio-engine --bin radio -- --config radio.json info --check
//! cargo run -p radio-engine --bin radio -- simulate --type text "hello" --noise 5
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use radio_core::{constants::MAX_PAYLOAD_LEN, Asset, ContentType, Frame, RadioConfig};
use radio_engine::{MemoryLedger, Radio, RpcLedger, RpcSettings, TxHash};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "radio")]
#[command(about = "Hide messages in ordinary token transfers and read them back")]
struct Args {
    /// Channel configuration (full or public form)
    #[arg(long, default_value = "radio.json")]
    config: PathBuf,

    /// Override the configured ledger endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show channel id and encoding capacity
    Info {
        /// Also connect to the ledger and report its latest block
        #[arg(long)]
        check: bool,
    },

    /// Print the public configuration (no secrets)
    PublicKey {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Encode a message and broadcast it
    Send {
        #[arg(long = "type", default_value = "text")]
        content_type: ContentType,

        /// Message text
        #[arg(required_unless_present = "file")]
        message: Option<String>,

        /// Read the payload from a file
        #[arg(long, conflicts_with = "message")]
        file: Option<PathBuf>,
    },

    /// Scan ledger history for messages
    Read {
        /// Only show messages of this type
        #[arg(long = "type")]
        content_type: Option<ContentType>,

        /// Start at the block of this transaction
        #[arg(long)]
        from_tx: Option<TxHash>,

        #[arg(long)]
        limit: Option<usize>,

        /// Print frames as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run send and read against an in-memory ledger
    Simulate {
        #[arg(long = "type", default_value = "text")]
        content_type: ContentType,

        message: String,

        /// Foreign transfers injected before the message
        #[arg(long, default_value = "0")]
        noise: usize,

        /// Seed noise and decoy choices for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("radio_engine=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = RadioConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(url) = args.rpc_url {
        config.rpc_url = url;
    }

    match args.command {
        Command::Info { check } => info(config, check).await,
        Command::PublicKey { out } => public_key(config, out),
        Command::Send {
            content_type,
            message,
            file,
        } => {
            let payload = match (message, file) {
                (_, Some(path)) => std::fs::read(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (Some(message), None) => message.into_bytes(),
                (None, None) => anyhow::bail!("nothing to send"),
            };
            let ledger = RpcLedger::connect(RpcSettings::new(&config.rpc_url)).await?;
            let radio = Radio::new(config, ledger)?;
            let txs = radio.send(&payload, content_type).await?;
            println!("[OK] Sent {} bytes in {} transactions", payload.len(), txs.len());
            for tx in txs {
                println!("  {tx}");
            }
            Ok(())
        }
        Command::Read {
            content_type,
            from_tx,
            limit,
            json,
        } => {
            let ledger = RpcLedger::connect(RpcSettings::new(&config.rpc_url)).await?;
            let radio = Radio::new(config, ledger)?;
            let frames = radio.transaction_history(from_tx, content_type, limit).await?;
            print_frames(&frames, json)
        }
        Command::Simulate {
            content_type,
            message,
            noise,
            seed,
        } => simulate(config, content_type, message, noise, seed).await,
    }
}

async fn info(config: RadioConfig, check: bool) -> anyhow::Result<()> {
    let radio = Radio::new(config, ())?;
    let space = radio.codec().space();
    let config = radio.config();

    println!("Channel id:     {}", radio.id());
    println!(
        "Accounts:       {} ({} of {} pairs addressable, {} bits)",
        config.accounts.len(),
        space.addressable_pairs(),
        radio_core::SpaceModel::pair_count(config.accounts.len()),
        space.account_bits
    );
    println!("Fractions:      {} ({} bits)", config.fractions, space.value_bits);
    println!("Tokens:         {} ({} bits)", config.tokens.len(), space.token_bits);
    println!(
        "Per transfer:   {} bits, {} bytes",
        space.total_bits(),
        space.bytes_per_operation()
    );
    println!("Max message:    {} bytes", MAX_PAYLOAD_LEN);
    println!("Max spacing:    {}", config.max_spacing);
    println!("Ledger:         {}", config.rpc_url);

    if check {
        let ledger = RpcLedger::connect(RpcSettings::new(&config.rpc_url)).await?;
        let block = ledger
            .block_number()
            .await
            .with_context(|| format!("querying {}", config.rpc_url))?;
        println!("[OK] Ledger reachable at block {block}");
    }
    Ok(())
}

fn public_key(config: RadioConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let radio = Radio::new(config, ())?;
    let key = radio.public_key()?;
    match out {
        Some(path) => {
            std::fs::write(&path, &key)?;
            println!("[OK] Public key written to {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(&key)),
    }
    Ok(())
}

async fn simulate(
    config: RadioConfig,
    content_type: ContentType,
    message: String,
    noise: usize,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let ledger = MemoryLedger::with_fee(1);
    for account in &config.accounts {
        ledger
            .fund(account.address, Asset::Native, config.min_gas.saturating_mul(100))
            .await;
        for token in &config.tokens {
            ledger
                .fund(account.address, Asset::Token(*token), config.fractions as u128 * 100)
                .await;
        }
    }

    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    for _ in 0..noise {
        let from = rng.gen_range(0..config.accounts.len());
        let to = (from + rng.gen_range(1..config.accounts.len())) % config.accounts.len();
        let token = config.tokens[rng.gen_range(0..config.tokens.len())];
        let value = rng.gen_range(1..=config.fractions as u128);
        ledger
            .foreign_transfer(config.accounts[from].address, config.accounts[to].address, token, value)
            .await;
    }

    let radio = Radio::new(config, ledger)?.with_seed(rng.gen());
    let txs = radio.send(message.as_bytes(), content_type).await?;
    println!(
        "[OK] Sent {} bytes in {} transactions ({} broadcasts incl. funding)",
        message.len(),
        txs.len(),
        radio.ledger().broadcasts().await.len()
    );

    let frames = radio.transaction_history(None, None, None).await?;
    print_frames(&frames, false)
}

fn print_frames(frames: &[Frame], json: bool) -> anyhow::Result<()> {
    if json {
        let contents: Vec<_> = frames.iter().map(Frame::content).collect();
        println!("{}", serde_json::to_string_pretty(&contents)?);
        return Ok(());
    }

    println!("[OK] {} messages", frames.len());
    for frame in frames {
        let kind = frame.content_type().map_or("unknown", |t| t.name());
        println!("  [{kind}] {}", frame.content());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_check_flag() {
        let args = Args::try_parse_from(["radio", "info", "--check"]).unwrap();
        assert!(matches!(args.command, Command::Info { check: true }));

        let args = Args::try_parse_from(["radio", "info"]).unwrap();
        assert!(matches!(args.command, Command::Info { check: false }));
    }

    #[test]
    fn test_simulate_seed_flag() {
        let args = Args::try_parse_from(["radio", "simulate", "hi", "--seed", "9"]).unwrap();
        assert!(matches!(args.command, Command::Simulate { seed: Some(9), .. }));
    }
}
