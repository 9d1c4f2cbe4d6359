//! sigscope CLI: signature recovery from EVM bytecode.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sigscope::batch::BatchDecoder;
use sigscope::config::Config;
use sigscope::decoder::SignDecoder;
use sigscope::disassembler::Disassembler;
use sigscope::parser::{BytecodeParser, SolidityParser};
use sigscope::remote::chain::JsonRpcChainClient;
use sigscope::remote::fourbyte::FourByteClient;
use sigscope::remote::openchain::OpenChainClient;
use sigscope::remote::BytecodeSource;
use sigscope::service::BytecodeService;
use sigscope::signature::SignatureKind;
use sigscope::store::SignatureStore;
use sigscope::sync::{cancellation, SyncEngine, SyncOutcome};
use sigscope::utils::helpers::{decode_hex, encode_prefixed};
use std::collections::BTreeMap;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sigscope",
    version,
    about = "Recover function selectors and event topics from EVM bytecode"
)]
struct Cli {
    /// SQLite signature cache.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Custom node RPC endpoint.
    #[arg(long, global = true, value_name = "URL")]
    node: Option<String>,

    /// Output format for listings.
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Where to take the bytecode from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Target {
    /// Contract address; code is fetched from the node.
    #[arg(long)]
    contract: Option<String>,

    /// Bytecode as a hex string, or `-` to read stdin.
    #[arg(long)]
    code: Option<String>,

    /// Read hex bytecode from a file.
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the bytecode of a contract from the node.
    #[command(visible_alias = "bc")]
    Bytecode(Target),

    /// Print the disassembly listing.
    #[command(visible_alias = "da")]
    Disasm(Target),

    /// Extract function selectors (hex).
    #[command(name = "hex-functions", visible_alias = "hf")]
    HexFunctions(Target),

    /// Extract event topics (hex).
    #[command(name = "hex-events", visible_alias = "he")]
    HexEvents(Target),

    /// Extract function selectors and resolve them to text.
    #[command(name = "text-functions", visible_alias = "tf")]
    TextFunctions(Target),

    /// Extract event topics and resolve them to text.
    #[command(name = "text-events", visible_alias = "te")]
    TextEvents(Target),

    /// Print a JSON summary of every selector and topic.
    Abi(Target),

    /// Resolve a single function selector.
    #[command(name = "decode-hex-function", visible_alias = "dhf")]
    DecodeHexFunction {
        #[arg(long)]
        hex: String,
    },

    /// Resolve a single event topic.
    #[command(name = "decode-hex-event", visible_alias = "dhe")]
    DecodeHexEvent {
        #[arg(long)]
        hex: String,
    },

    /// Mirror the 4byte function export into the local cache.
    #[command(name = "sync-4byte-functions", visible_alias = "s4f")]
    SyncFunctions {
        /// Stop after this many pages.
        #[arg(long)]
        max_pages: Option<u64>,
    },

    /// Mirror the 4byte event export into the local cache.
    #[command(name = "sync-4byte-events", visible_alias = "s4e")]
    SyncEvents {
        #[arg(long)]
        max_pages: Option<u64>,
    },
}

struct App {
    config: Config,
    format: Format,
}

impl App {
    async fn load_code(&self, target: &Target) -> Result<Vec<u8>> {
        if let Some(address) = &target.contract {
            let client = JsonRpcChainClient::new(
                self.config.rpc_url.clone(),
                self.config.http_timeout(),
                tracing::info_span!("chain", url = %self.config.rpc_url),
            );
            let code = client
                .get_code(address)
                .await
                .with_context(|| format!("failed to fetch bytecode for {address}"))?;
            if code.is_empty() {
                tracing::warn!("no code deployed at {address}");
            }
            return Ok(code);
        }

        let text = match (&target.code, &target.file) {
            (Some(code), _) if code == "-" => read_stdin()?,
            (Some(code), _) => code.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            (None, None) => anyhow::bail!("no bytecode source given"),
        };
        decode_hex(&text).context("failed to decode bytecode")
    }

    async fn parser(&self, target: &Target) -> Result<SolidityParser> {
        let code = self.load_code(target).await?;
        Ok(SolidityParser::from_bytes(code).with_event_window(self.config.event_window))
    }

    fn store(&self) -> Result<SignatureStore> {
        SignatureStore::open(&self.config.db_path, tracing::info_span!("store"))
            .with_context(|| format!("failed to open {}", self.config.db_path.display()))
    }

    fn sign_decoder(&self) -> Result<SignDecoder> {
        let remote = OpenChainClient::new(
            self.config.openchain_url.clone(),
            self.config.http_timeout(),
            tracing::info_span!("openchain"),
        );
        Ok(SignDecoder::new(
            Arc::new(remote),
            Some(self.store()?),
            tracing::info_span!("sign_decoder"),
        ))
    }

    fn service(&self) -> Result<BytecodeService> {
        let batch = BatchDecoder::new(
            Arc::new(self.sign_decoder()?),
            self.config.concurrency,
            tracing::info_span!("batch_decoder"),
        );
        Ok(BytecodeService::new(batch))
    }

    fn print_list(&self, title: &str, items: &[String]) -> Result<()> {
        match self.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(items)?),
            Format::Text => {
                println!("\n{title}:");
                for item in items {
                    println!("- {item}");
                }
            }
        }
        Ok(())
    }

    fn print_map(&self, title: &str, map: &BTreeMap<String, String>) -> Result<()> {
        match self.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(map)?),
            Format::Text => {
                println!("\n{title}:");
                for (hex, text) in map {
                    println!("- {hex}: {text}");
                }
            }
        }
        Ok(())
    }

    async fn decode_one(&self, kind: SignatureKind, hex: &str) -> Result<()> {
        let sig = self.sign_decoder()?.resolve(kind, hex).await?;
        let note = if sig.verified { "" } else { " (possibly spam)" };
        let title = match kind {
            SignatureKind::Function => "Function signature",
            SignatureKind::Event => "Event signature",
        };
        println!("\n{title} (<in text>): {}{note}", sig.text);
        Ok(())
    }

    async fn sync(&self, kind: SignatureKind, max_pages: Option<u64>) -> Result<()> {
        let pages = FourByteClient::new(
            self.config.fourbyte_url.clone(),
            self.config.http_timeout(),
            tracing::info_span!("fourbyte"),
        );
        let engine = SyncEngine::new(self.store()?, Arc::new(pages), tracing::info_span!("sync", %kind))
            .with_max_pages(max_pages);

        let (cancel_tx, cancel_rx) = cancellation();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupt received, finishing current page...");
                let _ = cancel_tx.send(true);
            }
        });

        let report = engine.run(kind, &cancel_rx).await?;
        let outcome = match report.outcome {
            SyncOutcome::UpToDate => "up to date",
            SyncOutcome::Cancelled => "cancelled",
            SyncOutcome::PageLimit => "page limit reached",
        };
        println!(
            "{kind} sync {outcome}: {} page(s), {} new record(s), last page {}",
            report.pages_synced, report.records_inserted, report.last_synced_page
        );
        Ok(())
    }
}

fn read_stdin() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        anyhow::bail!("`--code -` expects bytecode on stdin");
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(buf)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(node) = cli.node {
        config.rpc_url = node;
    }
    let app = App {
        config,
        format: cli.format,
    };

    match &cli.command {
        Command::Bytecode(target) => {
            let code = app.load_code(target).await?;
            println!("\nBytecode: {}", encode_prefixed(&code));
        }
        Command::Disasm(target) => {
            let code = app.load_code(target).await?;
            let d = Disassembler::new(code);
            match app.format {
                Format::Text => {
                    for line in d.disasm() {
                        println!("{line}");
                    }
                }
                Format::Json => {
                    let listing: Vec<_> = d
                        .instructions()
                        .iter()
                        .map(|inst| {
                            serde_json::json!({
                                "pc": inst.pc,
                                "op": inst
                                    .opcode
                                    .name()
                                    .map(str::to_string)
                                    .unwrap_or_else(|| format!("UNKNOWN_0x{:02x}", inst.opcode.byte())),
                                "arg": inst.arg_bytes().map(encode_prefixed),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&listing)?);
                }
            }
        }
        Command::HexFunctions(target) => {
            let parser = app.parser(target).await?;
            app.print_list("Function signatures (<in hex>)", &parser.function_signatures().list())?;
        }
        Command::HexEvents(target) => {
            let parser = app.parser(target).await?;
            app.print_list("Event signatures (<in hex>)", &parser.event_signatures().list())?;
        }
        Command::TextFunctions(target) => {
            let parser = app.parser(target).await?;
            let decoded = app.service()?.decoded_function_signs(&parser).await;
            app.print_map("Function signatures (<in hex>: <in text>)", &decoded)?;
        }
        Command::TextEvents(target) => {
            let parser = app.parser(target).await?;
            let decoded = app.service()?.decoded_event_signs(&parser).await;
            app.print_map("Event signatures (<in hex>: <in text>)", &decoded)?;
        }
        Command::Abi(target) => {
            let parser = app.parser(target).await?;
            let abi = app.service()?.abi(&parser).await;
            println!("{}", serde_json::to_string_pretty(&abi)?);
        }
        Command::DecodeHexFunction { hex } => app.decode_one(SignatureKind::Function, hex).await?,
        Command::DecodeHexEvent { hex } => app.decode_one(SignatureKind::Event, hex).await?,
        Command::SyncFunctions { max_pages } => app.sync(SignatureKind::Function, *max_pages).await?,
        Command::SyncEvents { max_pages } => app.sync(SignatureKind::Event, *max_pages).await?,
    }

    Ok(())
}
