use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cdp_bridge::{detect_chrome_executable, event_bus, BridgeConfig, TabAdapter};
use handoff_cli::build_relay;
use handoff_relay::{RelayRequest, RelayResponse};
use site_registry::SiteCatalog;

#[derive(Parser)]
#[command(
    name = "handoff",
    version,
    about = "Hand a captured transcript to an AI chat tab and submit it"
)]
struct Cli {
    #[command(flatten)]
    browser: BrowserArgs,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Args)]
struct BrowserArgs {
    /// Path to the Chrome/Chromium executable (overrides HANDOFF_CHROME).
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,

    /// Attach to a running browser's DevTools websocket instead of launching.
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Run the browser with a visible window.
    #[arg(long, global = true)]
    headful: bool,

    /// Browser profile directory (defaults to ./.handoff-profile).
    #[arg(long, global = true)]
    profile_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Deliver a text payload to one service and submit it.
    Send {
        /// Destination service key: chatgpt, claude, or gemini.
        #[arg(long)]
        service: String,

        /// The text payload; omit to read it from stdin.
        #[arg(long)]
        text: Option<String>,
    },
    /// Accept a raw wire-shape request (COMMAND or ANALYZE JSON).
    Request {
        /// The request JSON; omit to read it from stdin.
        #[arg(long)]
        json: Option<String>,
    },
    /// List the destination sites the relay knows about.
    Sites,
    /// Report the detected browser executable and transport mode.
    Doctor,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HANDOFF_LOG")
        .unwrap_or_else(|_| EnvFilter::new("handoff=info,relay=info,cdp-bridge=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn bridge_config(args: &BrowserArgs) -> BridgeConfig {
    let mut cfg = BridgeConfig::default();
    if let Some(path) = &args.chrome_path {
        cfg.executable = path.clone();
    }
    if let Some(ws) = &args.ws_url {
        cfg.websocket_url = Some(ws.clone());
    }
    if args.headful {
        cfg.headless = false;
    }
    if let Some(dir) = &args.profile_dir {
        cfg.user_data_dir = dir.clone();
    }
    cfg
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("reading payload from stdin")?;
    Ok(buffer.trim_end().to_string())
}

async fn run_request(args: &BrowserArgs, request: RelayRequest) -> Result<RelayResponse> {
    let cfg = bridge_config(args);
    let adapter = Arc::new(TabAdapter::new(cfg, event_bus(512)));
    if adapter.mode().is_stub() {
        bail!("no Chrome/Chromium found; install one or set HANDOFF_CHROME / --chrome-path");
    }

    Arc::clone(&adapter)
        .start()
        .await
        .context("starting browser bridge")?;
    debug!(target: "handoff", "bridge started");

    let relay = build_relay(Arc::clone(&adapter));
    let response = relay.handle(request).await;

    adapter.shutdown().await;
    Ok(response)
}

fn print_sites() {
    for profile in SiteCatalog::builtin().profiles() {
        println!(
            "{:<8} {}  (input: {}, submit: {})",
            profile.service.key(),
            profile.base_url,
            profile.input_selector,
            profile.submit_selector,
        );
    }
}

fn print_doctor(args: &BrowserArgs) {
    match args
        .chrome_path
        .clone()
        .or_else(detect_chrome_executable)
    {
        Some(path) => println!("browser: {}", path.display()),
        None => println!("browser: not found (set HANDOFF_CHROME or --chrome-path)"),
    }
    match &args.ws_url {
        Some(ws) => println!("transport: attach ({ws})"),
        None => println!("transport: launch"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let request = match &cli.command {
        CliCommand::Sites => {
            print_sites();
            return Ok(ExitCode::SUCCESS);
        }
        CliCommand::Doctor => {
            print_doctor(&cli.browser);
            return Ok(ExitCode::SUCCESS);
        }
        CliCommand::Send { service, text } => {
            let text = match text {
                Some(text) => text.clone(),
                None => read_stdin()?,
            };
            if text.is_empty() {
                bail!("empty payload: pass --text or pipe it on stdin");
            }
            serde_json::from_value(serde_json::json!({
                "type": "COMMAND",
                "command": service,
                "params": { "text": text },
            }))
            .context("building command request")?
        }
        CliCommand::Request { json } => {
            let raw = match json {
                Some(raw) => raw.clone(),
                None => read_stdin()?,
            };
            serde_json::from_str::<RelayRequest>(&raw).context("parsing request JSON")?
        }
    };

    let response = run_request(&cli.browser, request).await?;
    println!("{}", serde_json::to_string(&response)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
