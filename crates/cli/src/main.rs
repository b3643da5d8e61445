//! corsreq CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the optional TOML file and apply flag /
//!    environment-variable overrides.
//! 2. **Wire observability**: install `tracing-subscriber` (text or JSON on
//!    stderr) and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OTLP exporter.
//! 3. **Construct infrastructure**: build the `NativeEnvironment` and probe
//!    it for a transport.
//! 4. **Run the command**: issue one request and print the result, or report
//!    which transport was selected.
//!
//! # Usage
//!
//! ```text
//! corsreq fetch get https://api.example.com/items
//! corsreq fetch post https://api.example.com/items --data '{"name":"widget"}'
//! corsreq --transport fallback --timeout-ms 2000 fetch get https://example.com/
//! corsreq probe
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use corsreq::{Client, Payload, Response};
use tokio::sync::oneshot;
use transports::NativeEnvironment;

mod config;
mod telemetry;

use config::{FileConfig, TransportChoice};
use telemetry::LogFormat;

/// Cross-origin HTTP requests with one lifecycle over two transports.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true, env = "CORSREQ_CONFIG")]
    config: Option<PathBuf>,

    /// Restrict the transports offered to the probe.
    #[arg(long, global = true, value_enum, env = "CORSREQ_TRANSPORT")]
    transport: Option<TransportChoice>,

    /// Client-side timeout in milliseconds; 0 disables it.
    #[arg(long, global = true, env = "CORSREQ_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Issue one request and print the response.
    Fetch {
        /// GET or POST, in any case.
        method: String,
        /// Request target URL.
        target: String,
        /// Request payload. JSON objects and arrays are sent as JSON, anything
        /// else verbatim.
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Report which transport the environment provides.
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Kept alive until the end of `main` so that buffered spans are flushed.
    let _telemetry = telemetry::init(cli.log_format)?;

    let mut file = match &cli.config {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => FileConfig::default(),
    };
    if let Some(choice) = cli.transport {
        choice.apply(&mut file.environment);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        file.client.timeout_ms = timeout_ms;
    }

    let env = NativeEnvironment::new(&file.environment)
        .context("failed to build the transport environment")?;
    let client = Client::probe(&env, file.client).context("no usable transport")?;
    if client.using_fallback() && file.only_native_timeout() {
        tracing::warn!(
            legacy_native_timeout_ms = file.environment.legacy_native_timeout_ms,
            "fallback native timeout does not end a request; set a client timeout to bound it"
        );
    }

    match cli.command {
        Command::Probe => {
            println!("{}", client.transport_kind());
            Ok(())
        }
        Command::Fetch {
            method,
            target,
            data,
        } => {
            let response = fetch(&client, &method, target, data).await?;
            print_response(&response)
        }
    }
}

async fn fetch(
    client: &Client,
    method: &str,
    target: String,
    data: Option<String>,
) -> Result<Response> {
    let mut builder = client.request(method, target)?;
    if let Some(data) = data {
        builder = builder.payload(parse_data(data));
    }

    let (tx, rx) = oneshot::channel();
    let handle = builder
        .on_complete(move |result| {
            let _ = tx.send(result);
        })
        .send();
    tracing::debug!(request_id = %handle.id(), "request constructed");

    let result = tokio::select! {
        result = rx => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted; aborting request");
            handle.abort();
            return Err(anyhow::anyhow!("interrupted"));
        }
    };
    Ok(result.context("request completion was dropped")??)
}

/// Interprets `--data`: JSON objects and arrays become structured payloads,
/// anything else is sent as given.
fn parse_data(data: String) -> Payload {
    match serde_json::from_str::<serde_json::Value>(&data) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            Payload::Value(value)
        }
        _ => Payload::Text(data),
    }
}

fn print_response(response: &Response) -> Result<()> {
    eprintln!("status: {}", response.status);
    match &response.json {
        Some(json) => println!(
            "{}",
            serde_json::to_string_pretty(json).context("failed to render JSON")?
        ),
        None => println!("{}", response.text),
    }
    Ok(())
}
