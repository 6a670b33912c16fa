//! Envelope inspector - prints what an envelope carries without a registry
//!
//! Usage:
//!   envelope-inspect capture.bin
//!   envelope-inspect --hex tests/fixtures/valid_envelope.hex
//!   envelope-inspect --hex --decode capture.hex

use anyhow::{Context as _, Result};
use clap::Parser;
use courier_codec::{read_envelope, Context, Message, Schema};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "envelope-inspect")]
#[command(about = "Inspect a Courier envelope")]
#[command(version)]
struct Args {
    /// Envelope file (raw bytes, or hex text with --hex)
    file: PathBuf,

    /// Treat the file as hex text
    #[arg(long)]
    hex: bool,

    /// Also decode context and payload generically and print their values
    #[arg(long)]
    decode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let raw = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let bytes = if args.hex {
        let text = String::from_utf8(raw).context("Hex input is not UTF-8")?;
        hex::decode(text.trim()).context("Invalid hex input")?
    } else {
        raw
    };
    debug!(len = bytes.len(), "Read envelope bytes");

    let envelope = read_envelope(&bytes)?;
    let context = Context::from_envelope(&envelope)?;
    let payload_schema = Schema::parse(&envelope.message_schema)
        .context("Payload schema text is not a valid schema")?;
    info!("Envelope decoded");

    println!("envelope bytes:  {}", bytes.len());
    println!("context schema:  {}", envelope.context_schema);
    println!("context bytes:   {}", envelope.context_buffer.len());
    println!(
        "payload type:    {}",
        payload_schema.full_name().unwrap_or_else(|| "<anonymous>".to_string())
    );
    println!("payload schema:  {}", envelope.message_schema);
    println!("payload bytes:   {}", envelope.message_buffer.len());

    if args.decode {
        let context_value = context.decode()?;
        println!("context value:   {:?}", context_value.value());

        let payload = Message::with_parts(payload_schema, envelope.message_buffer.clone());
        let payload_value = payload.decode()?;
        println!("payload value:   {:?}", payload_value);
    }

    Ok(())
}

fn init_logging(args: &Args) {
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();
}
