use bytequeue::config::{load_config, InputSource, OutputFormat, PipeConfig, DEFAULT_READ_SIZE};
use bytequeue::pump::{Pump, RecordSink};
use bytequeue::{Error, SharedByteQueue};
use clap::Parser;
use futures::future::try_join;
use log::{error, info};
use std::path::Path;
use std::process::ExitCode;

/// Read byte streams through a queue and emit fixed-size records.
#[derive(Debug, Parser)]
#[command(name = "bqpipe", version)]
struct Args {
    /// Config file (defaults to ~/.config/bqpipe/config.toml or /etc/bqpipe/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Bytes per emitted record
    #[arg(short, long)]
    record_size: Option<usize>,

    /// Output format: hex or raw
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Drop trailing bytes that do not fill a whole record
    #[arg(long)]
    no_partial: bool,

    /// Input files, `-` for stdin. Replaces the sources from the config file.
    inputs: Vec<String>,
}

fn get_config_path() -> String {
    if let Ok(home) = std::env::var("HOME") {
        let path = format!("{}/.config/bqpipe/config.toml", home);
        if Path::new(&path).exists() {
            return path;
        }
    }
    "/etc/bqpipe/config.toml".to_string()
}

fn resolve_config(args: &Args) -> Result<PipeConfig, Error> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let path = get_config_path();
            if Path::new(&path).exists() {
                load_config(&path)?
            } else {
                info!("No config file found, using defaults");
                PipeConfig::default()
            }
        }
    };

    if let Some(record_size) = args.record_size {
        if record_size == 0 {
            return Err(Error::Config("record size must be positive".to_string()));
        }
        cfg.record_size = record_size;
    }
    if let Some(format) = args.format {
        cfg.format = format;
    }
    if args.no_partial {
        cfg.emit_partial = false;
    }
    if !args.inputs.is_empty() {
        cfg.sources = args
            .inputs
            .iter()
            .enumerate()
            .map(|(i, path)| InputSource {
                id: format!("input-{}", i),
                path: path.clone(),
                read_size: DEFAULT_READ_SIZE,
            })
            .collect();
    }
    Ok(cfg)
}

async fn run(args: Args) -> Result<(), Error> {
    let cfg = resolve_config(&args)?;
    let pump = Pump::from_config(&cfg).await?;
    let sink = RecordSink::from_config(&cfg);
    let queue = SharedByteQueue::new();

    let mut stdout = tokio::io::stdout();
    let (stats, pushed) = try_join(sink.run(queue.clone(), &mut stdout), pump.run(queue)).await?;

    info!(
        "Read {} bytes, wrote {} records ({} bytes{})",
        pushed,
        stats.records,
        stats.bytes,
        if stats.partial { ", last one partial" } else { "" }
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("bqpipe: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
