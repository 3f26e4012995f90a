//! Scan QR codes in image files by replaying them through the camera pipeline.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::{Deserialize, Serialize};

use qr_reader::{
    CameraConfig, DataType, DecodedSymbol, ExecutionContext, QrCodeReader, ReaderError,
    ReaderParams, Recognition, ReplayCamera, SetupError, StillImageError,
};
use qr_reader::core::LogConfig;

#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

/// Scan QR codes in image files through the recognition pipeline
#[derive(Parser, Debug)]
#[command(name = "qr-reader", version)]
#[command(about = "Scan QR codes in image files through the recognition pipeline", long_about = None)]
struct Args {
    /// Image files, played back as camera frames in order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON file with optional `reader` and `camera` sections
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one JSON object per result
    #[arg(long)]
    json: bool,

    /// Give up when no frame was replayed for this long
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Wait between frames (overrides the config file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Symbols reported per frame (overrides the config file)
    #[arg(long)]
    max_symbols: Option<usize>,

    /// Per-frame diagnostics on stderr
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    reader: ReaderParams,
    camera: Option<CameraConfig>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("failed to read config {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Still(#[from] StillImageError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ResultLine<'a> {
    Symbol {
        valid: bool,
        data_type: Option<DataType>,
        payload: Cow<'a, str>,
        payload_len: usize,
    },
    Degraded {
        width: u16,
        height: u16,
        reason: &'a str,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(&args) {
        Ok(0) => {
            eprintln!("no QR codes found");
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("qr-reader: {err}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(debug: bool) {
    #[cfg(not(feature = "tracing"))]
    {
        let mut config = LogConfig::new(LevelFilter::Warn);
        if debug {
            for target in ["qr_reader", "qr_reader_pipeline", "qr_reader_engine"] {
                config = config.with_target(target, LevelFilter::Debug);
            }
        }
        let _ = qr_reader::core::init(config);
    }

    #[cfg(feature = "tracing")]
    {
        let _ = debug;
        let _ = LogTracer::init();
        qr_reader::core::init_tracing(false);
    }
}

fn load_config(args: &Args) -> Result<CliConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&text)?
        }
        None => CliConfig::default(),
    };

    if let Some(ms) = args.interval_ms {
        config.reader.frame_interval_ms = ms;
    }
    if let Some(max) = args.max_symbols {
        config.reader.max_symbols_per_frame = max;
    }
    config.reader.debug |= args.debug;
    Ok(config)
}

/// Returns the number of successfully decoded symbols.
fn run(args: &Args) -> Result<usize, CliError> {
    let config = load_config(args)?;
    let mut camera = ReplayCamera::from_paths(&args.images)?;
    let total = camera.len();
    let progress = camera.progress();
    let poll = config.reader.frame_interval().max(Duration::from_millis(1));
    log::info!("replaying {total} image(s)");

    let mut reader = QrCodeReader::builder()
        .params(config.reader)
        .camera_config(config.camera.unwrap_or_default())
        .build();
    reader.setup(&mut camera)?;
    reader.start_on(&ExecutionContext::default())?;

    // Each cycle waits one interval before acquiring, so a shorter limit would misfire.
    let stall_limit = Duration::from_millis(args.timeout_ms).max(poll * 2);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut found = 0;
    let mut last_progress = (0, Instant::now());
    while progress.played() < total {
        if let Some(result) = reader.receive_result(poll) {
            found += print_result(&mut out, &result, args.json)?;
        }
        let played = progress.played();
        if played != last_progress.0 {
            last_progress = (played, Instant::now());
        } else if last_progress.1.elapsed() >= stall_limit {
            log::warn!("replay stalled after {played} of {total} frame(s)");
            break;
        }
    }

    // Joins the loop after its current cycle, so the last frame's results are queued.
    reader.stop();
    let rest = reader.receiver();
    while let Some(result) = rest.try_receive() {
        found += print_result(&mut out, &result, args.json)?;
    }

    let stats = reader.mailbox_stats();
    if stats.dropped > 0 {
        log::warn!("{} result(s) dropped on a full queue", stats.dropped);
    }
    Ok(found)
}

/// Print one result; returns 1 when it carries a decoded symbol.
fn print_result(out: &mut impl Write, result: &Recognition, json: bool) -> Result<usize, CliError> {
    let found = usize::from(result.symbol().is_some_and(DecodedSymbol::is_valid));
    let line = match result {
        Recognition::Symbol(symbol) => ResultLine::Symbol {
            valid: symbol.is_valid(),
            data_type: symbol.data_type(),
            payload: String::from_utf8_lossy(symbol.payload()),
            payload_len: symbol.payload_len(),
        },
        Recognition::Degraded {
            width,
            height,
            reason,
        } => ResultLine::Degraded {
            width: *width,
            height: *height,
            reason,
        },
    };

    if json {
        serde_json::to_writer(&mut *out, &line).map_err(io::Error::from)?;
        writeln!(out)?;
        return Ok(found);
    }

    match line {
        ResultLine::Symbol {
            valid: true,
            payload,
            ..
        } => writeln!(out, "QR-Code:{payload}")?,
        ResultLine::Symbol { payload, .. } => writeln!(out, "QR-Code decode failed: {payload}")?,
        ResultLine::Degraded {
            width,
            height,
            reason,
        } => writeln!(out, "frame {width}x{height} skipped: {reason}")?,
    }
    Ok(found)
}
