pub mod config;
pub mod initialization;
pub mod input;
pub mod logging_system;

pub use config::{Config, ConfigError, ErrorPolicy, LogFormat, TracingLevel};
pub use initialization::{FallbackStrategy, InitializationError};
pub use input::{InputError, decode_event};
pub use logging_system::{LoggingSystem, setup_logging_safe};

use chrono::Utc;
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process;
use tracing::{debug, error, info, warn};

use crate::domain::{EncodedPayload, LogLevel};
use crate::encoder::Encoder;
use crate::encoder::fields::ISO_EXTENDED_FORMAT;
use crate::encoder::payload::CONTEXT_KEY;

pub const ENCODE_ERROR_KEY: &str = "encode_error";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub encoded: usize,
    pub dropped: usize,
    pub fallbacks: usize,
}

/// Output options for `process_stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions {
    pub on_error: ErrorPolicy,
    pub pretty: bool,
}

impl From<&Config> for StreamOptions {
    fn from(config: &Config) -> Self {
        Self {
            on_error: config.on_error,
            pretty: config.pretty,
        }
    }
}

pub struct App {
    config: Config,
    encoder: Encoder,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_config(Config::from_args_and_file(args)?))
    }

    pub fn from_config(config: Config) -> Self {
        let encoder = Encoder::new(config.encoder_config());
        Self { config, encoder }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn run(&self) -> anyhow::Result<RunSummary> {
        info!(
            "Starting rask-log-encoder v{} (time_zone={}, recognized_keys={}, on_error={:?})",
            get_version(),
            self.config.time_zone_setting,
            self.encoder.recognized_keys().len(),
            self.config.on_error
        );

        let options = StreamOptions::from(&self.config);
        let stdout = io::stdout();
        let writer = BufWriter::new(stdout.lock());

        let summary = match &self.config.input {
            Some(path) => {
                let file = File::open(path).map_err(|source| {
                    InitializationError::InputOpenFailed {
                        resource: path.display().to_string(),
                        source,
                    }
                })?;
                process_stream(&self.encoder, BufReader::new(file), writer, options)?
            }
            None => process_stream(&self.encoder, io::stdin().lock(), writer, options)?,
        };

        info!(
            encoded = summary.encoded,
            dropped = summary.dropped,
            fallbacks = summary.fallbacks,
            "Input exhausted"
        );
        Ok(summary)
    }
}

/// Encodes every non-blank line of `reader`, writing one payload per line.
///
/// Events that fail to decode or encode are handled per `options.on_error`;
/// only I/O failures abort the stream.
pub fn process_stream<R, W>(
    encoder: &Encoder,
    mut reader: R,
    mut writer: W,
    options: StreamOptions,
) -> io::Result<RunSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = RunSummary::default();
    let mut buffer = Vec::new();
    let mut line_number: usize = 0;

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        line_number += 1;

        // Invalid UTF-8 is one bad event, not a broken stream.
        let outcome = match std::str::from_utf8(&buffer) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => decode_event(line.trim_end_matches(['\n', '\r']))
                .map_err(|e| e.to_string())
                .and_then(|event| encoder.encode_event(&event).map_err(|e| e.to_string())),
            Err(e) => Err(format!("line is not valid UTF-8: {e}")),
        };

        let payload = match outcome {
            Ok(payload) => {
                summary.encoded += 1;
                payload
            }
            Err(reason) => match options.on_error {
                ErrorPolicy::Drop => {
                    warn!(line = line_number, error = %reason, "Dropping event");
                    summary.dropped += 1;
                    continue;
                }
                ErrorPolicy::Fallback => {
                    debug!(line = line_number, error = %reason, "Emitting fallback payload");
                    summary.fallbacks += 1;
                    fallback_payload(&reason)
                }
            },
        };

        write_payload(&mut writer, &payload, options.pretty)?;
    }

    writer.flush()?;
    Ok(summary)
}

fn write_payload<W: Write>(writer: &mut W, payload: &EncodedPayload, pretty: bool) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, payload)?;
    } else {
        serde_json::to_writer(&mut *writer, payload)?;
    }
    writer.write_all(b"\n")
}

/// Payload standing in for an event the encoder rejected. It has the same
/// wire shape as a regular payload, stamped with the current UTC time.
pub fn fallback_payload(reason: &str) -> EncodedPayload {
    let mut metadata = Map::new();
    metadata.insert(ENCODE_ERROR_KEY.to_string(), json!(reason));
    metadata.insert(CONTEXT_KEY.to_string(), Value::Object(Map::new()));

    EncodedPayload {
        timestamp: Utc::now().format(ISO_EXTENDED_FORMAT).to_string(),
        level: LogLevel::Error.as_str().to_string(),
        message: "log event could not be encoded".to_string(),
        metadata,
    }
}

pub fn get_version() -> String {
    crate::VERSION.to_string()
}

pub fn main() -> anyhow::Result<()> {
    let app = match App::from_args(std::env::args_os()) {
        Ok(app) => app,
        // --help and --version land here too; clap knows the right exit code.
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    let config = app.config();
    if let Err(e) = setup_logging_safe(config.log_level, config.log_format, &config.log_directives)
    {
        match e.fallback_strategy() {
            FallbackStrategy::AbortStartup => {
                eprintln!("Fatal: {e}");
                process::exit(1);
            }
            _ => eprintln!("Warning: {e}, continuing without diagnostics"),
        }
    }

    if let Err(e) = app.run() {
        match e
            .downcast_ref::<InitializationError>()
            .map(InitializationError::fallback_strategy)
        {
            Some(FallbackStrategy::AbortStartup) => error!("Startup aborted: {e:#}"),
            _ => error!("Application error: {e:#}"),
        }
        process::exit(1);
    }

    Ok(())
}
