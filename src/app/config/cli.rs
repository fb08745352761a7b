use super::env::{load_env_enum, load_env_list, load_env_path_opt, load_env_string, load_env_var};
use super::{ConfigError, ErrorPolicy, LogFormat, TracingLevel};
use crate::encoder::{ContextCollision, EncoderConfig, RecognizedKeys, TimeZoneSetting};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(
    author,
    version,
    about = "Encode raw logger events into JSON-safe ingestion payloads",
    long_about = None
)]
#[serde(default)]
pub struct Config {
    /// Newline-delimited raw events to encode (stdin when omitted)
    #[arg(long, env = "ENCODER_INPUT")]
    pub input: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: TracingLevel,

    /// Diagnostic output format (compact or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Extra tracing directives, e.g. rask_log_encoder::encoder=trace
    #[arg(long = "log-directive", env = "LOG_DIRECTIVES", value_delimiter = ',')]
    pub log_directives: Vec<String>,

    /// Zone attached to event timestamps: local, utc or +HH:MM
    #[arg(long, env = "ENCODER_TIME_ZONE", default_value = "local")]
    pub time_zone: String,

    /// Metadata keys routed to the system context (logger defaults when empty)
    #[arg(long, env = "RECOGNIZED_KEYS", value_delimiter = ',')]
    pub recognized_keys: Vec<String>,

    /// Handling of a user metadata key named `context`
    #[arg(long, env = "CONTEXT_COLLISION", default_value = "overwrite")]
    pub context_collision: ContextCollision,

    /// Handling of events that cannot be encoded
    #[arg(long, env = "ON_ERROR", default_value = "drop")]
    pub on_error: ErrorPolicy,

    /// Pretty-print payloads instead of one per line
    #[arg(long, env = "PRETTY_OUTPUT")]
    pub pretty: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub time_zone_setting: TimeZoneSetting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            log_level: TracingLevel::Info,
            log_format: LogFormat::Compact,
            log_directives: Vec::new(),
            time_zone: "local".to_string(),
            recognized_keys: Vec::new(),
            context_collision: ContextCollision::Overwrite,
            on_error: ErrorPolicy::Drop,
            pretty: false,
            config_file: None,
            time_zone_setting: TimeZoneSetting::Local,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        // A whole TOML document in RASK_ENCODER_CONFIG takes precedence
        if let Ok(encoder_config) = std::env::var("RASK_ENCODER_CONFIG") {
            return Self::from_toml_str(&encoder_config);
        }

        let mut config = Config::default();

        load_env_path_opt("ENCODER_INPUT", &mut config.input);
        load_env_enum("LOG_LEVEL", &mut config.log_level)?;
        load_env_enum("LOG_FORMAT", &mut config.log_format)?;
        load_env_list("LOG_DIRECTIVES", &mut config.log_directives);
        load_env_string("ENCODER_TIME_ZONE", &mut config.time_zone);
        load_env_list("RECOGNIZED_KEYS", &mut config.recognized_keys);
        load_env_enum("CONTEXT_COLLISION", &mut config.context_collision)?;
        load_env_enum("ON_ERROR", &mut config.on_error)?;
        load_env_var("PRETTY_OUTPUT", &mut config.pretty)?;
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// Layers the configuration sources the binary honours: inline TOML in
    /// `RASK_ENCODER_CONFIG`, then CLI arguments and their env fallbacks, then
    /// a config file (when given) supplying the encoder settings. Input
    /// selection and output formatting stay with the CLI.
    pub fn from_args_and_file<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let base_config = match std::env::var("RASK_ENCODER_CONFIG") {
            Ok(encoder_config) => Some(Self::from_toml_str(&encoder_config)?),
            Err(_) => None,
        };

        let mut cli = Config::try_parse_from(args)?;
        if let Some(base_config) = base_config {
            cli.fill_unset_from(base_config);
        }
        cli.post_process()?;
        cli.validate()?;

        let Some(path) = cli.config_file.clone() else {
            return Ok(cli);
        };

        let mut config = Config::from_file(&path)?;
        config.input = cli.input;
        config.pretty |= cli.pretty;
        config.config_file = Some(path);
        config.validate()?;
        Ok(config)
    }

    /// Takes values from `base` for every field still at its default.
    fn fill_unset_from(&mut self, base: Config) {
        let defaults = Config::default();

        if self.input.is_none() {
            self.input = base.input;
        }
        if self.log_level == defaults.log_level {
            self.log_level = base.log_level;
        }
        if self.log_format == defaults.log_format {
            self.log_format = base.log_format;
        }
        if self.log_directives.is_empty() {
            self.log_directives = base.log_directives;
        }
        if self.time_zone == defaults.time_zone {
            self.time_zone = base.time_zone;
        }
        if self.recognized_keys.is_empty() {
            self.recognized_keys = base.recognized_keys;
        }
        if self.context_collision == defaults.context_collision {
            self.context_collision = base.context_collision;
        }
        if self.on_error == defaults.on_error {
            self.on_error = base.on_error;
        }
        self.pretty |= base.pretty;
        if self.config_file.is_none() {
            self.config_file = base.config_file;
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.time_zone_setting = self
            .time_zone
            .parse()
            .map_err(ConfigError::InvalidConfig)?;

        self.recognized_keys = self
            .recognized_keys
            .iter()
            .map(|key| key.trim().to_string())
            .collect();

        Ok(())
    }

    pub fn recognized_key_set(&self) -> RecognizedKeys {
        if self.recognized_keys.is_empty() {
            RecognizedKeys::logger_defaults()
        } else {
            RecognizedKeys::new(self.recognized_keys.iter().cloned())
        }
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            recognized_keys: self.recognized_key_set(),
            context_collision: self.context_collision,
            time_zone: self.time_zone_setting,
        }
    }
}
