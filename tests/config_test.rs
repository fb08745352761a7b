use rask_log_encoder::app::{Config, ConfigError, ErrorPolicy, LogFormat, TracingLevel};
use rask_log_encoder::encoder::{ContextCollision, RecognizedKeys, TimeZoneSetting};
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn clean_all_env_vars() {
    let env_vars = [
        "ENCODER_INPUT",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "LOG_DIRECTIVES",
        "ENCODER_TIME_ZONE",
        "RECOGNIZED_KEYS",
        "CONTEXT_COLLISION",
        "ON_ERROR",
        "PRETTY_OUTPUT",
        "CONFIG_FILE",
        "RASK_ENCODER_CONFIG",
    ];

    unsafe {
        for var in &env_vars {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_config_defaults() {
    clean_all_env_vars();

    let config = Config::from_args(["rask-log-encoder"]).unwrap();

    assert_eq!(config.log_level, TracingLevel::Info);
    assert_eq!(config.log_format, LogFormat::Compact);
    assert_eq!(config.time_zone_setting, TimeZoneSetting::Local);
    assert_eq!(config.context_collision, ContextCollision::Overwrite);
    assert_eq!(config.on_error, ErrorPolicy::Drop);
    assert!(config.input.is_none());
    assert!(!config.pretty);
    assert_eq!(config.recognized_key_set(), RecognizedKeys::logger_defaults());
}

#[test]
#[serial]
fn test_config_from_args() {
    clean_all_env_vars();
    let input = NamedTempFile::new().unwrap();
    let input_path = input.path().to_str().unwrap().to_string();

    let config = Config::from_args([
        "rask-log-encoder",
        "--input",
        &input_path,
        "--log-level",
        "debug",
        "--log-format",
        "json",
        "--time-zone",
        "+09:00",
        "--recognized-keys",
        "module, line,pid",
        "--context-collision",
        "reject",
        "--on-error",
        "fallback",
        "--pretty",
    ])
    .unwrap();

    assert_eq!(config.input.as_deref(), Some(input.path()));
    assert_eq!(config.log_level, TracingLevel::Debug);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.time_zone_setting.to_string(), "+09:00");
    assert_eq!(
        config.recognized_key_set(),
        RecognizedKeys::new(["module", "line", "pid"])
    );
    assert_eq!(config.context_collision, ContextCollision::Reject);
    assert_eq!(config.on_error, ErrorPolicy::Fallback);
    assert!(config.pretty);

    let encoder_config = config.encoder_config();
    assert_eq!(encoder_config.context_collision, ContextCollision::Reject);
    assert_eq!(encoder_config.recognized_keys.len(), 3);
}

#[test]
#[serial]
fn test_config_rejects_invalid_values() {
    clean_all_env_vars();

    let bad_zone = Config::from_args(["rask-log-encoder", "--time-zone", "mars/olympus"]);
    assert!(matches!(bad_zone, Err(ConfigError::InvalidConfig(_))));

    let blank_key = Config::from_args(["rask-log-encoder", "--recognized-keys", "module,,line"]);
    assert!(matches!(blank_key, Err(ConfigError::InvalidConfig(_))));

    let missing_input =
        Config::from_args(["rask-log-encoder", "--input", "/nonexistent/events.ndjson"]);
    assert!(matches!(missing_input, Err(ConfigError::InvalidConfig(_))));

    let bad_policy = Config::from_args(["rask-log-encoder", "--on-error", "explode"]);
    assert!(matches!(bad_policy, Err(ConfigError::Cli(_))));
}

#[test]
#[serial]
fn test_config_from_environment() {
    clean_all_env_vars();

    unsafe {
        env::set_var("LOG_LEVEL", "WARN");
        env::set_var("ENCODER_TIME_ZONE", "utc");
        env::set_var("RECOGNIZED_KEYS", "module, function");
        env::set_var("CONTEXT_COLLISION", "Reject");
        env::set_var("ON_ERROR", "fallback");
        env::set_var("PRETTY_OUTPUT", "true");
    }

    let config = Config::from_env().unwrap();

    assert_eq!(config.log_level, TracingLevel::Warn);
    assert_eq!(config.time_zone_setting.to_string(), "+00:00");
    assert_eq!(config.recognized_keys, vec!["module", "function"]);
    assert_eq!(config.context_collision, ContextCollision::Reject);
    assert_eq!(config.on_error, ErrorPolicy::Fallback);
    assert!(config.pretty);

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_config_from_environment_invalid_enum() {
    clean_all_env_vars();
    unsafe {
        env::set_var("ON_ERROR", "explode");
    }

    let result = Config::from_env();
    assert!(matches!(result, Err(ConfigError::EnvError(message)) if message.contains("drop, fallback")));

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_config_from_inline_toml_env() {
    clean_all_env_vars();
    unsafe {
        env::set_var(
            "RASK_ENCODER_CONFIG",
            "time_zone = \"-05:00\"\non_error = \"fallback\"\n",
        );
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.time_zone_setting.to_string(), "-05:00");
    assert_eq!(config.on_error, ErrorPolicy::Fallback);

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_config_from_file() {
    clean_all_env_vars();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("encoder.toml");

    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
log_level = "trace"
log_format = "json"
time_zone = "utc"
recognized_keys = ["module", "request_id"]
context_collision = "reject"
"#
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.log_level, TracingLevel::Trace);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(
        config.recognized_key_set(),
        RecognizedKeys::new(["module", "request_id"])
    );
    assert_eq!(config.context_collision, ContextCollision::Reject);
    // Fields absent from the file keep their defaults.
    assert_eq!(config.on_error, ErrorPolicy::Drop);
}

#[test]
#[serial]
fn test_config_file_overrides_encoder_settings_only() {
    clean_all_env_vars();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("encoder.toml");
    std::fs::write(&config_path, "time_zone = \"+02:00\"\n").unwrap();
    let input_path = temp_dir.path().join("events.ndjson");
    std::fs::write(&input_path, "").unwrap();

    let config = Config::from_args_and_file([
        "rask-log-encoder",
        "--config-file",
        config_path.to_str().unwrap(),
        "--input",
        input_path.to_str().unwrap(),
        "--pretty",
    ])
    .unwrap();

    assert_eq!(config.time_zone_setting.to_string(), "+02:00");
    assert_eq!(config.input.as_deref(), Some(input_path.as_path()));
    assert!(config.pretty);
    assert_eq!(config.config_file.as_deref(), Some(config_path.as_path()));
}

#[test]
#[serial]
fn test_config_file_errors() {
    clean_all_env_vars();

    let missing = Config::from_file("/nonexistent/encoder.toml");
    assert!(matches!(missing, Err(ConfigError::FileError(_))));

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "time_zone = [").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::ParseError(_))
    ));
}
