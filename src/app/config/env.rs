use super::ConfigError;
use std::path::PathBuf;

/// Helper function to load and parse an environment variable.
/// Returns Ok(()) if the variable doesn't exist (keeps default).
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load a string environment variable.
pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

/// Helper function to load a comma separated list, trimming blanks.
pub fn load_env_list(name: &str, target: &mut Vec<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
    }
}

/// Helper function to load an optional PathBuf environment variable.
pub fn load_env_path_opt(name: &str, target: &mut Option<PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(PathBuf::from(value));
    }
}

/// Helper function to load a `ValueEnum` environment variable case-insensitively.
pub fn load_env_enum<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: clap::ValueEnum,
{
    if let Ok(value) = std::env::var(name) {
        *target = T::from_str(&value, true).map_err(|_| {
            let valid: Vec<String> = T::value_variants()
                .iter()
                .filter_map(|variant| variant.to_possible_value())
                .map(|possible| possible.get_name().to_string())
                .collect();
            ConfigError::EnvError(format!(
                "Invalid {name}: {value}. Valid values: {}",
                valid.join(", ")
            ))
        })?;
    }
    Ok(())
}
