use super::{Config, ConfigError};
use crate::encoder::TimeZoneSetting;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate time zone
        self.time_zone
            .parse::<TimeZoneSetting>()
            .map_err(ConfigError::InvalidConfig)?;

        // Validate recognized keys
        if let Some(position) = self.recognized_keys.iter().position(|key| key.is_empty()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Recognized key #{} is empty",
                position + 1
            )));
        }

        // Validate input file if provided
        if let Some(input) = &self.input
            && !input.is_file()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Input file does not exist: {}",
                input.display()
            )));
        }

        // Validate log directives
        if let Some(directive) = self
            .log_directives
            .iter()
            .find(|directive| !directive.contains('='))
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log directive '{directive}'. Expected: 'target=level'"
            )));
        }

        Ok(())
    }
}
