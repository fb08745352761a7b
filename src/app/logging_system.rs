use super::config::{LogFormat, TracingLevel};
use super::initialization::{FallbackStrategy, InitializationError, LogDirective};
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Diagnostics subscriber setup. Everything is written to stderr so that
/// stdout carries nothing but encoded payloads.
pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
    fallback_level: TracingLevel,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
            fallback_level: TracingLevel::Info,
        }
    }

    pub fn add_directive(&self, directive_str: &str) -> Result<(), InitializationError> {
        match LogDirective::parse(directive_str) {
            Ok(directive) => {
                self.directives.write().push(directive);
                Ok(())
            }
            // The subscriber does not exist yet, so these go straight to stderr.
            Err(e) => match e.fallback_strategy() {
                FallbackStrategy::UseDefaultLevel => {
                    eprintln!("Warning: {e}, using default level");
                    self.add_default_directive(directive_str);
                    Ok(())
                }
                FallbackStrategy::SkipDirective => {
                    eprintln!("Warning: {e}, skipping directive");
                    Ok(())
                }
                _ => Err(e),
            },
        }
    }

    fn add_default_directive(&self, directive_str: &str) {
        let target = directive_str
            .split_once('=')
            .map_or(directive_str, |(target, _)| target)
            .trim();
        self.directives
            .write()
            .push(LogDirective::new(target, self.fallback_level));
    }

    pub fn build_filter_string(&self, default_level: TracingLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn initialize_tracing(
        &self,
        default_level: TracingLevel,
        format: LogFormat,
    ) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter =
            EnvFilter::try_new(&filter_string).map_err(|e| InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}'"),
                source: Box::new(e),
            })?;

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .try_init(),
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the global subscriber once per process. Later calls report the
/// outcome of the first one.
pub fn setup_logging_safe(
    level: TracingLevel,
    format: LogFormat,
    directives: &[String],
) -> Result<(), InitializationError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        for directive in directives {
            logging_system
                .add_directive(directive)
                .map_err(|e| e.to_string())?;
        }
        logging_system
            .initialize_tracing(level, format)
            .map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| InitializationError::LoggingInitFailed {
            details,
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_logging_system_creation() {
        let logging_system = LoggingSystem::new();
        assert_eq!(logging_system.directive_count(), 0);
    }

    #[test]
    fn test_add_valid_directive() {
        let logging_system = LoggingSystem::new();

        assert!(logging_system.add_directive("rask_log_encoder=warn").is_ok());
        assert!(
            logging_system
                .add_directive("rask_log_encoder::encoder=trace")
                .is_ok()
        );
        assert_eq!(logging_system.directive_count(), 2);
    }

    #[test]
    fn test_fallback_strategies() {
        let logging_system = LoggingSystem::new();

        let test_cases = [
            ("rask_log_encoder=warn", 1),   // Valid
            ("invalid_format", 1),          // Skip directive
            ("target=invalid_level", 2),    // Use default level
            ("=empty", 2),                  // Skip directive
            ("", 2),                        // Skip directive
        ];

        for (directive, expected_count) in test_cases {
            assert!(logging_system.add_directive(directive).is_ok(), "{directive}");
            assert_eq!(
                logging_system.directive_count(),
                expected_count,
                "Directive: {directive}"
            );
        }

        assert_eq!(
            logging_system.build_filter_string(TracingLevel::Warn),
            "warn,rask_log_encoder=warn,target=info"
        );
    }

    #[test]
    fn test_build_filter_string() {
        let logging_system = LoggingSystem::new();
        assert_eq!(logging_system.build_filter_string(TracingLevel::Info), "info");

        logging_system.add_directive("rask_log_encoder::app=debug").unwrap();
        assert_eq!(
            logging_system.build_filter_string(TracingLevel::Error),
            "error,rask_log_encoder::app=debug"
        );
    }

    #[test]
    fn test_concurrent_directive_modification() {
        let logging_system = Arc::new(LoggingSystem::new());

        let writers: Vec<_> = (0..50)
            .map(|i| {
                let logging_system = logging_system.clone();
                thread::spawn(move || logging_system.add_directive(&format!("target{i}=info")))
            })
            .collect();

        let readers: Vec<_> = (0..25)
            .map(|_| {
                let logging_system = logging_system.clone();
                thread::spawn(move || logging_system.build_filter_string(TracingLevel::Info))
            })
            .collect();

        for handle in writers {
            assert!(handle.join().unwrap().is_ok());
        }
        for handle in readers {
            assert!(handle.join().is_ok());
        }

        assert_eq!(logging_system.directive_count(), 50);
    }

    #[test]
    fn test_setup_logging_safe_is_repeatable() {
        let first = setup_logging_safe(TracingLevel::Info, LogFormat::Compact, &[]);
        let second = setup_logging_safe(TracingLevel::Debug, LogFormat::Json, &[]);

        // Another test harness subscriber may already be installed, in which
        // case both calls fail the same way rather than panicking.
        assert_eq!(first.is_ok(), second.is_ok());
        if let Err(e) = second {
            assert!(matches!(e, InitializationError::LoggingInitFailed { .. }));
        }
    }
}
