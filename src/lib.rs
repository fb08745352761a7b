#![warn(rust_2018_idioms)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Wire-form integers are range-checked before casting
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. EncodeError in encoder module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod domain;
pub mod encoder;

// Re-export main types for easy access
pub use domain::{EncodeError, EncodedPayload, LogLevel, RawLogEvent};
pub use encoder::{Encoder, EncoderConfig};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
