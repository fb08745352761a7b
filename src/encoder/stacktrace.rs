use std::fmt;

use crate::domain::StackFrame;

/// Renders a crash stack trace as text.
pub trait StacktraceFormatter: Send + Sync + fmt::Debug {
    fn format(&self, frames: &[StackFrame]) -> String;
}

/// Formats frames the way Elixir's `Exception.format_stacktrace/1` does:
///
/// ```text
///     (my_app) lib/my_app/worker.ex:42: MyApp.Worker.handle_call/3
///     (stdlib) gen_server.erl:721: :gen_server.try_handle_call/4
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ElixirStacktraceFormatter;

impl ElixirStacktraceFormatter {
    fn format_frame(frame: &StackFrame) -> String {
        let mut entry = String::from("    ");

        if let Some(application) = &frame.application {
            entry.push_str(&format!("({application}) "));
        }

        match (&frame.file, frame.line) {
            (Some(file), Some(line)) => entry.push_str(&format!("{file}:{line}: ")),
            (Some(file), None) => entry.push_str(&format!("{file}: ")),
            _ => {}
        }

        entry.push_str(&format!(
            "{}.{}/{}",
            frame.module, frame.function, frame.arity
        ));
        entry
    }
}

impl StacktraceFormatter for ElixirStacktraceFormatter {
    fn format(&self, frames: &[StackFrame]) -> String {
        frames
            .iter()
            .map(Self::format_frame)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
