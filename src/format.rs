//! Optional post-processing of generated source through an external formatter.
//!
//! Generated text is valid without this step; a formatter only changes layout.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::FormatError;

pub trait SourceFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

/// Leaves the text as generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unformatted;

impl SourceFormatter for Unformatted {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        Ok(source.to_owned())
    }
}

/// Pipes source through a command's stdin and reads the result from stdout,
/// e.g. `black -q -` or `prettier --parser typescript`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    /// Split a whitespace-separated command line. `None` when it is blank.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self { program, args: words.collect() })
    }

    fn fail(&self, message: impl Into<String>, raw: &str) -> FormatError {
        FormatError::Failed { program: self.program.clone(), message: message.into(), raw: raw.to_owned() }
    }
}

impl SourceFormatter for CommandFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        debug!(program = self.program.as_str(), bytes = source.len(), "running formatter");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.fail(e.to_string(), source))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).map_err(|e| self.fail(e.to_string(), source))?;
        }
        let output = child.wait_with_output().map_err(|e| self.fail(e.to_string(), source))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(self.fail(format!("{} ({stderr})", output.status), source));
        }
        String::from_utf8(output.stdout).map_err(|e| self.fail(e.to_string(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_program_and_args() {
        let f = CommandFormatter::parse("  black -q -  ").unwrap();
        assert_eq!(f.program, "black");
        assert_eq!(f.args, ["-q", "-"]);
        assert!(CommandFormatter::parse("   ").is_none());
    }

    #[test]
    fn failure_keeps_the_raw_source() {
        let f = CommandFormatter::parse("definitely-not-a-real-formatter-binary").unwrap();
        let err = f.format("class A:\n    pass\n").unwrap_err();
        assert_eq!(err.raw(), "class A:\n    pass\n");
    }

    #[test]
    fn unformatted_is_identity() {
        assert_eq!(Unformatted.format("x = 1\n").unwrap(), "x = 1\n");
    }
}
