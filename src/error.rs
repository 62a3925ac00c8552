//! Structured errors carrying pipeline phase and source location.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The pipeline phase in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Config,
    Scan,
    Parse,
    Convert,
    Template,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Config => "config",
            Phase::Scan => "scan",
            Phase::Parse => "parse",
            Phase::Convert => "convert",
            Phase::Template => "template",
            Phase::Write => "write",
        };
        f.write_str(name)
    }
}

/// An error with phase, file, and line context.
///
/// Line 0 means "not applicable". Formats as
/// `[phase] file:line: message: cause`, omitting the parts that are empty.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct WeaveError {
    pub phase: Phase,
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
    pub cause: Option<anyhow::Error>,
}

impl WeaveError {
    pub fn new(
        phase: Phase,
        file: impl AsRef<Path>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            file: file.as_ref().to_path_buf(),
            line,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    fn render(&self) -> String {
        let mut s = format!("[{}]", self.phase);
        if !self.file.as_os_str().is_empty() {
            s.push_str(&format!(" {}", self.file.display()));
        }
        if self.line > 0 {
            s.push_str(&format!(":{}", self.line));
        }
        s.push_str(&format!(": {}", self.message));
        if let Some(cause) = &self.cause {
            s.push_str(&format!(": {}", cause));
        }
        s
    }
}
