//! Configuration file handling for docweave.
//!
//! This module defines the `docweave.yaml` configuration schema and provides
//! functions for loading, validating, and defaulting configuration files.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Phase, WeaveError};

/// The default configuration filename.
pub const CONFIG_FILENAME: &str = "docweave.yaml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Input discovery settings.
    pub input: InputSection,
    /// Tag and attribute-alias settings.
    pub tags: TagsSection,
    /// Block delimiter patterns for the plaintext parser.
    pub plaintext_patterns: PlaintextPatterns,
    /// Generated output settings.
    pub output: OutputSection,
    /// Template selection settings.
    pub templates: TemplatesSection,
    /// Command synthesis settings.
    pub commands: CommandsSection,
    /// Logging settings.
    pub logging: LoggingSection,
    /// Parse and convert but don't write files.
    pub dry_run: bool,
}

/// Input discovery section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputSection {
    /// Directories to scan for documentation.
    pub directories: Vec<String>,
    /// Glob patterns for files to include.
    pub include: Vec<String>,
    /// Glob patterns for files to exclude.
    pub exclude: Vec<String>,
    /// Recurse into subdirectories. Unset means true.
    pub recursive: Option<bool>,
}

/// Tag matching and attribute alias section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TagsSection {
    /// Tags that mark a code block as a test step.
    pub step_tags: Vec<String>,
    /// Logical attribute name to ordered alias-key list.
    pub attributes: IndexMap<String, Vec<String>>,
}

/// Regex delimiters for tagged blocks in plain text documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaintextPatterns {
    /// Pattern matching a block opening line. Capture group 1 is the tag,
    /// optional capture group 2 the attribute list.
    pub block_start: String,
    /// Pattern matching a block closing line.
    pub block_end: String,
}

/// Generated output section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub directory: String,
    pub file_prefix: String,
    pub file_suffix: String,
    pub package_name: String,
    /// Optional `//go:build` tag for generated files.
    pub build_tag: String,
    /// Remove previously generated files before writing.
    pub clean_before_generate: bool,
    /// Labels applied to every generated test.
    pub default_labels: Vec<String>,
}

/// Template selection section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplatesSection {
    /// Directory holding `.tmpl` files (optional; the built-in default
    /// template is always available).
    pub directory: String,
    /// Name of the default template.
    pub default: String,
    /// Allow per-block `template=` attribute overrides.
    pub allow_override: bool,
}

/// Command synthesis section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandsSection {
    pub default_timeout: String,
    pub default_expected_exit_code: i32,
    /// Commands containing any of these substrings are rejected.
    pub blocked_patterns: Vec<String>,
    /// Shell used for complex commands.
    pub shell: String,
    pub shell_flag: String,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    /// One of: debug, info, warn, error.
    pub level: String,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            directories: vec!["docs".to_string()],
            include: vec!["*.md".to_string(), "*.adoc".to_string()],
            exclude: vec!["vendor/**".to_string(), "node_modules/**".to_string()],
            recursive: Some(true),
        }
    }
}

impl Default for TagsSection {
    fn default() -> Self {
        let aliases = |keys: &[&str]| keys.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        let mut attributes = IndexMap::new();
        attributes.insert("step_name".to_string(), aliases(&["step-name", "name"]));
        attributes.insert("timeout".to_string(), aliases(&["timeout"]));
        attributes.insert(
            "expected_exit_code".to_string(),
            aliases(&["expected", "exit-code"]),
        );
        attributes.insert("describe".to_string(), aliases(&["describe"]));
        attributes.insert("context".to_string(), aliases(&["context"]));
        attributes.insert("skip_on_failure".to_string(), aliases(&["skip-on-failure"]));
        attributes.insert("template".to_string(), aliases(&["template"]));
        attributes.insert(
            "retry".to_string(),
            aliases(&["retry", "retries", "retry-count"]),
        );
        attributes.insert(
            "retry_interval".to_string(),
            aliases(&["retry-interval", "retry-delay"]),
        );
        Self {
            step_tags: vec!["go-e2e-step".to_string()],
            attributes,
        }
    }
}

impl Default for PlaintextPatterns {
    fn default() -> Self {
        Self {
            block_start: r"^\s*@begin\((\S+)(?:\s+(.*))?\)\s*$".to_string(),
            block_end: r"^\s*@end\s*$".to_string(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: "tests/e2e/generated".to_string(),
            file_prefix: "generated_".to_string(),
            file_suffix: "_test.go".to_string(),
            package_name: "e2e_generated".to_string(),
            build_tag: String::new(),
            clean_before_generate: true,
            default_labels: vec!["documentation".to_string()],
        }
    }
}

impl Default for TemplatesSection {
    fn default() -> Self {
        Self {
            directory: "templates".to_string(),
            default: "ginkgo_default".to_string(),
            allow_override: true,
        }
    }
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            default_timeout: "30s".to_string(),
            default_expected_exit_code: 0,
            blocked_patterns: vec![
                "rm -rf /".to_string(),
                "mkfs".to_string(),
                "dd if=".to_string(),
                "format c:".to_string(),
                "> /dev/sd".to_string(),
            ],
            shell: "/bin/sh".to_string(),
            shell_flag: "-c".to_string(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TagsSection {
    /// Returns the ordered alias keys for a logical attribute name, or an
    /// empty slice when none are configured.
    pub fn aliases(&self, logical: &str) -> &[String] {
        self.attributes
            .get(logical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Config {
    /// Load configuration from a YAML file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeaveError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WeaveError::new(Phase::Config, path, 0, "failed to read config file").with_cause(e)
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            WeaveError::new(Phase::Config, path, 0, "failed to parse config file").with_cause(e)
        })
    }

    /// Parse configuration from a YAML string. Unspecified fields take
    /// their default values.
    pub fn parse(content: &str) -> Result<Self, WeaveError> {
        serde_yaml::from_str(content).map_err(|e| {
            WeaveError::new(Phase::Config, "", 0, "failed to parse config file").with_cause(e)
        })
    }

    /// Check required fields and value shapes.
    pub fn validate(&self) -> Result<(), WeaveError> {
        let mut errs: Vec<String> = Vec::new();

        if self.input.directories.is_empty() {
            errs.push("input.directories must not be empty".to_string());
        }
        if self.input.include.is_empty() {
            errs.push("input.include must not be empty".to_string());
        }
        if self.tags.step_tags.is_empty() {
            errs.push("tags.step_tags must not be empty".to_string());
        }
        if self.output.directory.is_empty() {
            errs.push("output.directory must not be empty".to_string());
        }
        if self.output.package_name.is_empty() {
            errs.push("output.package_name must not be empty".to_string());
        }
        if self.output.file_suffix.is_empty() {
            errs.push("output.file_suffix must not be empty".to_string());
        } else if !self.output.file_suffix.ends_with(".go") {
            errs.push("output.file_suffix must end with .go".to_string());
        }

        if !self.plaintext_patterns.block_start.is_empty() {
            if let Err(e) = Regex::new(&self.plaintext_patterns.block_start) {
                errs.push(format!(
                    "plaintext_patterns.block_start is not a valid regex: {e}"
                ));
            }
        }
        if !self.plaintext_patterns.block_end.is_empty() {
            if let Err(e) = Regex::new(&self.plaintext_patterns.block_end) {
                errs.push(format!(
                    "plaintext_patterns.block_end is not a valid regex: {e}"
                ));
            }
        }

        if !self.logging.level.is_empty()
            && !matches!(
                self.logging.level.as_str(),
                "debug" | "info" | "warn" | "error"
            )
        {
            errs.push(format!(
                "logging.level must be one of: debug, info, warn, error (got {:?})",
                self.logging.level
            ));
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(WeaveError::new(
                Phase::Config,
                "",
                0,
                format!("validation failed: {}", errs.join("; ")),
            ))
        }
    }
}
