//! Core data model shared across the extraction and conversion pipeline.

use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// A single tagged code block extracted from a document.
///
/// Blocks are immutable once emitted by a parser: the grouping context
/// (`context`, `test_group`, `step_group`) is a snapshot of the marker
/// cursor at the moment the block was encountered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeBlock {
    /// The matched tag (e.g. "go-e2e-step").
    pub tag: String,
    /// Raw content of the block.
    pub content: String,
    /// 1-based source line where the block begins: the directive line for
    /// the line-scan formats, the first content line for Markdown.
    pub line_number: usize,
    /// Key-value attributes from the block's info string, in source order.
    /// Duplicate keys are last-write-wins.
    pub attributes: IndexMap<String, String>,
    /// Nearest enclosing heading text.
    pub context: String,
    /// Enclosing `test-start` group name (empty if ungrouped).
    pub test_group: String,
    /// Enclosing `test-step-start` group name (empty if ungrouped).
    pub step_group: String,
}

/// A document heading, kept for describe/context inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// Heading level (1-based).
    pub level: usize,
    pub text: String,
    /// 1-based source line.
    pub line: usize,
}

/// The result of parsing a single document file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub file_path: PathBuf,
    /// Format name: "markdown", "asciidoc", or "plaintext".
    pub file_type: String,
    /// All extracted tagged blocks, in document order.
    pub blocks: Vec<CodeBlock>,
    /// All headings, in document order.
    pub headings: Vec<Heading>,
    /// Document-level metadata. Keeps the last-seen `test-start` name for
    /// backward compatibility.
    pub metadata: IndexMap<String, String>,
}

impl ParsedDocument {
    pub fn new(file_path: impl Into<PathBuf>, file_type: &str) -> Self {
        Self {
            file_path: file_path.into(),
            file_type: file_type.to_string(),
            blocks: Vec::new(),
            headings: Vec::new(),
            metadata: IndexMap::new(),
        }
    }
}

/// A single executable step within a generated test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestStep {
    /// Resolved step name, shown in the generated `By(...)` call.
    pub name: String,
    /// Raw command text from the source block.
    pub command: String,
    /// Synthesized Go code fragment for this step.
    pub code: String,
    /// Expected process exit code (default 0).
    pub expected_exit: i32,
    /// Timeout duration literal (e.g. "30s"); "0s" disables the deadline.
    pub timeout: String,
    /// 1-based source line of the originating block.
    pub line_number: usize,
    pub skip_on_failure: bool,
    /// Number of retries (0 = no retry loop).
    pub retry_count: u32,
    /// Duration literal between retries (e.g. "2s").
    pub retry_interval: String,
}

/// A fully converted test specification, ready for template rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSpec {
    pub source_file: PathBuf,
    pub source_type: String,
    /// The `It(...)` block name.
    pub test_name: String,
    /// The `Describe(...)` block name.
    pub describe_block: String,
    /// The `Context(...)` block name (empty = no context wrapper).
    pub context_block: String,
    pub steps: Vec<TestStep>,
    /// Template override name from block attributes (empty = default).
    pub template_name: String,
    /// Owning `test-start` group name; drives output-file grouping.
    pub test_group: String,
    /// Ginkgo labels: configured defaults plus the describe name.
    pub labels: Vec<String>,
}
