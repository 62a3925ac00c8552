//! Document parsers that extract tagged code blocks and headings.
//!
//! Each supported format drives the same marker-cursor state machine:
//! comment-embedded `test-start:` / `test-end` / `test-step-start:` /
//! `test-step-end` markers open and close grouping scopes, and every
//! captured block snapshots the cursor at the moment it is encountered.
//! Equivalent marker placement must yield structurally equivalent block
//! sequences across formats.

mod asciidoc;
mod markdown;
mod plaintext;

use indexmap::IndexMap;
use std::path::Path;

use crate::config::PlaintextPatterns;
use crate::domain::ParsedDocument;
use crate::error::WeaveError;

/// The closed set of supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markdown,
    Asciidoc,
    Plaintext,
}

impl DocumentFormat {
    /// Select a format from a file extension (without the leading dot).
    /// Unknown text-ish extensions fall back to the plaintext parser.
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.') {
            "md" | "markdown" => Some(Self::Markdown),
            "adoc" | "asciidoc" => Some(Self::Asciidoc),
            "txt" | "rst" => Some(Self::Plaintext),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Asciidoc => "asciidoc",
            Self::Plaintext => "plaintext",
        }
    }
}

/// Parse a document, extracting tagged blocks and headings.
pub fn parse_document(
    format: DocumentFormat,
    path: &Path,
    content: &str,
    tags: &[String],
    patterns: &PlaintextPatterns,
) -> Result<ParsedDocument, WeaveError> {
    match format {
        DocumentFormat::Markdown => markdown::parse(path, content, tags),
        DocumentFormat::Asciidoc => asciidoc::parse(path, content, tags),
        DocumentFormat::Plaintext => plaintext::parse(path, content, tags, patterns),
    }
}

/// Traversal cursor tracking the current heading and open grouping markers.
///
/// Owned by each format's parse function and threaded through the walk;
/// a start marker sets the corresponding field (last one wins when
/// re-triggered without a matching end), an end marker clears it. An
/// unterminated group auto-closes at end of document.
#[derive(Debug, Default, Clone)]
pub(crate) struct MarkerCursor {
    pub heading: String,
    pub test_group: String,
    pub step_group: String,
}

impl MarkerCursor {
    /// Apply a comment-embedded marker. `text` is the comment body with
    /// the format's comment syntax already stripped. Returns true when the
    /// text was a recognized marker.
    pub fn apply_marker(
        &mut self,
        text: &str,
        metadata: &mut IndexMap<String, String>,
    ) -> bool {
        let text = text.trim();
        if let Some(name) = text.strip_prefix("test-start:") {
            self.test_group = name.trim().to_string();
            // Backward-compatible metadata: stores the last seen test-start.
            metadata.insert("test-start".to_string(), self.test_group.clone());
            true
        } else if text.starts_with("test-end") {
            self.test_group.clear();
            true
        } else if let Some(name) = text.strip_prefix("test-step-start:") {
            self.step_group = name.trim().to_string();
            true
        } else if text.starts_with("test-step-end") {
            self.step_group.clear();
            true
        } else {
            false
        }
    }

    pub fn set_heading(&mut self, text: &str) {
        self.heading = text.to_string();
    }
}

/// How an attribute list is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    /// Unquoted whitespace (Markdown info strings, plaintext attr lists).
    Whitespace,
    /// Unquoted commas (AsciiDoc source directives).
    Comma,
}

/// Split a string on the separator, preserving quoted substrings verbatim
/// (quote characters are kept in the token; values are unquoted later).
pub(crate) fn split_quoted(s: &str, sep: Separator) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in s.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => {
                let is_sep = match sep {
                    Separator::Whitespace => c == ' ' || c == '\t',
                    Separator::Comma => c == ',',
                };
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    current.push(c);
                } else if is_sep {
                    if !current.is_empty() {
                        parts.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(c);
                }
            }
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Parse `key=value` tokens into an attribute map. Surrounding quotes are
/// trimmed from values; duplicate keys are last-write-wins.
pub(crate) fn parse_attr_tokens<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
) -> IndexMap<String, String> {
    let mut attrs = IndexMap::new();
    for token in tokens {
        let token = token.trim();
        if let Some(idx) = token.find('=') {
            if idx == 0 {
                continue;
            }
            let key = token[..idx].trim().to_string();
            let value = token[idx + 1..]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();
            attrs.insert(key, value);
        }
    }
    attrs
}

/// 1-based line number of a byte offset within `content`.
pub(crate) fn line_number(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaintextPatterns;
    use std::path::PathBuf;

    #[test]
    fn format_for_extension() {
        assert_eq!(
            DocumentFormat::for_extension("md"),
            Some(DocumentFormat::Markdown)
        );
        assert_eq!(
            DocumentFormat::for_extension(".adoc"),
            Some(DocumentFormat::Asciidoc)
        );
        assert_eq!(
            DocumentFormat::for_extension("txt"),
            Some(DocumentFormat::Plaintext)
        );
        assert_eq!(DocumentFormat::for_extension("pdf"), None);
    }

    #[test]
    fn cursor_marker_lifecycle() {
        let mut cursor = MarkerCursor::default();
        let mut metadata = IndexMap::new();

        assert!(cursor.apply_marker("test-start: Install Suite", &mut metadata));
        assert_eq!(cursor.test_group, "Install Suite");
        assert_eq!(metadata.get("test-start").unwrap(), "Install Suite");

        assert!(cursor.apply_marker("test-step-start: setup", &mut metadata));
        assert_eq!(cursor.step_group, "setup");

        assert!(cursor.apply_marker("test-step-end", &mut metadata));
        assert_eq!(cursor.step_group, "");

        assert!(cursor.apply_marker("test-end", &mut metadata));
        assert_eq!(cursor.test_group, "");

        assert!(!cursor.apply_marker("some other comment", &mut metadata));
    }

    #[test]
    fn cursor_restart_without_end_is_last_one_wins() {
        let mut cursor = MarkerCursor::default();
        let mut metadata = IndexMap::new();
        cursor.apply_marker("test-start: First", &mut metadata);
        cursor.apply_marker("test-start: Second", &mut metadata);
        assert_eq!(cursor.test_group, "Second");
        assert_eq!(metadata.get("test-start").unwrap(), "Second");
    }

    #[test]
    fn split_quoted_whitespace_preserves_quotes() {
        let parts = split_quoted(
            r#"go-e2e-step step-name="Deploy app" timeout=60s"#,
            Separator::Whitespace,
        );
        assert_eq!(
            parts,
            vec!["go-e2e-step", r#"step-name="Deploy app""#, "timeout=60s"]
        );
    }

    #[test]
    fn split_quoted_comma() {
        let parts = split_quoted(r#"step-name="a, b",timeout=5s"#, Separator::Comma);
        assert_eq!(parts, vec![r#"step-name="a, b""#, "timeout=5s"]);
    }

    #[test]
    fn attr_tokens_unquote_values_and_last_write_wins() {
        let attrs = parse_attr_tokens(vec![
            r#"step-name="Deploy app""#,
            "timeout=60s",
            "timeout=90s",
            "notanattr",
            "=broken",
        ]);
        assert_eq!(attrs.get("step-name").unwrap(), "Deploy app");
        assert_eq!(attrs.get("timeout").unwrap(), "90s");
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn line_number_is_one_based() {
        let content = "a\nb\nc";
        assert_eq!(line_number(content, 0), 1);
        assert_eq!(line_number(content, 2), 2);
        assert_eq!(line_number(content, 4), 3);
    }

    // Cross-format contract: equivalent marker placement yields
    // structurally equivalent block sequences.
    #[test]
    fn formats_agree_on_grouping_and_attributes() {
        let tags = vec!["go-e2e-step".to_string()];
        let patterns = PlaintextPatterns::default();

        let md = "\
# Guide

<!-- test-start: Suite A -->
<!-- test-step-start: setup -->
```go-e2e-step step-name=\"First\" timeout=10s
kubectl get pods
```
<!-- test-step-end -->
<!-- test-end -->
";
        let adoc = "\
== Guide

// test-start: Suite A
// test-step-start: setup
[source,go-e2e-step,step-name=\"First\",timeout=\"10s\"]
----
kubectl get pods
----
// test-step-end
// test-end
";
        let txt = "\
Guide
=====

# test-start: Suite A
# test-step-start: setup
@begin(go-e2e-step step-name=\"First\" timeout=10s)
kubectl get pods
@end
# test-step-end
# test-end
";

        let docs = [
            (DocumentFormat::Markdown, "g.md", md),
            (DocumentFormat::Asciidoc, "g.adoc", adoc),
            (DocumentFormat::Plaintext, "g.txt", txt),
        ]
        .map(|(format, name, content)| {
            parse_document(format, &PathBuf::from(name), content, &tags, &patterns).unwrap()
        });

        for doc in &docs {
            assert_eq!(doc.blocks.len(), 1, "one block in {}", doc.file_type);
            let block = &doc.blocks[0];
            assert_eq!(block.tag, "go-e2e-step");
            assert_eq!(block.content.trim(), "kubectl get pods");
            assert_eq!(block.test_group, "Suite A");
            assert_eq!(block.step_group, "setup");
            assert_eq!(block.context, "Guide");
            assert_eq!(block.attributes.get("step-name").unwrap(), "First");
            assert_eq!(block.attributes.get("timeout").unwrap(), "10s");
            assert_eq!(doc.headings.len(), 1);
            assert_eq!(doc.headings[0].text, "Guide");
            assert_eq!(doc.headings[0].level, 1);
        }
    }
}
