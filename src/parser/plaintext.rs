//! Plain text extractor using configurable regex block delimiters.
//!
//! Acts as the fallback for formats without native block structure:
//! headings are setext-style underlines (`===` / `---`), grouping markers
//! are `# test-start:` style comment lines, and tagged blocks are fenced
//! by the configured start/end patterns.

use regex::Regex;
use std::path::Path;

use crate::config::PlaintextPatterns;
use crate::domain::{CodeBlock, Heading, ParsedDocument};
use crate::error::{Phase, WeaveError};

use super::{MarkerCursor, Separator, parse_attr_tokens, split_quoted};

pub fn parse(
    path: &Path,
    content: &str,
    tags: &[String],
    patterns: &PlaintextPatterns,
) -> Result<ParsedDocument, WeaveError> {
    let start_re = compile(path, "block_start", &patterns.block_start)?;
    let end_re = compile(path, "block_end", &patterns.block_end)?;

    let mut doc = ParsedDocument::new(path, "plaintext");
    let lines: Vec<&str> = content.lines().collect();

    // Setext-style headings: a text line underlined by === (level 1) or
    // --- (level 2).
    for i in 0..lines.len().saturating_sub(1) {
        let text = lines[i].trim();
        let underline = lines[i + 1].trim();
        if !text.is_empty() && underline.len() >= 3 {
            let level = if underline.chars().all(|c| c == '=') {
                Some(1)
            } else if underline.chars().all(|c| c == '-') {
                Some(2)
            } else {
                None
            };
            if let Some(level) = level {
                doc.headings.push(Heading {
                    level,
                    text: text.to_string(),
                    line: i + 1,
                });
            }
        }
    }

    let mut cursor = MarkerCursor::default();
    let mut heading_idx = 0;
    let mut i = 0;
    while i < lines.len() {
        // Advance the heading cursor past any headings at or before this line.
        while heading_idx < doc.headings.len() && doc.headings[heading_idx].line <= i + 1 {
            cursor.set_heading(&doc.headings[heading_idx].text);
            heading_idx += 1;
        }

        let trimmed = lines[i].trim();
        if let Some(comment) = trimmed.strip_prefix('#') {
            if cursor.apply_marker(comment, &mut doc.metadata) {
                i += 1;
                continue;
            }
        }

        let Some(caps) = start_re.captures(lines[i]) else {
            i += 1;
            continue;
        };

        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
        if !tags.iter().any(|t| *t == tag) {
            i += 1;
            continue;
        }

        let attributes = match caps.get(2) {
            Some(m) => {
                let tokens = split_quoted(m.as_str(), Separator::Whitespace);
                parse_attr_tokens(tokens.iter().map(String::as_str))
            }
            None => Default::default(),
        };

        let directive_line = i + 1;
        i += 1;
        let mut body: Vec<&str> = Vec::new();
        while i < lines.len() && !end_re.is_match(lines[i]) {
            body.push(lines[i]);
            i += 1;
        }

        doc.blocks.push(CodeBlock {
            tag,
            content: body.join("\n"),
            line_number: directive_line,
            attributes,
            context: cursor.heading.clone(),
            test_group: cursor.test_group.clone(),
            step_group: cursor.step_group.clone(),
        });

        // Skip the @end line.
        i += 1;
    }

    Ok(doc)
}

fn compile(path: &Path, which: &str, pattern: &str) -> Result<Regex, WeaveError> {
    Regex::new(pattern).map_err(|e| {
        WeaveError::new(
            Phase::Parse,
            path,
            0,
            format!("invalid plaintext {which} pattern"),
        )
        .with_cause(e)
    })
}
