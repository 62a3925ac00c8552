//! AsciiDoc extractor driven by line-pattern matching.

use regex::Regex;
use std::path::Path;

use super::{MarkerCursor, Separator, parse_attr_tokens, split_quoted};
use crate::domain::{CodeBlock, Heading, ParsedDocument};
use crate::error::WeaveError;

/// Parse an AsciiDoc document. Tagged blocks are `[source,tag,attrs]`
/// directives followed by a `----` delimited body; grouping markers are
/// `// test-start: ...` style line comments.
pub fn parse(path: &Path, content: &str, tags: &[String]) -> Result<ParsedDocument, WeaveError> {
    // Matches [source,tag,attr1="val1",attr2="val2"]
    let source_re = Regex::new(r#"^\[source,([^,\]]+)(?:,(.+))?\]\s*$"#).unwrap();
    // Matches the ---- listing delimiter
    let delim_re = Regex::new(r"^----+\s*$").unwrap();
    // Matches == Heading, === Subheading, etc.
    let heading_re = Regex::new(r"^(={2,6})\s+(.+)$").unwrap();

    let mut doc = ParsedDocument::new(path, "asciidoc");
    let mut cursor = MarkerCursor::default();

    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        // AsciiDoc single-line comments carry the grouping markers.
        if let Some(comment) = trimmed.strip_prefix("//") {
            if cursor.apply_marker(comment, &mut doc.metadata) {
                i += 1;
                continue;
            }
        }

        if let Some(caps) = heading_re.captures(line) {
            // == is level 1, === is level 2.
            let level = caps[1].len() - 1;
            let text = caps[2].trim().to_string();
            cursor.set_heading(&text);
            doc.headings.push(Heading {
                level,
                text,
                line: i + 1,
            });
            i += 1;
            continue;
        }

        if let Some(caps) = source_re.captures(line) {
            let tag = caps[1].trim().to_string();
            if !tags.iter().any(|t| *t == tag) {
                i += 1;
                continue;
            }

            let attributes = match caps.get(2) {
                Some(m) => {
                    let tokens = split_quoted(m.as_str(), Separator::Comma);
                    parse_attr_tokens(tokens.iter().map(String::as_str))
                }
                None => Default::default(),
            };

            let directive_line = i + 1;

            // Expect the ---- delimiter on the next line.
            i += 1;
            if i >= lines.len() {
                break;
            }
            if !delim_re.is_match(lines[i]) {
                continue;
            }

            i += 1;
            let mut body: Vec<&str> = Vec::new();
            while i < lines.len() && !delim_re.is_match(lines[i]) {
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
        }

        i += 1;
    }

    Ok(doc)
}
