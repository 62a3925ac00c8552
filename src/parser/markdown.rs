//! Markdown extractor built on pulldown-cmark's event stream.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::path::Path;

use super::{MarkerCursor, Separator, line_number, parse_attr_tokens, split_quoted};
use crate::domain::{CodeBlock, Heading, ParsedDocument};
use crate::error::WeaveError;

/// Parse a Markdown document, extracting tagged fenced code blocks and
/// headings. Grouping markers are HTML comments (`<!-- test-start: ... -->`).
pub fn parse(path: &Path, content: &str, tags: &[String]) -> Result<ParsedDocument, WeaveError> {
    let mut doc = ParsedDocument::new(path, "markdown");
    let mut cursor = MarkerCursor::default();

    // In-flight state for the current heading / captured code block.
    let mut open_heading: Option<(usize, usize, String)> = None;
    let mut open_block: Option<CodeBlock> = None;

    let parser = Parser::new_ext(content, Options::empty());
    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                open_heading = Some((level as usize, line_number(content, range.start), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, line, text)) = open_heading.take() {
                    cursor.set_heading(&text);
                    doc.headings.push(Heading { level, text, line });
                }
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let tokens = split_quoted(&info, Separator::Whitespace);
                let Some(tag) = tokens.first() else { continue };
                if !tags.iter().any(|t| t == tag) {
                    continue;
                }
                let attributes = parse_attr_tokens(tokens[1..].iter().map(String::as_str));
                open_block = Some(CodeBlock {
                    tag: tag.clone(),
                    content: String::new(),
                    // Content starts on the line after the opening fence.
                    line_number: line_number(content, range.start) + 1,
                    attributes,
                    context: cursor.heading.clone(),
                    test_group: cursor.test_group.clone(),
                    step_group: cursor.step_group.clone(),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(mut block) = open_block.take() {
                    block.content = block.content.trim_end_matches('\n').to_string();
                    doc.blocks.push(block);
                }
            }
            Event::Text(text) => {
                if let Some(block) = open_block.as_mut() {
                    block.content.push_str(&text);
                } else if let Some((_, _, buf)) = open_heading.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::Code(text) => {
                if let Some((_, _, buf)) = open_heading.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::Html(html) => {
                for line in html.lines() {
                    if let Some(comment) = strip_html_comment(line) {
                        cursor.apply_marker(comment, &mut doc.metadata);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(doc)
}

/// Returns the body of an HTML comment line, or None.
fn strip_html_comment(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
}
