//! Conversion of parsed documents into renderable test specifications.
//!
//! Blocks are screened against the security blocklist, grouped two ways
//! (test group, then step group, both in first-occurrence order), and
//! each block becomes a `TestStep` with its attributes resolved through
//! the configured alias tables and its Go fragment synthesized.

pub(crate) mod command;
mod security;

use indexmap::IndexMap;

use crate::config::Config;
use crate::domain::{CodeBlock, ParsedDocument, TestSpec, TestStep};
use crate::error::{Phase, WeaveError};

/// Convert one parsed document into test specs.
///
/// A blocked command aborts the whole document: no partial spec list is
/// ever returned.
pub fn convert(doc: &ParsedDocument, config: &Config) -> Result<Vec<TestSpec>, WeaveError> {
    for block in &doc.blocks {
        if let Some(pattern) =
            security::blocked_pattern(&block.content, &config.commands.blocked_patterns)
        {
            return Err(WeaveError::new(
                Phase::Convert,
                &doc.file_path,
                block.line_number,
                format!("command contains blocked pattern {pattern:?}"),
            ));
        }
    }

    let stem = file_stem(doc);

    // Two-level grouping, both levels in first-occurrence order.
    let mut groups: IndexMap<&str, IndexMap<&str, Vec<&CodeBlock>>> = IndexMap::new();
    for block in &doc.blocks {
        if block.content.trim().is_empty() {
            continue;
        }
        groups
            .entry(block.test_group.as_str())
            .or_default()
            .entry(block.step_group.as_str())
            .or_default()
            .push(block);
    }

    let mut specs = Vec::new();
    for (test_group, step_groups) in &groups {
        for (step_group, blocks) in step_groups {
            let test_name = if !step_group.is_empty() {
                step_group.to_string()
            } else if !test_group.is_empty() {
                test_group.to_string()
            } else {
                stem.clone()
            };

            let describe_block = if !test_group.is_empty() {
                test_group.to_string()
            } else {
                describe_label(doc, &stem)
            };

            let context_block = doc
                .headings
                .iter()
                .find(|h| h.level == 2)
                .map(|h| h.text.clone())
                .unwrap_or_default();

            let steps: Vec<TestStep> = blocks
                .iter()
                .enumerate()
                .map(|(i, block)| block_to_step(block, i, config))
                .collect();

            specs.push(TestSpec {
                source_file: doc.file_path.clone(),
                source_type: doc.file_type.clone(),
                test_name,
                describe_block: describe_block.clone(),
                context_block,
                steps,
                template_name: template_override(blocks, config),
                test_group: test_group.to_string(),
                labels: build_labels(&config.output.default_labels, &describe_block),
            });
        }
    }

    Ok(specs)
}

fn file_stem(doc: &ParsedDocument) -> String {
    doc.file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Describe label for ungrouped specs: first level-1 heading, else the
/// first heading of any level, else the filename stem.
fn describe_label(doc: &ParsedDocument, stem: &str) -> String {
    doc.headings
        .iter()
        .find(|h| h.level == 1)
        .or_else(|| doc.headings.first())
        .map(|h| h.text.clone())
        .unwrap_or_else(|| stem.to_string())
}

/// First `template` attribute found scanning the group's blocks in order.
fn template_override(blocks: &[&CodeBlock], config: &Config) -> String {
    let aliases = config.tags.aliases("template");
    blocks
        .iter()
        .find_map(|b| resolve(&b.attributes, aliases))
        .unwrap_or_default()
        .to_string()
}

/// Configured default labels plus the describe name, deduplicated.
fn build_labels(defaults: &[String], describe: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in defaults.iter().map(String::as_str).chain([describe]) {
        if !label.is_empty() && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

fn block_to_step(block: &CodeBlock, index: usize, config: &Config) -> TestStep {
    let tags = &config.tags;
    let commands = &config.commands;

    let name = resolve(&block.attributes, tags.aliases("step_name"))
        .map(str::to_string)
        .unwrap_or_else(|| auto_step_name(&block.content, index));

    let expected_exit = resolve(&block.attributes, tags.aliases("expected_exit_code"))
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(commands.default_expected_exit_code);

    let timeout = resolve(&block.attributes, tags.aliases("timeout"))
        .unwrap_or(&commands.default_timeout)
        .to_string();

    let skip_on_failure = resolve(&block.attributes, tags.aliases("skip_on_failure"))
        .is_some_and(|v| matches!(v, "true" | "yes"));

    let retry_count = resolve(&block.attributes, tags.aliases("retry"))
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);

    let retry_interval = resolve(&block.attributes, tags.aliases("retry_interval"))
        .unwrap_or("2s")
        .to_string();

    let code = command::synthesize(
        &block.content,
        expected_exit,
        &timeout,
        retry_count,
        &retry_interval,
        skip_on_failure,
        commands,
    );

    TestStep {
        name,
        command: block.content.clone(),
        code,
        expected_exit,
        timeout,
        line_number: block.line_number,
        skip_on_failure,
        retry_count,
        retry_interval,
    }
}

/// First-match lookup over an ordered alias list.
fn resolve<'a>(
    attributes: &'a IndexMap<String, String>,
    aliases: &[String],
) -> Option<&'a str> {
    aliases
        .iter()
        .find_map(|key| attributes.get(key))
        .map(String::as_str)
}

/// Derive a readable step name from the command itself.
fn auto_step_name(command: &str, index: usize) -> String {
    let first_line = command.lines().map(str::trim).find(|l| !l.is_empty());
    let Some(line) = first_line else {
        return format!("Step {}", index + 1);
    };

    let mut words = line.split_whitespace();
    if let Some(head) = words.next() {
        match head {
            "kubectl" | "helm" | "docker" => {
                if let Some(verb) = words.next() {
                    return format!("{head} {verb}");
                }
            }
            "curl" => return "curl request".to_string(),
            _ => {}
        }
    }

    if line.chars().count() > 50 {
        line.chars().take(50).collect()
    } else {
        line.to_string()
    }
}
