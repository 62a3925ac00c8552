//! Pipeline orchestration: scan, parse, convert, render, write.

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::converter;
use crate::domain::TestSpec;
use crate::error::{Phase, WeaveError};
use crate::parser::{self, DocumentFormat};
use crate::scanner;
use crate::template::TemplateEngine;

const SUITE_FILENAME: &str = "suite_test.go";

/// Counters and outputs of one generator run.
#[derive(Debug, Default)]
pub struct Summary {
    pub files_scanned: usize,
    pub documents_parsed: usize,
    pub specs: usize,
    pub files_written: Vec<PathBuf>,
}

pub struct Generator {
    config: Config,
    engine: TemplateEngine,
}

impl Generator {
    pub fn new(config: Config) -> Result<Self, WeaveError> {
        config.validate()?;
        let engine = TemplateEngine::new(&config.templates)?;
        Ok(Self { config, engine })
    }

    /// Run the full pipeline.
    ///
    /// Unreadable or unparsable documents are skipped with a warning; a
    /// security rejection aborts the whole run. In dry-run mode nothing
    /// is cleaned or written.
    pub fn run(&self) -> Result<Summary, WeaveError> {
        let config = &self.config;
        let mut summary = Summary::default();

        let files = scanner::scan(&config.input)?;
        summary.files_scanned = files.len();
        info!("found {} documentation file(s)", files.len());

        let mut specs: Vec<TestSpec> = Vec::new();
        for path in &files {
            let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(DocumentFormat::for_extension)
            else {
                debug!("skipping {} (unsupported extension)", path.display());
                continue;
            };

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    continue;
                }
            };

            let doc = match parser::parse_document(
                format,
                path,
                &content,
                &config.tags.step_tags,
                &config.plaintext_patterns,
            ) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("skipping document: {e}");
                    continue;
                }
            };
            if doc.blocks.is_empty() {
                debug!("no tagged blocks in {}", path.display());
                continue;
            }
            summary.documents_parsed += 1;

            specs.extend(converter::convert(&doc, config)?);
        }
        summary.specs = specs.len();
        info!("converted {} test spec(s)", specs.len());

        if specs.is_empty() {
            return Ok(summary);
        }

        let out_dir = Path::new(&config.output.directory);
        if !config.dry_run {
            if config.output.clean_before_generate {
                self.clean(out_dir)?;
            }
            std::fs::create_dir_all(out_dir).map_err(|e| {
                WeaveError::new(Phase::Write, out_dir, 0, "failed to create output directory")
                    .with_cause(e)
            })?;
        }

        for (name, group) in group_specs(&specs) {
            let path = out_dir.join(format!(
                "{}{}{}",
                config.output.file_prefix, name, config.output.file_suffix
            ));
            let mut rendered = self.engine.render(&group, &config.output)?;
            if !rendered.ends_with('\n') {
                rendered.push('\n');
            }

            if config.dry_run {
                info!("dry run: would write {}", path.display());
                continue;
            }
            std::fs::write(&path, rendered).map_err(|e| {
                WeaveError::new(Phase::Write, &path, 0, "failed to write test file").with_cause(e)
            })?;
            info!("wrote {}", path.display());
            summary.files_written.push(path);
        }

        if !config.dry_run {
            self.write_suite(out_dir, &mut summary)?;
        }

        Ok(summary)
    }

    /// Remove previously generated test files, keeping the suite bootstrap.
    fn clean(&self, out_dir: &Path) -> Result<(), WeaveError> {
        let Ok(entries) = std::fs::read_dir(out_dir) else {
            return Ok(());
        };
        let output = &self.config.output;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == SUITE_FILENAME
                || !name.starts_with(&output.file_prefix)
                || !name.ends_with(&output.file_suffix)
            {
                continue;
            }
            std::fs::remove_file(&path).map_err(|e| {
                WeaveError::new(Phase::Write, &path, 0, "failed to remove stale file").with_cause(e)
            })?;
            debug!("removed stale {}", path.display());
        }
        Ok(())
    }

    /// Emit the suite bootstrap once; an existing file is never touched.
    fn write_suite(&self, out_dir: &Path, summary: &mut Summary) -> Result<(), WeaveError> {
        let path = out_dir.join(SUITE_FILENAME);
        if path.exists() {
            return Ok(());
        }
        let output = &self.config.output;
        let build_tag = if output.build_tag.is_empty() {
            String::new()
        } else {
            format!("//go:build {}\n\n", output.build_tag)
        };
        let content = format!(
            "{build_tag}// Code generated by docweave. DO NOT EDIT.\n\n\
             package {}\n\n\
             import (\n\t\"testing\"\n\n\
             \t. \"github.com/onsi/ginkgo/v2\"\n\
             \t. \"github.com/onsi/gomega\"\n)\n\n\
             func TestE2E(t *testing.T) {{\n\
             \tRegisterFailHandler(Fail)\n\
             \tRunSpecs(t, \"Generated E2E Suite\")\n}}\n",
            output.package_name
        );
        std::fs::write(&path, content).map_err(|e| {
            WeaveError::new(Phase::Write, &path, 0, "failed to write suite file").with_cause(e)
        })?;
        info!("wrote {}", path.display());
        summary.files_written.push(path);
        Ok(())
    }
}

/// Group specs by output key: the test group when set, else the source
/// file. Both levels keep first-occurrence order; colliding filenames get
/// a numeric suffix.
fn group_specs(specs: &[TestSpec]) -> IndexMap<String, Vec<TestSpec>> {
    let mut by_key: IndexMap<String, Vec<&TestSpec>> = IndexMap::new();
    for spec in specs {
        let key = if spec.test_group.is_empty() {
            format!("file:{}", spec.source_file.display())
        } else {
            format!("group:{}", spec.test_group)
        };
        by_key.entry(key).or_default().push(spec);
    }

    let mut named: IndexMap<String, Vec<TestSpec>> = IndexMap::new();
    for (_, group) in by_key {
        let first = group[0];
        let base = if first.test_group.is_empty() {
            sanitize_name(
                &first
                    .source_file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "document".to_string()),
            )
        } else {
            sanitize_name(&first.test_group)
        };

        let mut name = base.clone();
        let mut n = 2;
        while named.contains_key(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        named.insert(name, group.into_iter().cloned().collect());
    }
    named
}

/// Turn a test group name into a filename component: lowercase, spaces
/// and hyphens become underscores, everything else non-alphanumeric is
/// dropped, runs of underscores collapse.
fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = match c {
            ' ' | '-' | '_' => '_',
            c if c.is_ascii_alphanumeric() => c,
            _ => continue,
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
