//! Rendering of test specs into Go source files.
//!
//! Templates are minijinja. The built-in `ginkgo_default` template is
//! compiled into the binary; additional `.tmpl` files can be loaded from
//! the configured template directory and selected per spec through the
//! `template` block attribute.

use log::debug;
use minijinja::{Environment, context};
use std::path::Path;

use crate::config::{OutputSection, TemplatesSection};
use crate::converter::command::go_quote;
use crate::domain::TestSpec;
use crate::error::{Phase, WeaveError};

const DEFAULT_TEMPLATE_NAME: &str = "ginkgo_default";
const DEFAULT_TEMPLATE: &str = include_str!("../templates/ginkgo_default.tmpl");

pub struct TemplateEngine {
    env: Environment<'static>,
    default_template: String,
    allow_override: bool,
}

impl TemplateEngine {
    /// Build an engine with the embedded default template plus any `.tmpl`
    /// files found in the configured directory.
    pub fn new(templates: &TemplatesSection) -> Result<Self, WeaveError> {
        let mut env = Environment::new();
        env.add_filter("go_quote", filter_go_quote);
        env.add_filter("go_quote_list", filter_go_quote_list);
        env.add_filter("tabs", filter_tabs);

        env.add_template(DEFAULT_TEMPLATE_NAME, DEFAULT_TEMPLATE)
            .map_err(|e| {
                WeaveError::new(Phase::Template, "", 0, "invalid built-in template").with_cause(e)
            })?;

        let dir = Path::new(&templates.directory);
        if dir.is_dir() {
            load_directory(&mut env, dir)?;
        } else if !templates.directory.is_empty() {
            debug!("template directory {} not found", dir.display());
        }

        Ok(Self {
            env,
            default_template: templates.default.clone(),
            allow_override: templates.allow_override,
        })
    }

    /// Render one output file from a group of specs.
    ///
    /// All specs in a group share a describe label by construction; the
    /// first spec's template override (when overrides are allowed) selects
    /// the template for the whole file.
    pub fn render(&self, specs: &[TestSpec], output: &OutputSection) -> Result<String, WeaveError> {
        let Some(first) = specs.first() else {
            return Err(WeaveError::new(Phase::Template, "", 0, "no specs to render"));
        };

        let name = specs
            .iter()
            .map(|s| s.template_name.as_str())
            .find(|n| self.allow_override && !n.is_empty())
            .unwrap_or(&self.default_template);

        let template = self.env.get_template(name).map_err(|e| {
            WeaveError::new(
                Phase::Template,
                &first.source_file,
                0,
                format!("template {name:?} not found"),
            )
            .with_cause(e)
        })?;

        let mut sources: Vec<String> = Vec::new();
        for spec in specs {
            let display = spec.source_file.display().to_string();
            if !sources.contains(&display) {
                sources.push(display);
            }
        }

        let needs = |fragment: &str| {
            specs
                .iter()
                .flat_map(|s| &s.steps)
                .any(|step| step.code.contains(fragment))
        };

        template
            .render(context! {
                package_name => output.package_name,
                build_tag => output.build_tag,
                sources => sources,
                describe => first.describe_block,
                specs => specs,
                needs_context => needs("context."),
                needs_time => needs("time."),
            })
            .map_err(|e| {
                WeaveError::new(
                    Phase::Template,
                    &first.source_file,
                    0,
                    format!("failed to render template {name:?}"),
                )
                .with_cause(e)
            })
    }
}

fn load_directory(env: &mut Environment<'static>, dir: &Path) -> Result<(), WeaveError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        WeaveError::new(Phase::Template, dir, 0, "failed to read template directory").with_cause(e)
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tmpl") {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let source = std::fs::read_to_string(&path).map_err(|e| {
            WeaveError::new(Phase::Template, &path, 0, "failed to read template").with_cause(e)
        })?;
        debug!("loaded template {stem} from {}", path.display());
        env.add_template_owned(stem, source).map_err(|e| {
            WeaveError::new(Phase::Template, &path, 0, "invalid template").with_cause(e)
        })?;
    }
    Ok(())
}

fn filter_go_quote(value: String) -> String {
    go_quote(&value)
}

fn filter_go_quote_list(values: Vec<String>) -> String {
    values
        .iter()
        .map(|v| go_quote(v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Indent every non-empty line with `depth` tabs.
fn filter_tabs(value: String, depth: usize) -> String {
    let prefix = "\t".repeat(depth);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::TestStep;
    use std::path::PathBuf;

    fn step(name: &str, code: &str) -> TestStep {
        TestStep {
            name: name.to_string(),
            command: String::new(),
            code: code.to_string(),
            expected_exit: 0,
            timeout: "30s".to_string(),
            line_number: 1,
            skip_on_failure: false,
            retry_count: 0,
            retry_interval: "2s".to_string(),
        }
    }

    fn spec(test_name: &str, steps: Vec<TestStep>) -> TestSpec {
        TestSpec {
            source_file: PathBuf::from("docs/install.md"),
            source_type: "markdown".to_string(),
            test_name: test_name.to_string(),
            describe_block: "Install Guide".to_string(),
            context_block: String::new(),
            steps,
            template_name: String::new(),
            test_group: String::new(),
            labels: vec!["documentation".to_string()],
        }
    }

    fn engine() -> TemplateEngine {
        TemplateEngine::new(&Config::default().templates).unwrap()
    }

    #[test]
    fn renders_package_describe_and_steps() {
        let specs = vec![spec(
            "install",
            vec![step("kubectl apply", "cmd := exec.Command(\"kubectl\", \"apply\")")],
        )];
        let out = engine().render(&specs, &Config::default().output).unwrap();

        assert!(out.contains("// Code generated by docweave from docs/install.md. DO NOT EDIT."));
        assert!(out.contains("package e2e_generated"));
        assert!(out.contains("var _ = Describe(\"Install Guide\", func() {"));
        assert!(out.contains("It(\"install\", Label(\"documentation\"), func() {"));
        assert!(out.contains("\t\tBy(\"kubectl apply\")"));
        assert!(out.contains("\t\tcmd := exec.Command(\"kubectl\", \"apply\")"));
        assert!(out.contains("\"os/exec\""));
        assert!(out.contains(". \"github.com/onsi/ginkgo/v2\""));
        assert!(out.contains(". \"github.com/onsi/gomega\""));
    }

    #[test]
    fn conditional_imports_follow_step_code() {
        let plain = vec![spec("t", vec![step("s", "cmd := exec.Command(\"true\")")])];
        let out = engine().render(&plain, &Config::default().output).unwrap();
        assert!(!out.contains("\"context\""));
        assert!(!out.contains("\"time\""));

        let timed = vec![spec(
            "t",
            vec![step(
                "s",
                "ctx, cancel := context.WithTimeout(context.Background(), dur)\ntime.Sleep(2 * time.Second)",
            )],
        )];
        let out = engine().render(&timed, &Config::default().output).unwrap();
        assert!(out.contains("\t\"context\""));
        assert!(out.contains("\t\"time\""));
    }

    #[test]
    fn context_block_wraps_the_it() {
        let mut s = spec("verify", vec![step("check", "cmd := exec.Command(\"true\")")]);
        s.context_block = "Verification".to_string();
        let out = engine().render(&[s], &Config::default().output).unwrap();
        assert!(out.contains("\tContext(\"Verification\", func() {"));
        assert!(out.contains("\t\tIt(\"verify\", Label(\"documentation\"), func() {"));
        assert!(out.contains("\t\t\tBy(\"check\")"));
    }

    #[test]
    fn build_tag_is_emitted_first() {
        let mut output = Config::default().output;
        output.build_tag = "e2e".to_string();
        let out = engine()
            .render(&[spec("t", vec![step("s", "x := 1")])], &output)
            .unwrap();
        assert!(out.starts_with("//go:build e2e\n"));
        // One blank line between the tag and the generated-code header.
        assert!(out.starts_with("//go:build e2e\n\n// Code generated"));
    }

    #[test]
    fn no_build_tag_starts_with_the_header() {
        let out = engine()
            .render(&[spec("t", vec![step("s", "x := 1")])], &Config::default().output)
            .unwrap();
        assert!(out.starts_with("// Code generated"));
    }

    #[test]
    fn multiple_specs_share_one_describe() {
        let specs = vec![
            spec("setup", vec![step("a", "x := 1")]),
            spec("verify", vec![step("b", "y := 2")]),
        ];
        let out = engine().render(&specs, &Config::default().output).unwrap();
        assert_eq!(out.matches("var _ = Describe(").count(), 1);
        assert!(out.contains("It(\"setup\""));
        assert!(out.contains("It(\"verify\""));
    }

    #[test]
    fn override_selects_a_directory_template() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("minimal.tmpl"),
            "package {{ package_name }} // {{ specs | length }} specs\n",
        )
        .unwrap();

        let mut templates = Config::default().templates;
        templates.directory = tmp.path().to_string_lossy().into_owned();
        let engine = TemplateEngine::new(&templates).unwrap();

        let mut s = spec("t", vec![step("s", "x := 1")]);
        s.template_name = "minimal".to_string();
        let out = engine.render(&[s], &Config::default().output).unwrap();
        assert_eq!(out, "package e2e_generated // 1 specs");
    }

    #[test]
    fn override_is_ignored_when_disallowed() {
        let mut templates = Config::default().templates;
        templates.allow_override = false;
        let engine = TemplateEngine::new(&templates).unwrap();

        let mut s = spec("t", vec![step("s", "x := 1")]);
        s.template_name = "minimal".to_string();
        let out = engine.render(&[s], &Config::default().output).unwrap();
        assert!(out.contains("var _ = Describe("));
    }

    #[test]
    fn missing_template_is_a_template_error() {
        let mut s = spec("t", vec![step("s", "x := 1")]);
        s.template_name = "nonexistent".to_string();
        let err = engine().render(&[s], &Config::default().output).unwrap_err();
        assert!(err.to_string().starts_with("[template]"));
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn empty_spec_list_is_rejected() {
        let err = engine().render(&[], &Config::default().output).unwrap_err();
        assert!(err.to_string().contains("no specs"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let specs = vec![spec("t", vec![step("s", "x := 1")])];
        let a = engine().render(&specs, &Config::default().output).unwrap();
        let b = engine().render(&specs, &Config::default().output).unwrap();
        assert_eq!(a, b);
    }
}
