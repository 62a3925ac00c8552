//! Command classification and Go code synthesis.
//!
//! A command body is collapsed to one logical line, classified as simple
//! (direct argv execution) or complex (shell indirection), and rendered
//! from a structured scaffold. Wrapper order is fixed: base scaffold,
//! exit-code assertion, retry loop, deadline scope outermost. The
//! deadline bounds all retry attempts collectively.

use crate::config::CommandsSection;

/// How the generated code invokes the command.
#[derive(Debug, Clone, PartialEq)]
enum Invocation {
    /// Direct execution with a tokenized argument vector.
    Simple(Vec<String>),
    /// Shell indirection: shell path, shell flag, whole command string.
    Shell {
        shell: String,
        flag: String,
        command: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Retry {
    count: u32,
    interval: String,
}

/// Structured representation of one step's generated code, rendered to
/// text exactly once.
#[derive(Debug, Clone, PartialEq)]
struct Scaffold {
    invocation: Invocation,
    expected_exit: i32,
    retry: Option<Retry>,
    timeout: Option<String>,
    skip_on_failure: bool,
}

/// Synthesize the Go code fragment for a command with its resolved
/// attributes. Returns an empty fragment for an empty command.
pub fn synthesize(
    command: &str,
    expected_exit: i32,
    timeout: &str,
    retry_count: u32,
    retry_interval: &str,
    skip_on_failure: bool,
    commands: &CommandsSection,
) -> String {
    let command = join_lines(command);
    if command.is_empty() {
        return String::new();
    }

    let invocation = if is_complex(&command) {
        Invocation::Shell {
            shell: commands.shell.clone(),
            flag: commands.shell_flag.clone(),
            command,
        }
    } else {
        Invocation::Simple(shell_split(&command))
    };

    let scaffold = Scaffold {
        invocation,
        expected_exit,
        retry: (retry_count > 0).then(|| Retry {
            count: retry_count,
            interval: retry_interval.to_string(),
        }),
        timeout: effective_timeout(timeout),
        skip_on_failure,
    };

    scaffold.render()
}

/// Join non-blank lines with `&&`: every line must succeed in sequence
/// for the step to succeed.
fn join_lines(command: &str) -> String {
    let lines: Vec<&str> = command
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines.join(" && ")
}

/// A command is complex when it needs shell interpretation.
fn is_complex(command: &str) -> bool {
    const METACHARS: &[&str] = &["|", "&&", "||", ";", ">", "<", ">>", "$(", "`", "&"];
    METACHARS.iter().any(|c| command.contains(c))
}

/// The zero-duration sentinel disables the deadline scope.
fn effective_timeout(timeout: &str) -> Option<String> {
    match timeout {
        "" | "0" | "0s" => None,
        t => Some(t.to_string()),
    }
}

/// Split a command into arguments on whitespace, respecting single and
/// double quotes (quote characters are dropped).
fn shell_split(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in command.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == ' ' || c == '\t' {
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

/// Quote a string as a Go string literal.
pub(crate) fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Invocation {
    /// The `cmd := ...` line. Cancellable form when a deadline is active.
    fn render(&self, cancellable: bool) -> String {
        let (func, ctx_arg) = if cancellable {
            ("exec.CommandContext", "ctx, ")
        } else {
            ("exec.Command", "")
        };
        match self {
            Invocation::Simple(args) => {
                let quoted: Vec<String> = args.iter().map(|a| go_quote(a)).collect();
                format!("cmd := {func}({ctx_arg}{})", quoted.join(", "))
            }
            Invocation::Shell {
                shell,
                flag,
                command,
            } => format!(
                "cmd := {func}({ctx_arg}{}, {}, {})",
                go_quote(shell),
                go_quote(flag),
                go_quote(command)
            ),
        }
    }
}

impl Scaffold {
    /// Render the scaffold to Go source. Inner lines are tab-indented
    /// relative to the fragment root; the template indents the whole
    /// fragment into its surrounding block.
    fn render(&self) -> String {
        let cancellable = self.timeout.is_some();
        let mut lines: Vec<String> = Vec::new();

        if let Some(timeout) = &self.timeout {
            lines.push(format!(
                "dur, err := time.ParseDuration({})",
                go_quote(timeout)
            ));
            lines.push("Expect(err).ToNot(HaveOccurred())".to_string());
            lines.push("ctx, cancel := context.WithTimeout(context.Background(), dur)".to_string());
            lines.push("defer cancel()".to_string());
        }

        match &self.retry {
            None => {
                lines.push(self.invocation.render(cancellable));
                lines.push("output, err := cmd.CombinedOutput()".to_string());
                lines.extend(self.assertion("err", "output"));
            }
            Some(retry) => {
                let attempts = retry.count + 1;
                lines.push("var lastOutput []byte".to_string());
                lines.push("var lastErr error".to_string());
                lines.push(format!(
                    "for attempt := 1; attempt <= {attempts}; attempt++ {{"
                ));
                lines.push(format!("\t{}", self.invocation.render(cancellable)));
                lines.push("\tlastOutput, lastErr = cmd.CombinedOutput()".to_string());
                lines.push("\tif lastErr == nil {".to_string());
                lines.push("\t\tbreak".to_string());
                lines.push("\t}".to_string());
                lines.push(format!("\tif attempt < {attempts} {{"));
                for sleep_line in sleep_lines(&retry.interval) {
                    lines.push(format!("\t\t{sleep_line}"));
                }
                lines.push("\t}".to_string());
                lines.push("}".to_string());
                lines.extend(self.assertion("lastErr", "lastOutput"));
            }
        }

        lines.join("\n")
    }

    /// The final assertion. With a non-zero expected exit code the plain
    /// "no error" assertion becomes a conditional on the process exit.
    /// A skip-on-failure step logs instead of failing the test.
    fn assertion(&self, err_var: &str, out_var: &str) -> Vec<String> {
        if self.skip_on_failure {
            return vec![
                format!("if {err_var} != nil {{"),
                format!(
                    "\tGinkgoWriter.Printf(\"step failed (ignored): %v\\n%s\\n\", {err_var}, string({out_var}))"
                ),
                "}".to_string(),
            ];
        }
        if self.expected_exit == 0 {
            return vec![format!(
                "Expect({err_var}).ToNot(HaveOccurred(), string({out_var}))"
            )];
        }
        vec![
            format!("if exitErr, ok := {err_var}.(*exec.ExitError); ok {{"),
            format!(
                "\tExpect(exitErr.ExitCode()).To(Equal({}), string({out_var}))",
                self.expected_exit
            ),
            "} else {".to_string(),
            format!("\tExpect({err_var}).ToNot(HaveOccurred(), string({out_var}))"),
            "}".to_string(),
        ]
    }
}

/// The sleep between failed attempts. Recognized duration literals render
/// as a constant expression; anything else defers to a runtime
/// `time.ParseDuration`, so an unparsable literal never fails synthesis.
fn sleep_lines(interval: &str) -> Vec<String> {
    match parse_go_duration(interval) {
        Some(expr) => vec![format!("time.Sleep({expr})")],
        None => vec![
            format!("sleepDur, _ := time.ParseDuration({})", go_quote(interval)),
            "time.Sleep(sleepDur)".to_string(),
        ],
    }
}

/// Parse a simple `<n><unit>` duration literal into a Go duration
/// expression. Returns None for anything more exotic.
fn parse_go_duration(literal: &str) -> Option<String> {
    let literal = literal.trim();
    let split = literal.find(|c: char| !c.is_ascii_digit())?;
    let (number, unit) = literal.split_at(split);
    if number.is_empty() {
        return None;
    }
    let unit = match unit {
        "ms" => "time.Millisecond",
        "s" => "time.Second",
        "m" => "time.Minute",
        "h" => "time.Hour",
        _ => return None,
    };
    Some(format!("{number} * {unit}"))
}
