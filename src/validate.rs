//! Compilation-based validation of generated Java source.
//!
//! The candidate source is written under a unique per-request scratch
//! directory and handed to `javac`. The verdict is rendered as text: success
//! returns the source byte-for-byte unchanged; every failure mode prepends a
//! report above the original source so the user can still inspect the code.
//! Nothing here returns `Err` to the caller.

use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

/// Fixed first line of every compile-failure report.
pub const FAILURE_HEADER: &str = "// ===== compilation failed =====";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

#[derive(Debug)]
pub enum Rejection {
    /// No `public class` declaration was found in the candidate source.
    NoTypeDeclaration,
    /// No `javac` on PATH (a JRE without the JDK, or no Java at all).
    ToolchainMissing,
    /// The compiler ran and emitted diagnostics, in emission order.
    Diagnostics(Vec<Diagnostic>),
    /// Scratch I/O or process failure; wrapped rather than thrown.
    Internal(String),
}

#[derive(Debug)]
pub struct Validation {
    pub source: String,
    pub rejection: Option<Rejection>,
}

impl Validation {
    pub fn compiles(&self) -> bool {
        self.rejection.is_none()
    }

    /// Render the verdict: the unchanged source on success, otherwise a
    /// report above the original source.
    pub fn render(&self) -> String {
        match &self.rejection {
            None => self.source.clone(),
            Some(Rejection::NoTypeDeclaration) => format!(
                "// compilation failed: no public class declaration found\n\n{}",
                self.source
            ),
            Some(Rejection::ToolchainMissing) => format!(
                "// compilation failed: javac not found on PATH (a JDK is required)\n\n{}",
                self.source
            ),
            Some(Rejection::Internal(msg)) => {
                format!("// compilation error: {msg}\n\n{}", self.source)
            }
            Some(Rejection::Diagnostics(diagnostics)) => {
                let mut report = String::from(FAILURE_HEADER);
                report.push('\n');
                for d in diagnostics {
                    report.push_str(&format!("line {}: {}\n", d.line, d.message));
                }
                report.push('\n');
                report.push_str(&self.source);
                report
            }
        }
    }
}

/// Find the declared public type name: the identifier token immediately after
/// the first line beginning with `public class`.
pub fn extract_declared_type(source: &str) -> Option<&str> {
    for line in source.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("public class ") {
            let rest = rest.trim_start();
            let end = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(rest.len());
            if end > 0 {
                return Some(&rest[..end]);
            }
        }
    }
    None
}

/// Validate a candidate source, using the default scratch root.
pub fn validate(source: &str) -> Validation {
    validate_in(source, &std::env::temp_dir().join("sparkfx-check"))
}

/// Validate with an explicit scratch root. Each call compiles inside its own
/// uuid-named subdirectory, so two requests declaring the same class name
/// never race on the same file. The subdirectory is removed afterwards.
pub fn validate_in(source: &str, scratch_root: &Path) -> Validation {
    let Some(name) = extract_declared_type(source) else {
        return Validation {
            source: source.to_string(),
            rejection: Some(Rejection::NoTypeDeclaration),
        };
    };
    let name = name.to_string();

    let request_dir = scratch_root.join(uuid::Uuid::new_v4().simple().to_string());
    let result = compile_in(source, &name, &request_dir);
    let _ = fs::remove_dir_all(&request_dir);

    Validation {
        source: source.to_string(),
        rejection: result.err(),
    }
}

fn compile_in(source: &str, class_name: &str, dir: &Path) -> Result<(), Rejection> {
    fs::create_dir_all(dir).map_err(|e| Rejection::Internal(e.to_string()))?;
    let java_file = dir.join(format!("{class_name}.java"));
    fs::write(&java_file, source).map_err(|e| Rejection::Internal(e.to_string()))?;

    let output = Command::new("javac")
        .arg("-encoding")
        .arg("UTF-8")
        .arg("-d")
        .arg(dir)
        .arg(&java_file)
        .output()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Rejection::ToolchainMissing
            } else {
                Rejection::Internal(e.to_string())
            }
        })?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let diagnostics = parse_diagnostics(&stderr);
    if diagnostics.is_empty() {
        // javac failed without line-addressed output (bad flags, OOM, ...)
        return Err(Rejection::Internal(stderr.trim().to_string()));
    }
    Err(Rejection::Diagnostics(diagnostics))
}

/// Parse `Foo.java:12: error: ';' expected` lines from javac stderr, keeping
/// compiler emission order.
fn parse_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    let pattern = Regex::new(r"^.*\.java:(\d+):\s*(.+)$").expect("diagnostic pattern");
    stderr
        .lines()
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            let line_no = caps.get(1)?.as_str().parse().ok()?;
            Some(Diagnostic {
                line: line_no,
                message: caps.get(2)?.as_str().trim().to_string(),
            })
        })
        .collect()
}
