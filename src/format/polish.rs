//! Final polish: comment spacing, a few idiomatic fixes, and an indentation
//! recompute using the same brace-depth discipline as the structural rebuild,
//! as a consistency check over whatever the earlier passes produced.

use super::lexer::{line_brace_delta, ScanState};

const INDENT: &str = "    ";

/// Small catalog of idiomatic spacing fixes. Applied only to lines without
/// quote characters, so literal content is never rewritten.
const POLISH_PATTERNS: &[(&str, &str)] = &[
    ("->{", "-> {"),
    ("( )", "()"),
    (" ();", "();"),
];

pub fn finish(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut state = ScanState::default();
    let mut depth: usize = 0;
    let mut last_blank = false;

    for line in text.lines() {
        // lines continuing a block comment or an open literal pass verbatim
        if state.in_literal_or_comment() {
            line_brace_delta(line, &mut state);
            out.push(line.trim_end().to_string());
            last_blank = false;
            continue;
        }

        let mut trimmed = line.trim().to_string();
        if trimmed.is_empty() {
            if !last_blank && !out.is_empty() {
                out.push(String::new());
                last_blank = true;
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("//") {
            if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('/') {
                trimmed = format!("// {rest}");
            }
        }
        if !trimmed.contains('"') && !trimmed.contains('\'') {
            for (from, to) in POLISH_PATTERNS {
                trimmed = trimmed.replace(from, to);
            }
        }

        let (opens, closes) = line_brace_delta(&trimmed, &mut state);
        if closes > opens {
            depth = depth.saturating_sub(1);
        }
        out.push(format!("{}{}", INDENT.repeat(depth), trimmed));
        if opens > closes {
            depth += 1;
        }
        last_blank = false;
    }

    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
