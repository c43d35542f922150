//! First normalizer passes: scrubbing and encoding recovery.
//!
//! Generator output arrives with control characters, markdown fences, leading
//! "null" tokens, and occasionally text that was decoded through the wrong
//! code page. The reinterpretation attempts here are best-effort and lossy by
//! nature: there is no correctness criterion for guessing the right legacy
//! encoding, so each attempt is kept only when it round-trips to valid UTF-8
//! and the original is kept otherwise.

use encoding_rs::{Encoding, GB18030, GBK, WINDOWS_1252};
use regex::Regex;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:java)?").expect("fence pattern"))
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank run pattern"))
}

fn space_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("space run pattern"))
}

fn question_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\?{3,}").expect("question run pattern"))
}

fn keep_char(c: char) -> bool {
    if c == '\n' || c == '\r' || c == '\t' {
        return true;
    }
    if c.is_control() {
        return false;
    }
    // BOM, replacement character, private use area
    !matches!(c, '\u{FEFF}' | '\u{FFFD}' | '\u{E000}'..='\u{F8FF}')
}

/// Strip markdown code-fence delimiters.
pub fn strip_fences(text: &str) -> String {
    fence_re().replace_all(text, "").to_string()
}

/// Pass 1: drop junk characters, fences, and leading "null" tokens; collapse
/// blank-line runs; attempt a latin-1 → UTF-8 reinterpretation.
pub fn scrub(text: &str) -> String {
    let code: String = text.chars().filter(|&c| keep_char(c)).collect();
    let code = strip_fences(&code);

    let mut trimmed = code.trim();
    while let Some(rest) = trimmed.strip_prefix("null") {
        trimmed = rest.trim_start();
    }

    let mut code = blank_run_re().replace_all(trimmed, "\n\n").to_string();
    if let Some(recovered) = latin1_roundtrip(&code) {
        code = recovered;
    }
    code
}

/// Text that was UTF-8 but got decoded as latin-1 shows up as runs of
/// characters in U+0080..U+00FF. Re-encode those code points as single bytes
/// and try decoding the result as UTF-8; keep the original unless the attempt
/// yields strictly valid UTF-8.
fn latin1_roundtrip(text: &str) -> Option<String> {
    if text.is_ascii() || text.chars().any(|c| c as u32 > 0xFF) {
        return None;
    }
    let bytes: Vec<u8> = text.chars().map(|c| c as u8).collect();
    let recovered = String::from_utf8(bytes).ok()?;
    (recovered != text).then_some(recovered)
}

/// Pass 2: garbled-marker repair. Only runs when a placeholder run ("???" or
/// U+FFFD) is present. Tries a fixed ordered list of legacy code pages and
/// accepts the first reinterpretation that survives as valid UTF-8, then
/// deletes residual placeholder runs and collapses redundant whitespace.
pub fn repair_mojibake(text: &str) -> String {
    if !has_placeholder_run(text) {
        return text.to_string();
    }

    let mut code = text.to_string();
    const CANDIDATES: &[&Encoding] = &[GBK, GB18030, WINDOWS_1252];
    for encoding in CANDIDATES {
        if let Some(recovered) = reinterpret(&code, encoding) {
            code = recovered;
            break;
        }
    }

    let code = question_run_re().replace_all(&code, "").to_string();
    let code = code.replace('\u{FFFD}', "");
    space_run_re().replace_all(&code, " ").to_string()
}

fn has_placeholder_run(text: &str) -> bool {
    text.contains("???") || text.contains('\u{FFFD}')
}

fn reinterpret(text: &str, encoding: &'static Encoding) -> Option<String> {
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        return None;
    }
    let recovered = String::from_utf8(bytes.into_owned()).ok()?;
    (recovered != text && !recovered.contains('\u{FFFD}')).then_some(recovered)
}
