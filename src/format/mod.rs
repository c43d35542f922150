//! Best-effort source normalizer for generator output.
//!
//! A deterministic sequence of repair passes turning encoding-corrupted,
//! spacing-mangled, unindented text into readable JavaFX source. Later passes
//! assume earlier passes already ran. No pass may fail: a pass that cannot
//! improve the text leaves it unchanged, and the worst case over malformed
//! input is imperfect indentation, never lost code.

pub mod cleanup;
pub mod emit;
pub mod lexer;
pub mod polish;
pub mod repair;

/// Run the full pass pipeline. Non-empty input always yields non-empty
/// readable output.
pub fn normalize(source: &str) -> String {
    if source.trim().is_empty() {
        return "// no code was generated".to_string();
    }
    let text = cleanup::scrub(source);
    let text = cleanup::repair_mojibake(&text);
    // input that was nothing but fences/null tokens/junk characters
    if text.trim().is_empty() {
        return "// no code was generated".to_string();
    }
    let text = repair::apply_known_patterns(&text);
    let text = repair::space_keywords(&text);
    let text = emit::rebuild(&text);
    polish::finish(&text)
}
