//! Prompt templates for JavaFX code generation.

/// System instruction sent with every request. The model is told to emit a
/// single complete compilation unit so the validator has something to chew on.
pub const SYSTEM_PROMPT: &str = "You are a JavaFX expert. \
Return only complete, directly compilable JavaFX code. \
The code must include all imports, a public class, and a main method. \
No explanations, no pseudo-code, no markdown.";

/// Wrap the user's UI description in the fixed instruction template.
pub fn build_prompt(description: &str) -> String {
    format!(
        "Generate JavaFX UI code for the following description:\n\n\
         UI requirements:\n{description}\n\n\
         Rules:\n\
         1. Use standard JavaFX controls\n\
         2. Keep the code structure clear\n\
         3. Return only code, no explanation\n"
    )
}
