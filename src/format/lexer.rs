//! Tolerant Java token scanner used by the normalizer.
//!
//! The generator's output is frequently mangled, so this lexer never fails:
//! unterminated string and character literals end at the line break, unknown
//! characters become one-character operator tokens, and comments are kept as
//! single tokens (block comments may span lines). Structure passes work on
//! these tokens so that literal and comment content never leaks into spacing
//! or indentation decisions.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Keyword or identifier.
    Word(String),
    Number(String),
    /// String literal including the surrounding quotes.
    Str(String),
    /// Character literal including the surrounding quotes.
    CharLit(String),
    /// Line comment including the `//` marker, without the newline.
    LineComment(String),
    /// Block comment including delimiters; may contain newlines.
    BlockComment(String),
    Op(String),
    Punct(char),
    Newline,
}

const MULTI_OPS: &[&str] = &[
    "<<=", ">>=", "->", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<", ">>",
];

const SINGLE_OPS: &str = "=+-*/%<>!?:&|^~";

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub fn lex(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if c == '\n' {
            tokens.push(Token::Newline);
            i += 1;
            continue;
        }
        if c == ' ' || c == '\t' || c == '\r' {
            i += 1;
            continue;
        }

        if c == '/' && i + 1 < len {
            if chars[i + 1] == '/' {
                let start = i;
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
                tokens.push(Token::LineComment(chars[start..i].iter().collect()));
                continue;
            }
            if chars[i + 1] == '*' {
                let start = i;
                i += 2;
                while i < len && !(chars[i] == '*' && i + 1 < len && chars[i + 1] == '/') {
                    i += 1;
                }
                i = (i + 2).min(len);
                tokens.push(Token::BlockComment(chars[start..i].iter().collect()));
                continue;
            }
        }

        if c == '"' || c == '\'' {
            let start = i;
            i += 1;
            while i < len {
                if chars[i] == '\\' {
                    i = (i + 2).min(len);
                    continue;
                }
                if chars[i] == c {
                    i += 1;
                    break;
                }
                if chars[i] == '\n' {
                    // unterminated literal: end it at the line break
                    break;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(if c == '"' {
                Token::Str(text)
            } else {
                Token::CharLit(text)
            });
            continue;
        }

        if is_word_start(c) {
            let start = i;
            while i < len && is_word_char(chars[i]) {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            // fraction part, but only when a digit follows the dot
            if i + 1 < len && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < len && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
            continue;
        }

        if "()[]{};,.@".contains(c) {
            tokens.push(Token::Punct(c));
            i += 1;
            continue;
        }

        if let Some(op) = MULTI_OPS
            .iter()
            .find(|op| chars[i..].starts_with(&op.chars().collect::<Vec<_>>()[..]))
        {
            tokens.push(Token::Op((*op).to_string()));
            i += op.len();
            continue;
        }
        if SINGLE_OPS.contains(c) {
            tokens.push(Token::Op(c.to_string()));
            i += 1;
            continue;
        }

        // anything else (stray unicode, etc.) rides along as a one-char op
        tokens.push(Token::Op(c.to_string()));
        i += 1;
    }

    tokens
}

/// Literal/comment scan state carried across lines.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    pub in_block_comment: bool,
    /// Delimiter of an open string/char literal, if the previous line ended
    /// inside one.
    pub string_delim: Option<char>,
}

impl ScanState {
    pub fn in_literal_or_comment(&self) -> bool {
        self.in_block_comment || self.string_delim.is_some()
    }
}

/// Count unmatched-brace contributions of one line, ignoring braces inside
/// string/char literals and comments. Advances `state` past the line.
pub fn line_brace_delta(line: &str, state: &mut ScanState) -> (usize, usize) {
    let chars: Vec<char> = line.chars().collect();
    let mut opens = 0;
    let mut closes = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if state.in_block_comment {
            if c == '*' && chars.get(i + 1) == Some(&'/') {
                state.in_block_comment = false;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        if let Some(delim) = state.string_delim {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == delim {
                state.string_delim = None;
            }
            i += 1;
            continue;
        }
        match c {
            '/' if chars.get(i + 1) == Some(&'/') => break,
            '/' if chars.get(i + 1) == Some(&'*') => {
                state.in_block_comment = true;
                i += 2;
                continue;
            }
            '"' | '\'' => state.string_delim = Some(c),
            '{' => opens += 1,
            '}' => closes += 1,
            _ => {}
        }
        i += 1;
    }

    (opens, closes)
}

/// Apply `f` to the code portions of `text`, copying string/char literals and
/// comments through verbatim. This is how the text-repair passes stay
/// literal-and-comment-aware without each reimplementing the scan.
pub fn map_code_segments(text: &str, f: impl Fn(&str) -> String) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut out = String::new();
    let mut code = String::new();
    let mut i = 0;

    let flush = |code: &mut String, out: &mut String| {
        if !code.is_empty() {
            out.push_str(&f(code));
            code.clear();
        }
    };

    while i < len {
        let c = chars[i];
        if c == '/' && i + 1 < len && (chars[i + 1] == '/' || chars[i + 1] == '*') {
            flush(&mut code, &mut out);
            if chars[i + 1] == '/' {
                while i < len && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            } else {
                out.push_str("/*");
                i += 2;
                while i < len && !(chars[i] == '*' && i + 1 < len && chars[i + 1] == '/') {
                    out.push(chars[i]);
                    i += 1;
                }
                if i < len {
                    out.push_str("*/");
                    i += 2;
                }
            }
            continue;
        }
        if c == '"' || c == '\'' {
            flush(&mut code, &mut out);
            out.push(c);
            i += 1;
            while i < len {
                if chars[i] == '\\' {
                    out.push(chars[i]);
                    if i + 1 < len {
                        out.push(chars[i + 1]);
                    }
                    i = (i + 2).min(len);
                    continue;
                }
                let done = chars[i] == c;
                if chars[i] == '\n' {
                    break;
                }
                out.push(chars[i]);
                i += 1;
                if done {
                    break;
                }
            }
            continue;
        }
        code.push(c);
        i += 1;
    }
    flush(&mut code, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_a_simple_statement() {
        let tokens = lex("int x = 1;");
        assert_eq!(
            tokens,
            vec![
                Token::Word("int".into()),
                Token::Word("x".into()),
                Token::Op("=".into()),
                Token::Number("1".into()),
                Token::Punct(';'),
            ]
        );
    }

    #[test]
    fn string_literal_keeps_braces_and_escapes() {
        let tokens = lex(r#"String s = "{\"}";"#);
        assert!(tokens.contains(&Token::Str(r#""{\"}""#.into())));
        // no brace puncts leaked out of the literal
        assert!(!tokens.contains(&Token::Punct('{')));
        assert!(!tokens.contains(&Token::Punct('}')));
    }

    #[test]
    fn unterminated_string_ends_at_line_break() {
        let tokens = lex("String s = \"oops\nint y;");
        assert!(tokens.contains(&Token::Str("\"oops".into())));
        assert!(tokens.contains(&Token::Word("y".into())));
    }

    #[test]
    fn comments_are_single_tokens() {
        let tokens = lex("a(); // trailing\n/* multi\nline */ b();");
        assert!(tokens.contains(&Token::LineComment("// trailing".into())));
        assert!(tokens.contains(&Token::BlockComment("/* multi\nline */".into())));
    }

    #[test]
    fn multi_char_operators_are_munched_greedily() {
        let tokens = lex("a<=b&&c->d");
        assert!(tokens.contains(&Token::Op("<=".into())));
        assert!(tokens.contains(&Token::Op("&&".into())));
        assert!(tokens.contains(&Token::Op("->".into())));
    }

    #[test]
    fn brace_delta_ignores_literals_and_comments() {
        let mut state = ScanState::default();
        assert_eq!(line_brace_delta("String s = \"{\";", &mut state), (0, 0));
        assert_eq!(line_brace_delta("if (x) { // {{{", &mut state), (1, 0));
        assert_eq!(line_brace_delta("/* } */ }", &mut state), (0, 1));
    }

    #[test]
    fn brace_delta_tracks_block_comment_across_lines() {
        let mut state = ScanState::default();
        line_brace_delta("foo(); /* start", &mut state);
        assert!(state.in_block_comment);
        assert_eq!(line_brace_delta("} still comment", &mut state), (0, 0));
        assert!(state.in_block_comment);
        line_brace_delta("end */ {", &mut state);
        assert!(!state.in_block_comment);
    }

    #[test]
    fn map_code_segments_leaves_literals_alone() {
        let out = map_code_segments("print ln(\"print ln\"); // print ln", |code| {
            code.replace("print ln", "println")
        });
        assert_eq!(out, "println(\"print ln\"); // print ln");
    }
}
