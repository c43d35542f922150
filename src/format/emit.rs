//! Structural rebuild: token stream → lines → spaced, indented source.
//!
//! Replaces the original chain of order-dependent substitutions with a single
//! re-emitter. Line breaks come from statement structure (`{` `}` `;`),
//! modifier/annotation starts, and comments; spacing comes from token-class
//! rules; indentation comes from a running brace-depth counter. Because the
//! lexer already folded literals and comments into opaque tokens, their
//! content can never be re-split, re-spaced, or counted toward depth.

use super::lexer::{lex, Token};

const INDENT: &str = "    ";

pub fn rebuild(text: &str) -> String {
    let tokens = lex(text);
    let lines = split_lines(tokens);
    render(&lines)
}

fn is_control_keyword(word: &str) -> bool {
    matches!(
        word,
        "if" | "for" | "while" | "switch" | "catch" | "synchronized"
    )
}

fn is_modifier(word: &str) -> bool {
    matches!(word, "public" | "private" | "protected")
}

/// Group tokens into logical lines. Existing line breaks are kept (blank
/// lines are dropped); new breaks are inserted after `{` and `;`, around `}`
/// (with immediately following closers kept attached), before modifiers and
/// annotations mid-line, and around comments.
fn split_lines(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut lines: Vec<Vec<Token>> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    macro_rules! flush {
        () => {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
        };
    }

    while let Some(token) = iter.next() {
        match token {
            Token::Newline => flush!(),
            Token::Punct('{') => {
                current.push(token);
                flush!();
            }
            Token::Punct(';') => {
                current.push(token);
                flush!();
            }
            Token::Punct('}') => {
                flush!();
                current.push(token);
                // keep `});`-style closer runs on the brace line
                while matches!(iter.peek(), Some(Token::Punct(')' | ';' | ','))) {
                    current.push(iter.next().expect("peeked"));
                }
                flush!();
            }
            Token::Punct('@') if !current.is_empty() => {
                flush!();
                current.push(token);
            }
            Token::Word(ref word) if is_modifier(word) && !current.is_empty() => {
                // annotations stay glued to nothing: `@Override` gets its own
                // line, the modifier starts the next one
                let annotation_line = matches!(current.first(), Some(Token::Punct('@')));
                if annotation_line || !matches!(current.last(), Some(Token::Punct('@'))) {
                    flush!();
                }
                current.push(token);
            }
            Token::LineComment(_) => {
                flush!();
                current.push(token);
                flush!();
            }
            Token::BlockComment(_) => {
                flush!();
                current.push(token);
                flush!();
            }
            other => current.push(other),
        }
    }
    flush!();
    lines
}

/// Render lines with spacing, blank separators, and brace-depth indentation.
fn render(lines: &[Vec<Token>]) -> String {
    let mut out = String::new();
    let mut depth: usize = 0;
    let mut prev_was_import = false;
    let mut prev_blank = true; // suppress a leading blank at the top

    for tokens in lines {
        let rendered = render_line(tokens);
        if rendered.is_empty() {
            continue;
        }

        let (opens, closes) = brace_counts(tokens);
        if closes > opens {
            depth = depth.saturating_sub(1);
        }

        let is_import = rendered.starts_with("import ");
        let wants_blank = (is_import && !prev_was_import)
            || rendered.starts_with("public class")
            || rendered.starts_with("@Override")
            || rendered.starts_with("public static void main");
        if wants_blank && !out.is_empty() && !prev_blank {
            out.push('\n');
        }

        out.push_str(&INDENT.repeat(depth));
        out.push_str(&rendered);
        out.push('\n');

        if opens > closes {
            depth += 1;
        }
        prev_was_import = is_import;
        prev_blank = false;
    }
    out
}

fn brace_counts(tokens: &[Token]) -> (usize, usize) {
    let opens = tokens.iter().filter(|t| **t == Token::Punct('{')).count();
    let closes = tokens.iter().filter(|t| **t == Token::Punct('}')).count();
    (opens, closes)
}

fn token_text(token: &Token) -> &str {
    match token {
        Token::Word(s)
        | Token::Number(s)
        | Token::Str(s)
        | Token::CharLit(s)
        | Token::LineComment(s)
        | Token::BlockComment(s)
        | Token::Op(s) => s,
        Token::Punct(_) | Token::Newline => "",
    }
}

fn render_line(tokens: &[Token]) -> String {
    let generic = generic_angles(tokens);
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && needs_space(tokens, &generic, i) {
            out.push(' ');
        }
        match token {
            Token::Punct(c) => out.push(*c),
            other => out.push_str(token_text(other)),
        }
    }
    out
}

fn is_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Word(_) | Token::Number(_) | Token::Str(_) | Token::CharLit(_)
    )
}

/// Flag the `<` `>` `>>` tokens that form generic parameter lists. Pairs are
/// matched with a stack and kept only when everything between them is
/// type-like; unmatched or rejected angles are comparisons. Inner pairs of a
/// nested list resolve first, so the outer span sees them already flagged.
fn generic_angles(tokens: &[Token]) -> Vec<bool> {
    let mut generic = vec![false; tokens.len()];
    let mut stack: Vec<usize> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let Token::Op(op) = token else { continue };
        match op.as_str() {
            "<" => stack.push(i),
            ">" | ">>" => {
                let closes = if op == ">" { 1 } else { 2 };
                for _ in 0..closes {
                    let Some(open) = stack.pop() else { break };
                    let ok = span_is_type_like(&tokens[open + 1..i], &generic[open + 1..i]);
                    if ok {
                        generic[open] = true;
                        generic[i] = true;
                    }
                }
            }
            _ => {}
        }
    }
    generic
}

fn span_is_type_like(tokens: &[Token], generic: &[bool]) -> bool {
    tokens.iter().enumerate().all(|(i, token)| match token {
        Token::Word(_) => true,
        Token::Punct(',' | '.' | '[' | ']') => true,
        Token::Op(op) => match op.as_str() {
            "?" | "&" => true,
            "<" | ">" | ">>" => generic[i],
            _ => false,
        },
        _ => false,
    })
}

/// True when a `+`/`-`/`!`/`~` at position `i` is unary, judged by what
/// precedes it.
fn is_unary_position(tokens: &[Token], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    match &tokens[i - 1] {
        Token::Op(_) => true,
        Token::Punct('(' | '[' | ',' | ';' | '{' | '}') => true,
        Token::Word(w) => matches!(w.as_str(), "return" | "case"),
        _ => false,
    }
}

fn needs_space(tokens: &[Token], generic: &[bool], i: usize) -> bool {
    use Token::*;
    let prev = &tokens[i - 1];
    let cur = &tokens[i];

    // annotations hug their name
    if *prev == Punct('@') {
        return false;
    }
    // member access hugs both sides
    if *cur == Punct('.') || *prev == Punct('.') {
        return false;
    }
    // statement punctuation hugs to the left, spaces to the right
    if matches!(cur, Punct(';' | ',')) {
        return false;
    }
    if matches!(prev, Punct(';' | ',')) {
        return true;
    }
    if matches!(prev, Punct('(' | '[')) {
        return false;
    }
    if matches!(cur, Punct(')' | ']')) {
        return false;
    }
    // array brackets attach to the element type or target
    if *cur == Punct('[') {
        return !(is_operand(prev) || matches!(prev, Punct(']' | ')')));
    }
    // braces are isolated by whitespace
    if matches!(cur, Punct('{' | '}')) || matches!(prev, Punct('{' | '}')) {
        return true;
    }
    // calls vs. control structures
    if *cur == Punct('(') {
        return match prev {
            Word(w) => is_control_keyword(w),
            Punct(')' | ']') => false,
            Op(op) if matches!(op.as_str(), "<" | ">" | ">>") => !generic[i - 1],
            Op(op) => !matches!(op.as_str(), "++" | "--"),
            _ => true,
        };
    }
    // increment/decrement attach to their operand
    if let Op(op) = cur {
        if op == "++" || op == "--" {
            return !(is_operand(prev) || matches!(prev, Punct(')' | ']')));
        }
    }
    if let Op(op) = prev {
        if op == "++" || op == "--" {
            return !(is_operand(cur) || *cur == Punct('('));
        }
    }
    // logical-not and bitwise-not attach to the right
    if let Op(op) = prev {
        if op == "!" || op == "~" {
            return false;
        }
    }
    // unary plus/minus attach to the right
    if let Op(op) = prev {
        if (op == "+" || op == "-") && is_unary_position(tokens, i - 1) {
            return false;
        }
    }
    // generic angle brackets hug their content (`List<String>`), with a space
    // after the final closer before a declared name (`Map<K, V> name`);
    // comparison angles are spaced like any other binary operator
    if matches!(cur, Op(op) if op == "<" || op == ">" || op == ">>") {
        return !generic[i];
    }
    if let Op(op) = prev {
        if matches!(op.as_str(), "<" | ">" | ">>") {
            if !generic[i - 1] {
                return true;
            }
            return op != "<" && is_operand(cur);
        }
    }
    // remaining operators are binary: one space each side
    if matches!(cur, Op(_)) || matches!(prev, Op(_)) {
        return true;
    }
    // adjacent operands, comments, everything else
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_statements_onto_their_own_lines() {
        let out = rebuild("int a = 1; int b = 2;");
        assert_eq!(out, "int a = 1;\nint b = 2;\n");
    }

    #[test]
    fn indents_by_brace_depth() {
        let out = rebuild("public class A { void m() { x(); } }");
        let expected = "public class A {\n    void m() {\n        x();\n    }\n}\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn brace_in_string_does_not_change_depth() {
        let out = rebuild("void m() { String s = \"{\"; x(); }");
        assert_eq!(out, "void m() {\n    String s = \"{\";\n    x();\n}\n");
    }

    #[test]
    fn balanced_input_returns_to_depth_zero() {
        let out = rebuild("class A { void m() { if (x) { y(); } } }");
        let last = out.lines().last().unwrap();
        assert_eq!(last, "}");
        assert!(!last.starts_with(' '));
    }

    #[test]
    fn control_keywords_get_a_space_before_parens_calls_do_not() {
        let out = rebuild("if(x){foo(y);}");
        assert_eq!(out, "if (x) {\n    foo(y);\n}\n");
    }

    #[test]
    fn lambda_closers_stay_attached() {
        let out = rebuild("btn.setOnAction(e->{go();});");
        assert_eq!(out, "btn.setOnAction(e -> {\n    go();\n});\n");
    }

    #[test]
    fn operators_are_spaced_generics_are_not() {
        let out = rebuild("Map<String,Integer> m=new HashMap<>();");
        assert_eq!(out, "Map<String, Integer> m = new HashMap<>();\n");
    }

    #[test]
    fn bare_comparisons_are_spaced_like_binary_operators() {
        let out = rebuild("if (i>0) { i--; }");
        assert_eq!(out, "if (i > 0) {\n    i--;\n}\n");
    }

    #[test]
    fn well_formed_comparisons_are_not_disturbed() {
        let out = rebuild("if (a > b) { x(); }");
        assert_eq!(out, "if (a > b) {\n    x();\n}\n");
        let out = rebuild("while (a < b) { x(); }");
        assert_eq!(out, "while (a < b) {\n    x();\n}\n");
    }

    #[test]
    fn nested_generics_stay_tight() {
        let out = rebuild("List<List<String>> xs=new ArrayList<>();");
        assert_eq!(out, "List<List<String>> xs = new ArrayList<>();\n");
    }

    #[test]
    fn unary_minus_and_increment_attach() {
        let out = rebuild("int x=-1; x++;");
        assert_eq!(out, "int x = -1;\nx++;\n");
    }

    #[test]
    fn trailing_comment_moves_to_its_own_line() {
        let out = rebuild("x(); // done");
        assert_eq!(out, "x();\n// done\n");
    }

    #[test]
    fn modifiers_start_new_lines_with_blank_separators() {
        let out = rebuild("import javafx.stage.Stage; public class A { @Override public void start(Stage s) { } }");
        let expected = "import javafx.stage.Stage;\n\npublic class A {\n\n    @Override\n    public void start(Stage s) {\n    }\n}\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn member_access_is_tight() {
        let out = rebuild("System . out . println ( \"hi\" ) ;");
        assert_eq!(out, "System.out.println(\"hi\");\n");
    }
}
