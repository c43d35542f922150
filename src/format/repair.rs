//! Catalog-driven text repair: known corruption patterns and glued keywords.
//!
//! Both passes run on code segments only (string/char literals and comments
//! pass through verbatim). The catalogs are hand-curated from previously
//! observed generator output; nothing here is inferred.

use super::lexer::map_code_segments;

/// Pass 3: literal substitutions for known corruption patterns — misspelled
/// identifiers, split method names, doubled words.
const KNOWN_PATTERNS: &[(&str, &str)] = &[
    ("Buttonint erface", "ButtonInterface"),
    ("int erface", "Interface"),
    ("System.out.print ln", "System.out.println"),
    ("print ln(", "println("),
    ("@Overridepublic", "@Override public"),
    ("public public ", "public "),
    ("static static ", "static "),
    ("return return ", "return "),
    ("new new ", "new "),
];

pub fn apply_known_patterns(text: &str) -> String {
    map_code_segments(text, |code| {
        let mut code = code.to_string();
        for (from, to) in KNOWN_PATTERNS {
            code = code.replace(from, to);
        }
        code
    })
}

/// Reserved words considered by the keyword-spacing pass.
const KEYWORDS: &[&str] = &[
    "public",
    "private",
    "protected",
    "class",
    "extends",
    "implements",
    "void",
    "static",
    "final",
    "int",
    "String",
    "double",
    "float",
    "boolean",
    "char",
    "byte",
    "short",
    "long",
    "if",
    "else",
    "for",
    "while",
    "do",
    "switch",
    "case",
    "default",
    "break",
    "continue",
    "return",
    "try",
    "catch",
    "finally",
    "throw",
    "throws",
    "import",
    "package",
    "new",
    "this",
    "super",
    "instanceof",
    "interface",
    "abstract",
    "synchronized",
    "volatile",
    "transient",
    "native",
    "strictfp",
    "enum",
    "assert",
    "const",
    "goto",
];

/// Keyword pairs seen concatenated without a space, restored to canonical
/// two-word form. Entries with identifier tails (newButton, extendsApplication)
/// are listed explicitly rather than split heuristically, so identifiers like
/// `newValue` or `className` survive untouched.
const GLUED_PAIRS: &[(&str, &str)] = &[
    ("publicclass", "public class"),
    ("publicstatic", "public static"),
    ("publicvoid", "public void"),
    ("privatevoid", "private void"),
    ("protectedvoid", "protected void"),
    ("staticvoid", "static void"),
    ("extendsApplication", "extends Application"),
    ("newButton", "new Button"),
    ("newStage", "new Stage"),
    ("newScene", "new Scene"),
    ("newLabel", "new Label"),
    ("newTextField", "new TextField"),
    ("newVBox", "new VBox"),
    ("newHBox", "new HBox"),
    ("newBorderPane", "new BorderPane"),
    ("newGridPane", "new GridPane"),
    ("newArrayList", "new ArrayList"),
    ("newHashMap", "new HashMap"),
    ("newString", "new String"),
    ("newInteger", "new Integer"),
    ("Stagestage", "Stage stage"),
    ("Scenescene", "Scene scene"),
];

/// Pass 4: keyword spacing. Splits words from the glued catalog, then splits
/// any remaining word that is a chain of reserved words (`returnnew`,
/// `publicstaticvoid`). A word that merely starts with a keyword prefix
/// (`classic`, `newValue`, `format`) is left alone.
pub fn space_keywords(text: &str) -> String {
    map_code_segments(text, |code| {
        let mut out = String::with_capacity(code.len());
        let mut chars = code.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if !is_word_start(c) {
                out.push(c);
                continue;
            }
            let mut end = start + c.len_utf8();
            while let Some(&(i, nc)) = chars.peek() {
                if is_word_char(nc) {
                    end = i + nc.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            out.push_str(&split_word(&code[start..end]));
        }
        out
    })
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn split_word(word: &str) -> String {
    if let Some((_, replacement)) = GLUED_PAIRS.iter().find(|(glued, _)| *glued == word) {
        return (*replacement).to_string();
    }
    if KEYWORDS.contains(&word) {
        return word.to_string();
    }
    // longest keyword prefix whose remainder is itself splittable
    for keyword in KEYWORDS {
        if let Some(rest) = word.strip_prefix(keyword) {
            if !rest.is_empty() && is_keyword_chain(rest) {
                return format!("{keyword} {}", split_word(rest));
            }
        }
    }
    word.to_string()
}

/// True when the word can be decomposed entirely into reserved words.
fn is_keyword_chain(word: &str) -> bool {
    if KEYWORDS.contains(&word) {
        return true;
    }
    KEYWORDS.iter().any(|keyword| {
        word.strip_prefix(keyword)
            .is_some_and(|rest| !rest.is_empty() && is_keyword_chain(rest))
    })
}
