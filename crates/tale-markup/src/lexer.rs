use logos::Logos;
use std::fmt;

/// Token inside a single markup tag, i.e. the text between `<` and `>`.
///
/// Text between tags never goes through the lexer; the extractor copies it
/// verbatim into the open unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TagToken {
    /// Slash `/`, marking a closing or self-closing tag.
    Slash,
    /// Equals sign `=` between an attribute name and its value.
    Eq,
    /// Tag or attribute name.
    Ident(String),
    /// Quoted attribute value, quotes removed.
    Str(String),
}

impl fmt::Display for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagToken::Slash => write!(f, "/"),
            TagToken::Eq => write!(f, "="),
            TagToken::Ident(name) => write!(f, "{name}"),
            TagToken::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Internal logos token, borrowing from the tag source.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawTagToken {
    #[token("/")]
    Slash,

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    #[regex(r"[A-Za-z_][A-Za-z0-9_.:-]*")]
    Ident,
}

/// A lexer error with its location inside the tag source.
#[derive(Debug, Clone)]
pub struct LexError {
    /// Byte range of the offending input, relative to the tag source.
    pub span: std::ops::Range<usize>,
    /// Human-readable description.
    pub message: String,
}

/// Lex the inside of a tag into `(TagToken, Span)` pairs.
///
/// Lexing continues past errors so that a single stray character does not
/// hide the tag name from diagnostics.
pub fn lex_tag(source: &str) -> (Vec<(TagToken, std::ops::Range<usize>)>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = RawTagToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(raw) => {
                let token = match raw {
                    RawTagToken::Slash => TagToken::Slash,
                    RawTagToken::Eq => TagToken::Eq,
                    RawTagToken::DoubleQuoted | RawTagToken::SingleQuoted => {
                        let slice = lexer.slice();
                        TagToken::Str(slice[1..slice.len() - 1].to_string())
                    }
                    RawTagToken::Ident => TagToken::Ident(lexer.slice().to_string()),
                };
                tokens.push((token, span));
            }
            Err(()) => {
                errors.push(LexError {
                    span: span.clone(),
                    message: format!("unexpected character in tag: {:?}", &source[span]),
                });
            }
        }
    }

    (tokens, errors)
}

/// Find the `>` that closes a tag, skipping any inside quoted values.
///
/// `source` starts just after the `<`. Returns the byte offset of the `>`.
pub fn find_tag_end(source: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in source.char_indices() {
        match (quote, c) {
            (None, '>') => return Some(idx),
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    None
}
