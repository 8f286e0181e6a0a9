use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::lexer::{TagToken, lex_tag};

type Span = SimpleSpan;

/// Whether a tag opens, closes, or stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<name ...>`
    Open,
    /// `</name>`
    Close,
    /// `<name ... />`
    SelfClosing,
}

/// A parsed markup tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name as written.
    pub name: String,
    /// Open, close, or self-closing.
    pub kind: TagKind,
    /// Attributes in source order. Bare attributes have an empty value.
    pub attributes: Vec<(String, String)>,
}

impl Tag {
    /// Whether the tag has the given name (ASCII case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Look up an attribute value by name (ASCII case-insensitive).
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse error with a span relative to the tag source.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Byte range of the error inside the tag source.
    pub span: std::ops::Range<usize>,
    /// Human-readable description.
    pub message: String,
}

fn tag_parser<'a, I>() -> impl Parser<'a, I, Tag, extra::Err<Rich<'a, TagToken>>> + Clone
where
    I: ValueInput<'a, Token = TagToken, Span = Span>,
{
    let ident = select! { TagToken::Ident(name) => name }.labelled("name");
    let value = select! { TagToken::Str(s) => s }.labelled("quoted value");

    let attribute = ident
        .clone()
        .then(just(TagToken::Eq).ignore_then(value).or_not())
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .labelled("attribute");

    just(TagToken::Slash)
        .or_not()
        .then(ident)
        .then(attribute.repeated().collect::<Vec<(String, String)>>())
        .then(just(TagToken::Slash).or_not())
        .then_ignore(end())
        .map(|(((leading, name), attributes), trailing)| {
            let kind = if leading.is_some() {
                TagKind::Close
            } else if trailing.is_some() {
                TagKind::SelfClosing
            } else {
                TagKind::Open
            };
            Tag {
                name,
                kind,
                attributes,
            }
        })
}

/// Parse the text between `<` and `>` into a [`Tag`].
pub fn parse_tag(source: &str) -> Result<Tag, Vec<ParseError>> {
    let (tokens, lex_errors) = lex_tag(source);
    if !lex_errors.is_empty() {
        return Err(lex_errors
            .into_iter()
            .map(|e| ParseError {
                span: e.span,
                message: e.message,
            })
            .collect());
    }

    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));

    let len = source.len();
    let eoi: Span = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = tag_parser().parse(stream).into_output_errors();

    match output {
        Some(tag) if errors.is_empty() => Ok(tag),
        _ => Err(errors
            .into_iter()
            .map(|e| ParseError {
                span: e.span().into_range(),
                message: e.to_string(),
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_open_with_attribute() {
        let tag = parse_tag(r#"character name="Ari""#).unwrap();
        assert_eq!(tag.kind, TagKind::Open);
        assert!(tag.is("character"));
        assert_eq!(tag.attribute("name"), Some("Ari"));
    }

    #[test]
    fn parse_close() {
        let tag = parse_tag("/Narrator").unwrap();
        assert_eq!(tag.kind, TagKind::Close);
        assert!(tag.is("narrator"));
    }

    #[test]
    fn parse_self_closing() {
        let tag = parse_tag("pause /").unwrap();
        assert_eq!(tag.kind, TagKind::SelfClosing);
        assert_eq!(tag.name, "pause");
    }

    #[test]
    fn parse_multiple_and_bare_attributes() {
        let tag = parse_tag(r#"action expression="Sad" loud tone='low'"#).unwrap();
        assert_eq!(tag.attribute("EXPRESSION"), Some("Sad"));
        assert_eq!(tag.attribute("loud"), Some(""));
        assert_eq!(tag.attribute("tone"), Some("low"));
        assert_eq!(tag.attribute("missing"), None);
    }

    #[test]
    fn parse_rejects_missing_name() {
        assert!(parse_tag(r#""Ari""#).is_err());
        assert!(parse_tag("/").is_err());
        assert!(parse_tag("").is_err());
    }

    #[test]
    fn parse_rejects_dangling_equals() {
        assert!(parse_tag("action expression=").is_err());
    }

    #[test]
    fn parse_rejects_lex_errors() {
        let errors = parse_tag("!-- comment --").unwrap_err();
        assert!(errors[0].message.contains("unexpected character"));
    }
}
