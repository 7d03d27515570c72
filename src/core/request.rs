//! RZ-003: Request codec: tokenizer and structured builder.
//!
//! Grammar:
//!
//! ```text
//! request  := group ( '|' group )*
//! group    := WORD*
//! ```
//!
//! The first group is the base and may be empty. Every group after a `|`
//! is a subshell and must hold at least one word. `|` is a token on its own,
//! so `a|b` and `a | b` parse the same.

use super::error::EnvError;
use super::types::{PackageSpec, Request};
use std::str::FromStr;

/// Lexical token of a request string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Bar,
}

/// Split request text into words and bars.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    for c in text.chars() {
        if c == '|' || c.is_whitespace() {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            if c == '|' {
                tokens.push(Token::Bar);
            }
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }

    tokens
}

/// Parse request text into base packages and subshell groups.
pub fn parse(text: &str) -> Result<Request, EnvError> {
    let mut groups: Vec<Vec<PackageSpec>> = vec![Vec::new()];

    for token in tokenize(text) {
        match token {
            Token::Word(w) => {
                let spec = PackageSpec::new(&w)?;
                if let Some(current) = groups.last_mut() {
                    current.push(spec);
                }
            }
            Token::Bar => {
                if groups.len() > 1 && groups.last().is_some_and(|g| g.is_empty()) {
                    return Err(EnvError::malformed(text, "empty subshell group"));
                }
                groups.push(Vec::new());
            }
        }
    }

    if groups.len() > 1 && groups.last().is_some_and(|g| g.is_empty()) {
        return Err(EnvError::malformed(text, "empty subshell group"));
    }

    let mut groups = groups.into_iter();
    let base = groups.next().unwrap_or_default();
    Ok(Request {
        base,
        subshells: groups.collect(),
    })
}

/// Parse a list of CLI package arguments as one request.
pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Request, EnvError> {
    let joined = tokens
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    parse(&joined)
}

/// Encode a request back to its text form.
pub fn encode(request: &Request) -> String {
    let base = join_specs(&request.base);
    if request.subshells.is_empty() {
        return base;
    }

    let subshells = request
        .subshells
        .iter()
        .map(|group| join_specs(group))
        .collect::<Vec<_>>()
        .join(" | ");

    if base.is_empty() {
        format!("| {}", subshells)
    } else {
        format!("{} | {}", base, subshells)
    }
}

fn join_specs(specs: &[PackageSpec]) -> String {
    specs
        .iter()
        .map(PackageSpec::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

impl FromStr for Request {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&encode(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(specs: &[PackageSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.as_str()).collect()
    }

    fn normalize(s: &str) -> String {
        tokenize(s)
            .into_iter()
            .map(|t| match t {
                Token::Word(w) => w,
                Token::Bar => "|".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_rz003_tokenize_bar_without_spaces() {
        assert_eq!(
            tokenize("a|b  c"),
            vec![
                Token::Word("a".into()),
                Token::Bar,
                Token::Word("b".into()),
                Token::Word("c".into()),
            ]
        );
    }

    #[test]
    fn test_rz003_parse_base_only() {
        let req = parse("foo-1.0 bar").unwrap();
        assert_eq!(names(&req.base), vec!["foo-1.0", "bar"]);
        assert!(req.subshells.is_empty());
    }

    #[test]
    fn test_rz003_parse_subshells() {
        let req = parse("foo | bar-2 baz | qux").unwrap();
        assert_eq!(names(&req.base), vec!["foo"]);
        assert_eq!(req.subshells.len(), 2);
        assert_eq!(names(&req.subshells[0]), vec!["bar-2", "baz"]);
        assert_eq!(names(&req.subshells[1]), vec!["qux"]);
    }

    #[test]
    fn test_rz003_parse_empty_base_with_subshell() {
        let req = parse("| bar").unwrap();
        assert!(req.base.is_empty());
        assert_eq!(names(&req.subshells[0]), vec!["bar"]);
        assert_eq!(encode(&req), "| bar");
    }

    #[test]
    fn test_rz003_parse_empty_text() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   \t ").unwrap().is_empty());
    }

    #[test]
    fn test_rz003_trailing_bar_is_malformed() {
        let err = parse("foo |").unwrap_err();
        assert!(matches!(err, EnvError::MalformedRequest { .. }));
    }

    #[test]
    fn test_rz003_double_bar_is_malformed() {
        assert!(parse("foo | | bar").is_err());
        assert!(parse("foo || bar").is_err());
        assert!(parse("|").is_err());
    }

    #[test]
    fn test_rz003_encode_normalizes_whitespace() {
        let req = parse("  foo   bar|baz  ").unwrap();
        assert_eq!(encode(&req), "foo bar | baz");
    }

    #[test]
    fn test_rz003_parse_tokens_joins_cli_args() {
        let req = parse_tokens(&["foo-1.0", "bar", "|", "baz"]).unwrap();
        assert_eq!(encode(&req), "foo-1.0 bar | baz");
    }

    #[test]
    fn test_rz003_from_str_and_display() {
        let req: Request = "a b | c".parse().unwrap();
        assert_eq!(req.to_string(), "a b | c");
    }

    fn word() -> impl Strategy<Value = String> {
        "[~!]?[a-z][a-z0-9_]{0,6}(-[0-9]{1,2}(\\.[0-9]{1,2})?)?"
    }

    fn request_text() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(word(), 0..4),
            prop::collection::vec(prop::collection::vec(word(), 1..3), 0..3),
            prop::sample::select(vec![" ", "  ", "\t"]),
        )
            .prop_filter("non-empty", |(b, s, _)| !b.is_empty() || !s.is_empty())
            .prop_map(|(base, subs, sep)| {
                let mut groups = vec![base.join(sep)];
                groups.extend(subs.iter().map(|g| g.join(sep)));
                groups.join(&format!("{}|{}", sep, sep))
            })
    }

    proptest! {
        #[test]
        fn prop_rz003_encode_parse_roundtrip(text in request_text()) {
            let req = parse(&text).unwrap();
            let encoded = encode(&req);
            prop_assert_eq!(normalize(&encoded), normalize(&text));
            prop_assert_eq!(parse(&encoded).unwrap(), req);
        }
    }
}
