//! Locates `TAG(token, token): text` annotations inside file content.
//!
//! Scanning never fails on odd token lists: a list whose pieces are not all
//! identifiers is reported as malformed and left for the replace mode to
//! judge.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ReplaceError, ReplaceResult};

/// One comma-separated piece of a token list: optional padding around an
/// identifier made of letters, digits, `-` and `_`.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)([A-Za-z0-9_-]+)([ \t]*)$").expect("token regex"));

/// A single piece of a token list, split on `,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The piece exactly as written, padding included.
    pub raw: &'a str,
    pub leading: &'a str,
    /// The identifier, `None` when the piece is malformed.
    pub name: Option<&'a str>,
    pub trailing: &'a str,
}

impl<'a> Token<'a> {
    fn parse(raw: &'a str) -> Self {
        match TOKEN_PATTERN.captures(raw) {
            Some(caps) => {
                let group = |i| caps.get(i).map_or("", |m| m.as_str());
                Token {
                    raw,
                    leading: group(1),
                    name: Some(group(2)),
                    trailing: group(3),
                }
            }
            None => Token {
                raw,
                leading: "",
                name: None,
                trailing: "",
            },
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.name.is_some()
    }
}

/// A `TAG(...):` annotation found in some content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOccurrence<'a> {
    pub tag: &'a str,
    /// Text between the parentheses, verbatim.
    pub raw_token_list: &'a str,
    /// Pieces of the list; empty when the list is blank.
    pub tokens: Vec<Token<'a>>,
    pub well_formed: bool,
    /// 1-based line number.
    pub line: usize,
    /// Byte range of `TAG(...):` in the scanned content.
    pub span: Range<usize>,
}

impl<'a> TagOccurrence<'a> {
    /// `TAG(list)` as written, used in error messages.
    pub fn display_text(&self) -> String {
        format!("{}({})", self.tag, self.raw_token_list)
    }

    /// First piece that is not an identifier.
    pub fn first_malformed(&self) -> Option<&Token<'a>> {
        self.tokens.iter().find(|t| !t.is_well_formed())
    }
}

/// Finds occurrences of a fixed set of tags.
#[derive(Debug, Clone)]
pub struct TagScanner {
    pattern: Regex,
}

impl TagScanner {
    pub fn new<I>(tags: I) -> ReplaceResult<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let alternatives: Vec<String> = tags
            .into_iter()
            .map(|tag| {
                let tag = tag.as_ref();
                let escaped = regex::escape(tag);
                // A word-like tag must not be the tail of a longer word.
                if tag.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
                    format!(r"\b{escaped}")
                } else {
                    escaped
                }
            })
            .collect();
        if alternatives.is_empty() {
            return Err(ReplaceError::Config("'tags' cannot be empty".to_string()));
        }
        let pattern = Regex::new(&format!(
            r"(?P<tag>{})\((?P<list>[^()\n]*)\):",
            alternatives.join("|")
        ))
        .map_err(|e| ReplaceError::Config(format!("invalid tags: {e}")))?;
        Ok(Self { pattern })
    }

    /// Scan `content` and return every occurrence in order.
    pub fn scan<'a>(&self, content: &'a str) -> Vec<TagOccurrence<'a>> {
        let mut line = 1;
        let mut counted_to = 0;
        self.pattern
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let tag = caps.name("tag")?.as_str();
                let raw_token_list = caps.name("list")?.as_str();

                line += content[counted_to..whole.start()].matches('\n').count();
                counted_to = whole.start();

                let tokens: Vec<Token<'a>> = if raw_token_list.trim().is_empty() {
                    Vec::new()
                } else {
                    raw_token_list.split(',').map(Token::parse).collect()
                };
                let well_formed = tokens.iter().all(Token::is_well_formed);

                Some(TagOccurrence {
                    tag,
                    raw_token_list,
                    tokens,
                    well_formed,
                    line,
                    span: whole.range(),
                })
            })
            .collect()
    }
}
