//! Label line parsing.
//!
//! A label is a `name<separator>value` line such as `foo = bar` or
//! `Change-Id: I1234`. Origins use it to pull metadata out of commit
//! messages; during a transformation it should only be used to check whether
//! a line *is* a label.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const VALID_LABEL_EXPR: &str = r"[A-Za-z0-9_-]+";

/// A bare label name, e.g. `GitOrigin-RevId`.
pub static VALID_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{VALID_LABEL_EXPR}$")).expect("valid label regex"));

static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^({VALID_LABEL_EXPR})( *[:=] ?)(.*)$")).expect("label line regex")
});

/// `name://...` looks like a label with a `:` separator but is a URL.
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{VALID_LABEL_EXPR}://.*$")).expect("url regex"));

/// A parsed label line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub separator: String,
    pub value: String,
    pub raw_line: String,
}

impl Label {
    /// Parse `line`, returning `None` when it is not a label.
    pub fn parse(line: &str) -> Option<Self> {
        let finder = LabelFinder::new(line);
        finder.is_label().then(|| Label {
            name: finder.name().to_string(),
            separator: finder.separator().to_string(),
            value: finder.value().to_string(),
            raw_line: line.to_string(),
        })
    }

    /// Parse every label line in a multi-line text, in order.
    pub fn parse_all(text: &str) -> Vec<Self> {
        text.lines().filter_map(Label::parse).collect()
    }
}

/// Checks whether a single line is a label and exposes its parts.
///
/// The accessors are only meaningful for label lines. Calling them on any
/// other line is a programming error and panics.
#[derive(Debug)]
pub struct LabelFinder<'a> {
    line: &'a str,
    captures: Option<regex::Captures<'a>>,
}

impl<'a> LabelFinder<'a> {
    pub fn new(line: &'a str) -> Self {
        let captures = LABEL_PATTERN
            .captures(line)
            .filter(|_| !URL_PATTERN.is_match(line));
        Self { line, captures }
    }

    pub fn is_label(&self) -> bool {
        self.captures.is_some()
    }

    /// `true` when the line is a label called `name`.
    pub fn is_label_named(&self, name: &str) -> bool {
        self.is_label() && self.name() == name
    }

    pub fn name(&self) -> &'a str {
        self.group(1)
    }

    pub fn separator(&self) -> &'a str {
        self.group(2)
    }

    pub fn value(&self) -> &'a str {
        self.group(3)
    }

    pub fn line(&self) -> &'a str {
        self.line
    }

    fn group(&self, index: usize) -> &'a str {
        let captures = match &self.captures {
            Some(captures) => captures,
            None => panic!("Not a label: '{}'", self.line),
        };
        captures.get(index).map_or("", |m| m.as_str())
    }
}
