//! Path predicates used to pick which files of a checkout get rewritten.
//!
//! The core never interprets glob syntax itself; it only asks a
//! [`PathMatcher`] whether a checkout-relative path is in scope.

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Decides whether a path, relative to the checkout root, is in scope.
pub trait PathMatcher: Send + Sync {
    fn matches(&self, relative_path: &Path) -> bool;
}

impl<F> PathMatcher for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn matches(&self, relative_path: &Path) -> bool {
        self(relative_path)
    }
}

/// Matches every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl PathMatcher for MatchAll {
    fn matches(&self, _relative_path: &Path) -> bool {
        true
    }
}

/// Include/exclude glob lists compiled with `globset`.
///
/// A path matches when it matches any include pattern and no exclude
/// pattern. An empty include list includes everything.
#[derive(Clone)]
pub struct GlobMatcher {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    patterns: Vec<String>,
}

impl GlobMatcher {
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self, globset::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include: Vec<String> = include.into_iter().map(|g| g.as_ref().to_string()).collect();
        let exclude: Vec<String> = exclude.into_iter().map(|g| g.as_ref().to_string()).collect();

        let mut patterns = include.clone();
        patterns.extend(exclude.iter().map(|g| format!("!{g}")));

        Ok(Self {
            include: compile_globset(&include)?,
            exclude: compile_globset(&exclude)?,
            patterns,
        })
    }

    /// Include-only matcher.
    pub fn include<I>(include: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self::new(include, std::iter::empty::<&str>())
    }
}

impl PathMatcher for GlobMatcher {
    fn matches(&self, relative_path: &Path) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|set| set.is_match(relative_path));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|set| set.is_match(relative_path));
        included && !excluded
    }
}

impl fmt::Debug for GlobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobMatcher").field(&self.patterns).finish()
    }
}

fn compile_globset(globs: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if globs.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(Glob::new(glob)?);
    }
    Ok(Some(builder.build()?))
}
