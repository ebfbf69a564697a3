//! The replace engine: rewrites tag token lists across a checked-out tree.
//!
//! An engine is validated once at construction and is immutable afterwards,
//! so the same instance can be shared by the parallel per-file workers and
//! reused for forward and reverse runs.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use super::error::{ReplaceError, ReplaceResult};
use super::mode::{decide, Decision, ReplaceMode};
use super::scanner::{TagOccurrence, TagScanner};
use crate::obs;
use crate::paths::{MatchAll, PathMatcher};

/// Tag rewritten when no tags are configured explicitly.
pub const DEFAULT_TAG: &str = "TODO";

/// Result of rewriting one piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    /// Number of occurrences whose text changed.
    pub rewritten: usize,
}

/// Summary of a [`ReplaceEngine::transform`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    /// Files inside the path filter that were read.
    pub files_scanned: usize,
    /// Files outside the path filter.
    pub files_skipped: usize,
    /// Checkout-relative paths whose content changed, sorted.
    pub changed: Vec<PathBuf>,
    pub occurrences_rewritten: usize,
}

enum FileOutcome {
    Unchanged,
    NotText,
    Rewritten(usize),
}

/// Builder for [`ReplaceEngine`]; all validation happens in [`build`](Self::build).
#[derive(Clone)]
pub struct ReplaceEngineBuilder {
    tags: Vec<String>,
    mode: ReplaceMode,
    mapping: IndexMap<String, String>,
    default: Option<String>,
    paths: Arc<dyn PathMatcher>,
}

impl Default for ReplaceEngineBuilder {
    fn default() -> Self {
        Self {
            tags: vec![DEFAULT_TAG.to_string()],
            mode: ReplaceMode::default(),
            mapping: IndexMap::new(),
            default: None,
            paths: Arc::new(MatchAll),
        }
    }
}

impl ReplaceEngineBuilder {
    pub fn tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode(mut self, mode: ReplaceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mapping<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.mapping = mapping
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn paths(mut self, paths: impl PathMatcher + 'static) -> Self {
        self.paths = Arc::new(paths);
        self
    }

    pub fn shared_paths(mut self, paths: Arc<dyn PathMatcher>) -> Self {
        self.paths = paths;
        self
    }

    pub fn build(self) -> ReplaceResult<ReplaceEngine> {
        let mut seen = HashSet::new();
        let tags: Vec<String> = self
            .tags
            .into_iter()
            .filter(|tag| seen.insert(tag.clone()))
            .collect();
        if tags.is_empty() {
            return Err(ReplaceError::Config("'tags' cannot be empty".to_string()));
        }
        if tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ReplaceError::Config("'tags' cannot contain empty values".to_string()));
        }

        let mode = self.mode;
        match (&self.default, mode.requires_default()) {
            (None, true) => {
                return Err(ReplaceError::Config(format!(
                    "'default' needs to be set for mode '{mode}'"
                )))
            }
            (Some(_), false) => {
                return Err(ReplaceError::Config(format!(
                    "'default' cannot be used for mode '{mode}'"
                )))
            }
            _ => {}
        }
        if !mode.uses_mapping() && !self.mapping.is_empty() {
            return Err(ReplaceError::Config(format!(
                "'mapping' cannot be used with mode {mode}"
            )));
        }

        let scanner = TagScanner::new(&tags)?;
        Ok(ReplaceEngine {
            tags,
            mode,
            mapping: self.mapping,
            default: self.default,
            paths: self.paths,
            scanner,
        })
    }
}

/// Rewrites the token lists of configured tags according to a [`ReplaceMode`].
#[derive(Clone)]
pub struct ReplaceEngine {
    tags: Vec<String>,
    mode: ReplaceMode,
    mapping: IndexMap<String, String>,
    default: Option<String>,
    paths: Arc<dyn PathMatcher>,
    scanner: TagScanner,
}

impl ReplaceEngine {
    pub fn builder() -> ReplaceEngineBuilder {
        ReplaceEngineBuilder::default()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn mode(&self) -> ReplaceMode {
        self.mode
    }

    pub fn mapping(&self) -> &IndexMap<String, String> {
        &self.mapping
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether files at `relative_path` are touched by this engine.
    pub fn in_scope(&self, relative_path: &Path) -> bool {
        self.paths.matches(relative_path)
    }

    /// Build the engine that undoes this one.
    ///
    /// Only the mapping is inverted; mode, default, tags and paths are kept.
    /// Fails when the mode throws information away or when two keys share a
    /// value.
    pub fn reverse(&self) -> ReplaceResult<ReplaceEngine> {
        if !self.mode.is_reversible() {
            return Err(ReplaceError::NonReversible(format!(
                "mode '{}' discards the original token list",
                self.mode
            )));
        }
        let mut inverse = IndexMap::with_capacity(self.mapping.len());
        for (key, value) in &self.mapping {
            if let Some(previous) = inverse.insert(value.clone(), key.clone()) {
                return Err(ReplaceError::NonReversible(format!(
                    "mapping is not injective: '{value}' is the value of both '{previous}' and '{key}'"
                )));
            }
        }
        Ok(ReplaceEngine {
            mapping: inverse,
            ..self.clone()
        })
    }

    /// Rewrite `content` of the file at `path` (used in error messages).
    ///
    /// Returns `None` when nothing changed. The path filter is not consulted.
    pub fn rewrite(&self, path: &Path, content: &str) -> ReplaceResult<Option<Rewrite>> {
        let occurrences = self.scanner.scan(content);
        if occurrences.is_empty() {
            return Ok(None);
        }

        let mut output = String::with_capacity(content.len());
        let mut cursor = 0;
        let mut rewritten = 0;
        for occurrence in &occurrences {
            let Some(replacement) = self.rewrite_occurrence(occurrence, path)? else {
                continue;
            };
            if replacement == content[occurrence.span.clone()] {
                continue;
            }
            output.push_str(&content[cursor..occurrence.span.start]);
            output.push_str(&replacement);
            cursor = occurrence.span.end;
            rewritten += 1;
        }
        if rewritten == 0 {
            return Ok(None);
        }
        output.push_str(&content[cursor..]);
        Ok(Some(Rewrite {
            content: output,
            rewritten,
        }))
    }

    /// Rewrite every in-scope file under `root` in place.
    ///
    /// Files are processed in parallel. A failing file does not stop the
    /// others; when any file fails the whole pass fails and every failure is
    /// reported.
    pub fn transform(&self, root: &Path) -> ReplaceResult<TransformReport> {
        let mut in_scope = Vec::new();
        let mut files_skipped = 0;
        for entry in WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build()
        {
            let entry = entry?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if self.in_scope(&relative) {
                in_scope.push((entry.into_path(), relative));
            } else {
                files_skipped += 1;
            }
        }
        in_scope.sort_by(|a, b| a.1.cmp(&b.1));

        let _span = obs::TransformSpan::enter(root, self.mode);
        obs::emit_transform_started(root, self.mode, in_scope.len());

        let results: Vec<(PathBuf, ReplaceResult<FileOutcome>)> = in_scope
            .par_iter()
            .map(|(absolute, relative)| (relative.clone(), self.transform_file(absolute, relative)))
            .collect();

        let mut report = TransformReport {
            files_scanned: in_scope.len(),
            files_skipped,
            ..TransformReport::default()
        };
        let mut failures = Vec::new();
        for (relative, result) in results {
            match result {
                Ok(FileOutcome::Rewritten(count)) => {
                    obs::emit_file_rewritten(&relative, count);
                    report.occurrences_rewritten += count;
                    report.changed.push(relative);
                }
                Ok(FileOutcome::NotText) => {
                    tracing::debug!(path = %relative.display(), "skipping non UTF-8 file");
                }
                Ok(FileOutcome::Unchanged) => {}
                Err(err) => {
                    obs::emit_file_failed(&relative, &err);
                    failures.push(err);
                }
            }
        }

        obs::emit_transform_finished(&report, failures.len());
        match failures.len() {
            0 => Ok(report),
            1 => Err(failures.remove(0)),
            _ => Err(ReplaceError::Files { failures }),
        }
    }

    fn transform_file(&self, absolute: &Path, relative: &Path) -> ReplaceResult<FileOutcome> {
        let bytes = fs::read(absolute).map_err(|e| ReplaceError::io(relative, e))?;
        let Ok(content) = String::from_utf8(bytes) else {
            return Ok(FileOutcome::NotText);
        };
        match self.rewrite(relative, &content)? {
            Some(rewrite) => {
                fs::write(absolute, rewrite.content).map_err(|e| ReplaceError::io(relative, e))?;
                Ok(FileOutcome::Rewritten(rewrite.rewritten))
            }
            None => Ok(FileOutcome::Unchanged),
        }
    }

    /// `TAG:` or `TAG(default):` for the modes that discard the token list.
    fn collapsed(&self, tag: &str) -> Option<String> {
        match self.mode {
            ReplaceMode::ScrubNames => Some(format!("{tag}:")),
            ReplaceMode::UseDefault => Some(format!("{tag}({}):", self.default.as_deref()?)),
            _ => None,
        }
    }

    /// New text for `TAG(...):`, or `None` to leave it as written.
    fn rewrite_occurrence(
        &self,
        occurrence: &TagOccurrence<'_>,
        path: &Path,
    ) -> ReplaceResult<Option<String>> {
        let tag = occurrence.tag;
        if let Some(collapsed) = self.collapsed(tag) {
            return Ok(Some(collapsed));
        }

        if let Some(malformed) = occurrence.first_malformed() {
            match self.mode {
                ReplaceMode::MapOrFail => {
                    return Err(ReplaceError::Content {
                        path: path.to_path_buf(),
                        message: format!(
                            "Unexpected '{}' doesn't match expected format",
                            malformed.raw.trim()
                        ),
                    });
                }
                ReplaceMode::Mapping | ReplaceMode::MapOrIgnore => {
                    obs::emit_malformed_skipped(path, occurrence.line, &occurrence.display_text());
                    return Ok(None);
                }
                _ => {}
            }
        }

        let default = self.default.as_deref().unwrap_or_default();
        let dedupe = self.mode == ReplaceMode::MapOrDefault;
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut pieces: Vec<String> = Vec::with_capacity(occurrence.tokens.len());

        for token in &occurrence.tokens {
            let Some(name) = token.name else {
                obs::emit_malformed_skipped(path, occurrence.line, token.raw);
                continue;
            };
            let value = match decide(self.mode, name, &self.mapping) {
                Decision::Replace(value) => value,
                Decision::Keep => name,
                Decision::UseDefault => default,
                Decision::Unmapped => {
                    return Err(ReplaceError::Content {
                        path: path.to_path_buf(),
                        message: format!(
                            "Cannot find a mapping '{name}' in '{}' ({})",
                            occurrence.display_text(),
                            path.display()
                        ),
                    });
                }
                Decision::Discard => return Ok(self.collapsed(tag)),
            };
            if dedupe && !emitted.insert(value) {
                continue;
            }
            pieces.push(format!("{}{}{}", token.leading, value, token.trailing));
        }

        if pieces.is_empty() {
            return Ok(match self.mode {
                ReplaceMode::MapOrDefault => Some(format!("{tag}({default}):")),
                _ => None,
            });
        }
        Ok(Some(format!("{tag}({}):", pieces.join(","))))
    }
}

impl fmt::Debug for ReplaceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaceEngine")
            .field("tags", &self.tags)
            .field("mode", &self.mode)
            .field("mapping", &self.mapping)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
