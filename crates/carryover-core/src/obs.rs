//! Structured observability hooks for transform passes and history walks.
//!
//! This module provides:
//! - A transform-scoped tracing span via the `TransformSpan` RAII guard
//! - Emission functions for key events: transform start/finish, per-file
//!   outcomes, walk completion and baseline resolution
//!
//! Events are emitted at `info!` level unless noted. For JSON output pass
//! `json = true` to [`crate::telemetry::init_tracing`].

use std::path::Path;

use tracing::{debug, info, warn};

use crate::history::RevisionId;
use crate::replace::{ReplaceMode, TransformReport};

/// RAII guard that enters a span for the duration of a transform pass.
///
/// ```ignore
/// let _span = TransformSpan::enter(root, ReplaceMode::Mapping);
/// // every event below is tagged with root and mode
/// ```
pub struct TransformSpan {
    _span: tracing::span::EnteredSpan,
}

impl TransformSpan {
    pub fn enter(root: &Path, mode: ReplaceMode) -> Self {
        let span = tracing::info_span!("carryover.transform", root = %root.display(), mode = %mode);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_transform_started(root: &Path, mode: ReplaceMode, files: usize) {
    info!(event = "replace.started", root = %root.display(), mode = %mode, files = files);
}

pub fn emit_file_rewritten(path: &Path, occurrences: usize) {
    debug!(event = "replace.file_rewritten", path = %path.display(), occurrences = occurrences);
}

/// Warning level: a file could not be rewritten.
pub fn emit_file_failed(path: &Path, error: &dyn std::fmt::Display) {
    warn!(event = "replace.file_failed", path = %path.display(), error = %error);
}

/// Warning level: a token list was left alone or a piece dropped because it
/// does not look like a list of identifiers.
pub fn emit_malformed_skipped(path: &Path, line: usize, text: &str) {
    warn!(
        event = "replace.malformed_skipped",
        path = %path.display(),
        line = line,
        text = %text,
        "skipping text that doesn't match expected format"
    );
}

pub fn emit_transform_finished(report: &TransformReport, failed: usize) {
    info!(
        event = "replace.finished",
        scanned = report.files_scanned,
        skipped = report.files_skipped,
        changed = report.changed.len(),
        occurrences = report.occurrences_rewritten,
        failed = failed,
    );
}

pub fn emit_walk_finished(start: &RevisionId, visited: usize, terminated: bool) {
    debug!(
        event = "history.walk_finished",
        start = %start,
        visited = visited,
        terminated = terminated,
    );
}

pub fn emit_baseline_resolved(start: &RevisionId, baseline: &RevisionId) {
    info!(event = "history.baseline_resolved", start = %start, baseline = %baseline);
}
