//! Revisions as read from an origin repository.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::label::Label;

/// Opaque revision identifier (a commit SHA for git).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RevisionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RevisionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A node of the revision DAG plus its metadata.
///
/// Revisions are owned by the backing repository; the walk only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    /// Parent ids in repository order; the first one is the first parent.
    pub parents: Vec<RevisionId>,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// The reference this revision was resolved from, when it was resolved
    /// by name (e.g. `refs/changes/45/12345/3`).
    pub context_reference: Option<String>,
}

impl Revision {
    pub fn new(id: impl Into<RevisionId>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            parents: Vec::new(),
            author: String::new(),
            timestamp,
            message: String::new(),
            context_reference: None,
        }
    }

    pub fn with_parents<I>(mut self, parents: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<RevisionId>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_context_reference(mut self, reference: impl Into<String>) -> Self {
        self.context_reference = Some(reference.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Every label line of the message, in order.
    pub fn labels(&self) -> Vec<Label> {
        Label::parse_all(&self.message)
    }

    /// Values of all labels called `name`, in message order.
    pub fn label_values(&self, name: &str) -> Vec<String> {
        self.labels()
            .into_iter()
            .filter(|label| label.name == name)
            .map(|label| label.value)
            .collect()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context_reference {
            Some(reference) => write!(f, "{} ({reference})", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}
