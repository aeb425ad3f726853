//! Typed arguments for the read operations.
//!
//! # Design
//! Each optional knob of a read is a named field, so an unsupported
//! combination does not compile instead of failing at runtime. `MultiGetQuery`
//! keeps a positional constructor for callers that forward raw argument
//! lists; it enforces the two-argument minimum.

use crate::error::HostDbError;

/// Options for `HostDb::get`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Fetch this revision instead of the current value.
    pub revision: Option<String>,
    /// Ask the server for the unformatted value.
    pub raw: bool,
}

impl GetOptions {
    pub fn revision(revision: impl Into<String>) -> Self {
        Self {
            revision: Some(revision.into()),
            ..Self::default()
        }
    }

    pub fn raw() -> Self {
        Self {
            raw: true,
            ..Self::default()
        }
    }
}

/// Arguments for `HostDb::multi_get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiGetQuery {
    pub id_pattern: String,
    /// The server-side `foreach` expression.
    pub foreach: String,
    pub revision: Option<String>,
}

impl MultiGetQuery {
    pub fn new(id_pattern: impl Into<String>, foreach: impl Into<String>) -> Self {
        Self {
            id_pattern: id_pattern.into(),
            foreach: foreach.into(),
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Build from positional `[id_pattern, foreach, revision?]` arguments.
    /// Extra arguments past the third are ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, HostDbError> {
        match args {
            [id_pattern, foreach, rest @ ..] => {
                let query = Self::new(id_pattern.as_ref(), foreach.as_ref());
                Ok(match rest.first() {
                    Some(revision) => query.with_revision(revision.as_ref()),
                    None => query,
                })
            }
            _ => Err(HostDbError::InvalidParams),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), HostDbError> {
        if self.id_pattern.is_empty() || self.foreach.is_empty() {
            return Err(HostDbError::InvalidParams);
        }
        Ok(())
    }
}

/// Options for `HostDb::revisions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionsOptions {
    /// Return at most this many revisions.
    pub limit: Option<u32>,
}
