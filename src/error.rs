//! Error taxonomy and remote failure classification
//!
//! The platform reports job failures as free-text messages written for humans,
//! so classification is substring matching against an ordered rule table. The
//! table is the single place new phrasings get added; anything unmatched is
//! logged and falls through to [`Error::Platform`]. The source of truth here
//! is vendor-controlled prose - expect rules to grow over time.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// All errors surfaced to the schema layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input (bad locator, bad ceiling, bad configuration).
    /// Local and immediate; never the result of a network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The remote object does not exist. Callers treat this as "absent",
    /// not as a failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// Deletion was rejected because dependent child resources are still
    /// tearing down. Retried on a bounded cadence before being surfaced.
    #[error("dependent resources still releasing: {0}")]
    DependencyConflict(String),

    /// A poll loop exhausted its deadline or ceiling.
    #[error("timed out after {limit:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        limit: Duration,
    },

    /// The platform answered, but not in the shape the synthesized script
    /// promised. Indicates a synthesizer/engine contract mismatch and is
    /// never silently swallowed.
    #[error("malformed platform response: {0}")]
    MalformedResponse(String),

    /// Any other remote failure, message preserved verbatim plus operator
    /// diagnostics where available.
    #[error("platform error: {0}")]
    Platform(String),

    /// The platform was never reached.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_dependency_conflict(&self) -> bool {
        matches!(self, Error::DependencyConflict(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map a literal transport status code into the taxonomy. Used by the HTTP
/// layer, where a status code is available; job failures only carry prose and
/// go through [`Classifier`] instead.
pub fn classify_status(status: u16, detail: &str) -> Error {
    match status {
        404 => Error::NotFound(format!("status 404: {}", detail)),
        401 | 403 => Error::Platform(format!(
            "authentication rejected (status {}): {}",
            status, detail
        )),
        _ => Error::Platform(format!("request failed (status {}): {}", status, detail)),
    }
}

/// What a classification rule maps a message onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    NotFound,
    DependencyConflict,
}

/// One entry of the rule table: a named predicate over the raw message.
pub struct Rule {
    name: &'static str,
    kind: RemoteErrorKind,
    matches: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Rule {
    /// Rule that fires when the message contains `needle` (case-insensitive).
    pub fn contains(name: &'static str, kind: RemoteErrorKind, needle: &'static str) -> Self {
        Self {
            name,
            kind,
            matches: Box::new(move |msg| msg.to_lowercase().contains(&needle.to_lowercase())),
        }
    }

    /// Rule with an arbitrary predicate.
    pub fn predicate<F>(name: &'static str, kind: RemoteErrorKind, pred: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            matches: Box::new(pred),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered rule table mapping free-text platform failures into error kinds.
/// First matching rule wins; unmatched messages are logged and classified
/// as [`Error::Platform`].
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Empty table. Use [`Classifier::default`] for the known platform
    /// phrasings.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Rules are checked in insertion order.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Classify a raw failure message into the taxonomy. The message is
    /// preserved verbatim inside the returned variant.
    pub fn classify(&self, message: &str) -> Error {
        for rule in &self.rules {
            if (rule.matches)(message) {
                tracing::debug!(rule = rule.name, "classified platform failure");
                return match rule.kind {
                    RemoteErrorKind::NotFound => Error::NotFound(message.to_string()),
                    RemoteErrorKind::DependencyConflict => {
                        Error::DependencyConflict(message.to_string())
                    }
                };
            }
        }
        tracing::warn!(%message, "unclassified platform failure; add a rule if this recurs");
        Error::Platform(message.to_string())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::empty()
            .rule(Rule::contains(
                "not-found-text",
                RemoteErrorKind::NotFound,
                "could not be found",
            ))
            // The platform sometimes embeds the bare status code in prose.
            .rule(Rule::contains(
                "not-found-status",
                RemoteErrorKind::NotFound,
                "404",
            ))
            // Two known teardown phrasings: deployments with members still
            // releasing, and servers with an instance still attached.
            .rule(Rule::contains(
                "deployment-teardown",
                RemoteErrorKind::DependencyConflict,
                "has active member resources",
            ))
            .rule(Rule::contains(
                "server-teardown",
                RemoteErrorKind::DependencyConflict,
                "still referenced by a provisioned instance",
            ))
    }
}
