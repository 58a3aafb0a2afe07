// resolver.rs — The corpus resolver interface.
//
// Relevance scoring against the principal's frozen corpus happens outside
// this crate. The agent only needs a confidence in [0, 100] and the
// citations that justify it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference to a frozen (write-once) corpus snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorpusRef(pub String);

impl fmt::Display for CorpusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub confidence: u8,
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("corpus resolver unavailable: {0}")]
    Unavailable(String),

    #[error("malformed resolver response: {0}")]
    Malformed(String),
}

/// Scores a goal against a corpus snapshot.
///
/// Implementations must be idempotent for identical inputs within one
/// snapshot.
pub trait CorpusResolver {
    fn resolve(&self, goal_description: &str, corpus: &CorpusRef) -> Result<Resolution, ResolveError>;
}

impl<F> CorpusResolver for F
where
    F: Fn(&str, &CorpusRef) -> Result<Resolution, ResolveError>,
{
    fn resolve(&self, goal_description: &str, corpus: &CorpusRef) -> Result<Resolution, ResolveError> {
        self(goal_description, corpus)
    }
}

/// Resolve and reject confidences outside [0, 100].
pub(crate) fn resolve_checked(
    resolver: &dyn CorpusResolver,
    goal_description: &str,
    corpus: &CorpusRef,
) -> Result<Resolution, ResolveError> {
    let resolution = resolver.resolve(goal_description, corpus)?;
    if resolution.confidence > 100 {
        return Err(ResolveError::Malformed(format!(
            "confidence {} outside 0..=100",
            resolution.confidence
        )));
    }
    Ok(resolution)
}

/// Answers every query with the same resolution. Used when the score has
/// already been computed elsewhere and is handed in by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResolver {
    resolution: Resolution,
}

impl StaticResolver {
    pub fn new(confidence: u8, citations: Vec<String>) -> Self {
        Self {
            resolution: Resolution {
                confidence,
                citations,
            },
        }
    }
}

impl CorpusResolver for StaticResolver {
    fn resolve(&self, _goal_description: &str, _corpus: &CorpusRef) -> Result<Resolution, ResolveError> {
        Ok(self.resolution.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_is_idempotent() {
        let r = StaticResolver::new(97, vec!["journal/2019-04".into()]);
        let corpus = CorpusRef("corpus-v1".into());
        assert_eq!(r.resolve("fund a library", &corpus), r.resolve("fund a library", &corpus));
    }

    #[test]
    fn out_of_range_confidence_is_malformed() {
        let r = StaticResolver::new(101, vec![]);
        let err = resolve_checked(&r, "goal", &CorpusRef("c".into())).unwrap_err();
        assert!(matches!(err, ResolveError::Malformed(_)));
    }
}
