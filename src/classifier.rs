//! Classifier collaborator contract.
//!
//! The classifier is an external scoring/labeling service. The engine only
//! depends on the shape of its output: a JSON document matching
//! [`AnalysisResult`](crate::case::AnalysisResult). Model choice, prompting,
//! and transport all live behind this trait.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::case::AnalysisResult;

/// External content classifier.
///
/// Implementations return the *raw* model output. Parsing happens in the
/// analyze node so that an unparseable response degrades to the conservative
/// fallback verdict instead of failing the workflow.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Score the given content. Errors here are transient-external and
    /// surface to the dispatcher's retry policy.
    async fn analyze(&self, content_text: &str) -> Result<String, ClassifierError>;
}

/// Failure reaching or invoking the classifier service.
#[derive(Debug, Error, Diagnostic)]
pub enum ClassifierError {
    #[error("classifier provider error ({provider}): {message}")]
    #[diagnostic(
        code(guardian::classifier::provider),
        help("The classifier backend failed; the dispatch will be retried.")
    )]
    Provider {
        provider: &'static str,
        message: String,
    },
}

/// Parse raw classifier output into a structured verdict.
///
/// Returns `None` when the output is not valid JSON or does not match the
/// verdict shape; the caller substitutes [`AnalysisResult::fallback`]. This
/// is the degraded-but-non-fatal path: it is recorded in the case history,
/// never surfaced as an error.
#[must_use]
pub fn parse_verdict(raw: &str) -> Option<AnalysisResult> {
    serde_json::from_str::<AnalysisResult>(raw).ok()
}
