//! Content analysis node.

use std::sync::Arc;

use async_trait::async_trait;

use crate::case::{AnalysisResult, Case, CaseStatus};
use crate::classifier::{Classifier, parse_verdict};
use crate::node::{Node, NodeContext, NodeError};

/// Invokes the external classifier once and records its verdict.
///
/// There is no internal retry: a transport failure surfaces as a fatal node
/// error and the dispatcher re-runs the unit of work from the last
/// checkpoint. Unparseable classifier *output*, by contrast, degrades to the
/// conservative fallback verdict and is only noted in the case history.
pub struct AnalyzeNode {
    classifier: Arc<dyn Classifier>,
}

impl AnalyzeNode {
    #[must_use]
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Node for AnalyzeNode {
    async fn run(&self, mut case: Case, ctx: &NodeContext) -> Result<Case, NodeError> {
        ctx.emit("analyze", "Analyzing content");
        case.record_event("Starting content analysis.");

        let raw = self.classifier.analyze(&case.content_text).await?;

        let verdict = match parse_verdict(&raw) {
            Some(verdict) => {
                case.record_event(format!(
                    "Classifier analysis successful: {:?}",
                    verdict.suggested_action
                ));
                verdict
            }
            None => {
                tracing::warn!(case = %case.case_id, "classifier output unparseable, using fallback");
                case.record_event("Classifier analysis failed, using fallback verdict.");
                AnalysisResult::fallback()
            }
        };

        ctx.emit(
            "analyze",
            format!(
                "Verdict: {:?} (confidence {})",
                verdict.suggested_action, verdict.confidence_score
            ),
        );
        case.analysis_result = Some(verdict);
        case.status = CaseStatus::AiAnalysisComplete;
        Ok(case)
    }
}
