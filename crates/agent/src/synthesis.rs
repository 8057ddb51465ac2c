//! Answer synthesis with validated citations.

use crate::capabilities::{SynthesisRequest, Synthesizer};
use crate::error::CapabilityError;
use crate::types::{Citation, EvidenceRecord, EvidenceSet, SynthesizedAnswer};
use std::collections::HashSet;
use std::sync::Arc;

/// Prefix put in front of answers that are not backed by sufficient evidence.
pub const LOW_CONFIDENCE_PREFIX: &str = "[Low confidence: evidence may be incomplete] ";

const NO_EVIDENCE_ANSWER: &str = "No supporting evidence was found for this question.";

/// Turns accumulated evidence into a cited answer.
///
/// The generator only writes text and names chunk ids. Citations are checked
/// against the task's evidence here, so an answer can never cite a chunk the
/// task did not retrieve.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    generator: Arc<dyn Synthesizer>,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn Synthesizer>) -> Self {
        Self { generator }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        evidence: &EvidenceSet,
        low_confidence: bool,
    ) -> Result<SynthesizedAnswer, CapabilityError> {
        let ordered = evidence.by_iteration();

        if ordered.is_empty() {
            tracing::info!("No evidence to synthesize from");
            return Ok(SynthesizedAnswer {
                answer: format!("{}{}", LOW_CONFIDENCE_PREFIX, NO_EVIDENCE_ANSWER),
                citations: Vec::new(),
                low_confidence: true,
            });
        }

        let context = build_context(&ordered);
        let draft = self
            .generator
            .synthesize(SynthesisRequest {
                question,
                context: &context,
                evidence: &ordered,
                low_confidence,
            })
            .await?;

        let cited_ids = match draft.citations {
            Some(ids) if !ids.is_empty() => ids,
            _ => harvest_citations(&draft.answer),
        };
        let citations = resolve_citations(&cited_ids, evidence);

        let body = draft.answer.trim();
        let answer = if low_confidence && !body.starts_with(LOW_CONFIDENCE_PREFIX.trim_end()) {
            format!("{}{}", LOW_CONFIDENCE_PREFIX, body)
        } else {
            body.to_string()
        };

        Ok(SynthesizedAnswer {
            answer,
            citations,
            low_confidence,
        })
    }
}

/// Render evidence as tagged blocks: `[chunk-id | tool | iteration N | source]`.
pub fn build_context(evidence: &[&EvidenceRecord]) -> String {
    evidence
        .iter()
        .map(|r| {
            format!(
                "[{} | {} | iteration {} | {}]\n{}",
                r.chunk_id,
                r.originating_tool,
                r.iteration,
                r.source_uri,
                r.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collect ids written inline as `[chunk-id]` or `[id-1, id-2]`.
pub fn harvest_citations(text: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };

        for id in after[..close].split([',', ';']) {
            let id = id.trim();
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
        rest = &after[close + 1..];
    }

    ids
}

/// Keep ids present in the evidence, first mention first, without duplicates.
fn resolve_citations(ids: &[String], evidence: &EvidenceSet) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();

    for id in ids {
        let id = id.trim();
        if !seen.insert(id.to_string()) {
            continue;
        }

        match evidence.get(id) {
            Some(record) => citations.push(Citation {
                chunk_id: record.chunk_id.clone(),
                source_uri: record.source_uri.clone(),
            }),
            None => tracing::debug!(chunk_id = id, "Dropping citation not present in evidence"),
        }
    }

    citations
}
