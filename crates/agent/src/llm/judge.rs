use super::{parse_reply, PromptedCall};
use crate::capabilities::Judge;
use crate::error::CapabilityError;
use crate::synthesis::build_context;
use crate::types::{EvidenceRecord, Verdict};
use serde::Deserialize;
use sleuth_core::AppResult;
use sleuth_llm::LlmClient;
use sleuth_prompt::JUDGE_PROMPT_ID;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Reply schema. `score` must be a JSON integer; strings and floats are rejected.
#[derive(Debug, Deserialize)]
struct JudgeReply {
    score: u8,
    sufficient: bool,
    rationale: String,
    #[serde(default)]
    missing: Option<String>,
}

/// Judge backed by the `agent.judge` prompt.
#[derive(Clone)]
pub struct LlmJudge {
    call: PromptedCall,
    threshold: u8,
}

impl LlmJudge {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: &str,
        workspace: &Path,
        threshold: u8,
    ) -> AppResult<Self> {
        Ok(Self {
            call: PromptedCall::load(client, model, workspace, JUDGE_PROMPT_ID)?,
            threshold,
        })
    }
}

#[async_trait::async_trait]
impl Judge for LlmJudge {
    async fn evaluate(
        &self,
        question: &str,
        evidence: &[EvidenceRecord],
    ) -> Result<Verdict, CapabilityError> {
        let ordered: Vec<&EvidenceRecord> = evidence.iter().collect();

        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("evidence".to_string(), build_context(&ordered));
        variables.insert("threshold".to_string(), self.threshold.to_string());

        let reply = self.call.complete(variables).await?;
        let parsed: JudgeReply = parse_reply(&reply)?;

        let verdict = Verdict {
            score: parsed.score,
            sufficient: parsed.sufficient,
            rationale: parsed.rationale.trim().to_string(),
            missing: parsed
                .missing
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        };

        if !verdict.is_valid() {
            return Err(CapabilityError::Malformed(format!(
                "score {} outside {}..={}",
                verdict.score,
                Verdict::MIN_SCORE,
                Verdict::MAX_SCORE
            )));
        }

        Ok(verdict)
    }
}
