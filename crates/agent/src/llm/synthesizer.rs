use super::{extract_json_object, PromptedCall};
use crate::capabilities::{Draft, SynthesisRequest, Synthesizer};
use crate::error::CapabilityError;
use serde::Deserialize;
use sleuth_core::AppResult;
use sleuth_llm::LlmClient;
use sleuth_prompt::SYNTHESIZER_PROMPT_ID;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    answer: String,
    #[serde(default)]
    citations: Vec<CitedChunk>,
}

/// Models cite either bare ids or small objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CitedChunk {
    Id(String),
    Object {
        #[serde(alias = "chunkId", alias = "id")]
        chunk_id: String,
    },
}

impl CitedChunk {
    fn into_id(self) -> String {
        match self {
            CitedChunk::Id(id) => id,
            CitedChunk::Object { chunk_id } => chunk_id,
        }
    }
}

/// Synthesizer backed by the `agent.synthesize` prompt.
///
/// A reply that is not the expected JSON object is kept as plain answer text;
/// citations are then harvested from it by
/// [`AnswerSynthesizer`](crate::AnswerSynthesizer).
#[derive(Clone)]
pub struct LlmSynthesizer {
    call: PromptedCall,
}

impl LlmSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, model: &str, workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            call: PromptedCall::load(client, model, workspace, SYNTHESIZER_PROMPT_ID)?,
        })
    }
}

#[async_trait::async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Draft, CapabilityError> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), request.question.to_string());
        variables.insert("context".to_string(), request.context.to_string());
        if request.low_confidence {
            variables.insert("low_confidence".to_string(), "true".to_string());
        }

        let reply = self.call.complete(variables).await?;
        let raw = reply.trim();
        if raw.is_empty() {
            return Err(CapabilityError::Malformed("empty answer".to_string()));
        }

        let parsed = extract_json_object(raw)
            .and_then(|json| serde_json::from_str::<SynthesisReply>(json).ok());

        match parsed {
            Some(reply) if !reply.answer.trim().is_empty() => Ok(Draft {
                answer: reply.answer.trim().to_string(),
                citations: Some(reply.citations.into_iter().map(CitedChunk::into_id).collect()),
            }),
            Some(_) => Err(CapabilityError::Malformed("empty answer".to_string())),
            None => {
                tracing::debug!("Synthesizer reply was not JSON, using it as plain text");
                Ok(Draft {
                    answer: raw.to_string(),
                    citations: None,
                })
            }
        }
    }
}
