//! Language-model-backed capabilities.
//!
//! Each capability renders one prompt definition (built-in or workspace
//! override), sends it to an [`LlmClient`] and parses the reply through a
//! serde schema. A provider that cannot be reached becomes
//! [`CapabilityError::Unavailable`]. Error statuses, undecodable bodies,
//! prompts that fail to render and replies that do not fit the schema all
//! become [`CapabilityError::Malformed`].

mod judge;
mod planner;
mod synthesizer;

pub use judge::LlmJudge;
pub use planner::LlmPlanner;
pub use synthesizer::LlmSynthesizer;

use crate::error::CapabilityError;
use serde::de::DeserializeOwned;
use sleuth_core::{AppError, AppResult};
use sleuth_llm::{LlmClient, LlmRequest};
use sleuth_prompt::{build_prompt, load_prompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A prompt definition bound to a client and model.
#[derive(Clone)]
pub(crate) struct PromptedCall {
    client: Arc<dyn LlmClient>,
    model: String,
    definition: PromptDefinition,
}

impl PromptedCall {
    pub(crate) fn load(
        client: Arc<dyn LlmClient>,
        model: &str,
        workspace: &Path,
        prompt_id: &str,
    ) -> AppResult<Self> {
        Ok(Self {
            client,
            model: model.to_string(),
            definition: load_prompt(workspace, prompt_id)?,
        })
    }

    /// Render the prompt and return the raw completion text.
    pub(crate) async fn complete(
        &self,
        variables: HashMap<String, String>,
    ) -> Result<String, CapabilityError> {
        let built = build_prompt(&self.definition, variables)
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        let mut request = LlmRequest::new(built.user, &self.model);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = built.metadata.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = built.metadata.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if built.metadata.expects_json {
            request = request.with_json_format();
        }

        tracing::debug!(
            prompt = %built.metadata.source_prompt_id,
            provider = self.client.provider_name(),
            "Calling language model"
        );

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(classify_client_error)?;

        tracing::debug!(
            prompt = %built.metadata.source_prompt_id,
            tokens = response.usage.total_tokens,
            "Model replied"
        );

        Ok(response.content)
    }
}

/// Only an unreachable provider is `Unavailable`; anything it answered is `Malformed`.
fn classify_client_error(error: AppError) -> CapabilityError {
    match error {
        AppError::LlmReply(reason) => CapabilityError::Malformed(reason),
        other => CapabilityError::Unavailable(other.to_string()),
    }
}

/// Locate the JSON object in a reply that may be wrapped in prose or a
/// Markdown code fence.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a reply into `T`, reporting schema violations as `Malformed`.
pub(crate) fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, CapabilityError> {
    let json = extract_json_object(text)
        .ok_or_else(|| CapabilityError::Malformed("reply contains no JSON object".to_string()))?;

    serde_json::from_str(json).map_err(|e| CapabilityError::Malformed(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use sleuth_core::{AppError, AppResult};
    use sleuth_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
    use std::sync::Mutex;

    /// Replays canned replies and records the requests it received.
    pub struct ScriptedClient {
        replies: Mutex<Vec<AppResult<String>>>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<AppResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub fn failing() -> Self {
            Self::new(vec![Err(AppError::Llm("connection refused".to_string()))])
        }

        /// The provider answered with an HTTP error status.
        pub fn rejecting(status: u16, message: &str) -> Self {
            Self::new(vec![Err(AppError::LlmReply(format!(
                "Ollama API error ({}): {}",
                status, message
            )))])
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.is_empty() {
                Err(AppError::Llm("no scripted reply left".to_string()))
            } else {
                replies.remove(0)
            };

            reply.map(|content| LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::new(10, 10),
                done: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        value: u8,
    }

    #[test]
    fn test_extract_from_code_fence() {
        let text = "Here you go:\n```json\n{\"value\": 3}\n```";
        assert_eq!(extract_json_object(text), Some("{\"value\": 3}"));
    }

    #[test]
    fn test_extract_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_client_error_classification() {
        assert!(matches!(
            classify_client_error(AppError::Llm("connection refused".to_string())),
            CapabilityError::Unavailable(_)
        ));
        assert!(matches!(
            classify_client_error(AppError::LlmReply("Ollama API error (500)".to_string())),
            CapabilityError::Malformed(_)
        ));
    }

    #[test]
    fn test_parse_reply_strict_types() {
        assert_eq!(parse_reply::<Reply>("{\"value\": 3}").unwrap(), Reply { value: 3 });
        assert!(matches!(
            parse_reply::<Reply>("{\"value\": \"3\"}"),
            Err(CapabilityError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply::<Reply>("{\"other\": 1}"),
            Err(CapabilityError::Malformed(_))
        ));
    }
}
