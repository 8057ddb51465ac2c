//! Built-in prompt definitions.
//!
//! Each definition can be replaced per workspace by dropping a YAML file with
//! the same id into `.sleuth/prompts/`.

/// Prompt used by the planner capability.
pub const PLANNER_PROMPT_ID: &str = "agent.plan";

/// Prompt used by the judge capability.
pub const JUDGE_PROMPT_ID: &str = "agent.judge";

/// Prompt used by the synthesizer capability.
pub const SYNTHESIZER_PROMPT_ID: &str = "agent.synthesize";

const PLANNER_YAML: &str = r#"
id: agent.plan
title: Retrieval planner
apiVersion: "1.0"
createdBy: sleuth
behavior:
  temperature: 0.1
  maxTokens: 400
system: |
  You choose the next evidence-retrieval step for a research assistant.
  Pick exactly one tool from the list and write the query to send to it.
  You may rewrite the question into a better search query, using what earlier
  attempts were missing. Never repeat a tool and query pair that was already tried.
  Reply with a single JSON object and nothing else:
  {"tool": "<tool name>", "query": "<search query>", "rationale": "<one sentence>"}
input:
  required: [question, tools, attempts]
template: |
  Question:
  {{question}}

  Available tools:
  {{tools}}

  Attempts so far:
  {{attempts}}
  {{#if feedback}}

  Reviewer note:
  {{feedback}}
  {{/if}}
output:
  format: json
"#;

const JUDGE_YAML: &str = r#"
id: agent.judge
title: Evidence judge
apiVersion: "1.0"
createdBy: sleuth
behavior:
  temperature: 0.0
  maxTokens: 300
system: |
  You judge whether the collected evidence is enough to answer a question.
  Score the evidence from 1 (useless) to 10 (fully answers the question).
  Evidence scoring {{threshold}} or more is normally sufficient.
  Reply with a single JSON object and nothing else:
  {"score": <integer 1-10>, "sufficient": <true|false>, "rationale": "<short reason>", "missing": "<what is still missing, or null>"}
input:
  required: [question, evidence, threshold]
template: |
  Question:
  {{question}}

  Evidence:
  {{evidence}}
output:
  format: json
"#;

const SYNTHESIZER_YAML: &str = r#"
id: agent.synthesize
title: Cited answer synthesizer
apiVersion: "1.0"
createdBy: sleuth
behavior:
  temperature: 0.3
  maxTokens: 1000
system: |
  You answer questions using only the evidence provided.
  Every evidence item starts with a header like [chunk-id | tool | iteration | source].
  Cite the chunk ids that support each statement inline as [chunk-id].
  If the evidence does not answer the question, say so plainly.
  {{#if low_confidence}}
  The evidence may be incomplete. Make clear which parts of the answer are uncertain.
  {{/if}}
  Reply with a single JSON object and nothing else:
  {"answer": "<answer text with inline [chunk-id] citations>", "citations": ["<chunk-id>", ...]}
input:
  required: [question, context]
template: |
  Question:
  {{question}}

  Evidence:
  {{context}}
output:
  format: json
"#;

/// Look up the YAML source of a built-in prompt.
pub fn builtin_source(prompt_id: &str) -> Option<&'static str> {
    match prompt_id {
        PLANNER_PROMPT_ID => Some(PLANNER_YAML),
        JUDGE_PROMPT_ID => Some(JUDGE_YAML),
        SYNTHESIZER_PROMPT_ID => Some(SYNTHESIZER_YAML),
        _ => None,
    }
}

/// Ids of all built-in prompts.
pub fn builtin_ids() -> [&'static str; 3] {
    [PLANNER_PROMPT_ID, JUDGE_PROMPT_ID, SYNTHESIZER_PROMPT_ID]
}
