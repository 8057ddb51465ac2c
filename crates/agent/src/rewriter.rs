//! Query rewriting before the first planning round.

/// Strategy for turning a conversational question into a standalone one.
#[async_trait::async_trait]
pub trait QueryRewriter: Send + Sync {
    /// Rewrite `question`, optionally using the question asked before it.
    async fn rewrite(&self, question: &str, previous: Option<&str>) -> String;
}

/// Leaves the question untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughRewriter;

#[async_trait::async_trait]
impl QueryRewriter for PassthroughRewriter {
    async fn rewrite(&self, question: &str, _previous: Option<&str>) -> String {
        question.trim().to_string()
    }
}

/// Phrases that introduce a follow-up; the rest of the sentence is the topic.
const FOLLOW_UP_PREFIXES: &[&str] = &[
    "tell me more about",
    "tell me more",
    "more about",
    "what about",
    "how about",
    "and what about",
    "elaborate on",
    "elaborate",
    "explain further",
    "go on",
    "continue",
    "and",
];

/// Pronouns that only make sense with an earlier question.
const DANGLING_REFERENCES: &[&str] = &["it", "that", "this", "those", "them", "they"];

/// Short questions with dangling references count as follow-ups up to this length.
const MAX_REFERENCE_WORDS: usize = 5;

/// Rule-based detection of follow-up questions.
///
/// "tell me more" becomes the previous question asking for more detail;
/// "what about lifetimes?" becomes the new topic anchored to the previous
/// question.
#[derive(Debug, Default, Clone, Copy)]
pub struct FollowUpRewriter;

impl FollowUpRewriter {
    fn split_follow_up(question: &str) -> Option<String> {
        let lower = question.to_lowercase();
        let lower = lower.trim();

        for prefix in FOLLOW_UP_PREFIXES {
            if let Some(rest) = lower.strip_prefix(prefix) {
                // Whole-word prefixes only ("andrew" is not "and")
                if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace() || c.is_ascii_punctuation()) {
                    continue;
                }
                let offset = question.len() - question.trim_start().len() + prefix.len();
                let remainder = question.get(offset..).unwrap_or("");
                return Some(
                    remainder
                        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '?' | '.' | '!' | ','))
                        .to_string(),
                );
            }
        }

        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if words.len() <= MAX_REFERENCE_WORDS && words.iter().any(|w| DANGLING_REFERENCES.contains(w)) {
            return Some(question.trim().to_string());
        }

        None
    }
}

#[async_trait::async_trait]
impl QueryRewriter for FollowUpRewriter {
    async fn rewrite(&self, question: &str, previous: Option<&str>) -> String {
        let question = question.trim();
        let Some(previous) = previous.map(str::trim).filter(|p| !p.is_empty()) else {
            return question.to_string();
        };

        let rewritten = match Self::split_follow_up(question) {
            Some(topic) if topic.is_empty() => format!("{} (more detail)", previous),
            Some(topic) => format!("{} (in the context of: {})", topic, previous),
            None => return question.to_string(),
        };

        tracing::info!(original = question, rewritten = %rewritten, "Rewrote follow-up question");
        rewritten
    }
}
