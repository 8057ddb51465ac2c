//! Loop-prevention guard.

use std::collections::HashSet;

/// Normalize a query for repeat detection.
///
/// Lowercases, collapses whitespace and strips trailing `?`, `!` and `.`, so
/// "What is RRF?" and "what  is rrf" count as the same query.
pub fn normalize_query(query: &str) -> String {
    let collapsed = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    collapsed
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.') || c.is_whitespace())
        .to_string()
}

/// `(tool, normalized query)` pairs already executed in one task.
#[derive(Debug, Default)]
pub struct LoopGuard {
    executed: HashSet<(String, String)>,
    tools_used: Vec<String>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this pair already ran.
    pub fn is_repeat(&self, tool: &str, query: &str) -> bool {
        self.executed
            .contains(&(tool.to_string(), normalize_query(query)))
    }

    /// Record an executed pair.
    pub fn record(&mut self, tool: &str, query: &str) {
        self.executed
            .insert((tool.to_string(), normalize_query(query)));
        if !self.tools_used.iter().any(|t| t == tool) {
            self.tools_used.push(tool.to_string());
        }
    }

    /// Tools used so far, in first-use order.
    pub fn tools_used(&self) -> impl Iterator<Item = &str> {
        self.tools_used.iter().map(String::as_str)
    }
}
