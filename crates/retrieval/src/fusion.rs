//! Weighted reciprocal rank fusion.
//!
//! For each document `d`:
//!
//! ```text
//! score(d) = sum over methods m of  weight(m) / (rrf_k + rank_m(d) + 1)
//! ```
//!
//! where `rank_m(d)` is the 0-based rank of `d` in the list produced by `m`.
//! Documents missing from a list get nothing from it. Documents whose score
//! is zero (present only in zero-weight lists) are dropped, which makes
//! `alpha = 1.0` reproduce the semantic order exactly and `alpha = 0.0` the
//! lexical order.

use crate::types::{FusedResult, RankedCandidate, RetrievalMethod};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Default rank damping constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Stateless fusion of ranked lists. Safe to share across tasks.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    rrf_k: f64,
    /// Tie-break order; methods not listed follow in declaration order
    priority: Vec<RetrievalMethod>,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(
            DEFAULT_RRF_K,
            vec![RetrievalMethod::Semantic, RetrievalMethod::Lexical],
        )
    }
}

impl FusionEngine {
    pub fn new(rrf_k: f64, priority: Vec<RetrievalMethod>) -> Self {
        let mut full = Vec::with_capacity(RetrievalMethod::ALL.len());
        for method in priority.into_iter().chain(RetrievalMethod::ALL) {
            if !full.contains(&method) {
                full.push(method);
            }
        }

        Self {
            rrf_k: rrf_k.max(0.0),
            priority: full,
        }
    }

    /// Build from method names, ignoring unknown ones.
    pub fn from_names(rrf_k: f64, priority: &[String]) -> Self {
        Self::new(
            rrf_k,
            priority
                .iter()
                .filter_map(|name| RetrievalMethod::parse(name))
                .collect(),
        )
    }

    pub fn rrf_k(&self) -> f64 {
        self.rrf_k
    }

    /// Fuse lists with `alpha` weighting semantic against lexical.
    ///
    /// Semantic lists get `alpha`, lexical lists `1 - alpha`, any other
    /// method 1.0. `alpha` is clamped to `[0, 1]`.
    pub fn fuse(&self, lists: &[Vec<RankedCandidate>], alpha: f64, k: usize) -> Vec<FusedResult> {
        let alpha = if alpha.is_nan() { 0.5 } else { alpha.clamp(0.0, 1.0) };

        self.fuse_weighted(lists, k, |method| match method {
            RetrievalMethod::Semantic => alpha,
            RetrievalMethod::Lexical => 1.0 - alpha,
            RetrievalMethod::Web => 1.0,
        })
    }

    /// Fuse lists with an arbitrary non-negative weight per method.
    pub fn fuse_weighted<W>(&self, lists: &[Vec<RankedCandidate>], k: usize, weight: W) -> Vec<FusedResult>
    where
        W: Fn(RetrievalMethod) -> f64,
    {
        if lists.iter().all(Vec::is_empty) {
            tracing::debug!("Fusion input is empty; returning no candidates");
            return Vec::new();
        }

        // Best rank per (document, method)
        let mut ranks: HashMap<&str, BTreeMap<RetrievalMethod, usize>> = HashMap::new();
        for candidate in lists.iter().flatten() {
            let per_method = ranks.entry(candidate.chunk_id.as_str()).or_default();
            per_method
                .entry(candidate.method)
                .and_modify(|r| *r = (*r).min(candidate.rank))
                .or_insert(candidate.rank);
        }

        let mut fused: Vec<(&str, f64, &BTreeMap<RetrievalMethod, usize>)> = ranks
            .iter()
            .map(|(id, per_method)| {
                let score = per_method
                    .iter()
                    .map(|(method, rank)| weight(*method).max(0.0) / (self.rrf_k + *rank as f64 + 1.0))
                    .sum::<f64>();
                (*id, score, per_method)
            })
            .filter(|(_, score, _)| *score > 0.0)
            .collect();

        fused.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.compare_ranks(a.2, b.2))
                .then_with(|| a.0.cmp(b.0))
        });
        fused.truncate(k);

        fused
            .into_iter()
            .map(|(id, score, _)| FusedResult {
                chunk_id: id.to_string(),
                fused_score: score,
            })
            .collect()
    }

    fn compare_ranks(
        &self,
        a: &BTreeMap<RetrievalMethod, usize>,
        b: &BTreeMap<RetrievalMethod, usize>,
    ) -> Ordering {
        for method in &self.priority {
            let ra = a.get(method).copied().unwrap_or(usize::MAX);
            let rb = b.get(method).copied().unwrap_or(usize::MAX);
            match ra.cmp(&rb) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}
