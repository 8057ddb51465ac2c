//! BM25 lexical index.
//!
//! Scores are computed with the non-negative IDF variant
//! `ln(1 + (N - df + 0.5) / (df + 0.5))`, so every matching term contributes
//! a positive amount and a chunk with no query term never scores.

use crate::corpus::Corpus;
use crate::text::tokenize;
use crate::types::{RankedCandidate, RetrievalMethod};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// BM25 free parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f64,
    /// Length normalization strength (0 disables it)
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Inverted index over a shared corpus.
#[derive(Debug)]
pub struct LexicalIndex {
    corpus: Arc<Corpus>,
    params: Bm25Params,
    /// term -> (chunk position, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f64,
}

impl LexicalIndex {
    /// Build the index from precomputed term statistics.
    pub fn build(corpus: Arc<Corpus>, params: Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(corpus.len());

        for (position, chunk) in corpus.chunks().iter().enumerate() {
            let owned;
            let stats = match &chunk.term_stats {
                Some(stats) => stats,
                None => {
                    owned = crate::types::TermStats::from_text(&chunk.text);
                    &owned
                }
            };

            doc_lengths.push(stats.length);
            for (term, &tf) in &stats.term_freqs {
                postings.entry(term.clone()).or_default().push((position, tf));
            }
        }

        let total: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            total as f64 / doc_lengths.len() as f64
        };

        tracing::debug!(
            chunks = doc_lengths.len(),
            terms = postings.len(),
            avg_doc_length,
            "Built lexical index"
        );

        Self {
            corpus,
            params,
            postings,
            doc_lengths,
            avg_doc_length,
        }
    }

    /// Return up to `k` chunks ranked by BM25 score.
    ///
    /// Only chunks sharing at least one term with the query are returned.
    /// Equal scores are ordered by corpus position.
    pub fn search(&self, query: &str, k: usize) -> Vec<RankedCandidate> {
        if k == 0 || self.doc_lengths.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let terms: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();

        let n = self.doc_lengths.len() as f64;
        let mut scores: HashMap<usize, f64> = HashMap::new();

        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };

            let df = postings.len() as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for &(position, tf) in postings {
                *scores.entry(position).or_insert(0.0) += idf * self.term_weight(position, tf);
            }
        }

        let mut ranked: Vec<(usize, f64)> =
            scores.into_iter().filter(|(_, score)| *score > 0.0).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        let chunks = self.corpus.chunks();
        ranked
            .into_iter()
            .enumerate()
            .map(|(rank, (position, score))| RankedCandidate {
                chunk_id: chunks[position].id.clone(),
                method: RetrievalMethod::Lexical,
                rank,
                raw_score: score,
            })
            .collect()
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    fn term_weight(&self, position: usize, tf: u32) -> f64 {
        let Bm25Params { k1, b } = self.params;
        let tf = tf as f64;
        let length_ratio = if self.avg_doc_length > 0.0 {
            self.doc_lengths[position] as f64 / self.avg_doc_length
        } else {
            1.0
        };

        tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * length_ratio))
    }
}
