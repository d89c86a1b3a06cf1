//! Hybrid BM25 + TF-IDF index.
//!
//! BM25 alone under-rewards rare, distinguishing tokens in very short
//! documents such as action names, and TF-IDF alone ignores term-frequency
//! saturation. The final score is a fixed linear blend of both:
//!
//! ```text
//! score = w * bm25 / max_bm25 + (1 - w) * cosine_tfidf
//! ```
//!
//! BM25 is normalised by the best BM25 score of the query so both signals
//! live in `[0, 1]`. Weights are captured when the index is built and never
//! change afterwards, keeping scores comparable across queries.

use crate::search::synonyms::{Synonyms, SYNONYM_WEIGHT};
use crate::search::tokenize::tokenize;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Tunable scoring constants, fixed per index build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// BM25 term-frequency saturation.
    pub k1: f64,
    /// BM25 document-length normalisation.
    pub b: f64,
    /// Share of the BM25 signal in the final score (the rest is TF-IDF).
    pub bm25_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            bm25_weight: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: f64,
}

#[derive(Debug, Clone)]
struct TermEntry {
    postings: Vec<Posting>,
    idf_bm25: f64,
    idf_tfidf: f64,
}

/// An immutable search index over `(id, text)` documents.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    ids: Vec<String>,
    doc_len: Vec<f64>,
    /// Euclidean norm of each document's TF-IDF vector.
    doc_norm: Vec<f64>,
    avg_doc_len: f64,
    terms: BTreeMap<String, TermEntry>,
    weights: ScoringWeights,
    synonyms: Synonyms,
}

/// A scored hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub id: String,
    pub score: f64,
}

impl SearchIndex {
    /// Build with default weights and the built-in synonym table.
    pub fn build(documents: Vec<(String, String)>) -> Self {
        Self::build_with(documents, ScoringWeights::default(), Synonyms::builtin())
    }

    /// Build an index. Cost is linear in the total number of tokens.
    pub fn build_with(
        documents: Vec<(String, String)>,
        weights: ScoringWeights,
        synonyms: Synonyms,
    ) -> Self {
        let mut ids = Vec::with_capacity(documents.len());
        let mut doc_len = Vec::with_capacity(documents.len());
        let mut terms: BTreeMap<String, TermEntry> = BTreeMap::new();

        for (doc, (id, text)) in documents.into_iter().enumerate() {
            let tokens = tokenize(&text);
            doc_len.push(tokens.len() as f64);
            ids.push(id);

            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokens {
                *counts.entry(token).or_default() += 1;
            }
            for (term, tf) in counts {
                terms
                    .entry(term)
                    .or_insert_with(|| TermEntry {
                        postings: Vec::new(),
                        idf_bm25: 0.0,
                        idf_tfidf: 0.0,
                    })
                    .postings
                    .push(Posting {
                        doc: doc as u32,
                        tf: tf as f64,
                    });
            }
        }

        let n = ids.len() as f64;
        let avg_doc_len = if ids.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<f64>() / n
        };

        let mut norm_sq = vec![0.0f64; ids.len()];
        for entry in terms.values_mut() {
            let df = entry.postings.len() as f64;
            entry.idf_bm25 = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
            entry.idf_tfidf = ((n + 1.0) / (df + 1.0)).ln() + 1.0;
            for posting in &entry.postings {
                let w = tfidf_weight(posting.tf) * entry.idf_tfidf;
                norm_sq[posting.doc as usize] += w * w;
            }
        }
        let doc_norm = norm_sq.into_iter().map(f64::sqrt).collect();

        tracing::debug!(
            documents = ids.len(),
            vocabulary = terms.len(),
            avg_doc_len,
            "Search index built"
        );

        Self {
            ids,
            doc_len,
            doc_norm,
            avg_doc_len,
            terms,
            weights,
            synonyms,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Rank documents for `text`.
    ///
    /// Returns at most `top_k` documents with a positive score, best first,
    /// ties broken by ascending id. An empty result is valid.
    pub fn query(&self, text: &str, top_k: usize) -> Vec<ScoredDocument> {
        if top_k == 0 || self.is_empty() {
            return Vec::new();
        }

        let query_terms = self.weighted_query_terms(text);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let ScoringWeights { k1, b, bm25_weight } = self.weights;
        let avg_len = if self.avg_doc_len > 0.0 {
            self.avg_doc_len
        } else {
            1.0
        };

        // doc -> (bm25, tfidf dot product)
        let mut acc: HashMap<u32, (f64, f64)> = HashMap::new();
        let mut query_norm_sq = 0.0;

        for (term, weight) in &query_terms {
            let Some(entry) = self.terms.get(term) else {
                continue;
            };
            let query_tfidf = tfidf_weight(*weight) * entry.idf_tfidf;
            query_norm_sq += query_tfidf * query_tfidf;

            for posting in &entry.postings {
                let dl = self.doc_len[posting.doc as usize];
                let tf = posting.tf;
                let bm25 = entry.idf_bm25 * (tf * (k1 + 1.0))
                    / (tf + k1 * (1.0 - b + b * dl / avg_len));
                let doc_tfidf = tfidf_weight(tf) * entry.idf_tfidf;

                let slot = acc.entry(posting.doc).or_insert((0.0, 0.0));
                slot.0 += weight.min(1.0) * bm25;
                slot.1 += query_tfidf * doc_tfidf;
            }
        }

        if acc.is_empty() {
            return Vec::new();
        }

        let max_bm25 = acc.values().map(|(bm25, _)| *bm25).fold(0.0, f64::max);
        let query_norm = query_norm_sq.sqrt();

        let mut results: Vec<ScoredDocument> = acc
            .into_iter()
            .map(|(doc, (bm25, dot))| {
                let bm25_norm = if max_bm25 > 0.0 { bm25 / max_bm25 } else { 0.0 };
                let denom = query_norm * self.doc_norm[doc as usize];
                let cosine = if denom > 0.0 { dot / denom } else { 0.0 };
                ScoredDocument {
                    id: self.ids[doc as usize].clone(),
                    score: bm25_weight * bm25_norm + (1.0 - bm25_weight) * cosine,
                }
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);
        results
    }

    /// Query tokens with their weights; synonyms enter at a reduced weight
    /// unless the term was typed literally.
    fn weighted_query_terms(&self, text: &str) -> BTreeMap<String, f64> {
        let mut terms: BTreeMap<String, f64> = BTreeMap::new();
        let tokens = tokenize(text);
        for token in &tokens {
            *terms.entry(token.clone()).or_default() += 1.0;
        }
        for token in &tokens {
            for synonym in self.synonyms.expand(token) {
                terms.entry(synonym.clone()).or_insert(SYNONYM_WEIGHT);
            }
        }
        terms
    }
}

/// Sublinear term frequency; weights below one (synonyms) are used as-is.
fn tfidf_weight(tf: f64) -> f64 {
    if tf >= 1.0 {
        1.0 + tf.ln()
    } else {
        tf
    }
}
