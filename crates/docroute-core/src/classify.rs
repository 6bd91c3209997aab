//! Query classification: documents, web, or hybrid.
//!
//! # Scoring
//!
//! 1. **Keyword**: whole-word matches of vocabulary terms in the
//!    lowercased query. No match scores `0.0`; otherwise
//!    `min(1.0, 0.4 + (matches - 1) × 0.3)`.
//! 2. **Documents**: with retrieval scores present,
//!    `0.7 × keyword + 0.3 × min(1.0, max(scores))`; otherwise the
//!    keyword score alone.
//! 3. **Web**: `1.0 - documents`.
//! 4. **Hybrid**: `max(0.0, 1.0 - 2 × |documents - 0.5|)`.
//!
//! The verdict is checked in priority order against the confidence
//! threshold: documents first, then web, otherwise hybrid.

use std::fmt;

use serde::Serialize;

use crate::vocabulary::VocabularyHandle;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

const KEYWORD_BASE: f64 = 0.4;
const KEYWORD_STEP: f64 = 0.3;
const KEYWORD_WEIGHT: f64 = 0.7;
const RETRIEVAL_WEIGHT: f64 = 0.3;

/// Where the answer context should come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Documents,
    Web,
    Hybrid,
}

impl SourceType {
    /// Whether this verdict calls for web augmentation.
    pub fn wants_web(self) -> bool {
        matches!(self, SourceType::Web | SourceType::Hybrid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Documents => "documents",
            SourceType::Web => "web",
            SourceType::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-strategy scores, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationScores {
    pub documents: f64,
    pub web: f64,
    pub hybrid: f64,
}

impl ClassificationScores {
    /// Derive web and hybrid scores from the documents score.
    pub fn from_documents(documents: f64) -> Self {
        Self {
            documents,
            web: 1.0 - documents,
            hybrid: (1.0 - 2.0 * (documents - 0.5).abs()).max(0.0),
        }
    }

    /// Pick a source type and its confidence. Documents wins ties.
    pub fn decide(&self, threshold: f64) -> (SourceType, f64) {
        if self.documents >= threshold {
            (SourceType::Documents, self.documents)
        } else if self.web >= threshold {
            (SourceType::Web, self.web)
        } else {
            (SourceType::Hybrid, self.hybrid)
        }
    }
}

/// Outcome of classifying one query. Serializes to the explanation payload
/// `{source_type, confidence, explanations, matched_terms, scores}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub source_type: SourceType,
    pub confidence: f64,
    pub explanations: Vec<String>,
    pub matched_terms: Vec<String>,
    pub scores: ClassificationScores,
}

/// Keyword signal for a number of distinct matched terms.
pub fn keyword_score(match_count: usize) -> f64 {
    if match_count == 0 {
        return 0.0;
    }
    (KEYWORD_BASE + (match_count - 1) as f64 * KEYWORD_STEP).min(1.0)
}

/// Scores a query against the current vocabulary and retrieval confidence.
///
/// Classification is pure: it reads one vocabulary snapshot per call and
/// has no side effects.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    vocabulary: VocabularyHandle,
    threshold: f64,
}

impl QueryClassifier {
    pub fn new(vocabulary: VocabularyHandle) -> Self {
        Self {
            vocabulary,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn vocabulary(&self) -> &VocabularyHandle {
        &self.vocabulary
    }

    /// Classify `query`. `doc_scores` are similarity scores in `[0, 1]`
    /// for the retrieved material, if any.
    pub fn classify(&self, query: &str, doc_scores: Option<&[f64]>) -> ClassificationResult {
        let vocabulary = self.vocabulary.snapshot();
        let mut explanations = Vec::new();

        let matched_terms = vocabulary.matches(query);
        let keyword = keyword_score(matched_terms.len());
        explanations.push(format!(
            "Term match: {:.2} (found {} domain terms)",
            keyword,
            matched_terms.len()
        ));

        let documents = match doc_scores.filter(|s| !s.is_empty()) {
            Some(scores) => {
                let retrieval = scores
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
                    .min(1.0);
                explanations.push(format!("Document relevance: {:.2}", retrieval));
                KEYWORD_WEIGHT * keyword + RETRIEVAL_WEIGHT * retrieval
            }
            None => keyword,
        };

        let scores = ClassificationScores::from_documents(documents);
        let (source_type, confidence) = scores.decide(self.threshold);
        explanations.push(match source_type {
            SourceType::Documents => format!(
                "Documents score {:.2} meets threshold {:.2}",
                scores.documents, self.threshold
            ),
            SourceType::Web => format!(
                "Web score {:.2} meets threshold {:.2}",
                scores.web, self.threshold
            ),
            SourceType::Hybrid => format!(
                "Neither documents ({:.2}) nor web ({:.2}) meets threshold {:.2}; hybrid score {:.2}",
                scores.documents, scores.web, self.threshold, scores.hybrid
            ),
        });

        ClassificationResult {
            source_type,
            confidence,
            explanations,
            matched_terms,
            scores,
        }
    }
}
