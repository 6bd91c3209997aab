//! Domain vocabulary: the term set that signals in-corpus relevance.
//!
//! A [`DomainVocabulary`] is immutable once built. Rebuilds produce a new
//! snapshot and install it through a [`VocabularyHandle`], which swaps a
//! single `Arc`. Readers clone the current `Arc` and keep using it for the
//! rest of their call, so a classification never observes a half-built set.
//! Concurrent rebuilds are not coordinated; the last write wins.

use std::sync::{Arc, RwLock};

use regex::Regex;

/// Installed whenever extraction yields nothing.
pub const SEED_TERMS: [&str; 3] = ["product-name", "tenant", "infrastructure"];

/// An immutable, never-empty set of lowercase terms with precompiled
/// whole-word matchers.
#[derive(Debug, Clone)]
pub struct DomainVocabulary {
    terms: Vec<String>,
    matchers: Vec<Regex>,
}

impl DomainVocabulary {
    /// Build a vocabulary from raw terms.
    ///
    /// Terms are trimmed, lowercased and deduplicated (first occurrence
    /// wins). An empty result falls back to [`SEED_TERMS`].
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = normalize_terms(terms, usize::MAX);
        if normalized.is_empty() {
            return Self::seed();
        }
        Self::compile(normalized)
    }

    /// The fixed fallback vocabulary.
    pub fn seed() -> Self {
        Self::compile(SEED_TERMS.iter().map(|t| t.to_string()).collect())
    }

    fn compile(terms: Vec<String>) -> Self {
        let mut kept = Vec::with_capacity(terms.len());
        let mut matchers = Vec::with_capacity(terms.len());
        for term in terms {
            match Regex::new(&format!(r"\b{}\b", regex::escape(&term))) {
                Ok(re) => {
                    kept.push(term);
                    matchers.push(re);
                }
                Err(e) => tracing::warn!(term = %term, error = %e, "skipping unmatchable term"),
            }
        }
        if kept.is_empty() {
            return Self::seed();
        }
        Self {
            terms: kept,
            matchers,
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_seed(&self) -> bool {
        self.terms.iter().map(String::as_str).eq(SEED_TERMS.iter().copied())
    }

    /// Terms that occur as whole words in `text`, in vocabulary order.
    ///
    /// `text` is lowercased before matching.
    pub fn matches(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.terms
            .iter()
            .zip(&self.matchers)
            .filter(|(_, re)| re.is_match(&lowered))
            .map(|(term, _)| term.clone())
            .collect()
    }
}

impl Default for DomainVocabulary {
    fn default() -> Self {
        Self::seed()
    }
}

/// Lowercase, trim, drop empties, deduplicate stably, and cap at `max_terms`.
pub fn normalize_terms<I, S>(terms: I, max_terms: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for term in terms {
        if out.len() >= max_terms {
            break;
        }
        let term = term.as_ref().trim().to_lowercase();
        if term.is_empty() {
            continue;
        }
        if seen.insert(term.clone()) {
            out.push(term);
        }
    }
    out
}

/// Shared, swappable reference to the current vocabulary snapshot.
///
/// Cloning the handle shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct VocabularyHandle {
    current: Arc<RwLock<Arc<DomainVocabulary>>>,
}

impl VocabularyHandle {
    pub fn new(vocabulary: DomainVocabulary) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(vocabulary))),
        }
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<DomainVocabulary> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install a fully built snapshot, replacing the previous one wholesale.
    pub fn replace(&self, vocabulary: DomainVocabulary) {
        let next = Arc::new(vocabulary);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = next;
    }

    /// Reset to [`SEED_TERMS`].
    pub fn reset(&self) {
        self.replace(DomainVocabulary::seed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_seed() {
        let vocab = DomainVocabulary::default();
        assert!(vocab.is_seed());
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn test_empty_terms_fall_back_to_seed() {
        let vocab = DomainVocabulary::from_terms(Vec::<String>::new());
        assert!(vocab.is_seed());
        let vocab = DomainVocabulary::from_terms(["  ", ""]);
        assert!(vocab.is_seed());
    }

    #[test]
    fn test_terms_are_normalized() {
        let vocab = DomainVocabulary::from_terms([" VPC ", "vpc", "Load Balancer", "tenant"]);
        assert_eq!(vocab.terms(), &["vpc", "load balancer", "tenant"]);
        assert!(!vocab.is_seed());
    }

    #[test]
    fn test_whole_word_matching() {
        let vocab = DomainVocabulary::from_terms(["tenant", "vpc", "k8s"]);
        assert_eq!(vocab.matches("How do I create a Tenant?"), vec!["tenant"]);
        assert!(vocab.matches("multitenant setups").is_empty());
        assert_eq!(vocab.matches("VPC peering on k8s"), vec!["vpc", "k8s"]);
    }

    #[test]
    fn test_terms_with_regex_metacharacters() {
        let vocab = DomainVocabulary::from_terms(["c++", "product-name", "node.js"]);
        assert_eq!(vocab.matches("is product-name built on node.js?"), vec!["product-name", "node.js"]);
        assert!(vocab.matches("nodexjs").is_empty());
    }

    #[test]
    fn test_normalize_caps_terms() {
        let terms: Vec<String> = (0..10).map(|i| format!("t{}", i)).collect();
        assert_eq!(normalize_terms(&terms, 4).len(), 4);
    }

    #[test]
    fn test_handle_swaps_whole_snapshot() {
        let handle = VocabularyHandle::default();
        let before = handle.snapshot();
        handle.replace(DomainVocabulary::from_terms(["kubernetes"]));
        let after = handle.snapshot();

        assert!(before.is_seed());
        assert_eq!(after.terms(), &["kubernetes"]);

        handle.reset();
        assert!(handle.snapshot().is_seed());
    }

    #[test]
    fn test_cloned_handles_share_slot() {
        let handle = VocabularyHandle::default();
        let other = handle.clone();
        other.replace(DomainVocabulary::from_terms(["helm"]));
        assert_eq!(handle.snapshot().terms(), &["helm"]);
    }
}
