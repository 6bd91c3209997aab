//! Embedding provider trait and the distance metric used by
//! [`InMemoryStore`](crate::store::memory::InMemoryStore).
//!
//! Concrete providers (Ollama) live in the `docroute` app crate.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Turns query text into a vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, used in logs.
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cosine distance between two vectors, in `[0.0, 2.0]`.
///
/// Vectors of unequal length, empty vectors and zero vectors are treated
/// as unrelated and score `1.0`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 1.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x as f64, y as f64))
        .fold((0.0, 0.0, 0.0), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });

    let norm = sq_a.sqrt() * sq_b.sqrt();
    if norm <= f64::EPSILON {
        return 1.0;
    }
    (1.0 - dot / norm).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_direction_is_zero() {
        assert!(cosine_distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[-3.0, 0.0]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs_are_unrelated() {
        assert_eq!(cosine_distance(&[], &[]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 2.0], &[1.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
