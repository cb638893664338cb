// src/integrations/embedding.rs

use std::{fs, path::Path};

use anyhow::Context;

use crate::models::home_bot::LifespanRecord;

/// Turns text into a fixed-size, L2-normalized vector.
pub trait TextEmbedder: Send + Sync {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic feature hashing over lowercase words and word bigrams.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

// FNV-1a, stable across builds and platforms
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl TextEmbedder for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dims];
        let tokens = tokenize(text);

        let bigrams = tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
        for feature in tokens.iter().cloned().chain(bigrams) {
            let hash = fnv1a(feature.as_bytes());
            let slot = (hash % self.dims as u64) as usize;
            // The top bit picks the sign so collisions tend to cancel out
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

/// Flat cosine index over the lifespan reference records.
pub struct LifespanIndex {
    records: Vec<LifespanRecord>,
    vectors: Vec<Vec<f32>>,
}

impl LifespanIndex {
    pub fn build(records: Vec<LifespanRecord>, embedder: &dyn TextEmbedder) -> Self {
        let vectors = records.iter().map(|r| embedder.embed(&r.search_text())).collect();
        Self { records, vectors }
    }

    /// Reads a JSON array of records and embeds every entry.
    pub fn load(path: impl AsRef<Path>, embedder: &dyn TextEmbedder) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read lifespan index {}", path.display()))?;
        let records: Vec<LifespanRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid lifespan index {}", path.display()))?;
        Ok(Self::build(records, embedder))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Up to `k` records, most similar first.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(&LifespanRecord, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.iter().zip(query).map(|(a, b)| a * b).sum()))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| (&self.records[i], score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(brand: &str, model: &str, years: i64, description: &str) -> LifespanRecord {
        LifespanRecord {
            brand: brand.to_string(),
            model: model.to_string(),
            avg_lifespan_years: years,
            description: description.to_string(),
        }
    }

    #[test]
    fn embeddings_are_unit_length_and_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Whirlpool top load washer");
        let b = embedder.embed("Whirlpool top load washer");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero() {
        let embedder = HashingEmbedder::new(16);
        assert!(embedder.embed("  ?! ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn nearest_prefers_overlapping_terms() {
        let embedder = HashingEmbedder::new(384);
        let index = LifespanIndex::build(
            vec![
                record("Whirlpool", "WTW5000DW", 12, "top load washer"),
                record("GE", "JB645RKSS", 15, "electric range stove"),
                record("Rheem", "XE50M06ST45U1", 10, "electric water heater"),
            ],
            &embedder,
        );

        let query = embedder.embed("When should I replace my GE stove?");
        let hits = index.nearest(&query, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.brand, "GE");
    }

    #[test]
    fn nearest_on_empty_index_is_empty() {
        let embedder = HashingEmbedder::new(8);
        let index = LifespanIndex::build(Vec::new(), &embedder);
        assert!(index.is_empty());
        assert!(index.nearest(&embedder.embed("stove"), 3).is_empty());
    }
}
