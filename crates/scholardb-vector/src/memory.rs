//! Brute-force in-memory similarity collection.
//!
//! Session-lifetime only: `rebuild` swaps the whole table, `query` scans
//! it for the k nearest entries by L2 distance.

use anyhow::anyhow;
use scholardb_core::traits::{VectorEntry, VectorHit, VectorSearch};
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<VectorEntry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VectorSearch for InMemoryVectorStore {
    fn rebuild(&self, entries: Vec<VectorEntry>) -> anyhow::Result<()> {
        let mut guard = self.entries.write().map_err(|_| anyhow!("vector store lock poisoned"))?;
        *guard = entries;
        Ok(())
    }

    fn query(&self, vector: &[f32], top_k: usize) -> anyhow::Result<Vec<VectorHit>> {
        let entries = self.entries.read().map_err(|_| anyhow!("vector store lock poisoned"))?;
        let mut hits = Vec::with_capacity(entries.len());

        for entry in entries.iter() {
            if entry.vector.len() != vector.len() {
                return Err(anyhow!(
                    "dimension mismatch: query {} vs entry {}",
                    vector.len(),
                    entry.vector.len()
                ));
            }
            let distance = l2_distance(&entry.vector, vector);
            hits.push(VectorHit {
                id: entry.id.clone(),
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance,
            });
        }

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(x - y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
