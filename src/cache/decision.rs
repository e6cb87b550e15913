//! Short-lived cache of classifier decisions.
//!
//! Classification looks only at the diagram type and the rough size of the
//! content, so decisions are keyed on (normalized type, content length).
//! Backed by moka; entries expire after the configured TTL.

use std::time::Duration;

use moka::future::Cache;

use crate::backends::ClassifierDecision;
use crate::types::GenerationRequest;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DecisionKey {
    diagram_type: String,
    content_len: usize,
}

impl DecisionKey {
    fn of(request: &GenerationRequest) -> Self {
        Self {
            diagram_type: request.diagram_type().to_string(),
            content_len: request.content().len(),
        }
    }
}

/// Moka-backed store of recent [`ClassifierDecision`]s.
pub struct DecisionCache {
    cache: Cache<DecisionKey, ClassifierDecision>,
}

impl DecisionCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub async fn get(&self, request: &GenerationRequest) -> Option<ClassifierDecision> {
        self.cache.get(&DecisionKey::of(request)).await
    }

    pub async fn insert(&self, request: &GenerationRequest, decision: ClassifierDecision) {
        self.cache.insert(DecisionKey::of(request), decision).await;
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
