//! Retrieval surface for RAG tools.
//!
//! The execution core does not implement vector search; it defines the
//! contract and a post-filtering helper for backends that lack native
//! metadata/entity filtering: inflate `top_k` by a configurable strategy,
//! filter in memory, then truncate to the original `top_k`.

use async_trait::async_trait;
use gambit_types::ToolError;
use std::collections::HashMap;

/// A document returned from similarity search, ranked by score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// Backend document identifier.
    pub id: String,
    /// The document content.
    pub content: String,
    /// Similarity score in `[0, 1]`.
    pub score: f32,
    /// Arbitrary metadata attached at ingestion time.
    pub metadata: HashMap<String, serde_json::Value>,
    /// Entity names mentioned by this document, if the backend tracks them.
    pub entities: Vec<String>,
}

/// Metadata/entity constraints on a search.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    /// Every listed key must be present with exactly this value.
    pub equals: HashMap<String, serde_json::Value>,
    /// Every listed entity must be mentioned.
    pub entities: Vec<String>,
}

impl MetadataFilter {
    /// Whether `doc` satisfies this filter.
    #[must_use]
    pub fn matches(&self, doc: &ScoredDocument) -> bool {
        self.equals
            .iter()
            .all(|(key, want)| doc.metadata.get(key) == Some(want))
            && self
                .entities
                .iter()
                .all(|entity| doc.entities.contains(entity))
    }

    /// Whether this filter constrains anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.entities.is_empty()
    }
}

/// A similarity-search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// The query text.
    pub query: String,
    /// How many results the caller wants.
    pub top_k: usize,
    /// Minimum similarity score.
    pub similarity_threshold: f32,
    /// Optional metadata/entity constraints.
    pub filter: Option<MetadataFilter>,
}

/// A vector-search backend.
///
/// Backends with native filtering apply `request.filter` themselves;
/// backends without it ignore the filter and rely on
/// [`PostFilteringSearch`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `request.top_k` documents ranked by similarity.
    async fn similarity_search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ScoredDocument>, ToolError>;
}

/// How to inflate `top_k` before in-memory filtering.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopKInflation {
    /// Fetch `top_k * factor` candidates.
    Multiplier(f64),
    /// Fetch `top_k + offset` candidates.
    Offset(usize),
    /// Fetch `top_k / expected_pass_rate` candidates — for when the caller
    /// can estimate how many candidates the filter will reject.
    ExpectedPassRate(f64),
}

impl TopKInflation {
    /// The inflated fetch size for a requested `top_k`, bounded by
    /// `max_top_k`.
    #[must_use]
    pub fn inflate(&self, top_k: usize, max_top_k: usize) -> usize {
        let inflated = match self {
            TopKInflation::Multiplier(factor) => (top_k as f64 * factor).ceil() as usize,
            TopKInflation::Offset(offset) => top_k + offset,
            TopKInflation::ExpectedPassRate(rate) => {
                let rate = rate.clamp(0.01, 1.0);
                (top_k as f64 / rate).ceil() as usize
            }
        };
        inflated.clamp(top_k, max_top_k)
    }
}

/// Wraps a backend without native filtering: over-fetches, filters in
/// memory, truncates to the original `top_k`.
pub struct PostFilteringSearch<S> {
    store: S,
    inflation: TopKInflation,
    max_top_k: usize,
}

impl<S: VectorStore> PostFilteringSearch<S> {
    /// Wrap `store` with the given inflation strategy, bounded by
    /// `max_top_k`.
    #[must_use]
    pub fn new(store: S, inflation: TopKInflation, max_top_k: usize) -> Self {
        Self {
            store,
            inflation,
            max_top_k,
        }
    }

    /// Search with in-memory post-filtering.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredDocument>, ToolError> {
        let filter = match &request.filter {
            Some(filter) if !filter.is_empty() => filter.clone(),
            _ => {
                // Nothing to post-filter — pass through unchanged.
                return self.store.similarity_search(request).await;
            }
        };

        let inflated = SearchRequest {
            top_k: self.inflation.inflate(request.top_k, self.max_top_k),
            filter: None,
            ..request.clone()
        };
        let candidates = self.store.similarity_search(&inflated).await?;
        let kept = candidates.len();
        let mut filtered: Vec<ScoredDocument> = candidates
            .into_iter()
            .filter(|doc| filter.matches(doc))
            .collect();
        tracing::debug!(
            fetched = kept,
            passed = filtered.len(),
            top_k = request.top_k,
            "post-filtered similarity search"
        );
        filtered.truncate(request.top_k);
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedStore {
        docs: Vec<ScoredDocument>,
        requested_top_k: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl VectorStore for CannedStore {
        async fn similarity_search(
            &self,
            request: &SearchRequest,
        ) -> Result<Vec<ScoredDocument>, ToolError> {
            self.requested_top_k.lock().unwrap().push(request.top_k);
            Ok(self.docs.iter().take(request.top_k).cloned().collect())
        }
    }

    fn doc(id: &str, lang: &str) -> ScoredDocument {
        ScoredDocument {
            id: id.into(),
            content: format!("doc {id}"),
            score: 0.9,
            metadata: HashMap::from([("lang".to_string(), json!(lang))]),
            entities: vec![],
        }
    }

    fn request(top_k: usize, filter: Option<MetadataFilter>) -> SearchRequest {
        SearchRequest {
            query: "q".into(),
            top_k,
            similarity_threshold: 0.5,
            filter,
        }
    }

    #[test]
    fn inflation_strategies_bounded() {
        assert_eq!(TopKInflation::Multiplier(3.0).inflate(4, 100), 12);
        assert_eq!(TopKInflation::Offset(5).inflate(4, 100), 9);
        assert_eq!(TopKInflation::ExpectedPassRate(0.5).inflate(4, 100), 8);
        // Bounded above by max_top_k, below by top_k.
        assert_eq!(TopKInflation::Multiplier(100.0).inflate(4, 10), 10);
        assert_eq!(TopKInflation::Multiplier(0.1).inflate(4, 10), 4);
    }

    #[tokio::test]
    async fn no_filter_passes_through() {
        let store = CannedStore {
            docs: vec![doc("a", "en"), doc("b", "de")],
            requested_top_k: Mutex::new(vec![]),
        };
        let search = PostFilteringSearch::new(store, TopKInflation::Multiplier(2.0), 100);
        let results = search.search(&request(2, None)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(*search.store.requested_top_k.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn filter_inflates_then_truncates() {
        let store = CannedStore {
            docs: vec![
                doc("a", "de"),
                doc("b", "en"),
                doc("c", "de"),
                doc("d", "en"),
            ],
            requested_top_k: Mutex::new(vec![]),
        };
        let search = PostFilteringSearch::new(store, TopKInflation::Multiplier(4.0), 100);

        let filter = MetadataFilter {
            equals: HashMap::from([("lang".to_string(), json!("en"))]),
            entities: vec![],
        };
        let results = search.search(&request(1, Some(filter))).await.unwrap();

        // Backend was asked for 4 candidates, one "en" doc survives the cut.
        assert_eq!(*search.store.requested_top_k.lock().unwrap(), vec![4]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "b");
    }

    #[test]
    fn entity_filter_matches() {
        let mut document = doc("a", "en");
        document.entities = vec!["kermit".into()];
        let filter = MetadataFilter {
            equals: HashMap::new(),
            entities: vec!["kermit".into()],
        };
        assert!(filter.matches(&document));
        let filter = MetadataFilter {
            equals: HashMap::new(),
            entities: vec!["piggy".into()],
        };
        assert!(!filter.matches(&document));
    }
}
