//! In-memory listing store: the latest record per `(category, source_id)`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tanka_core::ScoredListing;
use tanka_scoring::rank;

#[derive(Debug, Default)]
struct CategoryEntry {
    listings: HashMap<String, ScoredListing>,
    updated_at: Option<DateTime<Utc>>,
}

/// Ranked snapshot of one category.
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub listings: Vec<ScoredListing>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingStore {
    inner: Arc<RwLock<HashMap<String, CategoryEntry>>>,
}

impl ListingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranked listings for `category`; empty when nothing was stored yet.
    #[must_use]
    pub fn snapshot(&self, category: &str) -> CategorySnapshot {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.get(category) {
            Some(entry) => CategorySnapshot {
                listings: rank(entry.listings.values().cloned().collect()),
                updated_at: entry.updated_at,
            },
            None => CategorySnapshot {
                listings: Vec::new(),
                updated_at: None,
            },
        }
    }

    /// Applies `f` to the category's ranked listings under the write lock
    /// and stores its result. Records whose `source_id` `f` returns replace
    /// the stored ones; records `f` drops are removed.
    pub fn update<F>(&self, category: &str, f: F) -> usize
    where
        F: FnOnce(Vec<ScoredListing>) -> Vec<ScoredListing>,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.entry(category.to_string()).or_default();
        let current = rank(entry.listings.drain().map(|(_, l)| l).collect());
        entry.listings = f(current)
            .into_iter()
            .map(|l| (l.source_id().to_string(), l))
            .collect();
        entry.updated_at = Some(Utc::now());
        entry.listings.len()
    }

    /// Inserts or replaces each listing by `source_id`, keeping the rest.
    pub fn upsert(&self, category: &str, listings: Vec<ScoredListing>) -> usize {
        self.update(category, |mut current| {
            let fresh: HashMap<String, ScoredListing> = listings
                .into_iter()
                .map(|l| (l.source_id().to_string(), l))
                .collect();
            current.retain(|l| !fresh.contains_key(l.source_id()));
            current.extend(fresh.into_values());
            current
        })
    }
}

#[cfg(test)]
mod tests {
    use tanka_core::{ExtractedAttributes, PricedListing, RawListing};

    use super::*;

    fn scored(id: &str, score: f64, title: &str) -> ScoredListing {
        ScoredListing {
            priced: PricedListing {
                listing: RawListing {
                    source_id: id.to_string(),
                    title: title.to_string(),
                    description: None,
                    price: None,
                    regular_price: None,
                    rating_avg: None,
                    rating_count: None,
                    image_url: None,
                    product_url: None,
                    brand: None,
                    fetched_at: Utc::now(),
                },
                attributes: ExtractedAttributes::default(),
                unit_price: None,
                discount_percent: None,
            },
            adjusted_review: score,
            price_score: None,
            score,
        }
    }

    #[test]
    fn unknown_category_is_empty() {
        let store = ListingStore::new();
        let snapshot = store.snapshot("rice");
        assert!(snapshot.listings.is_empty());
        assert!(snapshot.updated_at.is_none());
    }

    #[test]
    fn upsert_keeps_latest_record_per_id() {
        let store = ListingStore::new();
        store.upsert(
            "rice",
            vec![scored("B0C0000001", 3.0, "old"), scored("B0C0000002", 4.0, "b")],
        );
        let count = store.upsert("rice", vec![scored("B0C0000001", 4.5, "new")]);

        assert_eq!(count, 2);
        let snapshot = store.snapshot("rice");
        assert!(snapshot.updated_at.is_some());
        let ids: Vec<_> = snapshot.listings.iter().map(ScoredListing::source_id).collect();
        assert_eq!(ids, vec!["B0C0000001", "B0C0000002"]);
        assert_eq!(snapshot.listings[0].priced.listing.title, "new");
    }

    #[test]
    fn categories_are_separate() {
        let store = ListingStore::new();
        store.upsert("rice", vec![scored("B0C0000001", 3.0, "rice")]);
        store.upsert("toilet-paper", vec![scored("B0C0000001", 2.0, "tp")]);

        assert_eq!(store.snapshot("rice").listings[0].priced.listing.title, "rice");
        assert_eq!(
            store.snapshot("toilet-paper").listings[0].priced.listing.title,
            "tp"
        );
    }

    #[test]
    fn update_sees_ranked_listings() {
        let store = ListingStore::new();
        store.upsert(
            "rice",
            vec![scored("B0C0000001", 1.0, "a"), scored("B0C0000002", 4.0, "b")],
        );
        store.update("rice", |current| {
            assert_eq!(current[0].source_id(), "B0C0000002");
            current.into_iter().take(1).collect()
        });
        assert_eq!(store.snapshot("rice").listings.len(), 1);
    }
}
