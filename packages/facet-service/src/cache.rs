use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

use tracing::debug;

use facet_config::Config;

use crate::{
	error::Result,
	response::SearchResponseCreator,
	search::{QueryKey, SearchRequest},
	store::StoreFactory,
};

// Self-populating cache of response creators, one live creator (and
// underlying store) per query key. Construction happens under the map
// lock, so concurrent first access is single-flight; eviction, explicit or
// by idle expiry, destroys the creator and its store.
pub struct ResponseCreatorCache {
	factory: Arc<dyn StoreFactory>,
	ttl: Duration,
	default_timeout: Duration,
	entries: Mutex<HashMap<QueryKey, CacheEntry>>,
}
impl ResponseCreatorCache {
	pub fn new(factory: Arc<dyn StoreFactory>, cfg: &Config) -> Self {
		Self {
			factory,
			ttl: Duration::from_secs(cfg.cache.ttl_seconds),
			default_timeout: Duration::from_millis(cfg.search.default_timeout_ms),
			entries: Mutex::new(HashMap::new()),
		}
	}

	// Returns the live creator for the request's key, constructing one
	// from the first request seen for that key. A construction failure
	// propagates and caches nothing.
	pub fn get(&self, request: &SearchRequest) -> Result<Arc<SearchResponseCreator>> {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		if let Some(entry) = entries.get_mut(&request.key) {
			entry.last_access = Instant::now();

			return Ok(entry.creator.clone());
		}

		let store = self.factory.create(request)?;
		let creator = Arc::new(SearchResponseCreator::new(store, self.default_timeout));

		debug!(key = %request.key, "Constructed a response creator.");
		entries.insert(
			request.key.clone(),
			CacheEntry { creator: creator.clone(), last_access: Instant::now() },
		);

		Ok(creator)
	}

	pub fn remove(&self, key: &QueryKey) -> bool {
		let entry = {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

			entries.remove(key)
		};

		match entry {
			Some(entry) => {
				debug!(%key, "Evicting a response creator.");
				entry.creator.destroy();

				true
			},
			None => false,
		}
	}

	// Sweeps idle entries; scheduling the sweep is the caller's business.
	pub fn evict_expired(&self) {
		let expired: Vec<(QueryKey, CacheEntry)> = {
			let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
			let now = Instant::now();
			let keys: Vec<QueryKey> = entries
				.iter()
				.filter(|(_, entry)| now.duration_since(entry.last_access) >= self.ttl)
				.map(|(key, _)| key.clone())
				.collect();

			keys.into_iter()
				.filter_map(|key| entries.remove(&key).map(|entry| (key, entry)))
				.collect()
		};

		for (key, entry) in expired {
			debug!(%key, "Evicting an expired response creator.");
			entry.creator.destroy();
		}
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

struct CacheEntry {
	creator: Arc<SearchResponseCreator>,
	last_access: Instant,
}
