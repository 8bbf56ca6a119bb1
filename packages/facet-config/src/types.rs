use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub search: Search,
	pub cache: Cache,
	pub results: Results,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	/// Wait-for-completion bound applied when a non-incremental request
	/// carries no explicit timeout.
	pub default_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Cache {
	/// Idle time after which a cached response creator (and its store) is
	/// eligible for eviction.
	pub ttl_seconds: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Results {
	/// Per-depth caps on rows returned to the client. Empty means
	/// unlimited.
	pub default_max_results: Vec<usize>,
	/// Per-depth caps on rows kept in the backing store. Empty means
	/// unlimited.
	pub default_store_size: Vec<usize>,
}
