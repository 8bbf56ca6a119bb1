use std::sync::Arc;

use facet_domain::Data;

use crate::{error::Result, search::SearchRequest};

// The external, possibly still-running search engine. Implementations hand
// out `Arc<Data>` snapshots and swap the `Arc` on merge, so a projector
// always reads a consistent tree for the duration of one create call.
pub trait Store: Send + Sync {
	fn is_complete(&self) -> bool;

	fn data(&self, component_id: &str) -> Option<Arc<Data>>;

	fn errors(&self) -> Vec<String>;

	fn highlights(&self) -> Vec<String>;

	fn default_max_results(&self) -> Vec<usize>;

	fn store_size(&self) -> Vec<usize>;

	// Calls `listener` once the store completes; a store that is already
	// complete calls it immediately.
	fn register_completion_listener(&self, listener: Box<dyn FnOnce() + Send>);

	// Releases resources and stops any background computation. Idempotent.
	fn destroy(&self);
}

pub trait StoreFactory: Send + Sync {
	fn create(&self, request: &SearchRequest) -> Result<Arc<dyn Store>>;
}
