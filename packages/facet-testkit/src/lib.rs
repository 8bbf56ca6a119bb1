mod error;

pub use error::{Error, Result};

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use uuid::Uuid;

use facet_config::Config;
use facet_domain::{CompiledFields, Data, Field, FieldIndex, Val};
use facet_service::{
	CompletionState, Coprocessor, Query, QueryKey, ResultRequest, SearchRequest, Store,
	StoreBuilder, StoreFactory,
};

pub fn sample_config() -> Config {
	toml_config(
		"\
[search]
default_timeout_ms = 30000

[cache]
ttl_seconds = 600

[results]
default_max_results = [1000000, 100, 10, 1]
default_store_size = [1000000, 100, 10, 1]
",
	)
}

pub fn toml_config(raw: &str) -> Config {
	let cfg = toml::from_str(raw).expect("Failed to parse test config.");

	facet_config::validate(&cfg).expect("Test config must validate.");

	cfg
}

pub fn unique_key() -> QueryKey {
	QueryKey::new(Uuid::new_v4().to_string())
}

pub fn search_request(key: QueryKey, result_requests: Vec<ResultRequest>) -> SearchRequest {
	SearchRequest {
		key,
		query: Query {
			data_source: "test-index".to_string(),
			expression: serde_json::json!({ "op": "matchAll" }),
			params: HashMap::new(),
		},
		result_requests,
		date_time_locale: None,
		incremental: false,
		timeout_ms: None,
	}
}

// Aggregates literal rows through a coprocessor and store builder so tests
// can hand a store realistic grouped data.
pub fn data_for(fields: &[Field], rows: &[Vec<Val>], show_detail: bool) -> Result<Data> {
	let mut index = FieldIndex::default();
	let compiled = Arc::new(
		CompiledFields::compile(fields, &HashMap::new(), &mut index)
			.map_err(|err| Error::Message(format!("Failed to compile test fields: {err}.")))?,
	);
	let mut coprocessor = Coprocessor::new(compiled.clone(), show_detail);

	for row in rows {
		coprocessor.receive(row);
	}

	let mut builder = StoreBuilder::new(&compiled);

	builder.add_payload(coprocessor.create_payload());

	Ok(builder.into_data())
}

// In-memory store whose completion and contents are driven by the test.
pub struct ScriptedStore {
	completion: CompletionState,
	listeners: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
	data: Mutex<HashMap<String, Arc<Data>>>,
	errors: Mutex<Vec<String>>,
	highlights: Mutex<Vec<String>>,
	default_max_results: Vec<usize>,
	store_size: Vec<usize>,
	destroyed: AtomicBool,
}
impl ScriptedStore {
	pub fn new(cfg: &Config) -> Self {
		Self {
			completion: CompletionState::new(),
			listeners: Mutex::new(Vec::new()),
			data: Mutex::new(HashMap::new()),
			errors: Mutex::new(Vec::new()),
			highlights: Mutex::new(Vec::new()),
			default_max_results: cfg.results.default_max_results.clone(),
			store_size: cfg.results.default_store_size.clone(),
			destroyed: AtomicBool::new(false),
		}
	}

	pub fn set_data(&self, component_id: &str, data: Data) {
		let mut map = self.data.lock().unwrap_or_else(|err| err.into_inner());

		map.insert(component_id.to_string(), Arc::new(data));
	}

	pub fn push_error(&self, message: &str) {
		let mut errors = self.errors.lock().unwrap_or_else(|err| err.into_inner());

		errors.push(message.to_string());
	}

	pub fn push_highlight(&self, highlight: &str) {
		let mut highlights = self.highlights.lock().unwrap_or_else(|err| err.into_inner());

		highlights.push(highlight.to_string());
	}

	pub fn complete_now(&self) {
		self.completion.complete();

		let listeners = {
			let mut listeners = self.listeners.lock().unwrap_or_else(|err| err.into_inner());

			listeners.drain(..).collect::<Vec<_>>()
		};

		for listener in listeners {
			listener();
		}
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::SeqCst)
	}
}
impl Store for ScriptedStore {
	fn is_complete(&self) -> bool {
		self.completion.is_complete()
	}

	fn data(&self, component_id: &str) -> Option<Arc<Data>> {
		let map = self.data.lock().unwrap_or_else(|err| err.into_inner());

		map.get(component_id).cloned()
	}

	fn errors(&self) -> Vec<String> {
		self.errors.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn highlights(&self) -> Vec<String> {
		self.highlights.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn default_max_results(&self) -> Vec<usize> {
		self.default_max_results.clone()
	}

	fn store_size(&self) -> Vec<usize> {
		self.store_size.clone()
	}

	fn register_completion_listener(&self, listener: Box<dyn FnOnce() + Send>) {
		if self.completion.is_complete() {
			listener();

			return;
		}

		let mut listeners = self.listeners.lock().unwrap_or_else(|err| err.into_inner());

		listeners.push(listener);
	}

	fn destroy(&self) {
		self.destroyed.store(true, Ordering::SeqCst);
	}
}

// Creates one scripted store per request and remembers every store it
// handed out so tests can drive and inspect them.
pub struct ScriptedStoreFactory {
	cfg: Config,
	created: Mutex<Vec<Arc<ScriptedStore>>>,
}
impl ScriptedStoreFactory {
	pub fn new(cfg: Config) -> Self {
		Self { cfg, created: Mutex::new(Vec::new()) }
	}

	pub fn created(&self) -> Vec<Arc<ScriptedStore>> {
		self.created.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl StoreFactory for ScriptedStoreFactory {
	fn create(&self, _request: &SearchRequest) -> facet_service::Result<Arc<dyn Store>> {
		let store = Arc::new(ScriptedStore::new(&self.cfg));
		let mut created = self.created.lock().unwrap_or_else(|err| err.into_inner());

		created.push(store.clone());

		Ok(store)
	}
}

// Fails every construction; exercises the cache's propagate-don't-cache
// contract.
#[derive(Default)]
pub struct FailingStoreFactory {
	attempts: AtomicUsize,
}
impl FailingStoreFactory {
	pub fn attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}
}
impl StoreFactory for FailingStoreFactory {
	fn create(&self, _request: &SearchRequest) -> facet_service::Result<Arc<dyn Store>> {
		self.attempts.fetch_add(1, Ordering::SeqCst);

		Err(facet_service::Error::Store { message: "The data source is unavailable.".to_string() })
	}
}
