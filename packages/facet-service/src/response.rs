use std::{
	collections::{HashMap, HashSet, hash_map::Entry},
	sync::{Arc, Mutex},
	time::Duration,
};

use tracing::debug;

use crate::{
	completion::CompletionState,
	error::{Error, Result},
	flat_result::FlatResultCreator,
	search::{
		Fetch, FlatResult, OffsetRange, ResultRequest, ResultStyle, SearchRequest, SearchResponse,
		SearchResult, TableResult,
	},
	store::Store,
	table_result::TableResultCreator,
};

// State-light orchestrator over one long-lived store. Each poll waits for
// completion (bounded by the effective timeout), projects every requested
// component, and suppresses unchanged results for CHANGES fetches.
// Projectors are compiled once per component and pinned to the first
// request's configuration for the creator's lifetime.
pub struct SearchResponseCreator {
	store: Arc<dyn Store>,
	default_timeout: Duration,
	components: Mutex<HashMap<String, Component>>,
}
impl SearchResponseCreator {
	pub fn new(store: Arc<dyn Store>, default_timeout: Duration) -> Self {
		Self { store, default_timeout, components: Mutex::new(HashMap::new()) }
	}

	pub async fn create(&self, request: &SearchRequest) -> SearchResponse {
		if !self.store.is_complete() {
			let timeout = self.effective_timeout(request);
			let completed = if timeout.is_zero() {
				false
			} else {
				let state = CompletionState::new();
				let handle = state.clone();

				self.store.register_completion_listener(Box::new(move || handle.complete()));

				state.wait(timeout).await
			};

			if !completed && !request.incremental {
				return SearchResponse::failure(format!(
					"The search timed out after {}ms.",
					timeout.as_millis()
				));
			}
		}

		// Captured before results are fetched so the flag reflects the
		// state the results were computed against.
		let complete = self.store.is_complete();
		let results = self.collect_results(request);
		let mut errors = Vec::new();
		let mut seen = HashSet::new();

		for error in self.store.errors() {
			if seen.insert(error.clone()) {
				errors.push(error);
			}
		}

		SearchResponse { highlights: self.store.highlights(), results, errors, complete }
	}

	pub fn destroy(&self) {
		debug!("Destroying response creator.");

		self.store.destroy();
	}

	// Explicit request timeout wins; an incremental poll without one takes
	// whatever is available right now.
	fn effective_timeout(&self, request: &SearchRequest) -> Duration {
		request.timeout_ms.map(Duration::from_millis).unwrap_or(if request.incremental {
			Duration::ZERO
		} else {
			self.default_timeout
		})
	}

	fn collect_results(&self, request: &SearchRequest) -> Vec<SearchResult> {
		let mut results = Vec::new();
		let mut components = self.components.lock().unwrap_or_else(|err| err.into_inner());

		for result_request in &request.result_requests {
			let fetch = result_request.fetch.unwrap_or(Fetch::All);

			if fetch == Fetch::None {
				continue;
			}

			let component = match components.entry(result_request.component_id.clone()) {
				Entry::Occupied(entry) => entry.into_mut(),
				Entry::Vacant(entry) =>
					match Component::build(result_request, request, self.store.as_ref()) {
						Ok(component) => entry.insert(component),
						Err(err) => {
							results.push(error_result(result_request, err.to_string()));

							continue;
						},
					},
			};
			let data =
				self.store.data(&result_request.component_id).unwrap_or_default();
			let result = component.creator.create(&data, result_request);
			let fingerprint = fingerprint(&result);
			let deliver = match fetch {
				Fetch::All | Fetch::None => true,
				Fetch::Changes =>
					fingerprint.is_none() || component.last_fingerprint != fingerprint,
			};

			// The remembered fingerprint moves forward whether or not the
			// result is delivered, and whether or not it carries an error.
			component.last_fingerprint = fingerprint;

			if deliver {
				results.push(result);
			}
		}

		results
	}
}

struct Component {
	creator: ComponentCreator,
	last_fingerprint: Option<blake3::Hash>,
}
impl Component {
	fn build(
		result_request: &ResultRequest,
		request: &SearchRequest,
		store: &dyn Store,
	) -> Result<Self> {
		let params = &request.query.params;
		let locale = request.date_time_locale.as_deref();
		let defaults = store.default_max_results();
		let creator = match result_request.style {
			ResultStyle::Table => {
				let Some(first) = result_request.mappings.first() else {
					return Err(Error::InvalidRequest {
						message: "At least one table-settings stage is required.".to_string(),
					});
				};

				ComponentCreator::Table(TableResultCreator::new(first, params, &defaults, locale)?)
			},
			ResultStyle::Flat => ComponentCreator::Flat(FlatResultCreator::new(
				&result_request.mappings,
				params,
				&defaults,
				locale,
			)?),
		};

		Ok(Self { creator, last_fingerprint: None })
	}
}

enum ComponentCreator {
	Table(TableResultCreator),
	Flat(FlatResultCreator),
}
impl ComponentCreator {
	fn create(&self, data: &facet_domain::Data, request: &ResultRequest) -> SearchResult {
		match self {
			Self::Table(creator) => creator.create(data, request),
			Self::Flat(creator) => creator.create(data, request),
		}
	}
}

fn error_result(request: &ResultRequest, message: String) -> SearchResult {
	match request.style {
		ResultStyle::Table => SearchResult::Table(TableResult {
			component_id: request.component_id.clone(),
			fields: Vec::new(),
			rows: Vec::new(),
			range: OffsetRange { offset: 0, length: 0 },
			total_results: 0,
			error: Some(message),
		}),
		ResultStyle::Flat => SearchResult::Flat(FlatResult {
			component_id: request.component_id.clone(),
			structure: Vec::new(),
			values: Vec::new(),
			size: 0,
			error: Some(message),
		}),
	}
}

// Delta detection for CHANGES fetches compares canonical serializations by
// fingerprint rather than retaining whole results.
fn fingerprint(result: &SearchResult) -> Option<blake3::Hash> {
	serde_json::to_vec(result).ok().map(|raw| blake3::hash(&raw))
}
