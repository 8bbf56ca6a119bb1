use std::{
	collections::HashMap,
	fmt::{self, Display, Formatter},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use facet_domain::{TableSettings, Val};

// Stable identity of one logical, possibly multi-poll search. Two requests
// carrying the same key refer to the same running search.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct QueryKey(String);
impl QueryKey {
	pub fn new(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for QueryKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Query {
	pub data_source: String,
	// The match expression is owned by the external engine; the core only
	// carries it.
	pub expression: Value,
	#[serde(default)]
	pub params: HashMap<String, String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStyle {
	Table,
	Flat,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fetch {
	None,
	Changes,
	All,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OffsetRange {
	pub offset: usize,
	pub length: usize,
}
impl Default for OffsetRange {
	fn default() -> Self {
		Self { offset: 0, length: usize::MAX }
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResultRequest {
	pub component_id: String,
	// Drill-down pipeline; the last entry defines the final shape.
	pub mappings: Vec<TableSettings>,
	#[serde(default)]
	pub range: Option<OffsetRange>,
	#[serde(default)]
	pub open_groups: Option<Vec<String>>,
	pub style: ResultStyle,
	#[serde(default)]
	pub fetch: Option<Fetch>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchRequest {
	pub key: QueryKey,
	pub query: Query,
	pub result_requests: Vec<ResultRequest>,
	#[serde(default)]
	pub date_time_locale: Option<String>,
	#[serde(default)]
	pub incremental: bool,
	#[serde(default)]
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableRow {
	pub group_key: Option<String>,
	pub depth: u32,
	pub values: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableResult {
	pub component_id: String,
	pub fields: Vec<String>,
	pub rows: Vec<TableRow>,
	pub range: OffsetRange,
	pub total_results: usize,
	#[serde(default)]
	pub error: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FlatResult {
	pub component_id: String,
	pub structure: Vec<String>,
	pub values: Vec<Vec<Val>>,
	pub size: usize,
	#[serde(default)]
	pub error: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SearchResult {
	Table(TableResult),
	Flat(FlatResult),
}
impl SearchResult {
	pub fn component_id(&self) -> &str {
		match self {
			Self::Table(result) => &result.component_id,
			Self::Flat(result) => &result.component_id,
		}
	}

	pub fn error(&self) -> Option<&str> {
		match self {
			Self::Table(result) => result.error.as_deref(),
			Self::Flat(result) => result.error.as_deref(),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchResponse {
	pub highlights: Vec<String>,
	pub results: Vec<SearchResult>,
	pub errors: Vec<String>,
	pub complete: bool,
}
impl SearchResponse {
	pub fn failure(message: String) -> Self {
		Self { highlights: Vec::new(), results: Vec::new(), errors: vec![message], complete: false }
	}
}
