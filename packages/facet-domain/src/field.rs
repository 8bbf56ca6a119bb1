use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Field {
	pub name: String,
	#[serde(default)]
	pub expression: Option<String>,
	#[serde(default)]
	pub sort: Option<Sort>,
	#[serde(default)]
	pub filter: Option<FieldFilter>,
	#[serde(default)]
	pub format: Option<Format>,
	#[serde(default)]
	pub group: Option<u32>,
}
impl Field {
	pub fn named(name: &str) -> Self {
		Self {
			name: name.to_string(),
			expression: None,
			sort: None,
			filter: None,
			format: None,
			group: None,
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Sort {
	pub order: u32,
	pub direction: SortDirection,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
	Ascending,
	Descending,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldFilter {
	#[serde(default)]
	pub includes: Option<String>,
	#[serde(default)]
	pub excludes: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Format {
	pub kind: FormatKind,
	#[serde(default)]
	pub number: Option<NumberFormat>,
	#[serde(default)]
	pub date_time: Option<DateTimeFormat>,
}
impl Format {
	pub fn of(kind: FormatKind) -> Self {
		Self { kind, number: None, date_time: None }
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
	General,
	Number,
	DateTime,
	Text,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NumberFormat {
	pub decimal_places: u32,
	pub use_separator: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DateTimeFormat {
	#[serde(default)]
	pub pattern: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableSettings {
	pub fields: Vec<Field>,
	#[serde(default)]
	pub extract_values: bool,
	#[serde(default)]
	pub pipeline: Option<String>,
	#[serde(default)]
	pub max_results: Option<Vec<usize>>,
	#[serde(default)]
	pub show_detail: bool,
}
impl TableSettings {
	pub fn of(fields: Vec<Field>) -> Self {
		Self { fields, extract_values: true, pipeline: None, max_results: None, show_detail: false }
	}
}
