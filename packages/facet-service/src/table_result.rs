use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use facet_domain::{
	CompiledFields, Data, FieldFormatter, FieldIndex, GroupKey, ItemSorter, Sizes, TableSettings,
};

use crate::{
	error::Result,
	search::{OffsetRange, ResultRequest, SearchResult, TableResult, TableRow},
};

// Projects a Data tree as a paged table. Grouping collapses to the top
// level unless a bucket's key is listed in the request's open groups; the
// paging window applies to the overall visitation order, and each bucket
// independently stops expanding at the per-depth max-results cap.
pub struct TableResultCreator {
	fields: Arc<CompiledFields>,
	sorter: ItemSorter,
	max_results: Sizes,
	formatter: FieldFormatter,
}
impl TableResultCreator {
	pub fn new(
		settings: &TableSettings,
		params: &HashMap<String, String>,
		default_max_results: &[usize],
		date_time_locale: Option<&str>,
	) -> Result<Self> {
		let mut index = FieldIndex::default();
		let fields = Arc::new(CompiledFields::compile(&settings.fields, params, &mut index)?);
		let sorter = fields.sorter();
		let max_results = Sizes::min_of(settings.max_results.as_deref(), default_max_results);

		Ok(Self { fields, sorter, max_results, formatter: FieldFormatter::new(date_time_locale) })
	}

	pub fn field_names(&self) -> Vec<String> {
		self.fields.fields().iter().map(|field| field.field().name.clone()).collect()
	}

	pub fn create(&self, data: &Data, request: &ResultRequest) -> SearchResult {
		let range = request.range.unwrap_or_default();
		let mut walk = Walk {
			open_groups: request
				.open_groups
				.as_ref()
				.map(|groups| groups.iter().cloned().collect()),
			offset: range.offset,
			length: range.length,
			position: 0,
			rows: Vec::new(),
		};

		self.visit(data, &None, 0, &mut walk);

		SearchResult::Table(TableResult {
			component_id: request.component_id.clone(),
			fields: self.field_names(),
			range: OffsetRange { offset: range.offset, length: walk.rows.len() },
			total_results: walk.position,
			rows: walk.rows,
			error: None,
		})
	}

	fn visit(&self, data: &Data, parent: &Option<GroupKey>, depth: usize, walk: &mut Walk) {
		let Some(items) = data.items(parent) else {
			return;
		};
		let cap = self.max_results.size(depth);

		for index in items.sorted_order(&self.sorter).into_iter().take(cap) {
			let Some(item) = items.get(index) else {
				continue;
			};
			let encoded = item.key().map(|key| key.to_string());

			if walk.position >= walk.offset && walk.rows.len() < walk.length {
				let values = self
					.fields
					.fields()
					.iter()
					.enumerate()
					.map(|(position, field)| {
						self.formatter.format(&item.value(position), field.field().format.as_ref())
					})
					.collect();

				walk.rows.push(TableRow {
					group_key: encoded.clone(),
					depth: item.depth(),
					values,
				});
			}

			walk.position += 1;

			if let Some(key) = item.key()
				&& walk.is_open(encoded.as_deref())
			{
				self.visit(data, &Some(key.clone()), depth + 1, walk);
			}
		}
	}
}

struct Walk {
	open_groups: Option<HashSet<String>>,
	offset: usize,
	length: usize,
	position: usize,
	rows: Vec<TableRow>,
}
impl Walk {
	// No open-group set means nothing expands.
	fn is_open(&self, encoded: Option<&str>) -> bool {
		match (&self.open_groups, encoded) {
			(Some(open), Some(encoded)) => open.contains(encoded),
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{collections::HashMap, sync::Arc};

	use facet_domain::{
		CompiledFields, Data, Field, FieldIndex, Sizes, Sort, SortDirection, Val,
	};

	use crate::{
		coprocessor::Coprocessor,
		search::{Fetch, OffsetRange, ResultRequest, ResultStyle, SearchResult, TableResult},
		store_builder::StoreBuilder,
		table_result::TableResultCreator,
	};

	fn settings() -> facet_domain::TableSettings {
		facet_domain::TableSettings::of(vec![
			Field {
				expression: Some("${user}".to_string()),
				group: Some(0),
				sort: Some(Sort { order: 0, direction: SortDirection::Ascending }),
				..Field::named("user")
			},
			Field { expression: Some("${action}".to_string()), ..Field::named("action") },
		])
	}

	fn sample_data() -> Data {
		let settings = settings();
		let mut index = FieldIndex::default();
		let fields = Arc::new(
			CompiledFields::compile(&settings.fields, &HashMap::new(), &mut index)
				.expect("compiles"),
		);
		let mut coprocessor = Coprocessor::new(fields.clone(), true);

		for (user, action) in
			[("bob", "login"), ("alice", "login"), ("alice", "logout"), ("bob", "upload")]
		{
			coprocessor.receive(&[Val::Text(user.to_string()), Val::Text(action.to_string())]);
		}

		let mut builder = StoreBuilder::new(&fields);

		builder.add_payload(coprocessor.create_payload());
		builder.trim(&Sizes::unlimited());

		builder.into_data()
	}

	fn request(
		open_groups: Option<Vec<String>>,
		range: Option<OffsetRange>,
	) -> ResultRequest {
		ResultRequest {
			component_id: "table-1".to_string(),
			mappings: vec![settings()],
			range,
			open_groups,
			style: ResultStyle::Table,
			fetch: Some(Fetch::All),
		}
	}

	fn creator(max_results: &[usize]) -> TableResultCreator {
		TableResultCreator::new(&settings(), &HashMap::new(), max_results, None)
			.expect("creator compiles")
	}

	fn table(result: SearchResult) -> TableResult {
		match result {
			SearchResult::Table(table) => table,
			SearchResult::Flat(_) => panic!("expected a table result"),
		}
	}

	#[test]
	fn absent_open_groups_collapse_everything() {
		let data = sample_data();
		let result = table(creator(&[]).create(&data, &request(None, None)));

		assert_eq!(result.rows.len(), 2);
		assert_eq!(result.total_results, 2);
		assert_eq!(result.rows[0].values[0], "alice");
		assert_eq!(result.rows[1].values[0], "bob");
		assert!(result.rows.iter().all(|row| row.depth == 0));
	}

	#[test]
	fn listed_groups_expand_their_children() {
		let data = sample_data();
		let root = data.items(&None).expect("root bucket");
		let alice_key = root
			.iter()
			.find(|item| item.value(0) == Val::Text("alice".to_string()))
			.and_then(|item| item.key())
			.expect("alice key")
			.to_string();
		let result =
			table(creator(&[]).create(&data, &request(Some(vec![alice_key.clone()]), None)));

		assert_eq!(result.total_results, 4, "two roots plus alice's two details");
		assert_eq!(result.rows[0].group_key.as_deref(), Some(alice_key.as_str()));
		assert_eq!(result.rows[1].depth, 1);
		assert_eq!(result.rows[2].depth, 1);
		assert_eq!(result.rows[3].values[0], "bob");
	}

	#[test]
	fn paging_window_spans_the_visitation_order() {
		let data = sample_data();
		let open: Vec<String> = data
			.items(&None)
			.expect("root bucket")
			.iter()
			.filter_map(|item| item.key())
			.map(|key| key.to_string())
			.collect();
		let result = table(creator(&[]).create(
			&data,
			&request(Some(open), Some(OffsetRange { offset: 1, length: 2 })),
		));

		assert_eq!(result.rows.len(), 2);
		assert_eq!(result.range, OffsetRange { offset: 1, length: 2 });
		assert_eq!(result.total_results, 6, "paging never shortens the visit count");
		assert_eq!(result.rows[0].depth, 1);
	}

	#[test]
	fn per_depth_caps_stop_bucket_expansion() {
		let data = sample_data();
		let open: Vec<String> = data
			.items(&None)
			.expect("root bucket")
			.iter()
			.filter_map(|item| item.key())
			.map(|key| key.to_string())
			.collect();
		let result = table(creator(&[10, 1]).create(&data, &request(Some(open), None)));

		assert_eq!(result.total_results, 4, "each root shows at most one child");
	}

	#[test]
	fn user_caps_cannot_exceed_service_defaults() {
		let mut settings = settings();

		settings.max_results = Some(vec![100]);

		let creator = TableResultCreator::new(&settings, &HashMap::new(), &[1], None)
			.expect("creator compiles");
		let result = table(creator.create(&sample_data(), &request(None, None)));

		assert_eq!(result.rows.len(), 1);
	}
}
