use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use facet_domain::{
	CompiledFields, Data, FieldFormatter, FieldIndex, Format, FormatKind, GroupKey, ItemSorter,
	Sizes, TableSettings, Val,
};

use crate::{
	coprocessor::Coprocessor,
	error::{Error, Result},
	search::{FlatResult, ResultRequest, SearchResult},
	store_builder::StoreBuilder,
};

const STRUCTURE_PREFIX: [&str; 3] = [":ParentKey", ":Key", ":Depth"];

// Projects the last stage of a table-settings pipeline as one fully
// denormalized row per visited item, three synthetic key columns first.
// Unlike the table projector, an absent or empty open-group set flattens
// the whole tree.
pub struct FlatResultCreator {
	mappers: Vec<Mapper>,
	fields: Arc<CompiledFields>,
	sorter: ItemSorter,
	max_results: Sizes,
	formatter: FieldFormatter,
}
impl FlatResultCreator {
	pub fn new(
		mappings: &[TableSettings],
		params: &HashMap<String, String>,
		default_max_results: &[usize],
		date_time_locale: Option<&str>,
	) -> Result<Self> {
		let Some(last) = mappings.last() else {
			return Err(Error::InvalidRequest {
				message: "At least one table-settings stage is required.".to_string(),
			});
		};
		let mut mappers = Vec::with_capacity(mappings.len().saturating_sub(1));

		for pair in mappings.windows(2) {
			mappers.push(Mapper::new(&pair[0], &pair[1], params)?);
		}

		let fields = match mappers.last() {
			Some(mapper) => mapper.fields.clone(),
			None => {
				let mut index = FieldIndex::default();

				Arc::new(CompiledFields::compile(&last.fields, params, &mut index)?)
			},
		};
		let sorter = fields.sorter();
		let max_results = Sizes::min_of(last.max_results.as_deref(), default_max_results);

		Ok(Self {
			mappers,
			fields,
			sorter,
			max_results,
			formatter: FieldFormatter::new(date_time_locale),
		})
	}

	pub fn structure(&self) -> Vec<String> {
		STRUCTURE_PREFIX
			.iter()
			.map(|name| name.to_string())
			.chain(self.fields.fields().iter().map(|field| field.field().name.clone()))
			.collect()
	}

	pub fn create(&self, data: &Data, request: &ResultRequest) -> SearchResult {
		let mut mapped: Option<Data> = None;

		for mapper in &self.mappers {
			let input = mapped.as_ref().unwrap_or(data);

			mapped = Some(mapper.map(input));
		}

		let data = mapped.as_ref().unwrap_or(data);
		// An empty list behaves like an absent one: everything is open.
		let open_groups: Option<HashSet<String>> = request
			.open_groups
			.as_ref()
			.filter(|groups| !groups.is_empty())
			.map(|groups| groups.iter().cloned().collect());
		let mut walk = FlatWalk { open_groups, values: Vec::new() };

		self.visit(data, &None, 0, &mut walk);

		SearchResult::Flat(FlatResult {
			component_id: request.component_id.clone(),
			structure: self.structure(),
			size: walk.values.len(),
			values: walk.values,
			error: None,
		})
	}

	fn visit(&self, data: &Data, parent: &Option<GroupKey>, depth: usize, walk: &mut FlatWalk) {
		let Some(items) = data.items(parent) else {
			return;
		};
		let cap = self.max_results.size(depth);
		let parent_key = parent.as_ref().map(|key| key.to_string());

		for index in items.sorted_order(&self.sorter).into_iter().take(cap) {
			let Some(item) = items.get(index) else {
				continue;
			};
			let mut row = Vec::with_capacity(STRUCTURE_PREFIX.len() + self.fields.len());

			row.push(parent_key.clone().map(Val::Text).unwrap_or(Val::Null));
			row.push(item.key().map(|key| Val::Text(key.to_string())).unwrap_or(Val::Null));
			row.push(Val::Int(item.depth() as i64));

			for (position, field) in self.fields.fields().iter().enumerate() {
				row.push(self.flat_value(item.value(position), field.field().format.as_ref()));
			}

			walk.values.push(row);

			if let Some(key) = item.key()
				&& walk.is_open(key)
			{
				self.visit(data, &Some(key.clone()), depth + 1, walk);
			}
		}
	}

	// Numbers and dates flatten to numeric form for visualization; an
	// explicit text format routes through the formatter instead.
	fn flat_value(&self, value: Val, format: Option<&Format>) -> Val {
		if matches!(format, Some(Format { kind: FormatKind::Text, .. })) {
			return Val::Text(self.formatter.format(&value, format));
		}

		match value {
			Val::Null | Val::Int(_) | Val::Float(_) => value,
			Val::Date(date) => Val::Int((date.unix_timestamp_nanos() / 1_000_000) as i64),
			other => Val::Text(other.to_text()),
		}
	}
}

struct FlatWalk {
	open_groups: Option<HashSet<String>>,
	values: Vec<Vec<Val>>,
}
impl FlatWalk {
	fn is_open(&self, key: &GroupKey) -> bool {
		match &self.open_groups {
			None => true,
			Some(open) => open.contains(&key.to_string()),
		}
	}
}

// Bridges two consecutive pipeline stages: the parent stage's top-level
// rows are re-evaluated through a fresh coprocessor and store builder
// compiled against the child stage's fields. Child expressions reference
// parent fields by name.
struct Mapper {
	fields: Arc<CompiledFields>,
	slots: Vec<Option<usize>>,
	store_size: Sizes,
	show_detail: bool,
}
impl Mapper {
	fn new(
		parent: &TableSettings,
		child: &TableSettings,
		params: &HashMap<String, String>,
	) -> Result<Self> {
		let mut index = FieldIndex::default();
		let fields = Arc::new(CompiledFields::compile(&child.fields, params, &mut index)?);
		let slots = (0..index.len())
			.map(|slot| {
				index
					.name(slot)
					.and_then(|name| parent.fields.iter().position(|field| field.name == name))
			})
			.collect();
		let store_size =
			child.max_results.as_deref().map(Sizes::from_list).unwrap_or_else(Sizes::unlimited);

		Ok(Self { fields, slots, store_size, show_detail: child.show_detail })
	}

	fn map(&self, data: &Data) -> Data {
		let mut coprocessor = Coprocessor::new(self.fields.clone(), self.show_detail);

		if let Some(items) = data.items(&None) {
			for item in items.iter() {
				let row: Vec<Val> = self
					.slots
					.iter()
					.map(|slot| slot.map(|position| item.value(position)).unwrap_or(Val::Null))
					.collect();

				coprocessor.receive(&row);
			}
		}

		let mut builder = StoreBuilder::new(&self.fields);

		builder.add_payload(coprocessor.create_payload());
		builder.trim(&self.store_size);

		builder.into_data()
	}
}

#[cfg(test)]
mod tests {
	use std::{collections::HashMap, sync::Arc};

	use facet_domain::{
		CompiledFields, Data, Field, FieldIndex, Sizes, Sort, SortDirection, TableSettings, Val,
	};

	use crate::{
		coprocessor::Coprocessor,
		flat_result::FlatResultCreator,
		search::{Fetch, FlatResult, ResultRequest, ResultStyle, SearchResult},
		store_builder::StoreBuilder,
	};

	fn grouped_settings() -> TableSettings {
		let mut settings = TableSettings::of(vec![
			Field {
				expression: Some("${user}".to_string()),
				group: Some(0),
				sort: Some(Sort { order: 0, direction: SortDirection::Ascending }),
				..Field::named("user")
			},
			Field { expression: Some("sum(${count})".to_string()), ..Field::named("total") },
		]);

		settings.show_detail = true;

		settings
	}

	fn sample_data(settings: &TableSettings) -> Data {
		let mut index = FieldIndex::default();
		let fields = Arc::new(
			CompiledFields::compile(&settings.fields, &HashMap::new(), &mut index)
				.expect("compiles"),
		);
		let mut coprocessor = Coprocessor::new(fields.clone(), settings.show_detail);

		for (user, count) in [("alice", 2), ("alice", 3), ("bob", 5), ("carol", 7)] {
			coprocessor.receive(&[Val::Text(user.to_string()), Val::Int(count)]);
		}

		let mut builder = StoreBuilder::new(&fields);

		builder.add_payload(coprocessor.create_payload());
		builder.trim(&Sizes::unlimited());

		builder.into_data()
	}

	fn request(mappings: Vec<TableSettings>, open_groups: Option<Vec<String>>) -> ResultRequest {
		ResultRequest {
			component_id: "vis-1".to_string(),
			mappings,
			range: None,
			open_groups,
			style: ResultStyle::Flat,
			fetch: Some(Fetch::All),
		}
	}

	fn flat(result: SearchResult) -> FlatResult {
		match result {
			SearchResult::Flat(flat) => flat,
			SearchResult::Table(_) => panic!("expected a flat result"),
		}
	}

	#[test]
	fn every_row_leads_with_three_synthetic_columns() {
		let settings = grouped_settings();
		let data = sample_data(&settings);
		let creator =
			FlatResultCreator::new(&[settings.clone()], &HashMap::new(), &[], None)
				.expect("creator compiles");
		let result = flat(creator.create(&data, &request(vec![settings], None)));

		assert_eq!(result.structure[..3], [":ParentKey", ":Key", ":Depth"]);
		assert_eq!(result.structure[3..], ["user", "total"]);
		assert!(!result.values.is_empty());

		for row in &result.values {
			assert_eq!(row.len(), 5);
		}
	}

	#[test]
	fn absent_open_groups_flatten_the_whole_tree() {
		let settings = grouped_settings();
		let data = sample_data(&settings);
		let creator =
			FlatResultCreator::new(&[settings.clone()], &HashMap::new(), &[], None)
				.expect("creator compiles");
		let result = flat(creator.create(&data, &request(vec![settings.clone()], None)));

		// Three groups plus their four detail rows.
		assert_eq!(result.size, 7);

		let empty = flat(creator.create(&data, &request(vec![settings], Some(Vec::new()))));

		assert_eq!(empty.size, 7, "an empty open set behaves like an absent one");
	}

	#[test]
	fn listed_open_groups_limit_expansion() {
		let settings = grouped_settings();
		let data = sample_data(&settings);
		let alice_key = data
			.items(&None)
			.expect("root bucket")
			.iter()
			.find(|item| item.value(0) == Val::Text("alice".to_string()))
			.and_then(|item| item.key())
			.expect("alice key")
			.to_string();
		let creator =
			FlatResultCreator::new(&[settings.clone()], &HashMap::new(), &[], None)
				.expect("creator compiles");
		let result =
			flat(creator.create(&data, &request(vec![settings], Some(vec![alice_key]))));

		assert_eq!(result.size, 5, "three groups plus only alice's two details");
	}

	#[test]
	fn group_totals_flatten_as_numbers() {
		let settings = grouped_settings();
		let data = sample_data(&settings);
		let creator =
			FlatResultCreator::new(&[settings.clone()], &HashMap::new(), &[], None)
				.expect("creator compiles");
		let result = flat(creator.create(
			&data,
			&request(vec![settings], Some(vec!["none".to_string()])),
		));
		let alice_row = result
			.values
			.iter()
			.find(|row| row[3] == Val::Text("alice".to_string()))
			.expect("alice row");

		assert_eq!(alice_row[4], Val::Int(5));
		assert_eq!(alice_row[2], Val::Int(0));
		assert!(alice_row[0].is_null());
	}

	#[test]
	fn pipeline_stages_re_aggregate_parent_rows() {
		let parent = grouped_settings();
		let data = sample_data(&parent);
		let child = TableSettings::of(vec![
			Field {
				expression: Some("${total}".to_string()),
				group: Some(0),
				sort: Some(Sort { order: 0, direction: SortDirection::Ascending }),
				..Field::named("total")
			},
			Field { expression: Some("count()".to_string()), ..Field::named("users") },
		]);
		let creator = FlatResultCreator::new(
			&[parent.clone(), child.clone()],
			&HashMap::new(),
			&[],
			None,
		)
		.expect("creator compiles");
		let result = flat(creator.create(&data, &request(vec![parent, child], None)));

		// alice and bob both total 5, carol totals 7.
		assert_eq!(result.size, 2);
		assert_eq!(result.values[0][3], Val::Int(5));
		assert_eq!(result.values[0][4], Val::Int(2));
		assert_eq!(result.values[1][3], Val::Int(7));
		assert_eq!(result.values[1][4], Val::Int(1));
	}
}
