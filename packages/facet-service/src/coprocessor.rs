use std::sync::Arc;

use ahash::AHashMap;

use facet_domain::{CompiledFields, Generator, GroupKey, Item, Val};

use crate::payload::{Payload, PayloadEntry};

// Streams raw field-value rows into a grouped accumulator. Rows arrive as
// slices aligned to the compiled field index; each one is evaluated,
// filtered, and folded into the group item at every grouping depth, plus a
// detail item under the deepest key when details are kept.
pub struct Coprocessor {
	fields: Arc<CompiledFields>,
	group_positions: Vec<Vec<usize>>,
	show_detail: bool,
	groups: AHashMap<GroupKey, Item>,
	details: Vec<(Option<GroupKey>, Item)>,
}
impl Coprocessor {
	pub fn new(fields: Arc<CompiledFields>, show_detail: bool) -> Self {
		let group_positions = match fields.max_group_depth() {
			Some(max_depth) =>
				(0..=max_depth).map(|depth| fields.group_positions(depth)).collect(),
			None => Vec::new(),
		};

		Self {
			fields,
			group_positions,
			show_detail,
			groups: AHashMap::new(),
			details: Vec::new(),
		}
	}

	pub fn receive(&mut self, values: &[Val]) {
		let row: Vec<Val> = self
			.fields
			.fields()
			.iter()
			.map(|field| {
				field.expression().map(|expr| expr.eval(values)).unwrap_or(Val::Null)
			})
			.collect();

		for (field, value) in self.fields.fields().iter().zip(&row) {
			if let Some(filter) = field.filter()
				&& !filter.accepts(&value.to_text())
			{
				return;
			}
		}

		let mut parent: Option<GroupKey> = None;

		for (depth, positions) in self.group_positions.iter().enumerate() {
			let group_values: Vec<Val> =
				positions.iter().map(|position| row[*position].clone()).collect();
			let key = GroupKey::new(parent.clone(), group_values);

			self.groups
				.entry(key.clone())
				.or_insert_with(|| {
					Item::new(Some(key.clone()), depth as u32, new_generators(&self.fields))
				})
				.fold_row(&row);

			parent = Some(key);
		}

		if self.show_detail || self.group_positions.is_empty() {
			let depth = self.group_positions.len() as u32;
			let mut item = Item::new(None, depth, new_generators(&self.fields));

			item.fold_row(&row);

			self.details.push((parent, item));
		}
	}

	// Non-destructive snapshot; more rows may still arrive afterwards.
	pub fn create_payload(&self) -> Payload {
		let mut buckets: AHashMap<Option<GroupKey>, Vec<Item>> = AHashMap::new();

		for (key, item) in &self.groups {
			buckets.entry(key.parent().cloned()).or_default().push(item.clone());
		}
		for (parent, item) in &self.details {
			buckets.entry(parent.clone()).or_default().push(item.clone());
		}

		Payload::new(
			buckets.into_iter().map(|(parent, items)| PayloadEntry { parent, items }).collect(),
		)
	}
}

fn new_generators(fields: &CompiledFields) -> Vec<Generator> {
	fields
		.fields()
		.iter()
		.map(|field| Generator::new(field.expression().and_then(|expr| expr.aggregate())))
		.collect()
}

#[cfg(test)]
mod tests {
	use std::{collections::HashMap, sync::Arc};

	use facet_domain::{CompiledFields, Field, FieldFilter, FieldIndex, Val};

	use crate::coprocessor::Coprocessor;

	fn compiled(fields: &[Field]) -> Arc<CompiledFields> {
		let mut index = FieldIndex::default();

		Arc::new(CompiledFields::compile(fields, &HashMap::new(), &mut index).expect("compiles"))
	}

	fn grouped_fields() -> Arc<CompiledFields> {
		compiled(&[
			Field {
				expression: Some("${user}".to_string()),
				group: Some(0),
				..Field::named("user")
			},
			Field { expression: Some("sum(${count})".to_string()), ..Field::named("total") },
		])
	}

	#[test]
	fn rows_fold_into_one_item_per_group() {
		let mut coprocessor = Coprocessor::new(grouped_fields(), false);

		coprocessor.receive(&[Val::Text("alice".to_string()), Val::Int(2)]);
		coprocessor.receive(&[Val::Text("alice".to_string()), Val::Int(3)]);
		coprocessor.receive(&[Val::Text("bob".to_string()), Val::Int(1)]);

		let payload = coprocessor.create_payload();

		assert_eq!(payload.item_count(), 2);

		let entry = &payload.entries()[0];
		let alice = entry
			.items
			.iter()
			.find(|item| item.value(0) == Val::Text("alice".to_string()))
			.expect("alice bucket");

		assert_eq!(alice.value(1), Val::Int(5));
		assert_eq!(alice.depth(), 0);
	}

	#[test]
	fn payload_creation_is_non_destructive() {
		let mut coprocessor = Coprocessor::new(grouped_fields(), false);

		coprocessor.receive(&[Val::Text("alice".to_string()), Val::Int(2)]);

		let early = coprocessor.create_payload();

		coprocessor.receive(&[Val::Text("alice".to_string()), Val::Int(3)]);

		let late = coprocessor.create_payload();

		assert_eq!(early.item_count(), 1);
		assert_eq!(late.item_count(), 1);
		assert_eq!(late.entries()[0].items[0].value(1), Val::Int(5));
	}

	#[test]
	fn ungrouped_fields_emit_detail_rows() {
		let fields = compiled(&[Field {
			expression: Some("${user}".to_string()),
			..Field::named("user")
		}]);
		let mut coprocessor = Coprocessor::new(fields, false);

		coprocessor.receive(&[Val::Text("alice".to_string())]);
		coprocessor.receive(&[Val::Text("bob".to_string())]);

		let payload = coprocessor.create_payload();

		assert_eq!(payload.item_count(), 2);
		assert!(payload.entries()[0].parent.is_none());
		assert!(payload.entries()[0].items.iter().all(|item| item.key().is_none()));
	}

	#[test]
	fn show_detail_appends_rows_under_the_deepest_group() {
		let fields = compiled(&[
			Field {
				expression: Some("${user}".to_string()),
				group: Some(0),
				..Field::named("user")
			},
			Field { expression: Some("${action}".to_string()), ..Field::named("action") },
		]);
		let mut coprocessor = Coprocessor::new(fields, true);

		coprocessor.receive(&[Val::Text("alice".to_string()), Val::Text("login".to_string())]);

		let payload = coprocessor.create_payload();
		let detail_entry = payload
			.entries()
			.iter()
			.find(|entry| entry.parent.is_some())
			.expect("detail bucket under the group");

		assert_eq!(detail_entry.items.len(), 1);
		assert_eq!(detail_entry.items[0].depth(), 1);
		assert_eq!(detail_entry.items[0].value(1), Val::Text("login".to_string()));
	}

	#[test]
	fn filtered_rows_never_reach_the_accumulator() {
		let fields = compiled(&[Field {
			expression: Some("${user}".to_string()),
			filter: Some(FieldFilter { includes: Some("^a".to_string()), excludes: None }),
			..Field::named("user")
		}]);
		let mut coprocessor = Coprocessor::new(fields, false);

		coprocessor.receive(&[Val::Text("alice".to_string())]);
		coprocessor.receive(&[Val::Text("bob".to_string())]);

		assert_eq!(coprocessor.create_payload().item_count(), 1);
	}
}
