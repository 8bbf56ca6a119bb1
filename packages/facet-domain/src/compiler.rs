use std::collections::HashMap;

use regex::Regex;

use crate::{
	error::{Error, Result},
	expr::CompiledExpr,
	field::{Field, FieldFilter},
	item::ItemSorter,
};

// Name -> slot assignment shared by every evaluator of one search. Two
// compiled field sets over the same logical fields must agree on slot
// numbers, so the index is threaded through compilation and only ever
// grows.
#[derive(Clone, Debug, Default)]
pub struct FieldIndex {
	slots: HashMap<String, usize>,
	names: Vec<String>,
}
impl FieldIndex {
	pub fn slot(&mut self, name: &str) -> usize {
		if let Some(slot) = self.slots.get(name) {
			return *slot;
		}

		let slot = self.names.len();

		self.slots.insert(name.to_string(), slot);
		self.names.push(name.to_string());

		slot
	}

	pub fn get(&self, name: &str) -> Option<usize> {
		self.slots.get(name).copied()
	}

	pub fn name(&self, slot: usize) -> Option<&str> {
		self.names.get(slot).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}
}

#[derive(Clone, Debug)]
pub struct CompiledFilter {
	includes: Option<Regex>,
	excludes: Option<Regex>,
}
impl CompiledFilter {
	fn compile(field_name: &str, filter: &FieldFilter) -> Result<Option<Self>> {
		let includes = compile_pattern(field_name, filter.includes.as_deref())?;
		let excludes = compile_pattern(field_name, filter.excludes.as_deref())?;

		if includes.is_none() && excludes.is_none() {
			return Ok(None);
		}

		Ok(Some(Self { includes, excludes }))
	}

	pub fn accepts(&self, text: &str) -> bool {
		if let Some(includes) = &self.includes
			&& !includes.is_match(text)
		{
			return false;
		}
		if let Some(excludes) = &self.excludes
			&& excludes.is_match(text)
		{
			return false;
		}

		true
	}
}

fn compile_pattern(field_name: &str, pattern: Option<&str>) -> Result<Option<Regex>> {
	let Some(pattern) = pattern.map(str::trim).filter(|pattern| !pattern.is_empty()) else {
		return Ok(None);
	};

	Regex::new(pattern).map(Some).map_err(|err| Error::FilterParse {
		field: field_name.to_string(),
		message: err.to_string(),
	})
}

#[derive(Clone, Debug)]
pub struct CompiledField {
	field: Field,
	group: Option<u32>,
	expression: Option<CompiledExpr>,
	filter: Option<CompiledFilter>,
}
impl CompiledField {
	pub fn field(&self) -> &Field {
		&self.field
	}

	pub fn group(&self) -> Option<u32> {
		self.group
	}

	pub fn expression(&self) -> Option<&CompiledExpr> {
		self.expression.as_ref()
	}

	pub fn filter(&self) -> Option<&CompiledFilter> {
		self.filter.as_ref()
	}
}

// Built once per request stage, immutable afterwards.
#[derive(Clone, Debug)]
pub struct CompiledFields {
	fields: Vec<CompiledField>,
	index: FieldIndex,
	max_group_depth: Option<u32>,
}
impl CompiledFields {
	pub fn compile(
		fields: &[Field],
		params: &HashMap<String, String>,
		index: &mut FieldIndex,
	) -> Result<Self> {
		let mut compiled = Vec::with_capacity(fields.len());

		for field in fields {
			let expression = field
				.expression
				.as_deref()
				.map(|raw| CompiledExpr::parse(raw, params, index))
				.transpose()?;
			let filter = field
				.filter
				.as_ref()
				.map(|raw| CompiledFilter::compile(&field.name, raw))
				.transpose()?
				.flatten();

			compiled.push(CompiledField {
				field: field.clone(),
				group: field.group,
				expression,
				filter,
			});
		}

		let max_group_depth = compiled.iter().filter_map(CompiledField::group).max();

		Ok(Self { fields: compiled, index: index.clone(), max_group_depth })
	}

	pub fn fields(&self) -> &[CompiledField] {
		&self.fields
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn index(&self) -> &FieldIndex {
		&self.index
	}

	pub fn max_group_depth(&self) -> Option<u32> {
		self.max_group_depth
	}

	// Positions (within this field set) of the fields grouped at `depth`,
	// in declaration order.
	pub fn group_positions(&self, depth: u32) -> Vec<usize> {
		self.fields
			.iter()
			.enumerate()
			.filter(|(_, field)| field.group == Some(depth))
			.map(|(position, _)| position)
			.collect()
	}

	pub fn sorter(&self) -> ItemSorter {
		let mut keys: Vec<_> = self
			.fields
			.iter()
			.enumerate()
			.filter_map(|(position, field)| {
				field.field.sort.map(|sort| (sort.order, position, sort.direction))
			})
			.collect();

		keys.sort_by_key(|(order, _, _)| *order);

		ItemSorter::new(
			keys.into_iter().map(|(_, position, direction)| (position, direction)).collect(),
		)
	}
}
