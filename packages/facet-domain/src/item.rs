use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{expr::AggregateOp, field::SortDirection, key::GroupKey, value::Val};

// Accumulated state of one field for one item. Folding takes a per-row
// contribution; merging combines two accumulated states, which is what
// makes payloads from independent coprocessors combinable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Generator {
	op: Option<AggregateOp>,
	value: Val,
	count: u64,
}
impl Generator {
	pub fn new(op: Option<AggregateOp>) -> Self {
		Self { op, value: Val::Null, count: 0 }
	}

	pub fn fold(&mut self, incoming: Val) {
		match self.op {
			Some(AggregateOp::Sum | AggregateOp::Average) => {
				self.value = add(&self.value, &incoming);
				self.count += 1;
			},
			Some(AggregateOp::Count) => {
				self.value = add(&self.value, &incoming);
			},
			Some(AggregateOp::Min) => {
				if self.value.is_null() || incoming.compare(&self.value) == Ordering::Less {
					self.value = incoming;
				}
			},
			Some(AggregateOp::Max) => {
				if self.value.is_null()
					|| (!incoming.is_null() && incoming.compare(&self.value) == Ordering::Greater)
				{
					self.value = incoming;
				}
			},
			None =>
				if self.value.is_null() {
					self.value = incoming;
				},
		}
	}

	pub fn merge(&mut self, other: &Self) {
		match self.op {
			Some(AggregateOp::Sum | AggregateOp::Count | AggregateOp::Average) => {
				self.value = add(&self.value, &other.value);
				self.count += other.count;
			},
			Some(AggregateOp::Min) => {
				if self.value.is_null()
					|| (!other.value.is_null()
						&& other.value.compare(&self.value) == Ordering::Less)
				{
					self.value = other.value.clone();
				}
			},
			Some(AggregateOp::Max) => {
				if self.value.is_null()
					|| (!other.value.is_null()
						&& other.value.compare(&self.value) == Ordering::Greater)
				{
					self.value = other.value.clone();
				}
			},
			None =>
				if self.value.is_null() {
					self.value = other.value.clone();
				},
		}
	}

	pub fn current(&self) -> Val {
		match self.op {
			Some(AggregateOp::Average) => match (self.value.to_number(), self.count) {
				(Some(total), count) if count > 0 => Val::Float(total / count as f64),
				_ => Val::Null,
			},
			_ => self.value.clone(),
		}
	}
}

fn add(current: &Val, incoming: &Val) -> Val {
	match (current.to_number(), incoming.to_number()) {
		(Some(lhs), Some(rhs)) =>
			if let (Val::Int(left), Val::Int(right)) = (current, incoming)
				&& let Some(value) = left.checked_add(*right)
			{
				Val::Int(value)
			} else {
				Val::Float(lhs + rhs)
			},
		(None, Some(_)) => incoming.clone(),
		_ => current.clone(),
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Item {
	key: Option<GroupKey>,
	depth: u32,
	generators: Vec<Generator>,
}
impl Item {
	pub fn new(key: Option<GroupKey>, depth: u32, generators: Vec<Generator>) -> Self {
		Self { key, depth, generators }
	}

	pub fn key(&self) -> Option<&GroupKey> {
		self.key.as_ref()
	}

	pub fn depth(&self) -> u32 {
		self.depth
	}

	pub fn generators(&self) -> &[Generator] {
		&self.generators
	}

	pub fn value(&self, field_position: usize) -> Val {
		self.generators.get(field_position).map(Generator::current).unwrap_or(Val::Null)
	}

	pub fn fold_row(&mut self, values: &[Val]) {
		for (generator, value) in self.generators.iter_mut().zip(values) {
			generator.fold(value.clone());
		}
	}

	pub fn merge(&mut self, other: &Self) {
		for (generator, incoming) in self.generators.iter_mut().zip(other.generators.iter()) {
			generator.merge(incoming);
		}
	}
}

// Sort keys in user-declared priority order; each key is the position of a
// compiled field plus its direction.
#[derive(Clone, Debug, Default)]
pub struct ItemSorter {
	keys: Vec<(usize, SortDirection)>,
}
impl ItemSorter {
	pub fn new(keys: Vec<(usize, SortDirection)>) -> Self {
		Self { keys }
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	pub fn compare(&self, left: &Item, right: &Item) -> Ordering {
		for (position, direction) in &self.keys {
			let ordering = left.value(*position).compare(&right.value(*position));
			let ordering = match direction {
				SortDirection::Ascending => ordering,
				SortDirection::Descending => ordering.reverse(),
			};

			if ordering != Ordering::Equal {
				return ordering;
			}
		}

		Ordering::Equal
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Items {
	items: Vec<Item>,
}
impl Items {
	pub fn push(&mut self, item: Item) {
		self.items.push(item);
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Item> {
		self.items.iter()
	}

	pub fn get(&self, index: usize) -> Option<&Item> {
		self.items.get(index)
	}

	pub fn get_mut(&mut self, index: usize) -> Option<&mut Item> {
		self.items.get_mut(index)
	}

	pub fn position_of_key(&self, key: &GroupKey) -> Option<usize> {
		self.items.iter().position(|item| item.key() == Some(key))
	}

	// Presentation order without mutating the collection; projectors read
	// a Data tree they do not own.
	pub fn sorted_order(&self, sorter: &ItemSorter) -> Vec<usize> {
		let mut order: Vec<usize> = (0..self.items.len()).collect();

		if !sorter.is_empty() {
			order.sort_by(|left, right| sorter.compare(&self.items[*left], &self.items[*right]));
		}

		order
	}

	// Keeps the best `max_size` items under the sorter (insertion order
	// when the sorter is empty) and reports every discarded item.
	pub fn trim(&mut self, max_size: usize, sorter: &ItemSorter, mut on_removed: impl FnMut(&Item)) {
		if self.items.len() <= max_size {
			return;
		}

		if !sorter.is_empty() {
			self.items.sort_by(|left, right| sorter.compare(left, right));
		}

		for item in self.items.drain(max_size..) {
			on_removed(&item);
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		expr::AggregateOp,
		field::SortDirection,
		item::{Generator, Item, ItemSorter, Items},
		key::GroupKey,
		value::Val,
	};

	fn plain_item(value: i64) -> Item {
		let mut generator = Generator::new(None);

		generator.fold(Val::Int(value));

		Item::new(None, 0, vec![generator])
	}

	#[test]
	fn sum_generator_folds_and_merges() {
		let mut left = Generator::new(Some(AggregateOp::Sum));
		let mut right = Generator::new(Some(AggregateOp::Sum));

		left.fold(Val::Int(1));
		left.fold(Val::Int(2));
		right.fold(Val::Int(10));
		left.merge(&right);

		assert_eq!(left.current(), Val::Int(13));
	}

	#[test]
	fn average_divides_at_read_time() {
		let mut generator = Generator::new(Some(AggregateOp::Average));

		generator.fold(Val::Int(2));
		generator.fold(Val::Int(4));

		assert_eq!(generator.current(), Val::Float(3.0));

		let mut other = Generator::new(Some(AggregateOp::Average));

		other.fold(Val::Int(12));
		generator.merge(&other);

		assert_eq!(generator.current(), Val::Float(6.0));
	}

	#[test]
	fn min_max_ignore_nulls() {
		let mut min = Generator::new(Some(AggregateOp::Min));
		let mut max = Generator::new(Some(AggregateOp::Max));

		for value in [Val::Int(5), Val::Null, Val::Int(2), Val::Int(9)] {
			min.fold(value.clone());
			max.fold(value);
		}

		assert_eq!(min.current(), Val::Int(2));
		assert_eq!(max.current(), Val::Int(9));
	}

	#[test]
	fn ungrouped_generator_keeps_the_first_value() {
		let mut generator = Generator::new(None);

		generator.fold(Val::Text("first".to_string()));
		generator.fold(Val::Text("second".to_string()));

		assert_eq!(generator.current(), Val::Text("first".to_string()));
	}

	#[test]
	fn trim_keeps_the_best_items_and_reports_the_rest() {
		let sorter = ItemSorter::new(vec![(0, SortDirection::Descending)]);
		let mut items = Items::default();

		for value in [3, 9, 1, 7] {
			items.push(plain_item(value));
		}

		let mut removed = Vec::new();

		items.trim(2, &sorter, |item| removed.push(item.value(0)));

		assert_eq!(items.len(), 2);
		assert_eq!(items.get(0).map(|item| item.value(0)), Some(Val::Int(9)));
		assert_eq!(items.get(1).map(|item| item.value(0)), Some(Val::Int(7)));
		assert_eq!(removed, vec![Val::Int(3), Val::Int(1)]);
	}

	#[test]
	fn trim_without_sorter_keeps_insertion_order() {
		let mut items = Items::default();

		for value in [3, 9, 1] {
			items.push(plain_item(value));
		}

		items.trim(2, &ItemSorter::default(), |_| {});

		assert_eq!(items.get(0).map(|item| item.value(0)), Some(Val::Int(3)));
		assert_eq!(items.get(1).map(|item| item.value(0)), Some(Val::Int(9)));
	}

	#[test]
	fn position_of_key_finds_group_items() {
		let key = GroupKey::new(None, vec![Val::Text("a".to_string())]);
		let mut items = Items::default();

		items.push(plain_item(1));
		items.push(Item::new(Some(key.clone()), 0, Vec::new()));

		assert_eq!(items.position_of_key(&key), Some(1));
	}

	#[test]
	fn min_generator_merge_prefers_the_smaller_side() {
		let mut left = Generator::new(Some(AggregateOp::Min));
		let mut right = Generator::new(Some(AggregateOp::Min));

		left.fold(Val::Int(4));
		right.fold(Val::Int(2));
		left.merge(&right);

		assert_eq!(left.current(), Val::Int(2));
	}
}
