use std::collections::HashMap;

use crate::{
	item::{Item, ItemSorter, Items},
	key::GroupKey,
	sizes::Sizes,
};

// The grouped result tree: a bucket key (None = root) maps to the items
// directly under it. Every GroupKey held by a stored item is itself a
// valid bucket key, and removing a grouped item removes the whole subtree
// rooted at its key.
#[derive(Clone, Debug, Default)]
pub struct Data {
	buckets: HashMap<Option<GroupKey>, Items>,
	total: usize,
	unbounded: usize,
}
impl Data {
	pub fn items(&self, key: &Option<GroupKey>) -> Option<&Items> {
		self.buckets.get(key)
	}

	pub fn bucket_mut(&mut self, key: &Option<GroupKey>) -> &mut Items {
		self.buckets.entry(key.clone()).or_default()
	}

	pub fn add(&mut self, parent: Option<GroupKey>, item: Item) {
		self.buckets.entry(parent).or_default().push(item);

		self.total += 1;
		self.unbounded += 1;
	}

	// Current number of stored items.
	pub fn total_size(&self) -> usize {
		self.total
	}

	// Number of items ever added, before any trimming.
	pub fn unbounded_size(&self) -> usize {
		self.unbounded
	}

	pub fn record_added(&mut self, count: usize) {
		self.total += count;
		self.unbounded += count;
	}

	// Worklist cascade: drops the bucket at `key` and every bucket
	// reachable beneath it.
	pub fn cascade_remove(&mut self, key: &GroupKey) -> usize {
		let mut removed = 0;
		let mut worklist = vec![key.clone()];

		while let Some(key) = worklist.pop() {
			let Some(items) = self.buckets.remove(&Some(key)) else {
				continue;
			};

			for item in items.iter() {
				removed += 1;

				if let Some(child) = item.key() {
					worklist.push(child.clone());
				}
			}
		}

		self.total = self.total.saturating_sub(removed);

		removed
	}

	// Depth-first cap: bucket contents at depth d are cut to
	// `sizes.size(d)`, and each discarded grouped item takes its subtree
	// with it.
	pub fn trim(&mut self, sizes: &Sizes, sorter: &ItemSorter) {
		let mut worklist: Vec<(Option<GroupKey>, usize)> = vec![(None, 0)];

		while let Some((key, depth)) = worklist.pop() {
			let (removed, removed_keys, kept_keys) = {
				let Some(items) = self.buckets.get_mut(&key) else {
					continue;
				};
				let mut removed = 0;
				let mut removed_keys = Vec::new();

				items.trim(sizes.size(depth), sorter, |item| {
					removed += 1;

					if let Some(key) = item.key() {
						removed_keys.push(key.clone());
					}
				});

				let kept_keys: Vec<GroupKey> =
					items.iter().filter_map(|item| item.key().cloned()).collect();

				(removed, removed_keys, kept_keys)
			};

			self.total = self.total.saturating_sub(removed);

			// A bucket can briefly hold two items with the same key (merge
			// happens upstream); a key that survived keeps its subtree.
			for key in &removed_keys {
				if !kept_keys.contains(key) {
					self.cascade_remove(key);
				}
			}

			for key in kept_keys {
				worklist.push((Some(key), depth + 1));
			}
		}
	}
}
