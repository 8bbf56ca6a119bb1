use std::sync::Arc;

use tracing::debug;

use facet_domain::{CompiledFields, Data, ItemSorter, Sizes};

use crate::payload::Payload;

// Merges payloads into a size-bounded grouped tree. The only writer of its
// Data instance; callers serialize merge/trim passes against reads.
pub struct StoreBuilder {
	sorter: ItemSorter,
	data: Data,
}
impl StoreBuilder {
	pub fn new(fields: &Arc<CompiledFields>) -> Self {
		Self { sorter: fields.sorter(), data: Data::default() }
	}

	pub fn add_payload(&mut self, payload: Payload) {
		for entry in payload.into_entries() {
			for item in entry.items {
				match item.key().cloned() {
					Some(key) => {
						let merged = {
							let bucket = self.data.bucket_mut(&entry.parent);

							match bucket.position_of_key(&key) {
								Some(position) => {
									if let Some(existing) = bucket.get_mut(position) {
										existing.merge(&item);
									}

									true
								},
								None => {
									bucket.push(item);

									false
								},
							}
						};

						if !merged {
							self.data.record_added(1);
						}
					},
					None => {
						self.data.add(entry.parent.clone(), item);
					},
				}
			}
		}
	}

	pub fn trim(&mut self, store_size: &Sizes) {
		let before = self.data.total_size();

		self.data.trim(store_size, &self.sorter);

		debug!(
			before,
			after = self.data.total_size(),
			unbounded = self.data.unbounded_size(),
			"Trimmed result store.",
		);
	}

	pub fn data(&self) -> &Data {
		&self.data
	}

	pub fn into_data(self) -> Data {
		self.data
	}
}
