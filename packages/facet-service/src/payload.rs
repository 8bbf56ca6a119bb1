use serde::{Deserialize, Serialize};

use facet_domain::{GroupKey, Item};

// Transferable point-in-time snapshot of one coprocessor's accumulated
// state. Payloads from independent coprocessors (one per shard, or per
// pipeline stage) merge later in the store builder.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Payload {
	entries: Vec<PayloadEntry>,
}
impl Payload {
	pub fn new(entries: Vec<PayloadEntry>) -> Self {
		Self { entries }
	}

	pub fn entries(&self) -> &[PayloadEntry] {
		&self.entries
	}

	pub fn into_entries(self) -> Vec<PayloadEntry> {
		self.entries
	}

	pub fn is_empty(&self) -> bool {
		self.entries.iter().all(|entry| entry.items.is_empty())
	}

	pub fn item_count(&self) -> usize {
		self.entries.iter().map(|entry| entry.items.len()).sum()
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PayloadEntry {
	pub parent: Option<GroupKey>,
	pub items: Vec<Item>,
}
