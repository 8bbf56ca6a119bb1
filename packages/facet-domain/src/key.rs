use std::{
	fmt::{self, Display, Formatter},
	hash::{Hash, Hasher},
	sync::Arc,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::value::Val;

#[derive(Clone, Debug)]
pub struct GroupKey(Arc<Node>);

#[derive(Debug)]
struct Node {
	parent: Option<GroupKey>,
	depth: u32,
	values: Vec<Val>,
}

impl GroupKey {
	pub fn new(parent: Option<GroupKey>, values: Vec<Val>) -> Self {
		let depth = parent.as_ref().map(|key| key.depth() + 1).unwrap_or(0);

		Self(Arc::new(Node { parent, depth, values }))
	}

	pub fn parent(&self) -> Option<&GroupKey> {
		self.0.parent.as_ref()
	}

	pub fn depth(&self) -> u32 {
		self.0.depth
	}

	pub fn values(&self) -> &[Val] {
		&self.0.values
	}

	// Value chain from the root level down to this key.
	fn levels(&self) -> Vec<Vec<Val>> {
		let mut levels = Vec::with_capacity(self.depth() as usize + 1);
		let mut current = Some(self);

		while let Some(key) = current {
			levels.push(key.values().to_vec());

			current = key.parent();
		}

		levels.reverse();

		levels
	}

	fn from_levels(levels: Vec<Vec<Val>>) -> Option<Self> {
		let mut key = None;

		for values in levels {
			key = Some(Self::new(key, values));
		}

		key
	}
}

// Identity is (parent, values); depth is derived and excluded.
impl PartialEq for GroupKey {
	fn eq(&self, other: &Self) -> bool {
		if Arc::ptr_eq(&self.0, &other.0) {
			return true;
		}

		self.0.values == other.0.values && self.0.parent == other.0.parent
	}
}
impl Eq for GroupKey {}

impl Hash for GroupKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.parent.hash(state);
		self.0.values.hash(state);
	}
}

// Wire form used by open-group lists: levels joined by '/', values within
// a level joined by '|', both separators escaped inside values.
impl Display for GroupKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		for (level_index, values) in self.levels().iter().enumerate() {
			if level_index > 0 {
				f.write_str("/")?;
			}

			for (value_index, value) in values.iter().enumerate() {
				if value_index > 0 {
					f.write_str("|")?;
				}

				f.write_str(&escape(&value.to_text()))?;
			}
		}

		Ok(())
	}
}

impl Serialize for GroupKey {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.levels().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for GroupKey {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let levels = Vec::<Vec<Val>>::deserialize(deserializer)?;

		Self::from_levels(levels)
			.ok_or_else(|| de::Error::custom("group key requires at least one level"))
	}
}

fn escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '\\' | '|' | '/') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
