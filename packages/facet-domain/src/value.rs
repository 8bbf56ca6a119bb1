use std::{
	cmp::Ordering,
	hash::{Hash, Hasher},
	mem,
};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Val {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Date(OffsetDateTime),
}
impl Val {
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn to_text(&self) -> String {
		match self {
			Self::Null => String::new(),
			Self::Bool(value) => value.to_string(),
			Self::Int(value) => value.to_string(),
			Self::Float(value) => value.to_string(),
			Self::Text(value) => value.clone(),
			Self::Date(value) => value.format(&Rfc3339).unwrap_or_default(),
		}
	}

	pub fn to_number(&self) -> Option<f64> {
		match self {
			Self::Null => None,
			Self::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
			Self::Int(value) => Some(*value as f64),
			Self::Float(value) => Some(*value),
			Self::Text(value) => value.trim().parse().ok(),
			Self::Date(value) => Some((value.unix_timestamp_nanos() / 1_000_000) as f64),
		}
	}

	// Total order used by sort comparators. Nulls sort last; values that
	// both read as numbers compare numerically, everything else compares
	// as text.
	pub fn compare(&self, other: &Self) -> Ordering {
		match (self.is_null(), other.is_null()) {
			(true, true) => Ordering::Equal,
			(true, false) => Ordering::Greater,
			(false, true) => Ordering::Less,
			(false, false) => match (self.to_number(), other.to_number()) {
				(Some(lhs), Some(rhs)) => lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal),
				_ => self.to_text().cmp(&other.to_text()),
			},
		}
	}
}

impl PartialEq for Val {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(lhs), Self::Bool(rhs)) => lhs == rhs,
			(Self::Int(lhs), Self::Int(rhs)) => lhs == rhs,
			(Self::Float(lhs), Self::Float(rhs)) => lhs.to_bits() == rhs.to_bits(),
			(Self::Text(lhs), Self::Text(rhs)) => lhs == rhs,
			(Self::Date(lhs), Self::Date(rhs)) => lhs == rhs,
			_ => false,
		}
	}
}
impl Eq for Val {}

impl Hash for Val {
	fn hash<H: Hasher>(&self, state: &mut H) {
		mem::discriminant(self).hash(state);

		match self {
			Self::Null => {},
			Self::Bool(value) => value.hash(state),
			Self::Int(value) => value.hash(state),
			Self::Float(value) => value.to_bits().hash(state),
			Self::Text(value) => value.hash(state),
			Self::Date(value) => value.unix_timestamp_nanos().hash(state),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cmp::Ordering;

	use crate::value::Val;

	#[test]
	fn nulls_sort_last() {
		assert_eq!(Val::Null.compare(&Val::Int(1)), Ordering::Greater);
		assert_eq!(Val::Int(1).compare(&Val::Null), Ordering::Less);
		assert_eq!(Val::Null.compare(&Val::Null), Ordering::Equal);
	}

	#[test]
	fn numeric_comparison_spans_variants() {
		assert_eq!(Val::Int(2).compare(&Val::Float(10.0)), Ordering::Less);
		assert_eq!(Val::Text("10".to_string()).compare(&Val::Int(9)), Ordering::Greater);
	}

	#[test]
	fn non_numeric_text_compares_lexically() {
		assert_eq!(
			Val::Text("apple".to_string()).compare(&Val::Text("banana".to_string())),
			Ordering::Less
		);
	}

	#[test]
	fn float_equality_uses_bit_pattern() {
		assert_eq!(Val::Float(1.5), Val::Float(1.5));
		assert_ne!(Val::Float(0.0), Val::Float(-0.0));
		assert_eq!(Val::Float(f64::NAN), Val::Float(f64::NAN));
	}

	#[test]
	fn text_form_of_common_variants() {
		assert_eq!(Val::Null.to_text(), "");
		assert_eq!(Val::Int(42).to_text(), "42");
		assert_eq!(Val::Bool(true).to_text(), "true");
	}
}
