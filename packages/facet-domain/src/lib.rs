pub mod compiler;
pub mod data;
pub mod error;
pub mod expr;
pub mod field;
pub mod format;
pub mod item;
pub mod key;
pub mod sizes;
pub mod value;

pub use compiler::{CompiledField, CompiledFields, CompiledFilter, FieldIndex};
pub use data::Data;
pub use error::{Error, Result};
pub use expr::{AggregateOp, CompiledExpr};
pub use field::{
	DateTimeFormat, Field, FieldFilter, Format, FormatKind, NumberFormat, Sort, SortDirection,
	TableSettings,
};
pub use format::FieldFormatter;
pub use item::{Generator, Item, ItemSorter, Items};
pub use key::GroupKey;
pub use sizes::Sizes;
pub use value::Val;
