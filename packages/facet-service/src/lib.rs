pub mod cache;
pub mod completion;
pub mod coprocessor;
pub mod error;
pub mod flat_result;
pub mod payload;
pub mod response;
pub mod search;
pub mod store;
pub mod store_builder;
pub mod table_result;

pub use cache::ResponseCreatorCache;
pub use completion::CompletionState;
pub use coprocessor::Coprocessor;
pub use error::{Error, Result};
pub use flat_result::FlatResultCreator;
pub use payload::{Payload, PayloadEntry};
pub use response::SearchResponseCreator;
pub use search::{
	Fetch, FlatResult, OffsetRange, Query, QueryKey, ResultRequest, ResultStyle, SearchRequest,
	SearchResponse, SearchResult, TableResult, TableRow,
};
pub use store::{Store, StoreFactory};
pub use store_builder::StoreBuilder;
pub use table_result::TableResultCreator;
