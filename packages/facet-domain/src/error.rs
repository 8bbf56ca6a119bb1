pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Expression parse error at offset {position}: {message}")]
	ExpressionParse { position: usize, message: String },
	#[error("Filter parse error for field {field:?}: {message}")]
	FilterParse { field: String, message: String },
}
