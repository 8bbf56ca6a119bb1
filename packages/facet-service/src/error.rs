pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Compile(#[from] facet_domain::Error),
	#[error("Store error: {message}")]
	Store { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
