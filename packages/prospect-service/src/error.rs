pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<prospect_storage::Error> for Error {
	fn from(err: prospect_storage::Error) -> Self {
		match err {
			prospect_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			prospect_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			prospect_storage::Error::NotFound(message) => Self::NotFound { message },
			prospect_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<prospect_providers::Error> for Error {
	fn from(err: prospect_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
