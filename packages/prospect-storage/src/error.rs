#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
}
impl From<prospect_domain::status::UnknownStatus> for Error {
	fn from(err: prospect_domain::status::UnknownStatus) -> Self {
		Self::InvalidArgument(err.to_string())
	}
}
