pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Service(#[from] prospect_service::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
}
