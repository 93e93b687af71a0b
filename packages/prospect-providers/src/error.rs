pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How a provider failure should be treated by callers that retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Timeouts, connection failures and server errors.
	Transient,
	RateLimited,
	/// The request or the response was malformed.
	Rejected,
	/// The request payload exceeds what the provider accepts.
	TooLarge,
	Fatal,
}
impl ErrorKind {
	pub fn for_status(status: u16) -> Self {
		match status {
			413 => Self::TooLarge,
			429 => Self::RateLimited,
			400 | 422 => Self::Rejected,
			400..=499 => Self::Fatal,
			_ => Self::Transient,
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Provider returned HTTP {status}: {body}")]
	Status { status: u16, body: String },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("{message}")]
	Unavailable { message: String },
}
impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Reqwest(err) => match err.status() {
				Some(status) => ErrorKind::for_status(status.as_u16()),
				None if err.is_decode() => ErrorKind::Rejected,
				None if err.is_builder() => ErrorKind::Fatal,
				None => ErrorKind::Transient,
			},
			Self::SerdeJson(_) | Self::InvalidResponse { .. } => ErrorKind::Rejected,
			Self::InvalidHeaderName(_) | Self::InvalidHeaderValue(_) | Self::InvalidConfig { .. } =>
				ErrorKind::Fatal,
			Self::Status { status, .. } => ErrorKind::for_status(*status),
			Self::Unavailable { .. } => ErrorKind::Transient,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_http_statuses() {
		assert_eq!(ErrorKind::for_status(413), ErrorKind::TooLarge);
		assert_eq!(ErrorKind::for_status(429), ErrorKind::RateLimited);
		assert_eq!(ErrorKind::for_status(400), ErrorKind::Rejected);
		assert_eq!(ErrorKind::for_status(422), ErrorKind::Rejected);
		assert_eq!(ErrorKind::for_status(401), ErrorKind::Fatal);
		assert_eq!(ErrorKind::for_status(404), ErrorKind::Fatal);
		assert_eq!(ErrorKind::for_status(500), ErrorKind::Transient);
		assert_eq!(ErrorKind::for_status(503), ErrorKind::Transient);
	}

	#[test]
	fn malformed_bodies_are_rejections() {
		let err = Error::InvalidResponse { message: "Missing choices.".to_string() };

		assert_eq!(err.kind(), ErrorKind::Rejected);
		assert_eq!(Error::Status { status: 413, body: String::new() }.kind(), ErrorKind::TooLarge);
	}
}
