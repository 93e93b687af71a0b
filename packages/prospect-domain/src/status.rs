use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);
impl fmt::Display for UnknownStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown status {:?}.", self.0)
	}
}

impl std::error::Error for UnknownStatus {}

/// Lifecycle of a research job.
///
/// `Pending -> Running -> {Completed | Failed | Cancelled}`. Terminal states never transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	Running,
	Completed,
	Failed,
	Cancelled,
}
impl JobStatus {
	pub const TERMINAL: [Self; 3] = [Self::Completed, Self::Failed, Self::Cancelled];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Running => "running",
			Self::Completed => "completed",
			Self::Failed => "failed",
			Self::Cancelled => "cancelled",
		}
	}

	pub fn is_terminal(self) -> bool {
		Self::TERMINAL.contains(&self)
	}

	pub fn can_transition_to(self, next: Self) -> bool {
		match self {
			Self::Pending => matches!(next, Self::Running | Self::Failed | Self::Cancelled),
			Self::Running => next.is_terminal(),
			Self::Completed | Self::Failed | Self::Cancelled => false,
		}
	}
}
impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for JobStatus {
	type Err = UnknownStatus;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"pending" => Ok(Self::Pending),
			"running" => Ok(Self::Running),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			"cancelled" => Ok(Self::Cancelled),
			_ => Err(UnknownStatus(raw.to_string())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
	Pending,
	Researching,
	Completed,
	Failed,
	Skipped,
}
impl CompanyStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Researching => "researching",
			Self::Completed => "completed",
			Self::Failed => "failed",
			Self::Skipped => "skipped",
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed | Self::Skipped)
	}
}
impl fmt::Display for CompanyStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for CompanyStatus {
	type Err = UnknownStatus;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"pending" => Ok(Self::Pending),
			"researching" => Ok(Self::Researching),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			"skipped" => Ok(Self::Skipped),
			_ => Err(UnknownStatus(raw.to_string())),
		}
	}
}
