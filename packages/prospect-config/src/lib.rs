mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Cost, Health, LlmProviderConfig, Postgres, Providers, Research, Retry,
	SearchProviderConfig, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.service.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "service.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.service.max_concurrent_jobs == 0 {
		return Err(Error::Validation {
			message: "service.max_concurrent_jobs must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let research = &cfg.research;

	if !research.validation_threshold.is_finite() {
		return Err(Error::Validation {
			message: "research.validation_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&research.validation_threshold) {
		return Err(Error::Validation {
			message: "research.validation_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if research.max_validation_retries == 0 {
		return Err(Error::Validation {
			message: "research.max_validation_retries must be greater than zero.".to_string(),
		});
	}
	if research.phase1_window_size == 0 {
		return Err(Error::Validation {
			message: "research.phase1_window_size must be greater than zero.".to_string(),
		});
	}
	if research.phase2_window_size == 0 {
		return Err(Error::Validation {
			message: "research.phase2_window_size must be greater than zero.".to_string(),
		});
	}
	if research.max_evidence_chars == 0 {
		return Err(Error::Validation {
			message: "research.max_evidence_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.base_delay_ms > cfg.retry.max_delay_ms {
		return Err(Error::Validation {
			message: "retry.base_delay_ms must not exceed retry.max_delay_ms.".to_string(),
		});
	}
	if !cfg.cost.usd_per_credit.is_finite() || cfg.cost.usd_per_credit < 0.0 {
		return Err(Error::Validation {
			message: "cost.usd_per_credit must be a finite number, zero or greater.".to_string(),
		});
	}
	if cfg.health.stall_threshold_seconds <= 0 {
		return Err(Error::Validation {
			message: "health.stall_threshold_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.health.sweep_interval_seconds <= 0 {
		return Err(Error::Validation {
			message: "health.sweep_interval_seconds must be greater than zero.".to_string(),
		});
	}

	for (label, temperature) in [
		("judge", cfg.providers.judge.temperature),
		("analyzer", cfg.providers.analyzer.temperature),
	] {
		if !temperature.is_finite() || temperature < 0.0 {
			return Err(Error::Validation {
				message: format!("Provider {label} temperature must be a finite number, zero or greater."),
			});
		}
	}
	for (label, key) in [
		("search", &cfg.providers.search.api_key),
		("judge", &cfg.providers.judge.api_key),
		("analyzer", &cfg.providers.analyzer.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("search", cfg.providers.search.timeout_ms),
		("judge", cfg.providers.judge.timeout_ms),
		("analyzer", cfg.providers.analyzer.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.providers.search.include_domains.retain(|domain| !domain.trim().is_empty());

	for domain in &mut cfg.providers.search.include_domains {
		*domain = domain.trim().to_ascii_lowercase();
	}

	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
