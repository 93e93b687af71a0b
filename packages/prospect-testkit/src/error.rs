pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("PROSPECT_PG_DSN is not a valid Postgres DSN: {0}")]
	InvalidDsn(sqlx::Error),
	#[error("No admin database (postgres, template1) accepted a connection: {0}")]
	AdminUnavailable(sqlx::Error),
	#[error("Failed to create research test database {name}: {source}")]
	Create { name: String, source: sqlx::Error },
	#[error("Failed to drop research test database {name}: {source}")]
	Drop { name: String, source: sqlx::Error },
}
