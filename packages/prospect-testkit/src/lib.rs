//! Disposable Postgres databases for the storage and pipeline tests.
//!
//! Tests that need Postgres are `#[ignore]`d and read the server from `PROSPECT_PG_DSN`. Each
//! test gets its own `prospect_test_*` database so runs never share job rows.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

pub const DSN_ENV: &str = "PROSPECT_PG_DSN";

const DATABASE_PREFIX: &str = "prospect_test_";
const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// Returns the server DSN, or `None` when Postgres tests should be skipped.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A research database that exists for one test.
///
/// Call [`TestDatabase::cleanup`] at the end of the test. A database dropped without it is
/// removed from a helper thread so a failing assertion does not leak it.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(server_dsn: &str) -> Result<Self> {
		let server = PgConnectOptions::from_str(server_dsn).map_err(Error::InvalidDsn)?;
		let (admin, mut conn) = admin_connection(&server).await?;
		let name = format!("{DATABASE_PREFIX}{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|source| Error::Create { name: name.clone(), source })?;

		let dsn = server.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, dropped: false })
	}

	/// DSN for `prospect_storage::db::Db::connect`.
	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.admin, &self.name).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = std::mem::take(&mut self.name);
		let admin = self.admin.clone();
		// The test's runtime may already be gone, so the drop runs on its own.
		let helper = thread::spawn(move || {
			let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
			let outcome = match runtime {
				Ok(runtime) => runtime.block_on(drop_database(&admin, &name)),
				Err(err) => {
					eprintln!("Could not start a runtime to drop {name}: {err}.");

					return;
				},
			};

			if let Err(err) = outcome {
				eprintln!("{err}.");
			}
		});

		let _ = helper.join();
	}
}

async fn admin_connection(server: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last = None;

	for database in ADMIN_DATABASES {
		let options = server.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last = Some(err),
		}
	}

	Err(Error::AdminUnavailable(last.unwrap_or(sqlx::Error::PoolClosed)))
}

async fn drop_database(admin: &PgConnectOptions, name: &str) -> Result<()> {
	let failed = |source| Error::Drop { name: name.to_string(), source };
	let mut conn = PgConnection::connect_with(admin).await.map_err(failed)?;

	// Pools from the test may still hold connections.
	let _ = sqlx::query(
		"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.execute(&mut conn)
	.await;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await.map_err(failed)?;

	Ok(())
}
