use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

/// Advisory lock key taken while the schema is applied, so concurrent workers bootstrap one at a
/// time. The bytes spell "prospect".
const SCHEMA_LOCK_KEY: i64 = 0x7072_6F73_7065_6374;

/// Shared Postgres pool for jobs and companies.
pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &prospect_config::Postgres) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.connect(&cfg.dsn)
			.await?;

		Ok(Self { pool })
	}

	/// Creates the research tables if they are missing. Safe to call on every start.
	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		// The transaction pins one connection, which releases the lock on commit.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_KEY)
			.execute(&mut *tx)
			.await?;

		for statement in statements(&sql) {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}

/// Splits the rendered schema into executable statements. The table files contain no bodies with
/// embedded semicolons.
fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}
