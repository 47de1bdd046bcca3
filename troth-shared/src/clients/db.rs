use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::errors::{AppError, AppResult};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str, max_size: u32) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .min_idle(Some(2))
        .test_on_check_out(true)
        .build(manager)?;

    tracing::info!(max_size, "database connection pool created");
    Ok(pool)
}

/// Check out a connection, mapping pool exhaustion to an internal error.
pub fn get_conn(pool: &DbPool) -> AppResult<DbConn> {
    pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        AppError::internal("database connection error")
    })
}
