use std::time::Duration;

use sqlx::mysql::{MySqlConnection, MySqlPoolOptions};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::PayrollError;

pub async fn init_db(config: &Config) -> Result<MySqlPool, sqlx::Error> {
    info!(
        max_connections = config.db_max_connections,
        "Connecting to MySQL"
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await?;

    info!("MySQL connection pool established");
    Ok(pool)
}

/// A transaction scoped to one engine operation.
///
/// Dropping it without `commit` rolls back, so every early return, `?` and
/// cancelled future leaves the store untouched.
pub struct UnitOfWork {
    tx: Transaction<'static, MySql>,
}

impl UnitOfWork {
    pub async fn begin(pool: &MySqlPool) -> Result<Self, PayrollError> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    pub fn conn(&mut self) -> &mut MySqlConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), PayrollError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), PayrollError> {
        debug!("Rolling back unit of work");
        self.tx.rollback().await?;
        Ok(())
    }
}
