use crate::config::AppConfig;
use crate::migrator::Migrator;
use metrics::counter;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

/// Open the connection pool described by the application config.
pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    counter!("db_connections_established_total", 1);
    info!(max = config.db_max_connections, "database pool established");
    Ok(db)
}

/// Run all pending migrations. Invoked at startup when `auto_migrate` is set
/// and by the test harness against fresh databases.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;
    info!("database migrations applied");
    Ok(())
}

/// Liveness probe used by the health endpoint.
pub async fn check_connection(db: &DatabaseConnection) -> Result<(), DbErr> {
    match db.ping().await {
        Ok(()) => Ok(()),
        Err(err) => {
            counter!("db_ping_failures_total", 1);
            Err(err)
        }
    }
}
