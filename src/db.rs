use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use crate::store::StoreResult;

// Database-wide settings only; a per-connection pragma reaches one pooled connection.
const PRAGMAS: &[&str] = &["PRAGMA journal_mode=WAL"];

/// Opens the pool once for the life of the process and brings the schema up
/// to date. Handlers share the returned connection; nothing reconnects later.
pub async fn connect_and_migrate(
    database_url: &str,
    max_connections: u32,
) -> StoreResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(max_connections.max(1)).sqlx_logging(false);

    let db = Database::connect(options).await?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    tracing::debug!(url = %database_url, "database ready");
    Ok(db)
}
