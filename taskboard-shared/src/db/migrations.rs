/// Embedded schema migrations
///
/// The SQL files in the workspace `migrations/` directory are compiled into
/// the binary and applied at startup. A failed migration aborts startup.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::migrations::run_migrations;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{error, info};

/// Migrations embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Applying database migrations"
    );

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();

        assert_eq!(versions.len(), 5);
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_migration_descriptions() {
        let descriptions: Vec<String> = MIGRATOR
            .iter()
            .map(|m| m.description.to_string())
            .collect();

        assert_eq!(
            descriptions,
            vec![
                "create users",
                "create boards",
                "create board invitations",
                "create tasks",
                "create notifications",
            ]
        );
    }
}
