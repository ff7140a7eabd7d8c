//! Embedded schema migrations.

use std::time::{Duration, Instant};

use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{MIGRATIONS, PgClient, PgError, PgResult, TRACING_TARGET_MIGRATION};

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Wall time spent applying migrations.
    pub duration: Duration,
    /// Versions applied by this run, oldest first.
    pub applied_versions: Vec<String>,
}

impl MigrationResult {
    /// Returns whether this run changed the schema.
    #[inline]
    pub fn applied_any(&self) -> bool {
        !self.applied_versions.is_empty()
    }
}

/// Applies every migration not yet recorded in `__diesel_schema_migrations`.
///
/// Diesel's harness is synchronous, so the run happens on the blocking pool
/// through an [`AsyncConnectionWrapper`].
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn run_pending_migrations(pg: &PgClient) -> PgResult<MigrationResult> {
    let start = Instant::now();
    let conn = pg.get_pooled_connection().await?;
    let mut conn: AsyncConnectionWrapper<_> = conn.into();

    let outcome = spawn_blocking(move || {
        conn.run_pending_migrations(MIGRATIONS).map(|versions| {
            versions
                .into_iter()
                .map(|version| version.to_string())
                .collect::<Vec<_>>()
        })
    })
    .await
    .map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            error = %err,
            "migration task failed to complete"
        );
        PgError::Migration(err.into())
    })?;

    let duration = start.elapsed();
    let applied_versions = outcome.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            duration = ?duration,
            error = %err,
            "database migration failed"
        );
        PgError::Migration(err)
    })?;

    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        duration = ?duration,
        migrations_count = applied_versions.len(),
        "database schema is up to date"
    );

    Ok(MigrationResult {
        duration,
        applied_versions,
    })
}

/// Migration entry points on [`PgClient`].
pub trait PgClientMigrationExt {
    /// Applies pending migrations. Safe to call repeatedly.
    fn run_pending_migrations(&self) -> impl Future<Output = PgResult<MigrationResult>> + Send;
}

impl PgClientMigrationExt for PgClient {
    async fn run_pending_migrations(&self) -> PgResult<MigrationResult> {
        run_pending_migrations(self).await
    }
}
