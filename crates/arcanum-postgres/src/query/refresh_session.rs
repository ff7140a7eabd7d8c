//! Refresh session repository.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::model::{NewRefreshSession, RefreshSession};
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Refresh session persistence. All lookups go through the token identity.
pub trait RefreshSessionRepository {
    /// Inserts a session; a duplicate identity is a unique violation.
    fn create_refresh_session(
        &mut self,
        new_session: NewRefreshSession,
    ) -> impl Future<Output = PgResult<RefreshSession>> + Send;

    fn find_refresh_session_by_identity(
        &mut self,
        token_identity: &str,
    ) -> impl Future<Output = PgResult<Option<RefreshSession>>> + Send;

    /// Deletes one session. Returns `false` if no row matched.
    fn delete_refresh_session_by_identity(
        &mut self,
        token_identity: &str,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Deletes every session of an account, returning how many were removed.
    fn delete_refresh_sessions_for_account(
        &mut self,
        account_id: Uuid,
    ) -> impl Future<Output = PgResult<usize>> + Send;

    /// Purges sessions whose `expires_at` is at or before `now`.
    fn delete_expired_refresh_sessions(
        &mut self,
        now: jiff::Timestamp,
    ) -> impl Future<Output = PgResult<usize>> + Send;
}

impl RefreshSessionRepository for PgConnection {
    async fn create_refresh_session(
        &mut self,
        new_session: NewRefreshSession,
    ) -> PgResult<RefreshSession> {
        use schema::refresh_sessions;

        diesel::insert_into(refresh_sessions::table)
            .values(&new_session)
            .returning(RefreshSession::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)
    }

    async fn find_refresh_session_by_identity(
        &mut self,
        token_identity: &str,
    ) -> PgResult<Option<RefreshSession>> {
        use schema::refresh_sessions::{self, dsl};

        refresh_sessions::table
            .filter(dsl::token_identity.eq(token_identity))
            .select(RefreshSession::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)
    }

    async fn delete_refresh_session_by_identity(&mut self, token_identity: &str) -> PgResult<bool> {
        use schema::refresh_sessions::{self, dsl};

        let rows = diesel::delete(refresh_sessions::table)
            .filter(dsl::token_identity.eq(token_identity))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(rows > 0)
    }

    async fn delete_refresh_sessions_for_account(&mut self, account_id: Uuid) -> PgResult<usize> {
        use schema::refresh_sessions::{self, dsl};

        let rows = diesel::delete(refresh_sessions::table)
            .filter(dsl::account_id.eq(account_id))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            account_id = %account_id,
            revoked = rows,
            "refresh sessions revoked"
        );

        Ok(rows)
    }

    async fn delete_expired_refresh_sessions(&mut self, now: jiff::Timestamp) -> PgResult<usize> {
        use schema::refresh_sessions::{self, dsl};

        let rows = diesel::delete(refresh_sessions::table)
            .filter(dsl::expires_at.le(jiff_diesel::Timestamp::from(now)))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            purged = rows,
            "expired refresh sessions purged"
        );

        Ok(rows)
    }
}
