use arcanum_postgres::model::{
    Account as AccountModel, NewAccount as NewAccountModel, NewRefreshSession, RefreshSession,
    UpdateAccount,
};
use arcanum_postgres::query::{AccountRepository, RefreshSessionRepository};
use arcanum_postgres::types::ConstraintCategory;
use arcanum_postgres::{PgClient, PgConn, PgError};
use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use super::{
    Account, AccountStore, NewAccount, NewSession, SessionRecord, SessionStore, StoreError,
    TokenIdentity,
};
use crate::TRACING_TARGET_STORE;

impl From<PgError> for StoreError {
    fn from(err: PgError) -> Self {
        match err.constraint_violation() {
            Some(violation) if violation.categorize() == ConstraintCategory::Uniqueness => {
                return StoreError::Conflict {
                    constraint: violation.to_string(),
                };
            }
            Some(violation) => {
                // Input is validated before it reaches the database.
                tracing::error!(
                    target: TRACING_TARGET_STORE,
                    table = violation.table_name(),
                    constraint = %violation,
                    category = ?violation.categorize(),
                    "write rejected by a database constraint"
                );
                return StoreError::Backend(Box::new(err));
            }
            None if err.is_unique_violation() => {
                let constraint = err.constraint().unwrap_or("unknown").to_owned();
                return StoreError::Conflict { constraint };
            }
            None => {}
        }

        tracing::error!(
            target: TRACING_TARGET_STORE,
            error = %err,
            transient = err.is_transient(),
            "postgres operation failed"
        );
        StoreError::Backend(Box::new(err))
    }
}

impl From<AccountModel> for Account {
    fn from(model: AccountModel) -> Self {
        Self {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            display_name: model.display_name,
            is_premium: model.is_premium,
            premium_expires_at: model.premium_expires_at.map(jiff::Timestamp::from),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<RefreshSession> for SessionRecord {
    fn from(model: RefreshSession) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            token_identity: TokenIdentity::from_stored(model.token_identity),
            expires_at: model.expires_at.into(),
            created_at: model.created_at.into(),
        }
    }
}

/// Postgres-backed account and session store.
#[derive(Debug, Clone)]
pub struct PgStore {
    client: PgClient,
}

impl PgStore {
    /// Wraps a connected client. Migrations are expected to be applied.
    pub fn new(client: PgClient) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<PgConn, StoreError> {
        Ok(self.client.get_connection().await?)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut conn = self.connection().await?;
        let model = NewAccountModel {
            email: account.email,
            password_hash: account.password_hash,
            display_name: account.display_name,
        };

        Ok(conn.create_account(model).await?.into())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.find_account_by_id(id).await?.map(Account::from))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.find_account_by_email(email).await?.map(Account::from))
    }

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: &str,
    ) -> Result<Account, StoreError> {
        let mut conn = self.connection().await?;
        let updates = UpdateAccount {
            display_name: Some(display_name.to_owned()),
            ..Default::default()
        };

        conn.update_account(id, updates)
            .await?
            .map(Account::from)
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.client.ping().await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: NewSession) -> Result<SessionRecord, StoreError> {
        let mut conn = self.connection().await?;
        let model = NewRefreshSession {
            account_id: session.account_id,
            token_identity: session.token_identity.as_str().to_owned(),
            expires_at: session.expires_at.into(),
        };

        Ok(conn.create_refresh_session(model).await?.into())
    }

    async fn find_by_token_identity(
        &self,
        identity: &TokenIdentity,
    ) -> Result<SessionRecord, StoreError> {
        let mut conn = self.connection().await?;
        conn.find_refresh_session_by_identity(identity.as_str())
            .await?
            .map(SessionRecord::from)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_token_identity(&self, identity: &TokenIdentity) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        if conn
            .delete_refresh_session_by_identity(identity.as_str())
            .await?
        {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn delete_all_by_account(&self, account_id: Uuid) -> Result<usize, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.delete_refresh_sessions_for_account(account_id).await?)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut conn = self.connection().await?;
        Ok(conn.delete_expired_refresh_sessions(now).await?)
    }
}
