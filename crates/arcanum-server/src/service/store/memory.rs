use std::collections::HashMap;
use std::sync::Arc;

use arcanum_postgres::types::{AccountConstraints, RefreshSessionConstraints};
use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Account, AccountStore, NewAccount, NewSession, SessionRecord, SessionStore, StoreError,
    TokenIdentity, normalize_email,
};

#[derive(Default)]
struct Accounts {
    by_id: HashMap<Uuid, Account>,
    id_by_email: HashMap<String, Uuid>,
}

/// In-process account and session store.
///
/// Every operation takes a single lock, so uniqueness checks and their
/// writes are atomic. State is lost on restart and not shared between
/// instances.
#[derive(Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<RwLock<Accounts>>,
    sessions: Arc<RwLock<HashMap<TokenIdentity, SessionRecord>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants or revokes premium, standing in for the billing integration.
    pub async fn set_premium(
        &self,
        account_id: Uuid,
        is_premium: bool,
        expires_at: Option<Timestamp>,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_id
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound)?;

        account.is_premium = is_premium;
        account.premium_expires_at = expires_at;
        account.updated_at = Timestamp::now();
        Ok(())
    }

    /// Overrides a session's stored expiry, as an operator revoking it early would.
    pub async fn set_session_expiry(
        &self,
        identity: &TokenIdentity,
        expires_at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(identity).ok_or(StoreError::NotFound)?;
        session.expires_at = expires_at;
        Ok(())
    }

    /// Number of stored session records, expired ones included.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let email = normalize_email(&account.email);
        let mut accounts = self.accounts.write().await;

        if accounts.id_by_email.contains_key(&email) {
            return Err(StoreError::Conflict {
                constraint: AccountConstraints::EmailUnique.to_string(),
            });
        }

        let now = Timestamp::now();
        let created = Account {
            id: Uuid::now_v7(),
            email: email.clone(),
            password_hash: account.password_hash,
            display_name: account.display_name.trim().to_owned(),
            is_premium: false,
            premium_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        accounts.id_by_email.insert(email, created.id);
        accounts.by_id.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.by_id.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .id_by_email
            .get(&normalize_email(email))
            .and_then(|id| accounts.by_id.get(id))
            .cloned();
        Ok(account)
    }

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: &str,
    ) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;

        account.display_name = display_name.trim().to_owned();
        account.updated_at = Timestamp::now();
        Ok(account.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: NewSession) -> Result<SessionRecord, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token_identity) {
            return Err(StoreError::Conflict {
                constraint: RefreshSessionConstraints::TokenIdentityUnique.to_string(),
            });
        }

        let record = SessionRecord {
            id: Uuid::now_v7(),
            account_id: session.account_id,
            token_identity: session.token_identity.clone(),
            expires_at: session.expires_at,
            created_at: Timestamp::now(),
        };

        sessions.insert(session.token_identity, record.clone());
        Ok(record)
    }

    async fn find_by_token_identity(
        &self,
        identity: &TokenIdentity,
    ) -> Result<SessionRecord, StoreError> {
        self.sessions
            .read()
            .await
            .get(identity)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_by_token_identity(&self, identity: &TokenIdentity) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .remove(identity)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn delete_all_by_account(&self, account_id: Uuid) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.account_id != account_id);
        Ok(before - sessions.len())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_owned(),
            password_hash: "$2b$04$digest".to_owned(),
            display_name: " Alice ".to_owned(),
        }
    }

    fn new_session(account_id: Uuid, token: &str) -> NewSession {
        NewSession {
            account_id,
            token_identity: TokenIdentity::from_token(token),
            expires_at: Timestamp::now() + SignedDuration::from_hours(1),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let account = store.create_account(new_account("Alice@Example.com")).await?;
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.display_name, "Alice");

        let result = store.create_account(new_account(" alice@example.COM")).await;
        assert!(matches!(
            result,
            Err(StoreError::Conflict { constraint }) if constraint == "accounts_email_unique"
        ));

        let found = store.find_account_by_email("ALICE@example.com").await?;
        assert_eq!(found.map(|a| a.id), Some(account.id));
        Ok(())
    }

    #[tokio::test]
    async fn session_lifecycle() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let account_id = Uuid::new_v4();
        let record = store.create_session(new_session(account_id, "token-a")).await?;

        let found = store.find_by_token_identity(&record.token_identity).await?;
        assert_eq!(found, record);

        let duplicate = store.create_session(new_session(account_id, "token-a")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict { .. })));

        store.delete_by_token_identity(&record.token_identity).await?;
        assert!(matches!(
            store.delete_by_token_identity(&record.token_identity).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.find_by_token_identity(&record.token_identity).await,
            Err(StoreError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_all_only_touches_one_account() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        store.create_session(new_session(alice, "a1")).await?;
        store.create_session(new_session(alice, "a2")).await?;
        store.create_session(new_session(bob, "b1")).await?;

        assert_eq!(store.delete_all_by_account(alice).await?, 2);
        assert_eq!(store.delete_all_by_account(alice).await?, 0);
        assert_eq!(store.session_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let account_id = Uuid::new_v4();
        let live = store.create_session(new_session(account_id, "live")).await?;
        let stale = store.create_session(new_session(account_id, "stale")).await?;

        let now = Timestamp::now();
        store.set_session_expiry(&stale.token_identity, now).await?;

        assert_eq!(store.purge_expired(now).await?, 1);
        assert_eq!(store.purge_expired(now).await?, 0);
        assert!(store.find_by_token_identity(&live.token_identity).await.is_ok());
        assert!(matches!(
            store.find_by_token_identity(&stale.token_identity).await,
            Err(StoreError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn update_display_name_of_missing_account() {
        let store = MemoryStore::new();
        let result = store.update_display_name(Uuid::new_v4(), "Bob").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }
}
