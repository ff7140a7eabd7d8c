//! Account repository.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::model::{Account, NewAccount, UpdateAccount};
use crate::{PgConnection, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Account persistence.
pub trait AccountRepository {
    /// Inserts an account, normalizing the email to trimmed lowercase.
    ///
    /// Fails with a unique violation on `accounts_email_unique` if the email is taken.
    fn create_account(
        &mut self,
        new_account: NewAccount,
    ) -> impl Future<Output = PgResult<Account>> + Send;

    fn find_account_by_id(
        &mut self,
        account_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<Account>>> + Send;

    /// Looks an account up by email after the same normalization as [`create_account`].
    ///
    /// [`create_account`]: AccountRepository::create_account
    fn find_account_by_email(
        &mut self,
        email: &str,
    ) -> impl Future<Output = PgResult<Option<Account>>> + Send;

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `None` if the account does not exist.
    fn update_account(
        &mut self,
        account_id: Uuid,
        updates: UpdateAccount,
    ) -> impl Future<Output = PgResult<Option<Account>>> + Send;
}

impl AccountRepository for PgConnection {
    async fn create_account(&mut self, mut new_account: NewAccount) -> PgResult<Account> {
        use schema::accounts;

        new_account.email = new_account.email.trim().to_lowercase();
        new_account.display_name = new_account.display_name.trim().to_owned();

        let account = diesel::insert_into(accounts::table)
            .values(&new_account)
            .returning(Account::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            account_id = %account.id,
            "account created"
        );

        Ok(account)
    }

    async fn find_account_by_id(&mut self, account_id: Uuid) -> PgResult<Option<Account>> {
        use schema::accounts::{self, dsl};

        accounts::table
            .filter(dsl::id.eq(account_id))
            .select(Account::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)
    }

    async fn find_account_by_email(&mut self, email: &str) -> PgResult<Option<Account>> {
        use schema::accounts::{self, dsl};

        let email = email.trim().to_lowercase();
        accounts::table
            .filter(dsl::email.eq(email))
            .select(Account::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)
    }

    async fn update_account(
        &mut self,
        account_id: Uuid,
        mut updates: UpdateAccount,
    ) -> PgResult<Option<Account>> {
        use schema::accounts::{self, dsl};

        updates.display_name = updates.display_name.map(|name| name.trim().to_owned());
        updates.updated_at = Some(jiff::Timestamp::now().into());

        diesel::update(accounts::table.filter(dsl::id.eq(account_id)))
            .set(&updates)
            .returning(Account::as_returning())
            .get_result(self)
            .await
            .optional()
            .map_err(PgError::from)
    }
}
