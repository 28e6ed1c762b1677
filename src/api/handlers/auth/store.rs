//! Credential store: account records keyed by email and username.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::PublicUser;

/// One registered account.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub organization_name: String,
    pub role: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Projection safe to return to clients; omits the password hash and
    /// internal state flags.
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            organization_name: self.organization_name.clone(),
            username: self.username.clone(),
        }
    }
}

/// Fields supplied by register before the store assigns an id.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub organization_name: String,
    pub role: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a conditional insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Conflict,
}

/// Storage abstraction for account records.
///
/// `insert_unique` must be atomic: the uniqueness check and the write happen
/// under one critical section, so two concurrent registrations for the same
/// email or username cannot both succeed.
pub trait CredentialStore: Send + Sync {
    /// Insert if neither email nor username is taken; no mutation on conflict.
    fn insert_unique(&self, account: NewAccount) -> InsertOutcome;

    /// Look up by normalized email.
    fn find_by_email(&self, email: &str) -> Option<Account>;

    /// Flip the verified flag; returns false if the account does not exist.
    fn mark_verified(&self, email: &str) -> bool;

    /// Number of stored accounts.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide in-memory store. Accounts are never deleted and ids are
/// monotonic, starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    accounts: HashMap<String, Account>,
    next_id: i64,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn insert_unique(&self, account: NewAccount) -> InsertOutcome {
        let mut inner = self.lock();

        let taken = inner.accounts.contains_key(&account.email)
            || inner
                .accounts
                .values()
                .any(|existing| existing.username == account.username);
        if taken {
            return InsertOutcome::Conflict;
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.accounts.insert(
            account.email.clone(),
            Account {
                id,
                first_name: account.first_name,
                last_name: account.last_name,
                organization_name: account.organization_name,
                role: account.role,
                email: account.email,
                username: account.username,
                password_hash: account.password_hash,
                is_verified: false,
                created_at: account.created_at,
            },
        );

        InsertOutcome::Inserted(id)
    }

    fn find_by_email(&self, email: &str) -> Option<Account> {
        self.lock().accounts.get(email).cloned()
    }

    fn mark_verified(&self, email: &str) -> bool {
        let mut inner = self.lock();
        match inner.accounts.get_mut(email) {
            Some(account) => {
                account.is_verified = true;
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.lock().accounts.len()
    }
}
