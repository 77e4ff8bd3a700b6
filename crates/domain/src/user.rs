//! Customers and their lifetime order statistics.

use chrono::{DateTime, Utc};
use common::SharedClock;
use doc_store::{DocumentStore, NewDocument, StoreError};
use serde::{Deserialize, Serialize};

use crate::collections::USERS;
use crate::error::{DomainError, Result};
use crate::ids::UserId;
use crate::money::Money;
use crate::persistence::update_with_retry;
use crate::settings::DEFAULT_MAX_WRITE_ATTEMPTS;

/// Aggregate figures over a user's delivered orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserStats {
    pub total_orders: u64,
    pub total_spent: Money,
    pub last_order_date: Option<DateTime<Utc>>,
}

/// A user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    stats: UserStats,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Creates, reads and updates user documents.
#[derive(Clone)]
pub struct UserDirectory<S> {
    store: S,
    clock: SharedClock,
    max_write_attempts: u32,
}

impl<S: DocumentStore> UserDirectory<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }

    /// Overrides the compare-and-set attempt limit for stat updates.
    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts;
        self
    }

    /// Creates a user. Emails are unique, compared case-insensitively.
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: NewUser) -> Result<User> {
        let name = input.name.trim().to_string();
        let email = normalize_email(&input.email);
        if name.is_empty() {
            return Err(DomainError::validation("user name must not be empty"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(DomainError::validation(format!(
                    "'{}' is not a valid email address",
                    input.email
                )));
            }
        }

        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            name,
            email: email.clone(),
            stats: UserStats::default(),
            created_at: now,
        };
        let document =
            NewDocument::from_value(USERS, user.id.into(), now, &user)?.with_key(email.clone());
        self.store.insert(document).await.map_err(|e| match e {
            StoreError::DuplicateKey { .. } => DomainError::DuplicateKey {
                entity: "user email".to_string(),
                key: email,
            },
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Retrieves a user by id.
    pub async fn get(&self, id: UserId) -> Result<User> {
        self.store
            .get(USERS, id.into())
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?
            .into_decoded()
            .map_err(Into::into)
    }

    /// Retrieves a user by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.store.get_by_key(USERS, &normalize_email(email)).await? {
            Some(document) => Ok(Some(document.into_decoded()?)),
            None => Ok(None),
        }
    }

    /// Counts a delivered order towards the user's statistics.
    #[tracing::instrument(skip(self))]
    pub async fn record_order(
        &self,
        id: UserId,
        total: Money,
        ordered_at: DateTime<Utc>,
    ) -> Result<User> {
        let updated = update_with_retry(
            &self.store,
            self.clock.as_ref(),
            USERS,
            "user",
            id.into(),
            self.max_write_attempts,
            move |user: &mut User, _| {
                user.stats.total_spent =
                    user.stats.total_spent.checked_add(total).ok_or_else(|| {
                        DomainError::validation(format!("total spent by user {id} is out of range"))
                    })?;
                user.stats.total_orders += 1;
                user.stats.last_order_date = Some(ordered_at);
                Ok(())
            },
        )
        .await?;
        Ok(updated.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::FixedClock;
    use doc_store::InMemoryDocumentStore;
    use std::sync::Arc;

    fn directory() -> UserDirectory<InMemoryDocumentStore> {
        UserDirectory::new(
            InMemoryDocumentStore::new(),
            Arc::new(FixedClock::new(Utc::now())),
        )
    }

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let users = directory();
        let ada = users
            .create(NewUser::new("Ada", "Ada@Example.com"))
            .await
            .unwrap();
        assert_eq!(ada.email(), "ada@example.com");

        let dup = users.create(NewUser::new("Other", "ada@example.COM")).await;
        assert!(matches!(dup, Err(DomainError::DuplicateKey { .. })));

        let found = users.find_by_email(" ADA@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id()), Some(ada.id()));
    }

    #[tokio::test]
    async fn rejects_malformed_input() {
        let users = directory();
        assert!(users.create(NewUser::new("", "a@b.io")).await.is_err());
        assert!(users.create(NewUser::new("Ada", "nobody")).await.is_err());
        assert!(users.create(NewUser::new("Ada", "@b.io")).await.is_err());
    }

    #[tokio::test]
    async fn record_order_accumulates() {
        let users = directory();
        let user = users.create(NewUser::new("Ada", "ada@example.com")).await.unwrap();
        let at = Utc::now();

        users
            .record_order(user.id(), Money::from_cents(1100), at)
            .await
            .unwrap();
        let updated = users
            .record_order(user.id(), Money::from_cents(900), at)
            .await
            .unwrap();

        assert_eq!(updated.stats().total_orders, 2);
        assert_eq!(updated.stats().total_spent, Money::from_cents(2000));
        assert_eq!(updated.stats().last_order_date, Some(at));
        assert_eq!(users.get(user.id()).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn record_order_for_unknown_user_is_not_found() {
        let users = directory();
        let err = users
            .record_order(UserId::new(), Money::zero(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
