//! Durable user store.
//!
//! The store's unique email constraint is the final arbiter for concurrent
//! registrations: a verify that loses the race gets a duplicate error back
//! rather than silently overwriting.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use sqlx::PgPool;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::models::{NewUser, Role, User};
use crate::services::ServiceError;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Create a verified user with the default role. Fails with
    /// `DuplicateUser` if the email is already taken.
    async fn create_verified(&self, new: NewUser) -> Result<User, ServiceError>;
}

/// PostgreSQL-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name, contact_number, phone, verified, role, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_verified(&self, new: NewUser) -> Result<User, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash, name, contact_number, phone, verified, role) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6) \
             RETURNING id, email, password_hash, name, contact_number, phone, verified, role, created_at",
        )
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.contact_number)
        .bind(&new.phone)
        .bind(Role::Patient.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return ServiceError::DuplicateUser;
                }
            }
            ServiceError::Database(e)
        })?;

        Ok(user)
    }
}

/// In-memory user store for tests and local development.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
    next_id: AtomicI64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn create_verified(&self, new: NewUser) -> Result<User, ServiceError> {
        match self.users.entry(new.email.clone()) {
            Entry::Occupied(_) => Err(ServiceError::DuplicateUser),
            Entry::Vacant(vacant) => {
                let user = User {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    email: new.email,
                    password_hash: new.password_hash,
                    name: new.name,
                    contact_number: new.contact_number,
                    phone: new.phone,
                    verified: true,
                    role: Role::Patient.as_str().to_string(),
                    created_at: Utc::now(),
                };
                vacant.insert(user.clone());
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$stub".into(),
            name: "Alice".into(),
            contact_number: "555-0100".into(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_defaults() {
        let store = InMemoryUserStore::new();

        let a = store.create_verified(new_user("a@x.com")).await.unwrap();
        let b = store.create_verified(new_user("b@x.com")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.verified);
        assert_eq!(a.role, "patient");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryUserStore::new();
        store.create_verified(new_user("a@x.com")).await.unwrap();

        let err = store.create_verified(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateUser));
    }
}
